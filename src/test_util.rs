//! Helpers for building DWARF byte streams in tests.

extern crate test_assembler;

use self::test_assembler::Section;
use leb128;

/// LEB128 appenders for `test_assembler::Section`.
pub trait SectionMethods
    where Self: Sized
{
    /// Append an unsigned LEB128 encoded integer.
    fn uleb(self, val: u64) -> Self;

    /// Append a signed LEB128 encoded integer.
    fn sleb(self, val: i64) -> Self;
}

impl SectionMethods for Section {
    fn uleb(self, val: u64) -> Self {
        let mut buf = Vec::new();
        leb128::write::unsigned(&mut buf, val).unwrap();
        self.append_bytes(&buf)
    }

    fn sleb(self, val: i64) -> Self {
        let mut buf = Vec::new();
        leb128::write::signed(&mut buf, val).unwrap();
        self.append_bytes(&buf)
    }
}

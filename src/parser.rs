//! Low-level parsing primitives shared by every section decoder.

use constants;
use endianity::{Endianity, EndianBuf};
use leb128;
use std::error;
use std::ffi;
use std::fmt;
use std::io;
use std::result;

/// An error that occurred when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An error parsing an unsigned LEB128 value.
    BadUnsignedLeb128,
    /// An error parsing a signed LEB128 value.
    BadSignedLeb128,
    /// The abbreviation's has-children byte was not one of
    /// `DW_CHILDREN_{yes,no}`.
    BadHasChildren,
    /// The specified length is impossible.
    BadLength,
    /// Found an unknown `DW_FORM_*` type.
    UnknownForm(constants::DwForm),
    /// Expected a zero, found something else.
    ExpectedZero,
    /// Found an unknown reserved initial length value.
    UnknownReservedLength,
    /// Found an unknown DWARF version.
    UnknownVersion,
    /// Found a record with an unknown abbreviation code.
    UnknownAbbreviation,
    /// Hit the end of input before it was expected.
    UnexpectedEof,
    /// Found an unknown standard opcode.
    UnknownStandardOpcode(constants::DwLns),
    /// Found an unknown extended opcode.
    UnknownExtendedOpcode(constants::DwLne),
    /// Found an unknown DWARF expression opcode.
    UnknownOpcode(constants::DwOp),
    /// Found a vendor-defined expression opcode we have no handler for.
    UnsupportedOpcode(constants::DwOp),
    /// The specified segment selector size is not supported.
    UnsupportedSegmentSelectorSize(u8),
    /// The minimum instruction length must not be zero.
    MinimumInstructionLengthZero,
    /// The maximum operations per instruction must not be zero.
    MaximumOperationsPerInstructionZero,
    /// The line range must not be zero.
    LineRangeZero,
    /// The opcode base must not be zero.
    OpcodeBaseZero,
    /// Found an invalid UTF-8 string.
    BadUtf8,
    /// Found a zero-length inline string.
    EmptyString,
    /// A line number header's entry formats did not contain exactly one
    /// `DW_LNCT_path` entry.
    MissingPathEntryFormat,
    /// An offset value was larger than the maximum supported value.
    UnsupportedOffset,
    /// We tried to convert some number into a `u8`, but it was too large.
    CannotFitInU8,
}

impl Error {
    /// A short description of the error.
    pub fn description(&self) -> &str {
        match *self {
            Error::BadUnsignedLeb128 => "An error parsing an unsigned LEB128 value",
            Error::BadSignedLeb128 => "An error parsing a signed LEB128 value",
            Error::BadHasChildren => {
                "The abbreviation's has-children byte was not one of
                 `DW_CHILDREN_{yes,no}`"
            }
            Error::BadLength => "The specified length is impossible",
            Error::UnknownForm(_) => "Found an unknown `DW_FORM_*` type",
            Error::ExpectedZero => "Expected a zero, found something else",
            Error::UnknownReservedLength => "Found an unknown reserved initial length value",
            Error::UnknownVersion => "Found an unknown DWARF version",
            Error::UnknownAbbreviation => "Found a record with an unknown abbreviation code",
            Error::UnexpectedEof => "Hit the end of input before it was expected",
            Error::UnknownStandardOpcode(_) => "Found an unknown standard opcode",
            Error::UnknownExtendedOpcode(_) => "Found an unknown extended opcode",
            Error::UnknownOpcode(_) => "Found an unknown DWARF expression opcode",
            Error::UnsupportedOpcode(_) => {
                "Found a vendor-defined expression opcode we have no handler for"
            }
            Error::UnsupportedSegmentSelectorSize(_) => {
                "The specified segment selector size is not supported"
            }
            Error::MinimumInstructionLengthZero => {
                "The minimum instruction length must not be zero."
            }
            Error::MaximumOperationsPerInstructionZero => {
                "The maximum operations per instruction must not be zero."
            }
            Error::LineRangeZero => "The line range must not be zero.",
            Error::OpcodeBaseZero => "The opcode base must not be zero.",
            Error::BadUtf8 => "Found an invalid UTF-8 string.",
            Error::EmptyString => "Found a zero-length inline string.",
            Error::MissingPathEntryFormat => {
                "A line number header's entry formats did not contain exactly one
                 `DW_LNCT_path` entry."
            }
            Error::UnsupportedOffset => {
                "An offset value was larger than the maximum supported value."
            }
            Error::CannotFitInU8 => {
                "We tried to convert some number into a `u8`, but it was too large."
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> ::std::result::Result<(), fmt::Error> {
        write!(f, "{}", self.description())
    }
}

impl error::Error for Error {}

/// The result of a parse.
pub type Result<T> = result::Result<T, Error>;

/// Whether the format of a compilation unit is 32- or 64-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// 64-bit DWARF
    Dwarf64,
    /// 32-bit DWARF
    Dwarf32,
}

impl Format {
    /// The size in bytes of an initial length field in this format.
    #[inline]
    pub fn initial_length_size(self) -> u8 {
        match self {
            Format::Dwarf32 => 4,
            Format::Dwarf64 => 12,
        }
    }

    /// The size in bytes of a section offset in this format.
    #[inline]
    pub fn word_size(self) -> u8 {
        match self {
            Format::Dwarf32 => 4,
            Format::Dwarf64 => 8,
        }
    }
}

/// The shared properties of the encoding a record was produced under: the
/// section-offset width, the DWARF version, and the target's address size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    /// Whether the DWARF format is 32- or 64-bit.
    pub format: Format,

    /// The DWARF version of the header.
    pub version: u16,

    /// The size of an address, in bytes.
    pub address_size: u8,
}

/// Parse a `u8` from the input.
#[doc(hidden)]
#[inline]
pub fn parse_u8(input: &[u8]) -> Result<(&[u8], u8)> {
    if input.is_empty() {
        Err(Error::UnexpectedEof)
    } else {
        Ok((&input[1..], input[0]))
    }
}

/// Parse a `i8` from the input.
#[doc(hidden)]
#[inline]
pub fn parse_i8(input: &[u8]) -> Result<(&[u8], i8)> {
    if input.is_empty() {
        Err(Error::UnexpectedEof)
    } else {
        Ok((&input[1..], input[0] as i8))
    }
}

/// Parse a `u16` from the input.
#[doc(hidden)]
#[inline]
pub fn parse_u16<Endian>(input: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, u16)>
    where Endian: Endianity
{
    if input.len() < 2 {
        Err(Error::UnexpectedEof)
    } else {
        Ok((input.range_from(2..), Endian::read_u16(&input)))
    }
}

/// Parse a `u32` from the input.
#[doc(hidden)]
#[inline]
pub fn parse_u32<Endian>(input: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, u32)>
    where Endian: Endianity
{
    if input.len() < 4 {
        Err(Error::UnexpectedEof)
    } else {
        Ok((input.range_from(4..), Endian::read_u32(&input)))
    }
}

/// Parse a `u64` from the input.
#[doc(hidden)]
#[inline]
pub fn parse_u64<Endian>(input: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, u64)>
    where Endian: Endianity
{
    if input.len() < 8 {
        Err(Error::UnexpectedEof)
    } else {
        Ok((input.range_from(8..), Endian::read_u64(&input)))
    }
}

/// Like `parse_u8` but takes and returns an `EndianBuf` for convenience.
#[doc(hidden)]
#[inline]
pub fn parse_u8e<Endian>(bytes: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, u8)>
    where Endian: Endianity
{
    let (bytes, value) = parse_u8(bytes.into())?;
    Ok((EndianBuf::new(bytes), value))
}

/// Like `parse_i8` but takes and returns an `EndianBuf` for convenience.
#[doc(hidden)]
#[inline]
pub fn parse_i8e<Endian>(bytes: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, i8)>
    where Endian: Endianity
{
    let (bytes, value) = parse_i8(bytes.into())?;
    Ok((EndianBuf::new(bytes), value))
}

/// Like `parse_unsigned_leb` but takes and returns an `EndianBuf` for convenience.
#[doc(hidden)]
#[inline]
pub fn parse_unsigned_lebe<Endian>(bytes: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, u64)>
    where Endian: Endianity
{
    let (bytes, value) = parse_unsigned_leb(bytes.into())?;
    Ok((EndianBuf::new(bytes), value))
}

/// Like `parse_unsigned_leb` but converts the value to a `u8`.
#[doc(hidden)]
#[inline]
pub fn parse_unsigned_leb_as_u8e<Endian>(bytes: EndianBuf<Endian>)
                                         -> Result<(EndianBuf<Endian>, u8)>
    where Endian: Endianity
{
    let (bytes, value) = parse_unsigned_leb(bytes.into())?;
    let value = u64_to_u8(value)?;
    Ok((EndianBuf::new(bytes), value))
}

/// Like `parse_signed_leb` but takes and returns an `EndianBuf` for convenience.
#[doc(hidden)]
#[inline]
pub fn parse_signed_lebe<Endian>(bytes: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, i64)>
    where Endian: Endianity
{
    let (bytes, value) = parse_signed_leb(bytes.into())?;
    Ok((EndianBuf::new(bytes), value))
}

/// Parse a `u32` from the input and return it as a `u64`.
#[doc(hidden)]
#[inline]
pub fn parse_u32_as_u64<Endian>(input: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, u64)>
    where Endian: Endianity
{
    if input.len() < 4 {
        Err(Error::UnexpectedEof)
    } else {
        Ok((input.range_from(4..), Endian::read_u32(&input) as u64))
    }
}

/// Parse a 3-byte unsigned integer from the input, as the `DW_FORM_strx3`
/// and `DW_FORM_addrx3` forms use.
#[doc(hidden)]
#[inline]
pub fn parse_u24<Endian>(input: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, u32)>
    where Endian: Endianity
{
    if input.len() < 3 {
        Err(Error::UnexpectedEof)
    } else {
        let value = if Endian::is_big_endian() {
            (input[0] as u32) << 16 | (input[1] as u32) << 8 | input[2] as u32
        } else {
            input[0] as u32 | (input[1] as u32) << 8 | (input[2] as u32) << 16
        };
        Ok((input.range_from(3..), value))
    }
}

/// Convert a `u64` to a `usize` and return it.
#[doc(hidden)]
#[inline]
pub fn u64_to_offset(offset64: u64) -> Result<usize> {
    let offset = offset64 as usize;
    if offset as u64 == offset64 {
        Ok(offset)
    } else {
        Err(Error::UnsupportedOffset)
    }
}

/// Convert a `u64` to a `u8` and return it.
#[doc(hidden)]
#[inline]
pub fn u64_to_u8(x: u64) -> Result<u8> {
    let y = x as u8;
    if y as u64 == x {
        Ok(y)
    } else {
        Err(Error::CannotFitInU8)
    }
}

/// Parse an unsigned LEB128 encoded integer from the input, and return it as a `usize`.
#[doc(hidden)]
#[inline]
pub fn parse_uleb_as_offset<Endian>(input: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, usize)>
    where Endian: Endianity
{
    let (rest, offset) = parse_unsigned_lebe(input)?;
    let offset = u64_to_offset(offset)?;
    Ok((rest, offset))
}

/// Parse a word-sized integer according to the DWARF format, and return it as a `u64`.
#[doc(hidden)]
#[inline]
pub fn parse_word<Endian>(input: EndianBuf<Endian>,
                          format: Format)
                          -> Result<(EndianBuf<Endian>, u64)>
    where Endian: Endianity
{
    match format {
        Format::Dwarf32 => parse_u32_as_u64(input),
        Format::Dwarf64 => parse_u64(input),
    }
}

/// Parse a word-sized integer according to the DWARF format, and return it as a `usize`.
#[doc(hidden)]
#[inline]
pub fn parse_offset<Endian>(input: EndianBuf<Endian>,
                            format: Format)
                            -> Result<(EndianBuf<Endian>, usize)>
    where Endian: Endianity
{
    let (rest, offset) = parse_word(input, format)?;
    let offset = u64_to_offset(offset)?;
    Ok((rest, offset))
}

/// Parse an address-sized integer, and return it as a `u64`.
///
/// Address sizes other than 2, 4, and 8 are diagnosed, skipped over, and
/// yield zero, so a weird unit does not throw off the records that follow
/// it.
#[doc(hidden)]
#[inline]
pub fn parse_address<Endian>(input: EndianBuf<Endian>,
                             address_size: u8)
                             -> Result<(EndianBuf<Endian>, u64)>
    where Endian: Endianity
{
    if input.len() < address_size as usize {
        Err(Error::UnexpectedEof)
    } else {
        let address = match address_size {
            8 => Endian::read_u64(&input),
            4 => Endian::read_u32(&input) as u64,
            2 => Endian::read_u16(&input) as u64,
            otherwise => {
                warn!("weird address size: {}", otherwise);
                0
            }
        };
        Ok((input.range_from(address_size as usize..), address))
    }
}

/// Parse a null-terminated slice from the input.
#[doc(hidden)]
#[inline]
pub fn parse_null_terminated_string(input: &[u8]) -> Result<(&[u8], &ffi::CStr)> {
    let null_idx = input.iter().position(|ch| *ch == 0);

    if let Some(idx) = null_idx {
        let cstr = unsafe {
            // It is safe to use the unchecked variant here because we know we
            // grabbed the index of the first null byte in the input and
            // therefore there can't be any interior null bytes in this slice.
            ffi::CStr::from_bytes_with_nul_unchecked(&input[0..idx + 1])
        };
        Ok((&input[idx + 1..], cstr))
    } else {
        Err(Error::UnexpectedEof)
    }
}

const MAX_DWARF_32_UNIT_LENGTH: u64 = 0xfffffff0;

const DWARF_64_INITIAL_UNIT_LENGTH: u64 = 0xffffffff;

/// Parse an initial length field.
///
/// The field selects the DWARF format of the rest of the record: lengths up
/// to and including `0xfffffff0` are 32-bit, `0xffffffff` escapes to a
/// 64-bit length in the next eight bytes, and the values in between are
/// reserved.
#[doc(hidden)]
pub fn parse_initial_length<Endian>(input: EndianBuf<Endian>)
                                    -> Result<(EndianBuf<Endian>, (u64, Format))>
    where Endian: Endianity
{
    let (rest, val) = parse_u32_as_u64(input)?;
    if val <= MAX_DWARF_32_UNIT_LENGTH {
        Ok((rest, (val, Format::Dwarf32)))
    } else if val == DWARF_64_INITIAL_UNIT_LENGTH {
        let (rest, val) = parse_u64(rest)?;
        Ok((rest, (val, Format::Dwarf64)))
    } else {
        Err(Error::UnknownReservedLength)
    }
}

/// Take a slice of size `bytes` from the input.
#[inline]
pub fn take<Endian>(bytes: usize,
                    input: EndianBuf<Endian>)
                    -> Result<(EndianBuf<Endian>, EndianBuf<Endian>)>
    where Endian: Endianity
{
    if input.len() < bytes {
        Err(Error::UnexpectedEof)
    } else {
        Ok((input.range_from(bytes..), input.range_to(..bytes)))
    }
}

/// Parse a length as an unsigned LEB128 from the input, then take
/// that many bytes from the input.  These bytes are returned as the
/// second element of the result tuple.
#[doc(hidden)]
pub fn parse_length_uleb_value<Endian>(input: EndianBuf<Endian>)
                                       -> Result<(EndianBuf<Endian>, EndianBuf<Endian>)>
    where Endian: Endianity
{
    let (rest, len) = parse_unsigned_leb(input.into())?;
    take(len as usize, EndianBuf::new(rest))
}

/// Parse an unsigned LEB128 encoded integer.
#[inline]
pub fn parse_unsigned_leb(mut input: &[u8]) -> Result<(&[u8], u64)> {
    match leb128::read::unsigned(&mut input) {
        Ok(val) => Ok((input, val)),
        Err(leb128::read::Error::IoError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(Error::UnexpectedEof)
        }
        Err(_) => Err(Error::BadUnsignedLeb128),
    }
}

/// Parse a signed LEB128 encoded integer.
#[inline]
pub fn parse_signed_leb(mut input: &[u8]) -> Result<(&[u8], i64)> {
    match leb128::read::signed(&mut input) {
        Ok(val) => Ok((input, val)),
        Err(leb128::read::Error::IoError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(Error::UnexpectedEof)
        }
        Err(_) => Err(Error::BadSignedLeb128),
    }
}

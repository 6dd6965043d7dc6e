//! A one-shot parser for the DWARF debugging format.
//!
//! `dwalin` reads the debug sections a compiler leaves in an object file
//! and reconstructs the structures they encode: the `.debug_abbrev`
//! abbreviation dictionary, the `.debug_info` tree of debugging
//! information entries, the `.debug_line` line number programs and the
//! rows they compute, the `.debug_aranges` address range tables, the
//! `.debug_loc` location lists, and the DWARF expression operations
//! referenced from attributes and location lists.
//!
//! The parse is eager: one call to [`parse`](./fn.parse.html) walks every
//! requested section into plain owned records, with no borrows back into
//! the object file. Malformed input never poisons the whole result; the
//! affected record is abandoned, a diagnostic goes to the [`log`] facade,
//! and everything decoded before the failure is kept.
//!
//! ```no_run
//! use dwalin::{Object, ParseOptions};
//!
//! fn dump<O: Object>(object: &O) {
//!     let dwarf = dwalin::parse(object, &ParseOptions::default());
//!     if let Some(info) = dwarf.info() {
//!         for unit in info.units() {
//!             println!("unit at {:#x}: {} entries",
//!                      unit.header().offset(),
//!                      unit.dies().len());
//!         }
//!     }
//! }
//! ```
//!
//! Frame unwinding (`.debug_frame` and `.eh_frame`) is out of scope, as is
//! expression evaluation: [`Operation`](./enum.Operation.html) records are
//! decoded, never run.

#![deny(missing_docs)]

#[macro_use]
extern crate bitflags;
extern crate leb128;
#[macro_use]
extern crate log;

pub mod constants;

mod abbrev;
mod aranges;
mod dwarf;
mod endianity;
mod line;
mod loc;
mod op;
mod parser;
mod unit;

#[cfg(test)]
mod test_util;

pub use abbrev::{Abbreviations, AbbrevDecl, AttributeSpecification, parse_debug_abbrev};
pub use aranges::{Arange, ArangeSet, parse_debug_aranges};
pub use dwarf::{Dwarf, Object, ParseFlags, ParseOptions, parse};
pub use endianity::{BigEndian, Endianity, EndianBuf, LittleEndian, NativeEndian};
pub use line::{ExtendedInstruction, FileEntry, FileEntryFormat, LineInfo, LineInfoMask,
               LineInstruction, LineProgramHeader, LineUnit, Row, StandardInstruction,
               StateMachineRegisters, parse_debug_line, parse_instruction,
               parse_line_program_header};
pub use loc::{LocationList, LocationListEntry, LocationLists, parse_debug_loc};
pub use op::{Operation, parse_operation};
pub use parser::{Encoding, Error, Format, Result};
pub use unit::{Attribute, AttributeContext, AttributeKind, AttributeValue, CompilationUnit,
               DebugInfo, Die, UnitHeader, parse_attribute, parse_debug_info,
               parse_unit_header};

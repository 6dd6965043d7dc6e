//! Parsing the `.debug_loc` section's location lists.

use endianity::{Endianity, EndianBuf};
use parser::{Result, parse_address, parse_u16, take};
use std::collections::HashMap;

/// A single location list entry: the half-open address range and the DWARF
/// expression describing the location over it.
///
/// The expression block is carried raw; `op::parse_operation` decodes it on
/// demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationListEntry {
    /// The range's starting address, base address applied.
    pub start: u64,
    /// The range's ending address, base address applied.
    pub end: u64,
    /// The expression bytes.
    pub expression: Vec<u8>,
}

/// One location list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationList {
    offset: u64,
    entries: Vec<LocationListEntry>,
}

impl LocationList {
    /// The byte offset of this list's first entry within `.debug_loc`,
    /// which is how DIE attributes refer to it.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The list's entries in section order.
    #[inline]
    pub fn entries(&self) -> &[LocationListEntry] {
        &self.entries[..]
    }
}

/// The parsed contents of a `.debug_loc` section, keyed by list offset.
#[derive(Debug, Clone, Default)]
pub struct LocationLists {
    lists: HashMap<u64, LocationList>,
}

impl LocationLists {
    /// The number of lists.
    #[inline]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Whether the section yielded no lists.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// The list starting at the given section offset, if any.
    pub fn get(&self, offset: u64) -> Option<&LocationList> {
        self.lists.get(&offset)
    }

    /// All lists, keyed by their offsets.
    #[inline]
    pub fn lists(&self) -> &HashMap<u64, LocationList> {
        &self.lists
    }
}

/// The all-ones address for the given address size, which marks a base
/// address selection entry.
fn max_address(address_size: u8) -> u64 {
    match address_size {
        2 => 0xffff,
        4 => 0xffff_ffff,
        8 => !0,
        otherwise => {
            warn!("weird address size for location lists: {}", otherwise);
            0
        }
    }
}

fn parse_entry<Endian>(input: EndianBuf<Endian>,
                       address_size: u8)
                       -> Result<(EndianBuf<Endian>, u64, u64)>
    where Endian: Endianity
{
    let (rest, start) = parse_address(input, address_size)?;
    let (rest, end) = parse_address(rest, address_size)?;
    Ok((rest, start, end))
}

/// Parse the whole `.debug_loc` section.
///
/// The section has no headers; the address size comes from the caller.
/// A read failure drops the list being accumulated and ends the parse;
/// every list committed before it remains. A trailing list with no
/// terminating pair is dropped too.
pub fn parse_debug_loc<Endian>(input: EndianBuf<Endian>, address_size: u8) -> LocationLists
    where Endian: Endianity
{
    let section_len = input.len();
    let max = max_address(address_size);

    let mut locs = LocationLists::default();
    let mut address_base: u64 = 0;
    let mut list_offset: u64 = 0;
    let mut current: Option<LocationList> = None;
    let mut rest = input;

    while !rest.is_empty() {
        let (r, start, end) = match parse_entry(rest, address_size) {
            Ok(x) => x,
            Err(e) => {
                warn!(".debug_loc: aborting at {:#x}: {}",
                      section_len - rest.len(),
                      e);
                break;
            }
        };
        rest = r;

        if start == 0 && end == 0 {
            // End of list; the next list starts after the terminator.
            if let Some(list) = current.take() {
                locs.lists.insert(list.offset, list);
            }
            list_offset = (section_len - rest.len()) as u64;
            address_base = 0;
            continue;
        }

        if start == max && end != max {
            // A base address selection entry. It is not part of the list;
            // it biases the entries that follow.
            address_base = end;
            continue;
        }

        let (r, length) = match parse_u16(rest) {
            Ok(x) => x,
            Err(e) => {
                warn!(".debug_loc: truncated expression block: {}", e);
                break;
            }
        };
        let (r, expression) = match take(length as usize, r) {
            Ok(x) => x,
            Err(e) => {
                warn!(".debug_loc: truncated expression block: {}", e);
                break;
            }
        };
        rest = r;

        if current.is_none() {
            current = Some(LocationList {
                offset: list_offset,
                entries: Vec::new(),
            });
        }
        if let Some(ref mut list) = current {
            list.entries.push(LocationListEntry {
                start: start.wrapping_add(address_base),
                end: end.wrapping_add(address_base),
                expression: expression.buf().to_vec(),
            });
        }
    }

    locs
}

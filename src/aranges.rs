//! Parsing the `.debug_aranges` section's address range lookup tables.

use endianity::{Endianity, EndianBuf};
use parser::{Error, Format, Result, parse_address, parse_initial_length, parse_u16, parse_u8e,
             parse_word};

/// A single (address, length) range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arange {
    /// The range's starting address.
    pub address: u64,
    /// The range's length in bytes.
    pub length: u64,
}

/// One compilation unit's set of address ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArangeSet {
    unit_length: u64,
    format: Format,
    version: u16,
    debug_info_offset: u64,
    address_size: u8,
    segment_size: u8,
    aranges: Vec<Arange>,
}

impl ArangeSet {
    /// The length of this set, not counting the initial length field.
    #[inline]
    pub fn unit_length(&self) -> u64 {
        self.unit_length
    }

    /// Whether this set is 32- or 64-bit DWARF.
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// The arange table version.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// The offset of the owning compilation unit within `.debug_info`.
    #[inline]
    pub fn debug_info_offset(&self) -> u64 {
        self.debug_info_offset
    }

    /// The size of addresses in this set, in bytes.
    #[inline]
    pub fn address_size(&self) -> u8 {
        self.address_size
    }

    /// The size of segment selectors in this set, in bytes.
    #[inline]
    pub fn segment_size(&self) -> u8 {
        self.segment_size
    }

    /// The ranges of this set, without the terminating pair.
    #[inline]
    pub fn aranges(&self) -> &[Arange] {
        &self.aranges[..]
    }
}

fn align_delta(offset: usize, alignment: usize) -> usize {
    (alignment - offset % alignment) % alignment
}

fn parse_arange_set<Endian>(input: EndianBuf<Endian>)
                            -> Result<(EndianBuf<Endian>, ArangeSet)>
    where Endian: Endianity
{
    let set_len = input.len();
    let (rest, (unit_length, format)) = parse_initial_length(input)?;

    // The length must cover at least the remaining header fields and fit
    // the buffer.
    let header_rest_size = 2 + format.word_size() as usize + 1 + 1;
    if (unit_length as usize) < header_rest_size || unit_length as usize > rest.len() {
        return Err(Error::BadLength);
    }

    let (rest, version) = parse_u16(rest)?;
    let (rest, debug_info_offset) = parse_word(rest, format)?;
    let (rest, address_size) = parse_u8e(rest)?;
    let (mut rest, segment_size) = parse_u8e(rest)?;
    if address_size == 0 {
        return Err(Error::BadLength);
    }
    let mut remaining = unit_length as usize - header_rest_size;

    // Producers pad the header so the pairs start aligned to twice the
    // address size, counted from the start of the set.
    let tuple_size = 2 * address_size as usize;
    let pad = align_delta(set_len - rest.len(), tuple_size);
    if pad > remaining || pad > rest.len() {
        return Err(Error::BadLength);
    }
    rest = rest.range_from(pad..);
    remaining -= pad;

    let count = remaining / tuple_size;
    if count == 0 {
        return Err(Error::BadLength);
    }

    let mut aranges = Vec::new();
    for _ in 0..count {
        let (r, address) = parse_address(rest, address_size)?;
        let (r, length) = parse_address(r, address_size)?;
        rest = r;
        if address == 0 && length == 0 {
            // The last entry is a pair of zeros.
            break;
        }
        aranges.push(Arange {
            address: address,
            length: length,
        });
    }

    Ok((rest,
        ArangeSet {
            unit_length: unit_length,
            format: format,
            version: version,
            debug_info_offset: debug_info_offset,
            address_size: address_size,
            segment_size: segment_size,
            aranges: aranges,
        }))
}

/// Parse the whole `.debug_aranges` section.
///
/// A malformed set stops the section; the sets parsed before it remain.
pub fn parse_debug_aranges<Endian>(input: EndianBuf<Endian>) -> Vec<ArangeSet>
    where Endian: Endianity
{
    let section_len = input.len();
    let mut sets = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let offset = section_len - rest.len();
        let set = match parse_arange_set(rest) {
            Ok((_, set)) => set,
            Err(e) => {
                warn!(".debug_aranges: aborting at {:#x}: {}", offset, e);
                break;
            }
        };

        // Trust the declared length for the position of the next set, not
        // how much of the pair array was actually populated.
        let next = offset + set.format().initial_length_size() as usize +
                   set.unit_length() as usize;
        sets.push(set);
        rest = input.range_from(next..);
    }

    sets
}

#[cfg(test)]
mod tests {
    extern crate test_assembler;

    use self::test_assembler::{Endian, Section};
    use super::*;
    use endianity::{EndianBuf, LittleEndian};
    use parser::{Error, Format};

    fn one_set() -> Section {
        Section::with_endian(Endian::Little)
            .L32(44)
            .L16(2)
            .L32(0x0badf00d)
            .D8(8)
            .D8(0)
            // Padding up to 2 * address_size.
            .append_repeated(0, 4)
            .L64(0x1000)
            .L64(0x100)
            .L64(0)
            .L64(0)
    }

    #[test]
    fn test_parse_arange_set() {
        let buf = one_set().get_contents().unwrap();

        let (rest, set) = parse_arange_set(EndianBuf::<LittleEndian>::new(&buf)).unwrap();
        assert_eq!(rest.len(), 0);
        assert_eq!(set.unit_length(), 44);
        assert_eq!(set.format(), Format::Dwarf32);
        assert_eq!(set.version(), 2);
        assert_eq!(set.debug_info_offset(), 0x0badf00d);
        assert_eq!(set.address_size(), 8);
        assert_eq!(set.segment_size(), 0);
        assert_eq!(set.aranges(),
                   &[Arange {
                       address: 0x1000,
                       length: 0x100,
                   }]);
    }

    #[test]
    fn test_parse_arange_set_length_too_short() {
        let section = Section::with_endian(Endian::Little)
            .L32(4)
            .L16(2)
            .L32(0)
            .D8(8)
            .D8(0);
        let buf = section.get_contents().unwrap();

        match parse_arange_set(EndianBuf::<LittleEndian>::new(&buf)) {
            Err(Error::BadLength) => assert!(true),
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_arange_set_length_past_buffer() {
        let section = Section::with_endian(Endian::Little)
            .L32(1000)
            .L16(2)
            .L32(0)
            .D8(8)
            .D8(0);
        let buf = section.get_contents().unwrap();

        match parse_arange_set(EndianBuf::<LittleEndian>::new(&buf)) {
            Err(Error::BadLength) => assert!(true),
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_arange_set_zero_address_size() {
        let section = Section::with_endian(Endian::Little)
            .L32(24)
            .L16(2)
            .L32(0)
            .D8(0)
            .D8(0)
            .append_repeated(0, 16);
        let buf = section.get_contents().unwrap();

        match parse_arange_set(EndianBuf::<LittleEndian>::new(&buf)) {
            Err(Error::BadLength) => assert!(true),
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_debug_aranges_two_sets() {
        let mut buf = one_set().get_contents().unwrap();
        let second = one_set().get_contents().unwrap();
        buf.extend_from_slice(&second);

        let sets = parse_debug_aranges(EndianBuf::<LittleEndian>::new(&buf));
        assert_eq!(sets.len(), 2);
        for set in &sets {
            assert_eq!(set.aranges().len(), 1);
            assert_eq!(set.aranges()[0].address, 0x1000);
        }
    }

    #[test]
    fn test_parse_debug_aranges_keeps_prior_sets_on_error() {
        let buf = one_set()
            // A second set whose length is impossible.
            .L32(2)
            .L16(2)
            .get_contents()
            .unwrap();

        let sets = parse_debug_aranges(EndianBuf::<LittleEndian>::new(&buf));
        assert_eq!(sets.len(), 1);
    }
}

//! The top-level entry point: pull the debug sections out of an object
//! file and drive every section decoder in dependency order.

use abbrev::{Abbreviations, parse_debug_abbrev};
use aranges::{ArangeSet, parse_debug_aranges};
use endianity::{BigEndian, Endianity, EndianBuf, LittleEndian};
use line::{LineInfo, LineInfoMask, parse_debug_line};
use loc::{LocationLists, parse_debug_loc};
use unit::{DebugInfo, parse_debug_info};

/// The object file the host hands us: named section lookup plus the two
/// facts about the file the decoders cannot learn from the sections
/// themselves.
pub trait Object {
    /// The bytes of the section whose name contains `fragment`, or `None`
    /// when the file has no such section. Matching by substring lets one
    /// fragment cover both `.debug_info` and `__debug_info` spellings.
    fn section_by_name_fragment(&self, fragment: &str) -> Option<&[u8]>;

    /// Whether the file's integers are big endian.
    fn is_big_endian(&self) -> bool;

    /// The file's machine word width in bits, or zero when unknown. Used
    /// as the address size fallback for line programs before DWARF 5.
    fn bits(&self) -> u32;
}

bitflags! {
    /// Which sections to parse.
    pub struct ParseFlags: u32 {
        /// Parse `.debug_abbrev`.
        const ABBREVS = 1;
        /// Parse `.debug_info` (needs `ABBREVS`).
        const INFO = 2;
        /// Parse `.debug_loc`.
        const LOC = 4;
        /// Parse `.debug_line` (needs `INFO`).
        const LINES = 8;
        /// Parse `.debug_aranges`.
        const ARANGES = 16;
    }
}

/// What to parse and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// The sections to parse.
    pub flags: ParseFlags,

    /// The machine address size in bytes, used by the location list parser
    /// (`.debug_loc` carries no headers of its own).
    pub address_size: u8,

    /// Which outputs the line decoder should produce.
    pub line_mask: LineInfoMask,
}

impl Default for ParseOptions {
    fn default() -> ParseOptions {
        ParseOptions {
            flags: ParseFlags::all(),
            address_size: 4,
            line_mask: LineInfoMask::OPCODES | LineInfoMask::ROWS,
        }
    }
}

/// Everything parsed out of one object file's DWARF sections.
///
/// Every field is optional: a section can be absent from the file, gated
/// off by the parse flags, or abandoned after a malformed record. Whatever
/// was decoded before a failure is still here.
#[derive(Debug, Default)]
pub struct Dwarf {
    abbreviations: Option<Abbreviations>,
    info: Option<DebugInfo>,
    locations: Option<LocationLists>,
    lines: Option<LineInfo>,
    aranges: Option<Vec<ArangeSet>>,
}

impl Dwarf {
    /// The abbreviation dictionary, when `.debug_abbrev` was parsed.
    #[inline]
    pub fn abbreviations(&self) -> Option<&Abbreviations> {
        self.abbreviations.as_ref()
    }

    /// The compilation units, when `.debug_info` was parsed.
    #[inline]
    pub fn info(&self) -> Option<&DebugInfo> {
        self.info.as_ref()
    }

    /// The location lists, when `.debug_loc` was parsed.
    #[inline]
    pub fn locations(&self) -> Option<&LocationLists> {
        self.locations.as_ref()
    }

    /// The line number information, when `.debug_line` was parsed.
    #[inline]
    pub fn lines(&self) -> Option<&LineInfo> {
        self.lines.as_ref()
    }

    /// The address range sets, when `.debug_aranges` was parsed.
    #[inline]
    pub fn aranges(&self) -> Option<&[ArangeSet]> {
        self.aranges.as_ref().map(|sets| &sets[..])
    }
}

/// Parse an object file's DWARF sections per the given options.
///
/// Sub-parsers run in dependency order: abbreviations feed the DIE walk,
/// and the DIE walk's compilation directories feed line-path resolution.
/// A result is always returned; consumers check per-field presence.
pub fn parse<O>(object: &O, options: &ParseOptions) -> Dwarf
    where O: Object
{
    if object.is_big_endian() {
        parse_object::<O, BigEndian>(object, options)
    } else {
        parse_object::<O, LittleEndian>(object, options)
    }
}

fn parse_object<O, Endian>(object: &O, options: &ParseOptions) -> Dwarf
    where O: Object,
          Endian: Endianity
{
    let mut dwarf = Dwarf::default();

    if options.flags.contains(ParseFlags::ABBREVS) {
        debug!(".debug_abbrev");
        if let Some(buf) = object.section_by_name_fragment("debug_abbrev") {
            dwarf.abbreviations = Some(parse_debug_abbrev(EndianBuf::<Endian>::new(buf)));
        }
    }

    if options.flags.contains(ParseFlags::INFO) {
        if let Some(ref abbrevs) = dwarf.abbreviations {
            debug!(".debug_info");
            if let Some(buf) = object.section_by_name_fragment("debug_info") {
                let debug_str = object.section_by_name_fragment("debug_str");
                dwarf.info =
                    Some(parse_debug_info(EndianBuf::<Endian>::new(buf), abbrevs, debug_str));
            }
        }
    }

    if options.flags.contains(ParseFlags::LOC) {
        debug!(".debug_loc");
        if let Some(buf) = object.section_by_name_fragment("debug_loc") {
            dwarf.locations =
                Some(parse_debug_loc(EndianBuf::<Endian>::new(buf), options.address_size));
        }
    }

    if options.flags.contains(ParseFlags::LINES) && dwarf.info.is_some() {
        debug!(".debug_line");
        if let Some(buf) = object.section_by_name_fragment("debug_line") {
            let address_size_hint = match object.bits() {
                0 => 4,
                bits => (bits / 8) as u8,
            };
            // DWARF 5 line headers can name their paths by string-table
            // offset, so they get the same `.debug_str` the DIE walk got.
            let debug_str = object.section_by_name_fragment("debug_str");
            dwarf.lines = Some(parse_debug_line(EndianBuf::<Endian>::new(buf),
                                                dwarf.info.as_ref(),
                                                options.line_mask,
                                                address_size_hint,
                                                debug_str));
        }
    }

    if options.flags.contains(ParseFlags::ARANGES) {
        debug!(".debug_aranges");
        if let Some(buf) = object.section_by_name_fragment("debug_aranges") {
            dwarf.aranges = Some(parse_debug_aranges(EndianBuf::<Endian>::new(buf)));
        }
    }

    dwarf
}

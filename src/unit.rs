//! Parsing the `.debug_info` section: compilation unit headers, DIE trees,
//! and the attribute values both of them carry.

use abbrev::{Abbreviations, AttributeSpecification};
use constants;
use endianity::{Endianity, EndianBuf};
use parser::{Encoding, Error, Format, Result, parse_address, parse_initial_length,
             parse_null_terminated_string, parse_offset, parse_signed_lebe, parse_u16,
             parse_u24, parse_u32, parse_u64, parse_u8e, parse_unsigned_lebe, parse_word, take};
use std::collections::HashMap;

/// The classes an attribute value can belong to.
///
/// The decoder folds the finer form classes into their carrier
/// representation: an expression location is carried as a block, and the
/// section-pointer classes (line, macro, and range-list offsets) as plain
/// references. The attribute's retained form tells those apart when a
/// consumer needs the distinction, so only the carrier classes appear
/// here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// A machine address or an index into an address table.
    Address,
    /// An uninterpreted slice of bytes, expression locations included.
    Block,
    /// An integer constant.
    Constant,
    /// A boolean flag.
    Flag,
    /// An offset into `.debug_info` or another section.
    Reference,
    /// An inline string or a string-table offset.
    String,
    /// An offset into the location-list section.
    LoclistPtr,
}

/// The value of an attribute, decoded per its form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// A machine address, or an index into the address table for the
    /// `DW_FORM_addrx*` and `DW_FORM_rnglistx` indirections (resolution of
    /// the index is deferred to the consumer).
    Address(u64),

    /// A slice of bytes, copied out of the input. Expression locations are
    /// carried this way too.
    Block(Vec<u8>),

    /// An unsigned integer constant.
    UnsignedConstant(u64),

    /// A signed integer constant.
    SignedConstant(i64),

    /// A 128-bit constant, read as two 64-bit halves in the declared
    /// endianity.
    Constant128 {
        /// The low 64 bits.
        low: u64,
        /// The high 64 bits.
        high: u64,
    },

    /// A boolean flag.
    Flag(bool),

    /// An offset into `.debug_info` (absolute, even for the unit-relative
    /// reference forms) or into another section.
    Reference(u64),

    /// A string: an inline one carries its content, a `.debug_str` one its
    /// offset plus the content when the string table resolves it, and the
    /// indexed forms only their index.
    String {
        /// The string-table offset or indirection index, when the form has
        /// one.
        offset: Option<u64>,
        /// The resolved content, when available.
        string: Option<String>,
    },

    /// An offset into the location-list section.
    LocListPtr(u64),
}

/// An attribute in a DIE, or in a DWARF 5 line-header entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: constants::DwAt,
    form: constants::DwForm,
    value: AttributeValue,
}

impl Attribute {
    /// Construct a new `Attribute`.
    pub fn new(name: constants::DwAt,
               form: constants::DwForm,
               value: AttributeValue)
               -> Attribute {
        Attribute {
            name: name,
            form: form,
            value: value,
        }
    }

    /// Get this attribute's name.
    #[inline]
    pub fn name(&self) -> constants::DwAt {
        self.name
    }

    /// Get the form this attribute was decoded from.
    #[inline]
    pub fn form(&self) -> constants::DwForm {
        self.form
    }

    /// Get this attribute's value.
    #[inline]
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    /// The class this attribute's value belongs to.
    pub fn kind(&self) -> AttributeKind {
        match self.value {
            AttributeValue::Address(_) => AttributeKind::Address,
            AttributeValue::Block(_) => AttributeKind::Block,
            AttributeValue::UnsignedConstant(_) |
            AttributeValue::SignedConstant(_) |
            AttributeValue::Constant128 { .. } => AttributeKind::Constant,
            AttributeValue::Flag(_) => AttributeKind::Flag,
            AttributeValue::Reference(_) => AttributeKind::Reference,
            AttributeValue::String { .. } => AttributeKind::String,
            AttributeValue::LocListPtr(_) => AttributeKind::LoclistPtr,
        }
    }
}

/// Everything the attribute parser needs to know about its surroundings:
/// the encoding of the containing record, the containing unit's start
/// offset (unit-relative references are rebased onto it), and the
/// `.debug_str` bytes for `DW_FORM_strp` resolution.
#[derive(Debug, Clone, Copy)]
pub struct AttributeContext<'input> {
    /// The encoding of the containing unit or line header.
    pub encoding: Encoding,

    /// The offset at which the containing unit starts, zero when there is
    /// no containing unit.
    pub unit_offset: usize,

    /// The `.debug_str` section, when present.
    pub debug_str: Option<&'input [u8]>,
}

fn resolve_str(debug_str: Option<&[u8]>, offset: u64) -> Option<String> {
    let buf = match debug_str {
        Some(buf) if (offset as usize) < buf.len() => buf,
        _ => return None,
    };
    parse_null_terminated_string(&buf[offset as usize..])
        .ok()
        .and_then(|(_, s)| s.to_str().ok())
        .map(|s| s.to_string())
}

fn parse_block<Endian>(input: EndianBuf<Endian>,
                       length: usize)
                       -> Result<(EndianBuf<Endian>, AttributeValue)>
    where Endian: Endianity
{
    let (rest, block) = take(length, input)?;
    Ok((rest, AttributeValue::Block(block.buf().to_vec())))
}

/// Decode a single attribute value, dispatching on the specification's
/// form.
pub fn parse_attribute<'input, Endian>(input: EndianBuf<'input, Endian>,
                                       spec: AttributeSpecification,
                                       context: &AttributeContext<'input>)
                                       -> Result<(EndianBuf<'input, Endian>, Attribute)>
    where Endian: Endianity
{
    let format = context.encoding.format;
    let (rest, value) = match spec.form() {
        constants::DW_FORM_addr => {
            let (rest, addr) = parse_address(input, context.encoding.address_size)?;
            (rest, AttributeValue::Address(addr))
        }
        constants::DW_FORM_data1 => {
            let (rest, value) = parse_u8e(input)?;
            (rest, AttributeValue::UnsignedConstant(value as u64))
        }
        constants::DW_FORM_data2 => {
            let (rest, value) = parse_u16(input)?;
            (rest, AttributeValue::UnsignedConstant(value as u64))
        }
        constants::DW_FORM_data4 => {
            let (rest, value) = parse_u32(input)?;
            (rest, AttributeValue::UnsignedConstant(value as u64))
        }
        constants::DW_FORM_data8 => {
            let (rest, value) = parse_u64(input)?;
            (rest, AttributeValue::UnsignedConstant(value))
        }
        constants::DW_FORM_data16 => {
            // Two 64-bit halves in the declared endianity.
            let (rest, first) = parse_u64(input)?;
            let (rest, second) = parse_u64(rest)?;
            let (low, high) = if Endian::is_big_endian() {
                (second, first)
            } else {
                (first, second)
            };
            (rest,
             AttributeValue::Constant128 {
                 low: low,
                 high: high,
             })
        }
        constants::DW_FORM_sdata => {
            let (rest, value) = parse_signed_lebe(input)?;
            (rest, AttributeValue::SignedConstant(value))
        }
        constants::DW_FORM_udata => {
            let (rest, value) = parse_unsigned_lebe(input)?;
            (rest, AttributeValue::UnsignedConstant(value))
        }
        constants::DW_FORM_string => {
            let (rest, s) = parse_null_terminated_string(input.into())?;
            if s.to_bytes().is_empty() {
                return Err(Error::EmptyString);
            }
            let s = s.to_str().map_err(|_| Error::BadUtf8)?.to_string();
            (EndianBuf::new(rest),
             AttributeValue::String {
                 offset: None,
                 string: Some(s),
             })
        }
        constants::DW_FORM_block1 => {
            let (rest, len) = parse_u8e(input)?;
            parse_block(rest, len as usize)?
        }
        constants::DW_FORM_block2 => {
            let (rest, len) = parse_u16(input)?;
            parse_block(rest, len as usize)?
        }
        constants::DW_FORM_block4 => {
            let (rest, len) = parse_u32(input)?;
            parse_block(rest, len as usize)?
        }
        constants::DW_FORM_block |
        constants::DW_FORM_exprloc => {
            let (rest, len) = parse_unsigned_lebe(input)?;
            parse_block(rest, len as usize)?
        }
        constants::DW_FORM_flag => {
            let (rest, value) = parse_u8e(input)?;
            (rest, AttributeValue::Flag(value != 0))
        }
        constants::DW_FORM_flag_present => (input, AttributeValue::Flag(true)),
        constants::DW_FORM_strp => {
            let (rest, offset) = parse_offset(input, format)?;
            let string = resolve_str(context.debug_str, offset as u64);
            (rest,
             AttributeValue::String {
                 offset: Some(offset as u64),
                 string: string,
             })
        }
        constants::DW_FORM_line_strp |
        constants::DW_FORM_strp_sup => {
            // Offsets into sections we do not consume; resolution is the
            // consumer's problem.
            let (rest, offset) = parse_offset(input, format)?;
            (rest,
             AttributeValue::String {
                 offset: Some(offset as u64),
                 string: None,
             })
        }
        constants::DW_FORM_ref_addr => {
            let (rest, offset) = parse_word(input, format)?;
            (rest, AttributeValue::Reference(offset))
        }
        constants::DW_FORM_ref1 => {
            let (rest, value) = parse_u8e(input)?;
            (rest, AttributeValue::Reference(value as u64 + context.unit_offset as u64))
        }
        constants::DW_FORM_ref2 => {
            let (rest, value) = parse_u16(input)?;
            (rest, AttributeValue::Reference(value as u64 + context.unit_offset as u64))
        }
        constants::DW_FORM_ref4 => {
            let (rest, value) = parse_u32(input)?;
            (rest, AttributeValue::Reference(value as u64 + context.unit_offset as u64))
        }
        constants::DW_FORM_ref8 => {
            let (rest, value) = parse_u64(input)?;
            (rest, AttributeValue::Reference(value + context.unit_offset as u64))
        }
        constants::DW_FORM_ref_udata => {
            let (rest, value) = parse_unsigned_lebe(input)?;
            (rest, AttributeValue::Reference(value + context.unit_offset as u64))
        }
        constants::DW_FORM_ref_sig8 => {
            let (rest, value) = parse_u64(input)?;
            (rest, AttributeValue::Reference(value))
        }
        constants::DW_FORM_ref_sup4 => {
            let (rest, value) = parse_u32(input)?;
            (rest, AttributeValue::Reference(value as u64))
        }
        constants::DW_FORM_ref_sup8 => {
            let (rest, value) = parse_u64(input)?;
            (rest, AttributeValue::Reference(value))
        }
        constants::DW_FORM_sec_offset => {
            let (rest, offset) = parse_word(input, format)?;
            (rest, AttributeValue::Reference(offset))
        }
        constants::DW_FORM_implicit_const => {
            (input, AttributeValue::SignedConstant(spec.implicit_const()))
        }
        constants::DW_FORM_strx => {
            let (rest, index) = parse_unsigned_lebe(input)?;
            (rest,
             AttributeValue::String {
                 offset: Some(index),
                 string: None,
             })
        }
        constants::DW_FORM_strx1 => {
            let (rest, index) = parse_u8e(input)?;
            (rest,
             AttributeValue::String {
                 offset: Some(index as u64),
                 string: None,
             })
        }
        constants::DW_FORM_strx2 => {
            let (rest, index) = parse_u16(input)?;
            (rest,
             AttributeValue::String {
                 offset: Some(index as u64),
                 string: None,
             })
        }
        constants::DW_FORM_strx3 => {
            let (rest, index) = parse_u24(input)?;
            (rest,
             AttributeValue::String {
                 offset: Some(index as u64),
                 string: None,
             })
        }
        constants::DW_FORM_strx4 => {
            let (rest, index) = parse_u32(input)?;
            (rest,
             AttributeValue::String {
                 offset: Some(index as u64),
                 string: None,
             })
        }
        constants::DW_FORM_addrx => {
            let (rest, index) = parse_unsigned_lebe(input)?;
            (rest, AttributeValue::Address(index))
        }
        constants::DW_FORM_addrx1 => {
            let (rest, index) = parse_u8e(input)?;
            (rest, AttributeValue::Address(index as u64))
        }
        constants::DW_FORM_addrx2 => {
            let (rest, index) = parse_u16(input)?;
            (rest, AttributeValue::Address(index as u64))
        }
        constants::DW_FORM_addrx3 => {
            let (rest, index) = parse_u24(input)?;
            (rest, AttributeValue::Address(index as u64))
        }
        constants::DW_FORM_addrx4 => {
            let (rest, index) = parse_u32(input)?;
            (rest, AttributeValue::Address(index as u64))
        }
        constants::DW_FORM_loclistx => {
            let (rest, offset) = parse_word(input, format)?;
            (rest, AttributeValue::LocListPtr(offset))
        }
        constants::DW_FORM_rnglistx => {
            let (rest, index) = parse_unsigned_lebe(input)?;
            (rest, AttributeValue::Address(index))
        }
        form => return Err(Error::UnknownForm(form)),
    };

    Ok((rest, Attribute::new(spec.name(), spec.form(), value)))
}

/// The header of a compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitHeader {
    offset: usize,
    length: u64,
    format: Format,
    version: u16,
    unit_type: constants::DwUt,
    address_size: u8,
    abbrev_offset: u64,
    type_signature: u64,
    type_offset: u64,
    dwo_id: u64,
    header_size: usize,
}

impl UnitHeader {
    /// The offset at which this unit starts within `.debug_info`.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The length of this unit, not counting the initial length field.
    #[inline]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Whether this unit is 32- or 64-bit DWARF.
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// The DWARF version of this unit.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// The DWARF 5 unit type; zero for earlier versions.
    #[inline]
    pub fn unit_type(&self) -> constants::DwUt {
        self.unit_type
    }

    /// The size of addresses in this unit, in bytes.
    #[inline]
    pub fn address_size(&self) -> u8 {
        self.address_size
    }

    /// The offset of this unit's abbreviation set within `.debug_abbrev`.
    #[inline]
    pub fn abbrev_offset(&self) -> u64 {
        self.abbrev_offset
    }

    /// The type signature, for type units.
    #[inline]
    pub fn type_signature(&self) -> u64 {
        self.type_signature
    }

    /// The unit-relative offset of the described type, for type units.
    #[inline]
    pub fn type_offset(&self) -> u64 {
        self.type_offset
    }

    /// The split-DWARF id, for skeleton and split compilation units.
    #[inline]
    pub fn dwo_id(&self) -> u64 {
        self.dwo_id
    }

    /// The size of this header, not counting the initial length field.
    #[inline]
    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// The encoding this unit's records use.
    #[inline]
    pub fn encoding(&self) -> Encoding {
        Encoding {
            format: self.format,
            version: self.version,
            address_size: self.address_size,
        }
    }
}

/// Parse the header of the compilation unit starting at `offset`.
pub fn parse_unit_header<Endian>(input: EndianBuf<Endian>,
                                 offset: usize)
                                 -> Result<(EndianBuf<Endian>, UnitHeader)>
    where Endian: Endianity
{
    let (rest, (length, format)) = parse_initial_length(input)?;
    let body_len = rest.len();

    let (rest, version) = parse_u16(rest)?;
    if version < 2 || version > 5 {
        return Err(Error::UnknownVersion);
    }

    let mut unit_type = constants::DwUt(0);
    let mut type_signature = 0;
    let mut type_offset = 0;
    let mut dwo_id = 0;

    let (rest, abbrev_offset, address_size) = if version == 5 {
        let (rest, ut) = parse_u8e(rest)?;
        unit_type = constants::DwUt(ut);
        let (rest, address_size) = parse_u8e(rest)?;
        let (rest, abbrev_offset) = parse_word(rest, format)?;

        let rest = match unit_type {
            constants::DW_UT_skeleton |
            constants::DW_UT_split_compile => {
                let (rest, id) = parse_u64(rest)?;
                dwo_id = id;
                rest
            }
            constants::DW_UT_type |
            constants::DW_UT_split_type => {
                let (rest, sig) = parse_u64(rest)?;
                type_signature = sig;
                let (rest, to) = parse_word(rest, format)?;
                type_offset = to;
                rest
            }
            _ => rest,
        };
        (rest, abbrev_offset, address_size)
    } else {
        let (rest, abbrev_offset) = parse_word(rest, format)?;
        let (rest, address_size) = parse_u8e(rest)?;
        (rest, abbrev_offset, address_size)
    };

    let header_size = body_len - rest.len();
    Ok((rest,
        UnitHeader {
            offset: offset,
            length: length,
            format: format,
            version: version,
            unit_type: unit_type,
            address_size: address_size,
            abbrev_offset: abbrev_offset,
            type_signature: type_signature,
            type_offset: type_offset,
            dwo_id: dwo_id,
            header_size: header_size,
        }))
}

/// A Debugging Information Entry.
///
/// A DIE with an abbreviation code of zero is a null entry: it closes the
/// sibling list that is currently open and carries nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Die {
    offset: usize,
    unit_offset: usize,
    index: usize,
    abbrev_code: u64,
    tag: constants::DwTag,
    has_children: bool,
    attributes: Vec<Attribute>,
}

impl Die {
    /// The offset of this entry within `.debug_info`.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The offset of the unit that owns this entry.
    #[inline]
    pub fn unit_offset(&self) -> usize {
        self.unit_offset
    }

    /// The position of this entry within its unit's non-null entries.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The abbreviation code this entry was shaped by.
    #[inline]
    pub fn abbrev_code(&self) -> u64 {
        self.abbrev_code
    }

    /// Whether this is a null entry.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.abbrev_code == 0
    }

    /// This entry's tag.
    #[inline]
    pub fn tag(&self) -> constants::DwTag {
        self.tag
    }

    /// Whether this entry opens a child list.
    #[inline]
    pub fn has_children(&self) -> bool {
        self.has_children
    }

    /// This entry's attributes, in abbreviation order.
    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes[..]
    }

    /// Find this entry's attribute with the given name, if any.
    pub fn attribute(&self, name: constants::DwAt) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name() == name)
    }
}

/// A compilation unit: its header and the flattened depth-first walk of its
/// DIE tree, null entries included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    header: UnitHeader,
    dies: Vec<Die>,
}

impl CompilationUnit {
    /// This unit's header.
    #[inline]
    pub fn header(&self) -> &UnitHeader {
        &self.header
    }

    /// This unit's entries in depth-first order.
    #[inline]
    pub fn dies(&self) -> &[Die] {
        &self.dies[..]
    }

    /// The root entry, when the unit has one.
    pub fn root(&self) -> Option<&Die> {
        self.dies.first()
    }
}

/// The parsed contents of a `.debug_info` section.
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    units: Vec<CompilationUnit>,
    line_comp_dirs: HashMap<u64, String>,
    unit_index: HashMap<u64, usize>,
    die_index: HashMap<u64, (usize, usize)>,
}

impl DebugInfo {
    /// The compilation units, in section order.
    #[inline]
    pub fn units(&self) -> &[CompilationUnit] {
        &self.units[..]
    }

    /// The unit starting at the given section offset, if any.
    pub fn unit_at_offset(&self, offset: u64) -> Option<&CompilationUnit> {
        self.unit_index.get(&offset).map(|&idx| &self.units[idx])
    }

    /// The entry at the given section offset, if any.
    pub fn die_at_offset(&self, offset: u64) -> Option<&Die> {
        self.die_index
            .get(&offset)
            .map(|&(unit, die)| &self.units[unit].dies[die])
    }

    /// The compilation directory cached for the line program at the given
    /// `.debug_line` offset, if the owning unit declared one.
    pub fn line_comp_dir(&self, line_offset: u64) -> Option<&str> {
        self.line_comp_dirs.get(&line_offset).map(|s| &s[..])
    }

    fn build_indexes(&mut self) {
        for (unit_idx, unit) in self.units.iter().enumerate() {
            self.unit_index.insert(unit.header.offset as u64, unit_idx);
            for (die_idx, die) in unit.dies.iter().enumerate() {
                self.die_index.insert(die.offset as u64, (unit_idx, die_idx));
            }
        }
    }
}

/// Walk one unit's DIEs. `input` is clamped to the unit body, and
/// `unit_end` is the section offset the body ends at; a unit whose root
/// has no children carries no null terminator, so running out of body is
/// as valid an ending as the depth counter reaching zero.
///
/// A decoding failure inside a DIE drops that DIE and ends the walk; the
/// entries decoded before it stay on the unit.
fn parse_unit_dies<'input, Endian>(input: EndianBuf<'input, Endian>,
                                   unit: &mut CompilationUnit,
                                   abbrevs: &Abbreviations,
                                   set_start: usize,
                                   debug_str: Option<&'input [u8]>,
                                   unit_end: usize)
    where Endian: Endianity
{
    let context = AttributeContext {
        encoding: unit.header.encoding(),
        unit_offset: unit.header.offset,
        debug_str: debug_str,
    };

    let mut rest = input;
    let mut index = 0;
    let mut depth: isize = 0;

    while !rest.is_empty() {
        let offset = unit_end - rest.len();

        let (r, code) = match parse_unsigned_lebe(rest) {
            Ok(x) => x,
            Err(_) => return,
        };
        rest = r;

        if code == 0 {
            unit.dies.push(Die {
                offset: offset,
                unit_offset: unit.header.offset,
                index: index,
                abbrev_code: 0,
                tag: constants::DW_TAG_null,
                has_children: false,
                attributes: Vec::new(),
            });
            depth -= 1;
            if depth <= 0 {
                return;
            }
            continue;
        }

        let decl_idx = set_start.wrapping_add((code as usize).wrapping_sub(1));
        let decl = match abbrevs.get(decl_idx) {
            Some(decl) => decl,
            None => {
                warn!(".debug_info: {}: code {} at {:#x}",
                      Error::UnknownAbbreviation,
                      code,
                      offset);
                return;
            }
        };

        let mut die = Die {
            offset: offset,
            unit_offset: unit.header.offset,
            index: index,
            abbrev_code: code,
            tag: decl.tag(),
            has_children: decl.has_children(),
            attributes: Vec::with_capacity(decl.attributes().len()),
        };
        if die.has_children {
            depth += 1;
        }

        for spec in decl.attributes() {
            match parse_attribute(rest, *spec, &context) {
                Ok((r, attr)) => {
                    rest = r;
                    die.attributes.push(attr);
                }
                Err(e) => {
                    warn!(".debug_info: {:#x}: failed {} [{}]: {}",
                          offset,
                          spec.name(),
                          spec.form(),
                          e);
                    return;
                }
            }
        }

        index += 1;
        unit.dies.push(die);
    }
}

/// When a unit's root entry names both its compilation directory and its
/// line program, the pairing is remembered so the line decoder can build
/// full file paths later.
fn line_comp_dir_of(root: &Die) -> Option<(u64, String)> {
    let comp_dir = root.attribute(constants::DW_AT_comp_dir).and_then(|attr| {
        match *attr.value() {
            AttributeValue::String { string: Some(ref s), .. } => Some(s.clone()),
            _ => None,
        }
    });
    let line_offset = root.attribute(constants::DW_AT_stmt_list).and_then(|attr| {
        match *attr.value() {
            AttributeValue::UnsignedConstant(offset) |
            AttributeValue::Reference(offset) => Some(offset),
            _ => None,
        }
    });

    match (comp_dir, line_offset) {
        (Some(dir), Some(offset)) => Some((offset, dir)),
        _ => None,
    }
}

/// Parse the whole `.debug_info` section.
///
/// A malformed unit stops the section; the units parsed before it remain.
pub fn parse_debug_info<Endian>(input: EndianBuf<Endian>,
                                abbrevs: &Abbreviations,
                                debug_str: Option<&[u8]>)
                                -> DebugInfo
    where Endian: Endianity
{
    let section_len = input.len();
    let mut info = DebugInfo::default();
    let mut rest = input;

    while !rest.is_empty() {
        let offset = section_len - rest.len();

        let (after_header, header) = match parse_unit_header(rest, offset) {
            Ok(x) => x,
            Err(e) => {
                warn!(".debug_info: bad unit header at {:#x}: {}", offset, e);
                break;
            }
        };

        // The declared length covers everything after the initial length
        // field.
        let unit_end = offset + header.format().initial_length_size() as usize +
                       header.length() as usize;
        if header.length() < header.header_size() as u64 || unit_end > section_len {
            warn!(".debug_info: unit at {:#x} declares impossible length {:#x}",
                  offset,
                  header.length());
            break;
        }

        let set_start = match abbrevs.index_at_offset(header.abbrev_offset()) {
            Some(idx) => idx,
            None => {
                warn!(".debug_info: unit at {:#x} names unknown abbreviation set {:#x}",
                      offset,
                      header.abbrev_offset());
                break;
            }
        };

        debug!("{:#x}: compile unit length = {:#x}, abbrev offset: {:#x}",
               offset,
               header.length(),
               header.abbrev_offset());

        let mut unit = CompilationUnit {
            header: header,
            dies: Vec::new(),
        };
        let body_start = section_len - after_header.len();
        parse_unit_dies(input.range(body_start..unit_end),
                        &mut unit,
                        abbrevs,
                        set_start,
                        debug_str,
                        unit_end);

        if let Some((line_offset, dir)) = unit.root().and_then(line_comp_dir_of) {
            info.line_comp_dirs.insert(line_offset, dir);
        }
        info.units.push(unit);

        // Resume at the unit boundary the header declared, whether or not
        // the DIE walk consumed exactly the body.
        rest = input.range_from(unit_end..);
    }

    info.build_indexes();
    info
}

#[cfg(test)]
mod tests {
    extern crate test_assembler;

    use self::test_assembler::{Endian, Section};
    use super::*;
    use abbrev::{AttributeSpecification, parse_debug_abbrev};
    use constants;
    use endianity::{EndianBuf, LittleEndian, BigEndian};
    use parser::{Encoding, Error, Format};
    use test_util::SectionMethods;

    fn context<'input>(format: Format,
                       version: u16,
                       address_size: u8,
                       unit_offset: usize,
                       debug_str: Option<&'input [u8]>)
                       -> AttributeContext<'input> {
        AttributeContext {
            encoding: Encoding {
                format: format,
                version: version,
                address_size: address_size,
            },
            unit_offset: unit_offset,
            debug_str: debug_str,
        }
    }

    #[test]
    fn test_parse_unit_header_v4() {
        let section = Section::with_endian(Endian::Little)
            .L32(27)
            .L16(4)
            .L32(0x0102_0304)
            .D8(8);
        let buf = section.get_contents().unwrap();

        let (rest, header) = parse_unit_header(EndianBuf::<LittleEndian>::new(&buf), 0)
            .unwrap();
        assert_eq!(rest.len(), 0);
        assert_eq!(header.length(), 27);
        assert_eq!(header.format(), Format::Dwarf32);
        assert_eq!(header.version(), 4);
        assert_eq!(header.abbrev_offset(), 0x0102_0304);
        assert_eq!(header.address_size(), 8);
        // version + abbrev offset + address size
        assert_eq!(header.header_size(), 7);
    }

    #[test]
    fn test_parse_unit_header_v5() {
        let section = Section::with_endian(Endian::Little)
            .L32(100)
            .L16(5)
            .D8(constants::DW_UT_compile.0)
            .D8(8)
            .L32(0x0102_0304);
        let buf = section.get_contents().unwrap();

        let (rest, header) = parse_unit_header(EndianBuf::<LittleEndian>::new(&buf), 0)
            .unwrap();
        assert_eq!(rest.len(), 0);
        assert_eq!(header.version(), 5);
        assert_eq!(header.unit_type(), constants::DW_UT_compile);
        assert_eq!(header.address_size(), 8);
        assert_eq!(header.abbrev_offset(), 0x0102_0304);
        assert_eq!(header.header_size(), 8);
    }

    #[test]
    fn test_parse_unit_header_v5_skeleton() {
        let section = Section::with_endian(Endian::Little)
            .L32(100)
            .L16(5)
            .D8(constants::DW_UT_skeleton.0)
            .D8(8)
            .L32(0)
            .L64(0xfeed_beef_dead_cafe);
        let buf = section.get_contents().unwrap();

        let (_, header) = parse_unit_header(EndianBuf::<LittleEndian>::new(&buf), 0)
            .unwrap();
        assert_eq!(header.unit_type(), constants::DW_UT_skeleton);
        assert_eq!(header.dwo_id(), 0xfeed_beef_dead_cafe);
    }

    #[test]
    fn test_parse_unit_header_v5_type_unit() {
        let section = Section::with_endian(Endian::Little)
            .L32(100)
            .L16(5)
            .D8(constants::DW_UT_type.0)
            .D8(8)
            .L32(0)
            .L64(0x0123_4567_89ab_cdef)
            .L32(0x30);
        let buf = section.get_contents().unwrap();

        let (_, header) = parse_unit_header(EndianBuf::<LittleEndian>::new(&buf), 0)
            .unwrap();
        assert_eq!(header.type_signature(), 0x0123_4567_89ab_cdef);
        assert_eq!(header.type_offset(), 0x30);
    }

    #[test]
    fn test_parse_unit_header_unknown_version() {
        let section = Section::with_endian(Endian::Little)
            .L32(27)
            .L16(6);
        let buf = section.get_contents().unwrap();

        match parse_unit_header(EndianBuf::<LittleEndian>::new(&buf), 0) {
            Err(Error::UnknownVersion) => assert!(true),
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_attribute_string() {
        let buf = b"hello\0rest";
        let spec = AttributeSpecification::new(constants::DW_AT_name,
                                               constants::DW_FORM_string,
                                               0);
        let ctx = context(Format::Dwarf32, 4, 4, 0, None);

        let (rest, attr) = parse_attribute(EndianBuf::<LittleEndian>::new(&buf[..]),
                                           spec,
                                           &ctx)
            .unwrap();
        assert_eq!(rest.len(), 4);
        assert_eq!(attr.kind(), AttributeKind::String);
        assert_eq!(*attr.value(),
                   AttributeValue::String {
                       offset: None,
                       string: Some("hello".to_string()),
                   });
    }

    #[test]
    fn test_parse_attribute_empty_string_rejected() {
        let buf = [0x00];
        let spec = AttributeSpecification::new(constants::DW_AT_name,
                                               constants::DW_FORM_string,
                                               0);
        let ctx = context(Format::Dwarf32, 4, 4, 0, None);

        match parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx) {
            Err(Error::EmptyString) => assert!(true),
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_attribute_ref4_is_rebased() {
        let section = Section::with_endian(Endian::Little).L32(0x10);
        let buf = section.get_contents().unwrap();
        let spec = AttributeSpecification::new(constants::DW_AT_type,
                                               constants::DW_FORM_ref4,
                                               0);
        let ctx = context(Format::Dwarf32, 4, 4, 0x200, None);

        let (_, attr) = parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx)
            .unwrap();
        assert_eq!(attr.kind(), AttributeKind::Reference);
        assert_eq!(*attr.value(), AttributeValue::Reference(0x210));
    }

    #[test]
    fn test_parse_attribute_data16() {
        let section = Section::with_endian(Endian::Big)
            .B64(0x0102030405060708)
            .B64(0x090a0b0c0d0e0f10);
        let buf = section.get_contents().unwrap();
        let spec = AttributeSpecification::new(constants::DW_AT_const_value,
                                               constants::DW_FORM_data16,
                                               0);
        let ctx = context(Format::Dwarf32, 5, 4, 0, None);

        let (_, attr) = parse_attribute(EndianBuf::<BigEndian>::new(&buf), spec, &ctx)
            .unwrap();
        assert_eq!(*attr.value(),
                   AttributeValue::Constant128 {
                       low: 0x090a0b0c0d0e0f10,
                       high: 0x0102030405060708,
                   });
    }

    #[test]
    fn test_parse_attribute_implicit_const_reads_nothing() {
        let buf = [0xff];
        let spec = AttributeSpecification::new(constants::DW_AT_decl_line,
                                               constants::DW_FORM_implicit_const,
                                               -7);
        let ctx = context(Format::Dwarf32, 5, 4, 0, None);

        let (rest, attr) = parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx)
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(*attr.value(), AttributeValue::SignedConstant(-7));
    }

    #[test]
    fn test_parse_attribute_strp_resolves() {
        let debug_str = b"abc\0def\0";
        let section = Section::with_endian(Endian::Little).L32(4);
        let buf = section.get_contents().unwrap();
        let spec = AttributeSpecification::new(constants::DW_AT_name,
                                               constants::DW_FORM_strp,
                                               0);
        let ctx = context(Format::Dwarf32, 4, 4, 0, Some(&debug_str[..]));

        let (_, attr) = parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx)
            .unwrap();
        assert_eq!(*attr.value(),
                   AttributeValue::String {
                       offset: Some(4),
                       string: Some("def".to_string()),
                   });
    }

    #[test]
    fn test_parse_attribute_strp_out_of_bounds_is_unresolved() {
        let debug_str = b"abc\0";
        let section = Section::with_endian(Endian::Little).L32(100);
        let buf = section.get_contents().unwrap();
        let spec = AttributeSpecification::new(constants::DW_AT_name,
                                               constants::DW_FORM_strp,
                                               0);
        let ctx = context(Format::Dwarf32, 4, 4, 0, Some(&debug_str[..]));

        let (_, attr) = parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx)
            .unwrap();
        assert_eq!(*attr.value(),
                   AttributeValue::String {
                       offset: Some(100),
                       string: None,
                   });
    }

    #[test]
    fn test_parse_attribute_strx3() {
        let buf = [0x12, 0x34, 0x56, 0xff];
        let spec = AttributeSpecification::new(constants::DW_AT_name,
                                               constants::DW_FORM_strx3,
                                               0);
        let ctx = context(Format::Dwarf32, 5, 4, 0, None);

        let (rest, attr) = parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx)
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(*attr.value(),
                   AttributeValue::String {
                       offset: Some(0x563412),
                       string: None,
                   });
    }

    #[test]
    fn test_parse_attribute_exprloc() {
        let section = Section::with_endian(Endian::Little)
            .uleb(3)
            .append_bytes(&[0x91, 0x7c, 0x9f]);
        let buf = section.get_contents().unwrap();
        let spec = AttributeSpecification::new(constants::DW_AT_location,
                                               constants::DW_FORM_exprloc,
                                               0);
        let ctx = context(Format::Dwarf32, 4, 4, 0, None);

        let (rest, attr) = parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx)
            .unwrap();
        assert_eq!(rest.len(), 0);
        assert_eq!(attr.kind(), AttributeKind::Block);
        assert_eq!(*attr.value(), AttributeValue::Block(vec![0x91, 0x7c, 0x9f]));
    }

    #[test]
    fn test_attribute_kind_disambiguates_by_form() {
        let ctx = context(Format::Dwarf32, 4, 4, 0, None);

        // An expression location and a plain block share the block kind;
        // the retained form tells them apart.
        let section = Section::with_endian(Endian::Little)
            .uleb(1)
            .append_bytes(&[0x9c]);
        let buf = section.get_contents().unwrap();
        let spec = AttributeSpecification::new(constants::DW_AT_frame_base,
                                               constants::DW_FORM_exprloc,
                                               0);
        let (_, attr) = parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx)
            .unwrap();
        assert_eq!(attr.kind(), AttributeKind::Block);
        assert_eq!(attr.form(), constants::DW_FORM_exprloc);

        // Likewise for the section-pointer classes: a line-table offset
        // surfaces as a reference whose form is DW_FORM_sec_offset.
        let section = Section::with_endian(Endian::Little).L32(0x80);
        let buf = section.get_contents().unwrap();
        let spec = AttributeSpecification::new(constants::DW_AT_stmt_list,
                                               constants::DW_FORM_sec_offset,
                                               0);
        let (_, attr) = parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx)
            .unwrap();
        assert_eq!(attr.kind(), AttributeKind::Reference);
        assert_eq!(attr.form(), constants::DW_FORM_sec_offset);
        assert_eq!(*attr.value(), AttributeValue::Reference(0x80));
    }

    #[test]
    fn test_parse_attribute_flag_present() {
        let buf = [0xff];
        let spec = AttributeSpecification::new(constants::DW_AT_external,
                                               constants::DW_FORM_flag_present,
                                               0);
        let ctx = context(Format::Dwarf32, 4, 4, 0, None);

        let (rest, attr) = parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx)
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(*attr.value(), AttributeValue::Flag(true));
    }

    #[test]
    fn test_parse_attribute_unknown_form() {
        let buf = [0x01];
        let spec = AttributeSpecification::new(constants::DW_AT_name, constants::DwForm(0x99), 0);
        let ctx = context(Format::Dwarf32, 4, 4, 0, None);

        match parse_attribute(EndianBuf::<LittleEndian>::new(&buf), spec, &ctx) {
            Err(Error::UnknownForm(form)) => assert_eq!(form, constants::DwForm(0x99)),
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    fn simple_abbrevs() -> Abbreviations {
        let section = Section::with_endian(Endian::Little)
            // Code 1: a compile unit with name, comp dir, and line offset.
            .uleb(1)
            .uleb(constants::DW_TAG_compile_unit.0 as u64)
            .D8(constants::DW_CHILDREN_yes.0)
            .uleb(constants::DW_AT_name.0 as u64)
            .uleb(constants::DW_FORM_string.0 as u64)
            .uleb(constants::DW_AT_comp_dir.0 as u64)
            .uleb(constants::DW_FORM_string.0 as u64)
            .uleb(constants::DW_AT_stmt_list.0 as u64)
            .uleb(constants::DW_FORM_data4.0 as u64)
            .uleb(0).uleb(0)
            // Code 2: a childless variable with a name.
            .uleb(2)
            .uleb(constants::DW_TAG_variable.0 as u64)
            .D8(constants::DW_CHILDREN_no.0)
            .uleb(constants::DW_AT_name.0 as u64)
            .uleb(constants::DW_FORM_string.0 as u64)
            .uleb(0).uleb(0)
            .uleb(0);
        let buf = section.get_contents().unwrap();
        parse_debug_abbrev(EndianBuf::<LittleEndian>::new(&buf))
    }

    fn simple_unit_section() -> Vec<u8> {
        let section = Section::with_endian(Endian::Little)
            // Unit header: 27 bytes of body follow the length field.
            .L32(27)
            .L16(4)
            .L32(0)
            .D8(4)
            // Root DIE at offset 11.
            .uleb(1)
            .append_bytes(b"foo\0")
            .append_bytes(b"/tmp\0")
            .L32(0x1000)
            // Child DIE at offset 25.
            .uleb(2)
            .append_bytes(b"bar\0")
            // Null entry at offset 30 closes the root's children.
            .uleb(0);
        section.get_contents().unwrap()
    }

    #[test]
    fn test_parse_debug_info() {
        let abbrevs = simple_abbrevs();
        let buf = simple_unit_section();

        let info = parse_debug_info(EndianBuf::<LittleEndian>::new(&buf),
                                    &abbrevs,
                                    None);
        assert_eq!(info.units().len(), 1);

        let unit = &info.units()[0];
        assert_eq!(unit.header().length(), 27);
        assert_eq!(unit.header().version(), 4);
        assert_eq!(unit.dies().len(), 3);

        let root = unit.root().unwrap();
        assert_eq!(root.tag(), constants::DW_TAG_compile_unit);
        assert_eq!(root.offset(), 11);
        assert_eq!(root.index(), 0);
        assert!(root.has_children());

        let child = &unit.dies()[1];
        assert_eq!(child.tag(), constants::DW_TAG_variable);
        assert_eq!(child.offset(), 25);
        assert_eq!(child.index(), 1);
        assert_eq!(*child.attribute(constants::DW_AT_name).unwrap().value(),
                   AttributeValue::String {
                       offset: None,
                       string: Some("bar".to_string()),
                   });

        let null = &unit.dies()[2];
        assert!(null.is_null());
        assert_eq!(null.offset(), 30);

        // Every entry is stamped with its owning unit's offset.
        for die in unit.dies() {
            assert_eq!(die.unit_offset(), unit.header().offset());
        }
    }

    #[test]
    fn test_parse_debug_info_lookups() {
        let abbrevs = simple_abbrevs();
        let buf = simple_unit_section();

        let info = parse_debug_info(EndianBuf::<LittleEndian>::new(&buf),
                                    &abbrevs,
                                    None);

        assert_eq!(info.unit_at_offset(0).unwrap().header().version(), 4);
        assert!(info.unit_at_offset(1).is_none());
        assert_eq!(info.die_at_offset(25).unwrap().tag(), constants::DW_TAG_variable);
        assert!(info.die_at_offset(26).is_none());
        assert_eq!(info.line_comp_dir(0x1000), Some("/tmp"));
        assert_eq!(info.line_comp_dir(0x1001), None);
    }

    #[test]
    fn test_parse_debug_info_missing_abbrev_set() {
        let abbrevs = simple_abbrevs();
        let section = Section::with_endian(Endian::Little)
            .L32(7)
            .L16(4)
            // No abbreviation set lives at this offset.
            .L32(0x42)
            .D8(4);
        let buf = section.get_contents().unwrap();

        let info = parse_debug_info(EndianBuf::<LittleEndian>::new(&buf),
                                    &abbrevs,
                                    None);
        assert!(info.units().is_empty());
    }

    #[test]
    fn test_parse_debug_info_two_units() {
        let abbrevs = simple_abbrevs();
        let mut buf = simple_unit_section();
        let second = simple_unit_section();
        buf.extend_from_slice(&second);

        let info = parse_debug_info(EndianBuf::<LittleEndian>::new(&buf),
                                    &abbrevs,
                                    None);
        assert_eq!(info.units().len(), 2);
        assert_eq!(info.units()[1].header().offset(), 31);
        assert_eq!(info.die_at_offset(31 + 11).unwrap().tag(),
                   constants::DW_TAG_compile_unit);
        // The depth counter returned to zero exactly at each unit's end.
        for unit in info.units() {
            assert!(unit.dies().last().unwrap().is_null());
        }
    }
}

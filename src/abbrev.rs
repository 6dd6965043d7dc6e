//! Parsing the `.debug_abbrev` section's abbreviation declarations.

use constants;
use endianity::{Endianity, EndianBuf};
use parser::{Error, Result, parse_u8e, parse_unsigned_lebe, parse_signed_lebe};
use std::collections::HashMap;

/// The description of an attribute in an abbreviated type: a (name, form)
/// pair, plus the constant payload when the form is
/// `DW_FORM_implicit_const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpecification {
    name: constants::DwAt,
    form: constants::DwForm,
    implicit_const: i64,
}

impl AttributeSpecification {
    /// Construct a new `AttributeSpecification` from the given name and form.
    pub fn new(name: constants::DwAt,
               form: constants::DwForm,
               implicit_const: i64)
               -> AttributeSpecification {
        AttributeSpecification {
            name: name,
            form: form,
            implicit_const: implicit_const,
        }
    }

    /// Get the attribute's name.
    #[inline]
    pub fn name(&self) -> constants::DwAt {
        self.name
    }

    /// Get the attribute's form.
    #[inline]
    pub fn form(&self) -> constants::DwForm {
        self.form
    }

    /// The constant carried in the specification itself. Only meaningful
    /// when the form is `DW_FORM_implicit_const`.
    #[inline]
    pub fn implicit_const(&self) -> i64 {
        self.implicit_const
    }
}

/// An abbreviation declaration describes the shape of the DIEs that refer to
/// it: its code, tag, whether it has children, and its attribute
/// specifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbbrevDecl {
    offset: usize,
    code: u64,
    tag: constants::DwTag,
    has_children: bool,
    attributes: Vec<AttributeSpecification>,
}

impl AbbrevDecl {
    /// The offset of this declaration within `.debug_abbrev`.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Get this declaration's code.
    #[inline]
    pub fn code(&self) -> u64 {
        self.code
    }

    /// Get this declaration's tag.
    #[inline]
    pub fn tag(&self) -> constants::DwTag {
        self.tag
    }

    /// Return true if DIEs of this shape have children.
    #[inline]
    pub fn has_children(&self) -> bool {
        self.has_children
    }

    /// Get this declaration's attribute specifications.
    #[inline]
    pub fn attributes(&self) -> &[AttributeSpecification] {
        &self.attributes[..]
    }

    /// Find the specification for the given attribute name, if any.
    pub fn attribute(&self, name: constants::DwAt) -> Option<&AttributeSpecification> {
        self.attributes.iter().find(|spec| spec.name == name)
    }
}

/// The parsed contents of a `.debug_abbrev` section: every declaration in
/// the order the section stores them, plus an index from each declaration's
/// section offset to its position in that order.
///
/// Compilation unit headers name their abbreviation set by the offset of the
/// set's first declaration, so the same index answers both "which
/// declaration starts here" and "where does this unit's set begin".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abbreviations {
    decls: Vec<AbbrevDecl>,
    index_by_offset: HashMap<u64, usize>,
}

impl Abbreviations {
    /// Construct a new, empty set of abbreviations.
    pub fn new() -> Abbreviations {
        Abbreviations {
            decls: Vec::new(),
            index_by_offset: HashMap::new(),
        }
    }

    /// The number of declarations parsed out of the section.
    #[inline]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Whether the section yielded no declarations at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// All declarations, in section order.
    #[inline]
    pub fn decls(&self) -> &[AbbrevDecl] {
        &self.decls[..]
    }

    /// The declaration at the given position in section order.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&AbbrevDecl> {
        self.decls.get(idx)
    }

    /// The declaration starting at the given section offset, if any.
    pub fn decl_at_offset(&self, offset: u64) -> Option<&AbbrevDecl> {
        self.index_by_offset
            .get(&offset)
            .and_then(|&idx| self.decls.get(idx))
    }

    /// The position in section order of the declaration starting at the
    /// given section offset, if any.
    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        self.index_by_offset.get(&offset).cloned()
    }

    fn push(&mut self, decl: AbbrevDecl) {
        self.index_by_offset.insert(decl.offset as u64, self.decls.len());
        self.decls.push(decl);
    }
}

/// Parse a single abbreviation declaration starting at `offset` within the
/// section. A code of zero is a separator between abbreviation sets and
/// yields `None`.
#[doc(hidden)]
pub fn parse_abbrev_decl<Endian>(input: EndianBuf<Endian>,
                                 offset: usize)
                                 -> Result<(EndianBuf<Endian>, Option<AbbrevDecl>)>
    where Endian: Endianity
{
    let (rest, code) = parse_unsigned_lebe(input)?;
    if code == 0 {
        return Ok((rest, None));
    }

    let (rest, tag) = parse_unsigned_lebe(rest)?;
    let (rest, has_children) = parse_u8e(rest)?;
    let has_children = match constants::DwChildren(has_children) {
        constants::DW_CHILDREN_yes => true,
        constants::DW_CHILDREN_no => false,
        _ => return Err(Error::BadHasChildren),
    };

    let mut attributes = Vec::new();
    let mut rest = rest;
    loop {
        let (r, name) = parse_unsigned_lebe(rest)?;
        let (r, form) = parse_unsigned_lebe(r)?;
        if name == 0 {
            if form != 0 {
                return Err(Error::ExpectedZero);
            }
            rest = r;
            break;
        }

        let form = constants::DwForm(form as u16);
        let (r, implicit_const) = if form == constants::DW_FORM_implicit_const {
            parse_signed_lebe(r)?
        } else {
            (r, 0)
        };
        attributes.push(AttributeSpecification::new(constants::DwAt(name as u16),
                                                    form,
                                                    implicit_const));
        rest = r;
    }

    Ok((rest,
        Some(AbbrevDecl {
            offset: offset,
            code: code,
            tag: constants::DwTag(tag as u16),
            has_children: has_children,
            attributes: attributes,
        })))
}

/// Parse the whole `.debug_abbrev` section.
///
/// A malformed declaration aborts the section; everything parsed before it
/// stays valid in the returned table.
pub fn parse_debug_abbrev<Endian>(input: EndianBuf<Endian>) -> Abbreviations
    where Endian: Endianity
{
    let section_len = input.len();
    let mut abbrevs = Abbreviations::new();
    let mut rest = input;

    while !rest.is_empty() {
        let offset = section_len - rest.len();
        match parse_abbrev_decl(rest, offset) {
            Ok((r, Some(decl))) => {
                abbrevs.push(decl);
                rest = r;
            }
            Ok((r, None)) => {
                rest = r;
            }
            Err(e) => {
                warn!(".debug_abbrev: aborting at offset {:#x}: {}", offset, e);
                break;
            }
        }
    }

    abbrevs
}

#[cfg(test)]
mod tests {
    extern crate test_assembler;

    use self::test_assembler::{Endian, Section};
    use super::*;
    use constants;
    use endianity::{EndianBuf, LittleEndian};
    use parser::Error;
    use test_util::SectionMethods;

    #[test]
    fn test_parse_abbrev_decl_ok() {
        // code 2, DW_TAG_compile_unit, has children,
        // DW_AT_producer with DW_FORM_string, then the (0, 0) terminator.
        let buf = [0x02, 0x11, 0x01, 0x25, 0x08, 0x00, 0x00, 0x00];

        let (rest, decl) = parse_abbrev_decl(EndianBuf::<LittleEndian>::new(&buf), 0)
            .unwrap();
        let decl = decl.expect("non-null declaration");
        assert_eq!(decl.code(), 2);
        assert_eq!(decl.tag(), constants::DW_TAG_compile_unit);
        assert!(decl.has_children());
        assert_eq!(decl.attributes(),
                   &[AttributeSpecification::new(constants::DW_AT_producer,
                                                 constants::DW_FORM_string,
                                                 0)]);
        // One trailing byte: the set-end separator.
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_parse_abbrev_decl_null() {
        let buf = [0x00, 0xff];

        let (rest, decl) = parse_abbrev_decl(EndianBuf::<LittleEndian>::new(&buf), 0)
            .unwrap();
        assert!(decl.is_none());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_parse_abbrev_decl_bad_has_children() {
        let section = Section::with_endian(Endian::Little)
            .uleb(1)
            .uleb(constants::DW_TAG_subprogram.0 as u64)
            .D8(2)
            .uleb(0)
            .uleb(0);
        let buf = section.get_contents().unwrap();

        match parse_abbrev_decl(EndianBuf::<LittleEndian>::new(&buf), 0) {
            Err(Error::BadHasChildren) => assert!(true),
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_abbrev_decl_implicit_const() {
        let section = Section::with_endian(Endian::Little)
            .uleb(1)
            .uleb(constants::DW_TAG_variable.0 as u64)
            .D8(constants::DW_CHILDREN_no.0)
            .uleb(constants::DW_AT_decl_line.0 as u64)
            .uleb(constants::DW_FORM_implicit_const.0 as u64)
            .sleb(-42)
            .uleb(0)
            .uleb(0);
        let buf = section.get_contents().unwrap();

        let (_, decl) = parse_abbrev_decl(EndianBuf::<LittleEndian>::new(&buf), 0)
            .unwrap();
        let decl = decl.unwrap();
        assert_eq!(decl.attributes().len(), 1);
        assert_eq!(decl.attributes()[0].form(), constants::DW_FORM_implicit_const);
        assert_eq!(decl.attributes()[0].implicit_const(), -42);
    }

    #[test]
    fn test_parse_debug_abbrev_two_sets() {
        let section = Section::with_endian(Endian::Little)
            // First set, at offset 0.
            .uleb(1)
            .uleb(constants::DW_TAG_compile_unit.0 as u64)
            .D8(constants::DW_CHILDREN_yes.0)
            .uleb(constants::DW_AT_name.0 as u64)
            .uleb(constants::DW_FORM_string.0 as u64)
            .uleb(0).uleb(0)
            // Set terminator.
            .uleb(0)
            // Second set, at offset 9.
            .uleb(1)
            .uleb(constants::DW_TAG_base_type.0 as u64)
            .D8(constants::DW_CHILDREN_no.0)
            .uleb(0).uleb(0);
        let buf = section.get_contents().unwrap();

        let abbrevs = parse_debug_abbrev(EndianBuf::<LittleEndian>::new(&buf));
        assert_eq!(abbrevs.len(), 2);
        assert_eq!(abbrevs.get(0).unwrap().tag(), constants::DW_TAG_compile_unit);
        assert_eq!(abbrevs.get(1).unwrap().tag(), constants::DW_TAG_base_type);

        assert_eq!(abbrevs.index_at_offset(0), Some(0));
        assert_eq!(abbrevs.index_at_offset(9), Some(1));
        assert_eq!(abbrevs.decl_at_offset(9).unwrap().tag(),
                   constants::DW_TAG_base_type);
        assert_eq!(abbrevs.index_at_offset(1), None);
    }

    #[test]
    fn test_parse_debug_abbrev_partial_on_error() {
        let section = Section::with_endian(Endian::Little)
            // A good declaration.
            .uleb(1)
            .uleb(constants::DW_TAG_compile_unit.0 as u64)
            .D8(constants::DW_CHILDREN_no.0)
            .uleb(0).uleb(0)
            // A declaration with a malformed has-children byte.
            .uleb(2)
            .uleb(constants::DW_TAG_subprogram.0 as u64)
            .D8(7);
        let buf = section.get_contents().unwrap();

        let abbrevs = parse_debug_abbrev(EndianBuf::<LittleEndian>::new(&buf));
        assert_eq!(abbrevs.len(), 1);
        assert_eq!(abbrevs.get(0).unwrap().code(), 1);
    }

    #[test]
    fn test_abbrev_decl_attribute_lookup() {
        let section = Section::with_endian(Endian::Little)
            .uleb(1)
            .uleb(constants::DW_TAG_compile_unit.0 as u64)
            .D8(constants::DW_CHILDREN_no.0)
            .uleb(constants::DW_AT_name.0 as u64)
            .uleb(constants::DW_FORM_string.0 as u64)
            .uleb(constants::DW_AT_language.0 as u64)
            .uleb(constants::DW_FORM_data1.0 as u64)
            .uleb(0).uleb(0);
        let buf = section.get_contents().unwrap();

        let (_, decl) = parse_abbrev_decl(EndianBuf::<LittleEndian>::new(&buf), 0)
            .unwrap();
        let decl = decl.unwrap();
        assert_eq!(decl.attribute(constants::DW_AT_language).unwrap().form(),
                   constants::DW_FORM_data1);
        assert!(decl.attribute(constants::DW_AT_low_pc).is_none());
    }
}

//! Parsing the `.debug_line` section: line program headers, the opcodes of
//! the line number program, and the register state machine that turns them
//! into (address, file, line, column) rows.

use abbrev::AttributeSpecification;
use constants;
use endianity::{Endianity, EndianBuf};
use parser::{Encoding, Error, Format, Result, parse_address, parse_i8e, parse_initial_length,
             parse_null_terminated_string, parse_signed_lebe, parse_u16, parse_u8e,
             parse_unsigned_lebe, parse_word, take};
use unit::{AttributeContext, AttributeValue, DebugInfo, parse_attribute};

bitflags! {
    /// Which outputs the line decoder should produce for each program.
    pub struct LineInfoMask: u32 {
        /// Keep the decoded opcodes of each program.
        const OPCODES = 1;
        /// Execute each program and keep the synthesized rows.
        const ROWS = 2;
    }
}

/// A (content type, form) descriptor from a DWARF 5 directory or file name
/// entry format table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntryFormat {
    /// What the decoded value describes.
    pub content_type: constants::DwLnct,
    /// How the value is encoded.
    pub form: constants::DwForm,
}

/// An entry in the line program header's file name table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEntry {
    path: String,
    directory_index: u64,
    timestamp: u64,
    size: u64,
}

impl FileEntry {
    /// The file's path as the table stores it.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The index of the directory the file lives in.
    #[inline]
    pub fn directory_index(&self) -> u64 {
        self.directory_index
    }

    /// The file's modification time, in an implementation-defined encoding.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The file's size in bytes, or zero when unknown.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// A line number program header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineProgramHeader {
    offset: usize,
    unit_length: u64,
    format: Format,
    version: u16,
    address_size: u8,
    segment_selector_size: u8,
    header_length: u64,
    minimum_instruction_length: u8,
    maximum_operations_per_instruction: u8,
    default_is_stmt: bool,
    line_base: i8,
    line_range: u8,
    opcode_base: u8,
    standard_opcode_lengths: Vec<u8>,
    directory_entry_formats: Vec<FileEntryFormat>,
    file_name_entry_formats: Vec<FileEntryFormat>,
    include_directories: Vec<String>,
    file_names: Vec<FileEntry>,
}

impl LineProgramHeader {
    /// The offset of this program within `.debug_line`.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The length of this program, not counting the initial length field.
    #[inline]
    pub fn unit_length(&self) -> u64 {
        self.unit_length
    }

    /// Whether this program is 32- or 64-bit DWARF.
    #[inline]
    pub fn format(&self) -> Format {
        self.format
    }

    /// The line number program version.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// The size of `DW_LNE_set_address` operands, in bytes.
    #[inline]
    pub fn address_size(&self) -> u8 {
        self.address_size
    }

    /// The size of segment selectors; always zero in programs we accept.
    #[inline]
    pub fn segment_selector_size(&self) -> u8 {
        self.segment_selector_size
    }

    /// The declared number of bytes between the header length field and the
    /// first opcode.
    #[inline]
    pub fn header_length(&self) -> u64 {
        self.header_length
    }

    /// The size of the smallest target instruction, in bytes.
    #[inline]
    pub fn minimum_instruction_length(&self) -> u8 {
        self.minimum_instruction_length
    }

    /// The maximum number of operations per instruction bundle; one for
    /// non-VLIW targets.
    #[inline]
    pub fn maximum_operations_per_instruction(&self) -> u8 {
        self.maximum_operations_per_instruction
    }

    /// The initial value of the `is_stmt` register.
    #[inline]
    pub fn default_is_stmt(&self) -> bool {
        self.default_is_stmt
    }

    /// The smallest line advance a special opcode can encode.
    #[inline]
    pub fn line_base(&self) -> i8 {
        self.line_base
    }

    /// The number of distinct line advances special opcodes encode.
    #[inline]
    pub fn line_range(&self) -> u8 {
        self.line_range
    }

    /// The first special opcode value.
    #[inline]
    pub fn opcode_base(&self) -> u8 {
        self.opcode_base
    }

    /// The operand counts of the standard opcodes, indexed by opcode − 1.
    #[inline]
    pub fn standard_opcode_lengths(&self) -> &[u8] {
        &self.standard_opcode_lengths[..]
    }

    /// The DWARF 5 directory entry format descriptors.
    #[inline]
    pub fn directory_entry_formats(&self) -> &[FileEntryFormat] {
        &self.directory_entry_formats[..]
    }

    /// The DWARF 5 file name entry format descriptors.
    #[inline]
    pub fn file_name_entry_formats(&self) -> &[FileEntryFormat] {
        &self.file_name_entry_formats[..]
    }

    /// The include directory table.
    #[inline]
    pub fn include_directories(&self) -> &[String] {
        &self.include_directories[..]
    }

    /// The file name table.
    #[inline]
    pub fn file_names(&self) -> &[FileEntry] {
        &self.file_names[..]
    }

    /// The encoding this program's records use.
    #[inline]
    pub fn encoding(&self) -> Encoding {
        Encoding {
            format: self.format,
            version: self.version,
            address_size: self.address_size,
        }
    }

    /// A special opcode with the base subtracted out.
    #[inline]
    pub fn adjusted_opcode(&self, opcode: u8) -> u8 {
        opcode.wrapping_sub(self.opcode_base)
    }

    /// The address advance encoded by the given special opcode.
    pub fn special_op_advance_pc(&self, opcode: u8) -> u64 {
        if self.line_range == 0 {
            // dodge division by zero
            return 0;
        }
        let op_advance = self.adjusted_opcode(opcode) as u64 / self.line_range as u64;
        if self.maximum_operations_per_instruction == 1 {
            op_advance * self.minimum_instruction_length as u64
        } else {
            self.minimum_instruction_length as u64 *
            (op_advance / self.maximum_operations_per_instruction as u64)
        }
    }

    /// The line advance encoded by the given special opcode.
    pub fn special_op_advance_line(&self, opcode: u8) -> i64 {
        if self.line_range == 0 {
            return 0;
        }
        self.line_base as i64 + (self.adjusted_opcode(opcode) % self.line_range) as i64
    }

    /// Resolve a file table index (already rebased to the table, so the
    /// caller has subtracted the file register's bias) into a full path.
    ///
    /// Directory indexes are 1-based before DWARF 5 and 0-based from it. A
    /// relative include directory is prefixed with the compilation
    /// directory when one is known. Separators are forward slashes,
    /// unconditionally.
    pub fn file_path(&self, comp_dir: Option<&str>, file_index: u64) -> Option<String> {
        let file = match self.file_names.get(file_index as usize) {
            Some(file) => file,
            None => return None,
        };

        let include_dir = if self.version <= 4 {
            if file.directory_index > 0 {
                self.include_directories.get(file.directory_index as usize - 1)
            } else {
                None
            }
        } else {
            self.include_directories.get(file.directory_index as usize)
        };

        let dir = match include_dir {
            Some(dir) if !dir.starts_with('/') => {
                match comp_dir {
                    Some(comp_dir) => format!("{}/{}", comp_dir, dir),
                    None => dir.clone(),
                }
            }
            Some(dir) => dir.clone(),
            None => comp_dir.unwrap_or(".").to_string(),
        };
        Some(format!("{}/{}", dir, file.path))
    }

    /// Like `file_path`, pulling the compilation directory out of the
    /// cross-section cache the DIE parser filled in.
    pub fn full_file_path(&self, info: Option<&DebugInfo>, file_index: u64) -> Option<String> {
        let comp_dir = info.and_then(|info| info.line_comp_dir(self.offset as u64));
        self.file_path(comp_dir, file_index)
    }
}

/// A decoded standard opcode and its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardInstruction {
    /// Emit a row and clear the basic block flag.
    Copy,
    /// Advance the address by the operand times the minimum instruction
    /// length.
    AdvancePc(u64),
    /// Advance the line by the signed operand.
    AdvanceLine(i64),
    /// Set the file register.
    SetFile(u64),
    /// Set the column register.
    SetColumn(u64),
    /// Toggle the is_stmt register.
    NegateStatement,
    /// Set the basic block flag.
    SetBasicBlock,
    /// Advance the address as special opcode 255 would, without emitting.
    ConstAddPc,
    /// Advance the address by a fixed 16-bit operand.
    FixedAdvancePc(u16),
    /// Set the prologue end flag.
    SetPrologueEnd,
    /// Set the epilogue begin flag.
    SetEpilogueBegin,
    /// Set the isa register.
    SetIsa(u64),
    /// An opcode the header declared but we have no semantics for; its
    /// declared operands were consumed and ignored.
    Unknown(constants::DwLns),
}

/// A decoded extended opcode and its operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedInstruction {
    /// End the current sequence: emit a closing row and reset the
    /// registers.
    EndSequence,
    /// Set the address register.
    SetAddress(u64),
    /// Define an additional file table entry mid-program (DWARF ≤ 4).
    DefineFile(FileEntry),
    /// Set the discriminator register.
    SetDiscriminator(u64),
    /// An opcode we have no semantics for; the declared payload was
    /// skipped.
    Unknown(constants::DwLne),
}

/// One operation of a line number program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineInstruction {
    /// A standard opcode.
    Standard(StandardInstruction),
    /// An extended opcode.
    Extended(ExtendedInstruction),
    /// A special opcode, carried raw; the header's arithmetic gives its
    /// address and line advances.
    Special(u8),
}

/// The registers of the line number state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMachineRegisters {
    /// The program counter.
    pub address: u64,
    /// The current file, 1-based; zero means unknown.
    pub file: u64,
    /// The current line, 1-based; zero only in closing rows.
    pub line: u64,
    /// The current column, or zero for "any".
    pub column: u64,
    /// Whether this address is a recommended breakpoint location.
    pub is_stmt: bool,
    /// Whether this address begins a basic block.
    pub basic_block: bool,
    /// Whether this row ends a sequence.
    pub end_sequence: bool,
    /// Whether this address is where a function prologue ends.
    pub prologue_end: bool,
    /// Whether this address is where a function epilogue begins.
    pub epilogue_begin: bool,
    /// The current instruction set architecture.
    pub isa: u64,
    /// The current path discriminator.
    pub discriminator: u64,
}

impl StateMachineRegisters {
    /// Registers in the state a sequence starts with.
    pub fn new(header: &LineProgramHeader) -> StateMachineRegisters {
        StateMachineRegisters {
            address: 0,
            file: 1,
            line: 1,
            column: 0,
            is_stmt: header.default_is_stmt(),
            basic_block: false,
            end_sequence: false,
            prologue_end: false,
            epilogue_begin: false,
            isa: 0,
            discriminator: 0,
        }
    }

    /// Reset to the sequence start state.
    pub fn reset(&mut self, header: &LineProgramHeader) {
        *self = StateMachineRegisters::new(header);
    }
}

/// One row of the synthesized line table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// The instruction address the row describes.
    pub address: u64,
    /// The resolved source path, when the file register named one.
    pub path: Option<String>,
    /// The source line; zero marks the closing row of a sequence.
    pub line: u32,
    /// The source column.
    pub column: u32,
}

/// One line number program: its header, and its decoded opcodes when the
/// mask asked for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineUnit {
    /// The program's header.
    pub header: LineProgramHeader,
    /// The program's decoded opcodes, in program order.
    pub instructions: Vec<LineInstruction>,
}

/// The parsed contents of a `.debug_line` section.
#[derive(Debug, Clone, Default)]
pub struct LineInfo {
    units: Vec<LineUnit>,
    rows: Vec<Row>,
}

impl LineInfo {
    /// The line number programs, in section order.
    #[inline]
    pub fn units(&self) -> &[LineUnit] {
        &self.units[..]
    }

    /// The synthesized rows of every program, sorted by address. Each
    /// sequence contributes a closing row with a line of zero.
    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows[..]
    }
}

fn parse_entry_formats<Endian>(input: EndianBuf<Endian>)
                               -> Result<(EndianBuf<Endian>, Vec<FileEntryFormat>)>
    where Endian: Endianity
{
    let (mut rest, count) = parse_u8e(input)?;
    let mut formats = Vec::with_capacity(count as usize);
    let mut path_count = 0;
    for _ in 0..count {
        let (r, content_type) = parse_unsigned_lebe(rest)?;
        let (r, form) = parse_unsigned_lebe(r)?;
        let content_type = constants::DwLnct(content_type as u16);
        if content_type == constants::DW_LNCT_path {
            path_count += 1;
        }
        formats.push(FileEntryFormat {
            content_type: content_type,
            form: constants::DwForm(form as u16),
        });
        rest = r;
    }
    if path_count != 1 {
        return Err(Error::MissingPathEntryFormat);
    }
    Ok((rest, formats))
}

fn parse_v5_entry<'input, Endian>(input: EndianBuf<'input, Endian>,
                                  formats: &[FileEntryFormat],
                                  context: &AttributeContext<'input>)
                                  -> Result<(EndianBuf<'input, Endian>, FileEntry)>
    where Endian: Endianity
{
    let mut entry = FileEntry::default();
    let mut rest = input;
    for format in formats {
        let spec = AttributeSpecification::new(constants::DW_AT_null, format.form, 0);
        let (r, attr) = parse_attribute(rest, spec, context)?;
        rest = r;
        match format.content_type {
            constants::DW_LNCT_path => {
                if let AttributeValue::String { string: Some(s), .. } = attr.value().clone() {
                    entry.path = s;
                }
            }
            constants::DW_LNCT_directory_index => {
                if let AttributeValue::UnsignedConstant(idx) = *attr.value() {
                    entry.directory_index = idx;
                }
            }
            constants::DW_LNCT_timestamp => {
                if let AttributeValue::UnsignedConstant(t) = *attr.value() {
                    entry.timestamp = t;
                }
            }
            constants::DW_LNCT_size => {
                if let AttributeValue::UnsignedConstant(s) = *attr.value() {
                    entry.size = s;
                }
            }
            // MD5 hashes and vendor content types are consumed and dropped.
            _ => {}
        }
    }
    Ok((rest, entry))
}

/// Parse a line number program header starting at `offset` within
/// `.debug_line`.
///
/// Versions before 5 do not name their address size; `address_size_hint`
/// supplies it from the surrounding object file. DWARF 5 directory and
/// file name entries may name their paths by `.debug_str` offset, so the
/// string table threads into their decoding context just as it does for
/// DIE attributes.
pub fn parse_line_program_header<'input, Endian>
    (input: EndianBuf<'input, Endian>,
     offset: usize,
     address_size_hint: u8,
     debug_str: Option<&'input [u8]>)
     -> Result<(EndianBuf<'input, Endian>, LineProgramHeader)>
    where Endian: Endianity
{
    let (rest, (unit_length, format)) = parse_initial_length(input)?;
    let (rest, version) = parse_u16(rest)?;
    if version < 2 || version > 5 {
        return Err(Error::UnknownVersion);
    }

    let (rest, address_size, segment_selector_size) = if version == 5 {
        let (rest, address_size) = parse_u8e(rest)?;
        let (rest, segment_selector_size) = parse_u8e(rest)?;
        if segment_selector_size != 0 {
            return Err(Error::UnsupportedSegmentSelectorSize(segment_selector_size));
        }
        (rest, address_size, segment_selector_size)
    } else {
        (rest, address_size_hint, 0)
    };

    let (rest, header_length) = parse_word(rest, format)?;

    let (rest, minimum_instruction_length) = parse_u8e(rest)?;
    if minimum_instruction_length == 0 {
        return Err(Error::MinimumInstructionLengthZero);
    }

    let (rest, maximum_operations_per_instruction) = if version >= 4 {
        parse_u8e(rest)?
    } else {
        (rest, 1)
    };
    if maximum_operations_per_instruction == 0 {
        return Err(Error::MaximumOperationsPerInstructionZero);
    }

    let (rest, default_is_stmt) = parse_u8e(rest)?;
    let (rest, line_base) = parse_i8e(rest)?;
    let (rest, line_range) = parse_u8e(rest)?;
    if line_range == 0 {
        return Err(Error::LineRangeZero);
    }

    let (rest, opcode_base) = parse_u8e(rest)?;
    if opcode_base == 0 {
        return Err(Error::OpcodeBaseZero);
    }
    let (mut rest, lengths) = take(opcode_base as usize - 1, rest)?;
    let standard_opcode_lengths = lengths.buf().to_vec();

    let mut directory_entry_formats = Vec::new();
    let mut file_name_entry_formats = Vec::new();
    let mut include_directories = Vec::new();
    let mut file_names = Vec::new();

    if version <= 4 {
        loop {
            let (r, dir) = parse_null_terminated_string(rest.into())?;
            rest = EndianBuf::new(r);
            if dir.to_bytes().is_empty() {
                break;
            }
            let dir = dir.to_str().map_err(|_| Error::BadUtf8)?.to_string();
            include_directories.push(dir);
        }

        loop {
            let (r, name) = parse_null_terminated_string(rest.into())?;
            let r = EndianBuf::new(r);
            if name.to_bytes().is_empty() {
                rest = r;
                break;
            }
            let name = name.to_str().map_err(|_| Error::BadUtf8)?.to_string();
            let (r, directory_index) = parse_unsigned_lebe(r)?;
            let (r, timestamp) = parse_unsigned_lebe(r)?;
            let (r, size) = parse_unsigned_lebe(r)?;
            file_names.push(FileEntry {
                path: name,
                directory_index: directory_index,
                timestamp: timestamp,
                size: size,
            });
            rest = r;
        }
    } else {
        let context = AttributeContext {
            encoding: Encoding {
                format: format,
                version: version,
                address_size: address_size,
            },
            unit_offset: 0,
            debug_str: debug_str,
        };

        let (r, formats) = parse_entry_formats(rest)?;
        directory_entry_formats = formats;
        let (mut r, count) = parse_unsigned_lebe(r)?;
        for _ in 0..count {
            let (r2, entry) = parse_v5_entry(r, &directory_entry_formats, &context)?;
            include_directories.push(entry.path);
            r = r2;
        }

        let (r, formats) = parse_entry_formats(r)?;
        file_name_entry_formats = formats;
        let (mut r, count) = parse_unsigned_lebe(r)?;
        for _ in 0..count {
            let (r2, entry) = parse_v5_entry(r, &file_name_entry_formats, &context)?;
            file_names.push(entry);
            r = r2;
        }
        rest = r;
    }

    Ok((rest,
        LineProgramHeader {
            offset: offset,
            unit_length: unit_length,
            format: format,
            version: version,
            address_size: address_size,
            segment_selector_size: segment_selector_size,
            header_length: header_length,
            minimum_instruction_length: minimum_instruction_length,
            maximum_operations_per_instruction: maximum_operations_per_instruction,
            default_is_stmt: default_is_stmt != 0,
            line_base: line_base,
            line_range: line_range,
            opcode_base: opcode_base,
            standard_opcode_lengths: standard_opcode_lengths,
            directory_entry_formats: directory_entry_formats,
            file_name_entry_formats: file_name_entry_formats,
            include_directories: include_directories,
            file_names: file_names,
        }))
}

fn parse_extended_instruction<'input, Endian>
    (input: EndianBuf<'input, Endian>,
     header: &LineProgramHeader)
     -> Result<(EndianBuf<'input, Endian>, ExtendedInstruction)>
    where Endian: Endianity
{
    let (rest, length) = parse_unsigned_lebe(input)?;
    if length == 0 {
        return Err(Error::BadLength);
    }
    // The declared length bounds the whole payload; whatever an opcode does
    // not consume is skipped.
    let (rest, payload) = take(length as usize, rest)?;
    let (payload, opcode) = parse_u8e(payload)?;

    let instruction = match constants::DwLne(opcode) {
        constants::DW_LNE_end_sequence => ExtendedInstruction::EndSequence,
        constants::DW_LNE_set_address => {
            let (_, address) = parse_address(payload, header.address_size())?;
            ExtendedInstruction::SetAddress(address)
        }
        constants::DW_LNE_set_discriminator => {
            let (_, discriminator) = parse_unsigned_lebe(payload)?;
            ExtendedInstruction::SetDiscriminator(discriminator)
        }
        constants::DW_LNE_define_file if header.version() <= 4 => {
            let (r, name) = parse_null_terminated_string(payload.into())?;
            let name = name.to_str().map_err(|_| Error::BadUtf8)?.to_string();
            let r = EndianBuf::<Endian>::new(r);
            let (r, directory_index) = parse_unsigned_lebe(r)?;
            let (r, timestamp) = parse_unsigned_lebe(r)?;
            let (_, size) = parse_unsigned_lebe(r)?;
            ExtendedInstruction::DefineFile(FileEntry {
                path: name,
                directory_index: directory_index,
                timestamp: timestamp,
                size: size,
            })
        }
        opcode => ExtendedInstruction::Unknown(opcode),
    };
    Ok((rest, instruction))
}

fn parse_standard_instruction<'input, Endian>
    (input: EndianBuf<'input, Endian>,
     header: &LineProgramHeader,
     opcode: constants::DwLns)
     -> Result<(EndianBuf<'input, Endian>, StandardInstruction)>
    where Endian: Endianity
{
    let (rest, instruction) = match opcode {
        constants::DW_LNS_copy => (input, StandardInstruction::Copy),
        constants::DW_LNS_advance_pc => {
            let (rest, advance) = parse_unsigned_lebe(input)?;
            (rest, StandardInstruction::AdvancePc(advance))
        }
        constants::DW_LNS_advance_line => {
            let (rest, advance) = parse_signed_lebe(input)?;
            (rest, StandardInstruction::AdvanceLine(advance))
        }
        constants::DW_LNS_set_file => {
            let (rest, file) = parse_unsigned_lebe(input)?;
            (rest, StandardInstruction::SetFile(file))
        }
        constants::DW_LNS_set_column => {
            let (rest, column) = parse_unsigned_lebe(input)?;
            (rest, StandardInstruction::SetColumn(column))
        }
        constants::DW_LNS_negate_stmt => (input, StandardInstruction::NegateStatement),
        constants::DW_LNS_set_basic_block => (input, StandardInstruction::SetBasicBlock),
        constants::DW_LNS_const_add_pc => (input, StandardInstruction::ConstAddPc),
        constants::DW_LNS_fixed_advance_pc => {
            let (rest, advance) = parse_u16(input)?;
            (rest, StandardInstruction::FixedAdvancePc(advance))
        }
        constants::DW_LNS_set_prologue_end => (input, StandardInstruction::SetPrologueEnd),
        constants::DW_LNS_set_epilogue_begin => (input, StandardInstruction::SetEpilogueBegin),
        constants::DW_LNS_set_isa => {
            let (rest, isa) = parse_unsigned_lebe(input)?;
            (rest, StandardInstruction::SetIsa(isa))
        }
        opcode => {
            // The operand counts in the header tell us how much to skip.
            let count = header.standard_opcode_lengths()
                .get(opcode.0 as usize - 1)
                .cloned()
                .unwrap_or(0);
            let mut rest = input;
            for _ in 0..count {
                let (r, _) = parse_unsigned_lebe(rest)?;
                rest = r;
            }
            (rest, StandardInstruction::Unknown(opcode))
        }
    };
    Ok((rest, instruction))
}

/// Parse a single line number program operation.
pub fn parse_instruction<'input, Endian>
    (input: EndianBuf<'input, Endian>,
     header: &LineProgramHeader)
     -> Result<(EndianBuf<'input, Endian>, LineInstruction)>
    where Endian: Endianity
{
    let (rest, opcode) = parse_u8e(input)?;
    if opcode == 0 {
        let (rest, instruction) = parse_extended_instruction(rest, header)?;
        Ok((rest, LineInstruction::Extended(instruction)))
    } else if opcode >= header.opcode_base() {
        Ok((rest, LineInstruction::Special(opcode)))
    } else {
        let (rest, instruction) =
            parse_standard_instruction(rest, header, constants::DwLns(opcode))?;
        Ok((rest, LineInstruction::Standard(instruction)))
    }
}

struct RowSink<'a> {
    rows: &'a mut Vec<Row>,
    // Resolved paths per file table index, filled on first use.
    path_cache: Vec<Option<String>>,
    comp_dir: Option<String>,
}

impl<'a> RowSink<'a> {
    fn new(rows: &'a mut Vec<Row>,
           header: &LineProgramHeader,
           info: Option<&DebugInfo>)
           -> RowSink<'a> {
        RowSink {
            rows: rows,
            path_cache: vec![None; header.file_names().len()],
            comp_dir: info.and_then(|info| info.line_comp_dir(header.offset() as u64))
                .map(|s| s.to_string()),
        }
    }

    fn path(&mut self, header: &LineProgramHeader, file_index: u64) -> Option<String> {
        let idx = file_index as usize;
        if idx >= self.path_cache.len() {
            return header.file_path(self.comp_dir.as_ref().map(|s| &s[..]), file_index);
        }
        if self.path_cache[idx].is_none() {
            self.path_cache[idx] =
                header.file_path(self.comp_dir.as_ref().map(|s| &s[..]), file_index);
        }
        self.path_cache[idx].clone()
    }

    fn push(&mut self, header: &LineProgramHeader, regs: &StateMachineRegisters) {
        let path = if regs.file > 0 {
            self.path(header, regs.file - 1)
        } else {
            None
        };
        self.rows.push(Row {
            address: regs.address,
            path: path,
            line: regs.line as u32,
            column: regs.column as u32,
        });
    }

    fn push_closing(&mut self, regs: &StateMachineRegisters) {
        self.rows.push(Row {
            address: regs.address,
            path: None,
            line: 0,
            column: 0,
        });
    }
}

/// Execute one operation against the register state machine, pushing rows
/// into the sink when one is emitted.
fn run_instruction(header: &LineProgramHeader,
                   regs: &mut StateMachineRegisters,
                   instruction: &LineInstruction,
                   sink: &mut Option<RowSink>)
                   -> Result<()> {
    match *instruction {
        LineInstruction::Standard(ref std) => {
            match *std {
                StandardInstruction::Copy => {
                    if let Some(ref mut sink) = *sink {
                        sink.push(header, regs);
                    }
                    regs.basic_block = false;
                }
                StandardInstruction::AdvancePc(advance) => {
                    regs.address = regs.address
                        .wrapping_add(advance.wrapping_mul(header.minimum_instruction_length() as
                                                           u64));
                }
                StandardInstruction::AdvanceLine(advance) => {
                    regs.line = regs.line.wrapping_add(advance as u64);
                }
                StandardInstruction::SetFile(file) => regs.file = file,
                StandardInstruction::SetColumn(column) => regs.column = column,
                StandardInstruction::NegateStatement => regs.is_stmt = !regs.is_stmt,
                StandardInstruction::SetBasicBlock => regs.basic_block = true,
                StandardInstruction::ConstAddPc => {
                    regs.address = regs.address.wrapping_add(header.special_op_advance_pc(255));
                }
                StandardInstruction::FixedAdvancePc(advance) => {
                    regs.address = regs.address.wrapping_add(advance as u64);
                }
                StandardInstruction::SetPrologueEnd => regs.prologue_end = true,
                StandardInstruction::SetEpilogueBegin => regs.epilogue_begin = true,
                StandardInstruction::SetIsa(isa) => regs.isa = isa,
                StandardInstruction::Unknown(opcode) => {
                    return Err(Error::UnknownStandardOpcode(opcode));
                }
            }
        }
        LineInstruction::Extended(ref ext) => {
            match *ext {
                ExtendedInstruction::EndSequence => {
                    regs.end_sequence = true;
                    if let Some(ref mut sink) = *sink {
                        sink.push_closing(regs);
                    }
                    regs.reset(header);
                }
                ExtendedInstruction::SetAddress(address) => regs.address = address,
                ExtendedInstruction::DefineFile(_) => {}
                ExtendedInstruction::SetDiscriminator(discriminator) => {
                    regs.discriminator = discriminator;
                }
                ExtendedInstruction::Unknown(opcode) => {
                    return Err(Error::UnknownExtendedOpcode(opcode));
                }
            }
        }
        LineInstruction::Special(opcode) => {
            regs.address = regs.address.wrapping_add(header.special_op_advance_pc(opcode));
            regs.line = regs.line.wrapping_add(header.special_op_advance_line(opcode) as u64);
            if let Some(ref mut sink) = *sink {
                sink.push(header, regs);
            }
            regs.basic_block = false;
            regs.prologue_end = false;
            regs.epilogue_begin = false;
            regs.discriminator = 0;
        }
    }
    Ok(())
}

/// Parse the whole `.debug_line` section.
///
/// When `info` is given, file names resolve to full paths using the
/// compilation directories its units declared; `debug_str` resolves the
/// string-table path entries of DWARF 5 headers. A malformed program is
/// abandoned where it fails; everything accumulated before the failure is
/// kept.
pub fn parse_debug_line<'input, Endian>(input: EndianBuf<'input, Endian>,
                                        info: Option<&DebugInfo>,
                                        mask: LineInfoMask,
                                        address_size_hint: u8,
                                        debug_str: Option<&'input [u8]>)
                                        -> LineInfo
    where Endian: Endianity
{
    let section_len = input.len();
    let mut li = LineInfo::default();
    let mut rest = input;

    while !rest.is_empty() {
        let offset = section_len - rest.len();

        let (after_header, header) =
            match parse_line_program_header(rest, offset, address_size_hint, debug_str) {
                Ok(x) => x,
                Err(e) => {
                    warn!(".debug_line: bad header at {:#x}: {}", offset, e);
                    break;
                }
            };

        let unit_end = offset + header.format().initial_length_size() as usize +
                       header.unit_length() as usize;
        let body_start = section_len - after_header.len();
        if unit_end > section_len {
            warn!(".debug_line: program at {:#x} runs past the section", offset);
            break;
        }
        if unit_end <= body_start {
            // The declared length leaves no room for opcodes; skip the
            // truncated program.
            rest = input.range_from(unit_end..);
            continue;
        }

        let mut unit = LineUnit {
            header: header,
            instructions: Vec::new(),
        };
        let mut regs = StateMachineRegisters::new(&unit.header);
        let mut sink = if mask.contains(LineInfoMask::ROWS) {
            Some(RowSink::new(&mut li.rows, &unit.header, info))
        } else {
            None
        };

        let mut body = input.range(body_start..unit_end);
        while !body.is_empty() {
            let (r, instruction) = match parse_instruction(body, &unit.header) {
                Ok(x) => x,
                Err(e) => {
                    warn!(".debug_line: program at {:#x}: {}", offset, e);
                    break;
                }
            };
            body = r;

            if sink.is_some() {
                if let Err(e) = run_instruction(&unit.header, &mut regs, &instruction, &mut sink) {
                    warn!(".debug_line: program at {:#x}: {}", offset, e);
                    break;
                }
            }
            if mask.contains(LineInfoMask::OPCODES) {
                unit.instructions.push(instruction);
            }
        }

        drop(sink);
        li.units.push(unit);
        rest = input.range_from(unit_end..);
    }

    li.rows.sort_by_key(|row| row.address);
    li
}

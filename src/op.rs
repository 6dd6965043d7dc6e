//! Decoding DWARF expression operations.
//!
//! Decoding is separate from evaluation: one call decodes one operation
//! from the raw bytes, and consumers that want to inspect an expression
//! never need an evaluation stack.

use constants;
use endianity::{Endianity, EndianBuf};
use parser::{Encoding, Error, Result, parse_address, parse_i8e, parse_signed_lebe, parse_u16,
             parse_u32, parse_u64, parse_u8e, parse_unsigned_lebe, parse_word, take};

/// A single decoded DWARF expression operation.
///
/// Each variant carries exactly the fields its opcode encodes; opcodes that
/// differ only in operand width or in vendor prefix fold into the same
/// variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Dereference the topmost value of the stack.
    Deref {
        /// The DIE offset of the base type, or zero for the generic type.
        base_type: u64,
        /// The size of the data to dereference.
        size: u8,
        /// Whether the operation pops an address space argument too.
        space: bool,
    },
    /// Pop the topmost value of the stack.
    Drop,
    /// Push a copy of the item at the given stack depth. Handles
    /// `DW_OP_pick`, `DW_OP_dup`, and `DW_OP_over`.
    Pick(u8),
    /// Swap the top two stack values.
    Swap,
    /// Rotate the top three stack values.
    Rot,
    /// Take the absolute value of the top of the stack.
    Abs,
    /// Bitwise and of the top two values.
    And,
    /// Divide the top two values.
    Div,
    /// Subtract the top two values.
    Minus,
    /// The remainder of the top two values.
    Mod,
    /// Multiply the top two values.
    Mul,
    /// Negate the top of the stack.
    Neg,
    /// Bitwise not of the top of the stack.
    Not,
    /// Bitwise or of the top two values.
    Or,
    /// Add the top two values.
    Plus,
    /// Add an unsigned constant to the top of the stack.
    PlusConstant(u64),
    /// Shift the second value left by the top value.
    Shl,
    /// Shift the second value right, logically.
    Shr,
    /// Shift the second value right, arithmetically.
    Shra,
    /// Bitwise exclusive or of the top two values.
    Xor,
    /// Branch by the relative offset if the top of the stack is nonzero.
    Bra(i16),
    /// Equality comparison.
    Eq,
    /// Greater-or-equal comparison.
    Ge,
    /// Greater-than comparison.
    Gt,
    /// Less-or-equal comparison.
    Le,
    /// Less-than comparison.
    Lt,
    /// Inequality comparison.
    Ne,
    /// Unconditional branch by the relative offset.
    Skip(i16),
    /// Push an unsigned constant. Handles the literal opcodes and the
    /// unsigned constant opcodes of every width.
    UnsignedConstant(u64),
    /// Push a signed constant.
    SignedConstant(i64),
    /// The piece or expression result lives in the given register.
    Register(u16),
    /// Push the given register's value plus an offset.
    RegisterOffset {
        /// The register number.
        register: u16,
        /// The offset to add.
        offset: i64,
        /// The DIE offset of the base type, or zero for the generic type.
        base_type: u64,
    },
    /// Push the frame base plus the given offset.
    FrameOffset(i64),
    /// Do nothing.
    Nop,
    /// Push the address of the object being evaluated.
    PushObjectAddress,
    /// Evaluate the `DW_AT_location` of the DIE at the given offset as a
    /// subroutine.
    Call(u64),
    /// Translate the top of the stack into a thread-local storage address.
    Tls,
    /// Push the canonical frame address.
    CallFrameCfa,
    /// Terminate a piece of a composite location.
    Piece {
        /// The size of this piece in bits.
        size_in_bits: u64,
        /// The bit offset of this piece; `None` for `DW_OP_piece`, which
        /// starts at the next byte boundary.
        bit_offset: Option<u64>,
    },
    /// The object has no location; the given bytes are its value.
    ImplicitValue(Vec<u8>),
    /// The object has no location; the top of the stack is its value.
    StackValue,
    /// The object is a pointer whose referent lives at the given DIE plus
    /// a byte offset, even though the pointer itself cannot be
    /// materialized.
    ImplicitPointer {
        /// The `.debug_info` offset of the DIE describing the referent.
        value: u64,
        /// The byte offset into the referent.
        byte_offset: i64,
    },
    /// Evaluate the given expression in the context of the caller.
    EntryValue(Vec<u8>),
    /// Refer to a formal parameter's DIE.
    ParameterRef(u64),
    /// Push a machine address.
    Address(u64),
    /// Push the address at the given index of `.debug_addr`.
    AddressIndex(u64),
    /// Push the constant at the given index of `.debug_addr`.
    ConstantIndex(u64),
    /// Push a typed literal.
    TypedLiteral {
        /// The DIE offset of the base type.
        base_type: u64,
        /// The literal's raw bytes.
        value: Vec<u8>,
    },
    /// Convert the top of the stack to the given base type.
    Convert(u64),
    /// Reinterpret the bits of the top of the stack as the given base type.
    Reinterpret(u64),
    /// The object lives in the given WebAssembly local.
    WasmLocal(u32),
    /// The object lives in the given WebAssembly global.
    WasmGlobal(u32),
    /// The object lives at the given WebAssembly stack slot.
    WasmStack(u32),
}

/// Decode a single operation from the front of `input`.
pub fn parse_operation<Endian>(input: EndianBuf<Endian>,
                               encoding: Encoding)
                               -> Result<(EndianBuf<Endian>, Operation)>
    where Endian: Endianity
{
    let (rest, byte) = parse_u8e(input)?;
    let opcode = constants::DwOp(byte);

    let (rest, operation) = match opcode {
        constants::DW_OP_addr => {
            let (rest, address) = parse_address(rest, encoding.address_size)?;
            (rest, Operation::Address(address))
        }
        constants::DW_OP_deref => {
            (rest,
             Operation::Deref {
                 base_type: 0,
                 size: encoding.address_size,
                 space: false,
             })
        }
        constants::DW_OP_xderef => {
            (rest,
             Operation::Deref {
                 base_type: 0,
                 size: encoding.address_size,
                 space: true,
             })
        }
        constants::DW_OP_const1u => {
            let (rest, value) = parse_u8e(rest)?;
            (rest, Operation::UnsignedConstant(value as u64))
        }
        constants::DW_OP_const1s => {
            let (rest, value) = parse_i8e(rest)?;
            (rest, Operation::SignedConstant(value as i64))
        }
        constants::DW_OP_const2u => {
            let (rest, value) = parse_u16(rest)?;
            (rest, Operation::UnsignedConstant(value as u64))
        }
        constants::DW_OP_const2s => {
            let (rest, value) = parse_u16(rest)?;
            (rest, Operation::SignedConstant(value as i16 as i64))
        }
        constants::DW_OP_const4u => {
            let (rest, value) = parse_u32(rest)?;
            (rest, Operation::UnsignedConstant(value as u64))
        }
        constants::DW_OP_const4s => {
            let (rest, value) = parse_u32(rest)?;
            (rest, Operation::SignedConstant(value as i32 as i64))
        }
        constants::DW_OP_const8u => {
            let (rest, value) = parse_u64(rest)?;
            (rest, Operation::UnsignedConstant(value))
        }
        constants::DW_OP_const8s => {
            let (rest, value) = parse_u64(rest)?;
            (rest, Operation::SignedConstant(value as i64))
        }
        constants::DW_OP_constu => {
            let (rest, value) = parse_unsigned_lebe(rest)?;
            (rest, Operation::UnsignedConstant(value))
        }
        constants::DW_OP_consts => {
            let (rest, value) = parse_signed_lebe(rest)?;
            (rest, Operation::SignedConstant(value))
        }
        constants::DW_OP_dup => (rest, Operation::Pick(0)),
        constants::DW_OP_over => (rest, Operation::Pick(1)),
        constants::DW_OP_pick => {
            let (rest, index) = parse_u8e(rest)?;
            (rest, Operation::Pick(index))
        }
        constants::DW_OP_drop => (rest, Operation::Drop),
        constants::DW_OP_swap => (rest, Operation::Swap),
        constants::DW_OP_rot => (rest, Operation::Rot),
        constants::DW_OP_abs => (rest, Operation::Abs),
        constants::DW_OP_and => (rest, Operation::And),
        constants::DW_OP_div => (rest, Operation::Div),
        constants::DW_OP_minus => (rest, Operation::Minus),
        constants::DW_OP_mod => (rest, Operation::Mod),
        constants::DW_OP_mul => (rest, Operation::Mul),
        constants::DW_OP_neg => (rest, Operation::Neg),
        constants::DW_OP_not => (rest, Operation::Not),
        constants::DW_OP_or => (rest, Operation::Or),
        constants::DW_OP_plus => (rest, Operation::Plus),
        constants::DW_OP_plus_uconst => {
            let (rest, value) = parse_unsigned_lebe(rest)?;
            (rest, Operation::PlusConstant(value))
        }
        constants::DW_OP_shl => (rest, Operation::Shl),
        constants::DW_OP_shr => (rest, Operation::Shr),
        constants::DW_OP_shra => (rest, Operation::Shra),
        constants::DW_OP_xor => (rest, Operation::Xor),
        constants::DW_OP_bra => {
            let (rest, target) = parse_u16(rest)?;
            (rest, Operation::Bra(target as i16))
        }
        constants::DW_OP_skip => {
            let (rest, target) = parse_u16(rest)?;
            (rest, Operation::Skip(target as i16))
        }
        constants::DW_OP_eq => (rest, Operation::Eq),
        constants::DW_OP_ge => (rest, Operation::Ge),
        constants::DW_OP_gt => (rest, Operation::Gt),
        constants::DW_OP_le => (rest, Operation::Le),
        constants::DW_OP_lt => (rest, Operation::Lt),
        constants::DW_OP_ne => (rest, Operation::Ne),
        constants::DW_OP_regx => {
            let (rest, register) = parse_unsigned_lebe(rest)?;
            (rest, Operation::Register(register as u16))
        }
        constants::DW_OP_fbreg => {
            let (rest, offset) = parse_signed_lebe(rest)?;
            (rest, Operation::FrameOffset(offset))
        }
        constants::DW_OP_bregx => {
            let (rest, register) = parse_unsigned_lebe(rest)?;
            let (rest, offset) = parse_signed_lebe(rest)?;
            (rest,
             Operation::RegisterOffset {
                 register: register as u16,
                 offset: offset,
                 base_type: 0,
             })
        }
        constants::DW_OP_piece => {
            let (rest, size) = parse_unsigned_lebe(rest)?;
            (rest,
             Operation::Piece {
                 size_in_bits: size * 8,
                 bit_offset: None,
             })
        }
        constants::DW_OP_bit_piece => {
            let (rest, size) = parse_unsigned_lebe(rest)?;
            let (rest, offset) = parse_unsigned_lebe(rest)?;
            (rest,
             Operation::Piece {
                 size_in_bits: size,
                 bit_offset: Some(offset),
             })
        }
        constants::DW_OP_deref_size => {
            let (rest, size) = parse_u8e(rest)?;
            (rest,
             Operation::Deref {
                 base_type: 0,
                 size: size,
                 space: false,
             })
        }
        constants::DW_OP_xderef_size => {
            let (rest, size) = parse_u8e(rest)?;
            (rest,
             Operation::Deref {
                 base_type: 0,
                 size: size,
                 space: true,
             })
        }
        constants::DW_OP_nop => (rest, Operation::Nop),
        constants::DW_OP_push_object_address => (rest, Operation::PushObjectAddress),
        constants::DW_OP_call2 => {
            let (rest, offset) = parse_u16(rest)?;
            (rest, Operation::Call(offset as u64))
        }
        constants::DW_OP_call4 => {
            let (rest, offset) = parse_u32(rest)?;
            (rest, Operation::Call(offset as u64))
        }
        constants::DW_OP_call_ref => {
            let (rest, offset) = parse_address(rest, encoding.address_size)?;
            (rest, Operation::Call(offset))
        }
        constants::DW_OP_form_tls_address => (rest, Operation::Tls),
        constants::DW_OP_call_frame_cfa => (rest, Operation::CallFrameCfa),
        constants::DW_OP_implicit_value => {
            let (rest, data) = parse_length_block(rest)?;
            (rest, Operation::ImplicitValue(data))
        }
        constants::DW_OP_stack_value => (rest, Operation::StackValue),
        constants::DW_OP_implicit_pointer |
        constants::DW_OP_GNU_implicit_pointer => {
            // DWARF 2 has no section offsets wider than an address; later
            // versions use the format's offset width.
            let (rest, value) = if encoding.version == 2 {
                parse_address(rest, encoding.address_size)?
            } else {
                parse_word(rest, encoding.format)?
            };
            let (rest, byte_offset) = parse_signed_lebe(rest)?;
            (rest,
             Operation::ImplicitPointer {
                 value: value,
                 byte_offset: byte_offset,
             })
        }
        constants::DW_OP_addrx |
        constants::DW_OP_GNU_addr_index => {
            let (rest, index) = parse_unsigned_lebe(rest)?;
            (rest, Operation::AddressIndex(index))
        }
        constants::DW_OP_constx |
        constants::DW_OP_GNU_const_index => {
            let (rest, index) = parse_unsigned_lebe(rest)?;
            (rest, Operation::ConstantIndex(index))
        }
        constants::DW_OP_entry_value |
        constants::DW_OP_GNU_entry_value => {
            let (rest, expression) = parse_length_block(rest)?;
            (rest, Operation::EntryValue(expression))
        }
        constants::DW_OP_const_type |
        constants::DW_OP_GNU_const_type => {
            let (rest, base_type) = parse_unsigned_lebe(rest)?;
            let (rest, length) = parse_u8e(rest)?;
            let (rest, value) = take(length as usize, rest)?;
            (rest,
             Operation::TypedLiteral {
                 base_type: base_type,
                 value: value.buf().to_vec(),
             })
        }
        constants::DW_OP_regval_type |
        constants::DW_OP_GNU_regval_type => {
            let (rest, register) = parse_unsigned_lebe(rest)?;
            let (rest, base_type) = parse_unsigned_lebe(rest)?;
            (rest,
             Operation::RegisterOffset {
                 register: register as u16,
                 offset: 0,
                 base_type: base_type,
             })
        }
        constants::DW_OP_deref_type |
        constants::DW_OP_GNU_deref_type => {
            let (rest, size) = parse_u8e(rest)?;
            let (rest, base_type) = parse_unsigned_lebe(rest)?;
            (rest,
             Operation::Deref {
                 base_type: base_type,
                 size: size,
                 space: false,
             })
        }
        constants::DW_OP_xderef_type => {
            let (rest, size) = parse_u8e(rest)?;
            let (rest, base_type) = parse_unsigned_lebe(rest)?;
            (rest,
             Operation::Deref {
                 base_type: base_type,
                 size: size,
                 space: true,
             })
        }
        constants::DW_OP_convert |
        constants::DW_OP_GNU_convert => {
            let (rest, base_type) = parse_unsigned_lebe(rest)?;
            (rest, Operation::Convert(base_type))
        }
        constants::DW_OP_reinterpret |
        constants::DW_OP_GNU_reinterpret => {
            let (rest, base_type) = parse_unsigned_lebe(rest)?;
            (rest, Operation::Reinterpret(base_type))
        }
        constants::DW_OP_GNU_parameter_ref => {
            let (rest, offset) = parse_u32(rest)?;
            (rest, Operation::ParameterRef(offset as u64))
        }
        constants::DW_OP_WASM_location => {
            let (rest, kind) = parse_u8e(rest)?;
            match kind {
                0 => {
                    let (rest, index) = parse_unsigned_lebe(rest)?;
                    (rest, Operation::WasmLocal(index as u32))
                }
                1 => {
                    let (rest, index) = parse_unsigned_lebe(rest)?;
                    (rest, Operation::WasmGlobal(index as u32))
                }
                2 => {
                    let (rest, index) = parse_unsigned_lebe(rest)?;
                    (rest, Operation::WasmStack(index as u32))
                }
                3 => {
                    let (rest, index) = parse_u32(rest)?;
                    (rest, Operation::WasmGlobal(index))
                }
                _ => return Err(Error::UnknownOpcode(opcode)),
            }
        }
        _ if opcode >= constants::DW_OP_lit0 && opcode <= constants::DW_OP_lit31 => {
            (rest, Operation::UnsignedConstant((byte - constants::DW_OP_lit0.0) as u64))
        }
        _ if opcode >= constants::DW_OP_reg0 && opcode <= constants::DW_OP_reg31 => {
            (rest, Operation::Register((byte - constants::DW_OP_reg0.0) as u16))
        }
        _ if opcode >= constants::DW_OP_breg0 && opcode <= constants::DW_OP_breg31 => {
            let (rest, offset) = parse_signed_lebe(rest)?;
            (rest,
             Operation::RegisterOffset {
                 register: (byte - constants::DW_OP_breg0.0) as u16,
                 offset: offset,
                 base_type: 0,
             })
        }
        _ if opcode >= constants::DW_OP_lo_user && opcode <= constants::DW_OP_hi_user => {
            // A vendor opcode we know nothing about: its operand layout is
            // vendor-defined, so it cannot even be skipped.
            return Err(Error::UnsupportedOpcode(opcode));
        }
        _ => return Err(Error::UnknownOpcode(opcode)),
    };

    Ok((rest, operation))
}

fn parse_length_block<Endian>(input: EndianBuf<Endian>) -> Result<(EndianBuf<Endian>, Vec<u8>)>
    where Endian: Endianity
{
    let (rest, length) = parse_unsigned_lebe(input)?;
    let (rest, block) = take(length as usize, rest)?;
    Ok((rest, block.buf().to_vec()))
}

#[cfg(test)]
mod tests {
    extern crate test_assembler;

    use self::test_assembler::{Endian, Section};
    use super::*;
    use constants;
    use endianity::{EndianBuf, LittleEndian};
    use parser::{Encoding, Error, Format};
    use test_util::SectionMethods;

    fn encoding(version: u16) -> Encoding {
        Encoding {
            format: Format::Dwarf32,
            version: version,
            address_size: 4,
        }
    }

    fn parse_one(buf: &[u8], version: u16) -> Result<(usize, Operation)> {
        parse_operation(EndianBuf::<LittleEndian>::new(buf), encoding(version))
            .map(|(rest, op)| (rest.len(), op))
    }

    #[test]
    fn test_parse_operation_literals_and_constants() {
        assert_eq!(parse_one(&[0x35], 4).unwrap(),
                   (0, Operation::UnsignedConstant(5)));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_const2s.0)
            .L16(0xfffe);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(), (0, Operation::SignedConstant(-2)));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_constu.0)
            .uleb(624485);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(),
                   (0, Operation::UnsignedConstant(624485)));
    }

    #[test]
    fn test_parse_operation_registers() {
        assert_eq!(parse_one(&[0x55], 4).unwrap(), (0, Operation::Register(5)));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_regx.0)
            .uleb(42);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(), (0, Operation::Register(42)));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_breg5.0)
            .sleb(-16);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(),
                   (0,
                    Operation::RegisterOffset {
                        register: 5,
                        offset: -16,
                        base_type: 0,
                    }));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_fbreg.0)
            .sleb(-8);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(), (0, Operation::FrameOffset(-8)));
    }

    #[test]
    fn test_parse_operation_branches_carry_targets() {
        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_bra.0)
            .L16(0xfffc);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(), (0, Operation::Bra(-4)));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_skip.0)
            .L16(8);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(), (0, Operation::Skip(8)));
    }

    #[test]
    fn test_parse_operation_derefs() {
        assert_eq!(parse_one(&[constants::DW_OP_deref.0], 4).unwrap(),
                   (0,
                    Operation::Deref {
                        base_type: 0,
                        size: 4,
                        space: false,
                    }));
        assert_eq!(parse_one(&[constants::DW_OP_xderef.0], 4).unwrap(),
                   (0,
                    Operation::Deref {
                        base_type: 0,
                        size: 4,
                        space: true,
                    }));
        assert_eq!(parse_one(&[constants::DW_OP_deref_size.0, 2], 4).unwrap(),
                   (0,
                    Operation::Deref {
                        base_type: 0,
                        size: 2,
                        space: false,
                    }));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_deref_type.0)
            .D8(8)
            .uleb(0x30);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 5).unwrap(),
                   (0,
                    Operation::Deref {
                        base_type: 0x30,
                        size: 8,
                        space: false,
                    }));
    }

    #[test]
    fn test_parse_operation_pieces() {
        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_piece.0)
            .uleb(4);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(),
                   (0,
                    Operation::Piece {
                        size_in_bits: 32,
                        bit_offset: None,
                    }));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_bit_piece.0)
            .uleb(7)
            .uleb(3);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(),
                   (0,
                    Operation::Piece {
                        size_in_bits: 7,
                        bit_offset: Some(3),
                    }));
    }

    #[test]
    fn test_parse_operation_blocks() {
        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_implicit_value.0)
            .uleb(3)
            .append_bytes(&[1, 2, 3]);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(),
                   (0, Operation::ImplicitValue(vec![1, 2, 3])));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_GNU_entry_value.0)
            .uleb(2)
            .append_bytes(&[0x55, 0x9f]);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(),
                   (0, Operation::EntryValue(vec![0x55, 0x9f])));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_const_type.0)
            .uleb(0x40)
            .D8(4)
            .L32(0xdeadbeef);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 5).unwrap(),
                   (0,
                    Operation::TypedLiteral {
                        base_type: 0x40,
                        value: vec![0xef, 0xbe, 0xad, 0xde],
                    }));
    }

    #[test]
    fn test_parse_operation_typed() {
        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_regval_type.0)
            .uleb(3)
            .uleb(0x30);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 5).unwrap(),
                   (0,
                    Operation::RegisterOffset {
                        register: 3,
                        offset: 0,
                        base_type: 0x30,
                    }));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_GNU_convert.0)
            .uleb(0x48);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(), (0, Operation::Convert(0x48)));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_reinterpret.0)
            .uleb(0x50);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 5).unwrap(), (0, Operation::Reinterpret(0x50)));
    }

    #[test]
    fn test_parse_operation_implicit_pointer_widths() {
        // Version 2: the reference is address-sized.
        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_implicit_pointer.0)
            .L32(0x1234)
            .sleb(-2);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 2).unwrap(),
                   (0,
                    Operation::ImplicitPointer {
                        value: 0x1234,
                        byte_offset: -2,
                    }));

        // Later versions: the reference is a format-width offset.
        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_GNU_implicit_pointer.0)
            .L32(0x5678)
            .sleb(4);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(),
                   (0,
                    Operation::ImplicitPointer {
                        value: 0x5678,
                        byte_offset: 4,
                    }));
    }

    #[test]
    fn test_parse_operation_wasm() {
        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_WASM_location.0)
            .D8(0)
            .uleb(7);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(), (0, Operation::WasmLocal(7)));

        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_WASM_location.0)
            .D8(3)
            .L32(0x1000);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(), (0, Operation::WasmGlobal(0x1000)));

        let buf = [constants::DW_OP_WASM_location.0, 9];
        match parse_one(&buf, 4) {
            Err(Error::UnknownOpcode(op)) => {
                assert_eq!(op, constants::DW_OP_WASM_location)
            }
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_operation_parameter_ref() {
        let section = Section::with_endian(Endian::Little)
            .D8(constants::DW_OP_GNU_parameter_ref.0)
            .L32(0x0801);
        let buf = section.get_contents().unwrap();
        assert_eq!(parse_one(&buf, 4).unwrap(), (0, Operation::ParameterRef(0x0801)));
    }

    #[test]
    fn test_parse_operation_vendor_range_unsupported() {
        match parse_one(&[0xe0], 4) {
            Err(Error::UnsupportedOpcode(op)) => {
                assert_eq!(op, constants::DW_OP_GNU_push_tls_address)
            }
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_operation_unknown_opcode() {
        match parse_one(&[0x01], 4) {
            Err(Error::UnknownOpcode(op)) => assert_eq!(op, constants::DwOp(0x01)),
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_operation_truncated() {
        match parse_one(&[constants::DW_OP_const4u.0, 1, 2], 4) {
            Err(Error::UnexpectedEof) => assert!(true),
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_operation_stack_and_frame() {
        assert_eq!(parse_one(&[constants::DW_OP_call_frame_cfa.0], 4).unwrap(),
                   (0, Operation::CallFrameCfa));
        assert_eq!(parse_one(&[constants::DW_OP_form_tls_address.0], 4).unwrap(),
                   (0, Operation::Tls));
        assert_eq!(parse_one(&[constants::DW_OP_stack_value.0], 4).unwrap(),
                   (0, Operation::StackValue));
        assert_eq!(parse_one(&[constants::DW_OP_dup.0], 4).unwrap(),
                   (0, Operation::Pick(0)));
        assert_eq!(parse_one(&[constants::DW_OP_over.0], 4).unwrap(),
                   (0, Operation::Pick(1)));
        assert_eq!(parse_one(&[constants::DW_OP_pick.0, 5], 4).unwrap(),
                   (0, Operation::Pick(5)));
    }
}

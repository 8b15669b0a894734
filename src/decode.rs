//! Instruction decoding.
//!
//! Converts a raw 64-bit instruction word (and, for `LDDW`, the word
//! that follows it) into a decoded [`Instruction`]. Every unrecognized
//! `(class, op)` or `(class, mode, size)` combination faults with
//! [`Fault::InvalidInstruction`], carrying the raw word and the IP it
//! was fetched from; a `dst`/`src` field naming register 11 or higher
//! faults with [`Fault::InvalidRegister`] instead.

use crate::error::Fault;
use crate::instruction::{
    self, check_register, AluOp, Class, EndWidth, Instruction, JmpOp, Mode, Size, Source,
};

/// Result of decoding a single instruction word.
pub enum Decoded {
    /// A fully decoded instruction.
    Complete(Instruction),
    /// An `LDDW` header: the caller must fetch the next program word,
    /// validate it with [`finish_lddw`], and combine the two halves.
    NeedsImm64Tail { dst: u8, low: u32 },
}

fn invalid(word: u64, ip: u32) -> Fault {
    Fault::InvalidInstruction { word, ip }
}

/// Decode the instruction word fetched from `ip`.
pub fn decode(word: u64, ip: u32) -> Result<Decoded, Fault> {
    let f = instruction::split(word);
    let class = instruction::class(f.opcode);

    match class {
        Class::Alu32 | Class::Alu64 => decode_alu(word, ip, class == Class::Alu64, &f),
        Class::Jmp => decode_jmp(word, ip, &f),
        Class::Ld => decode_ld(word, ip, &f),
        Class::Ldx => decode_ldx(word, ip, &f),
        Class::St => decode_st(word, ip, &f),
        Class::Stx => decode_stx(word, ip, &f),
        Class::Reserved => Err(invalid(word, ip)),
    }
}

/// Validate and fold in the second word of an `LDDW` pair.
///
/// The second word's opcode byte, dst, src and offset must all be zero;
/// only its immediate contributes (the high 32 bits of the result).
pub fn finish_lddw(dst: u8, low: u32, tail_word: u64, tail_ip: u32) -> Result<Instruction, Fault> {
    let tail = instruction::split(tail_word);
    if tail.opcode != 0 || tail.dst != 0 || tail.src != 0 || tail.offset != 0 {
        return Err(invalid(tail_word, tail_ip));
    }
    let high = tail.imm as u32;
    let imm = (low as u64) | ((high as u64) << 32);
    Ok(Instruction::LoadImm64 { dst, imm })
}

fn decode_alu(
    word: u64,
    ip: u32,
    is64: bool,
    f: &instruction::RawFields,
) -> Result<Decoded, Fault> {
    let op_bits = instruction::op_nibble(f.opcode);
    let op = AluOp::from_nibble(op_bits).ok_or_else(|| invalid(word, ip))?;
    let dst = check_register(f.dst)?;

    if op == AluOp::Endc {
        let to_be = instruction::source_bit(f.opcode);
        let width = EndWidth::from_imm(f.imm).ok_or_else(|| invalid(word, ip))?;
        return Ok(Decoded::Complete(Instruction::Endian { to_be, width, dst }));
    }

    let src = if op == AluOp::Neg {
        // NEG takes no operand at all and is only valid encoded with
        // the source bit clear; the register form is unassigned.
        if instruction::source_bit(f.opcode) {
            return Err(invalid(word, ip));
        }
        Source::Imm(0)
    } else if instruction::source_bit(f.opcode) {
        Source::Reg(check_register(f.src)?)
    } else {
        Source::Imm(f.imm)
    };

    Ok(Decoded::Complete(Instruction::Alu {
        is64,
        op,
        dst,
        src,
    }))
}

fn decode_jmp(word: u64, ip: u32, f: &instruction::RawFields) -> Result<Decoded, Fault> {
    let op_bits = instruction::op_nibble(f.opcode);
    let op = JmpOp::from_nibble(op_bits).ok_or_else(|| invalid(word, ip))?;

    match op {
        JmpOp::Exit => {
            if instruction::source_bit(f.opcode) {
                return Err(invalid(word, ip));
            }
            Ok(Decoded::Complete(Instruction::Exit))
        }
        JmpOp::Call => {
            if instruction::source_bit(f.opcode) {
                return Err(invalid(word, ip));
            }
            Ok(Decoded::Complete(Instruction::Call { imm: f.imm as u32 }))
        }
        JmpOp::Ja => {
            if instruction::source_bit(f.opcode) {
                return Err(invalid(word, ip));
            }
            Ok(Decoded::Complete(Instruction::Jump {
                is64: true,
                op,
                dst: 0,
                src: Source::Imm(0),
                offset: f.offset,
            }))
        }
        _ => {
            let dst = check_register(f.dst)?;
            let src = if instruction::source_bit(f.opcode) {
                Source::Reg(check_register(f.src)?)
            } else {
                Source::Imm(f.imm)
            };
            Ok(Decoded::Complete(Instruction::Jump {
                is64: true,
                op,
                dst,
                src,
                offset: f.offset,
            }))
        }
    }
}

fn decode_ld(word: u64, ip: u32, f: &instruction::RawFields) -> Result<Decoded, Fault> {
    let mode = Mode::from_bits(instruction::mode_bits(f.opcode)).ok_or_else(|| invalid(word, ip))?;
    let size = Size::from_bits(instruction::size_bits(f.opcode)).ok_or_else(|| invalid(word, ip))?;

    match (mode, size) {
        (Mode::Imm, Size::Dw) => {
            let dst = check_register(f.dst)?;
            Ok(Decoded::NeedsImm64Tail {
                dst,
                low: f.imm as u32,
            })
        }
        (Mode::Abs, _) => Ok(Decoded::Complete(Instruction::LoadAbs { size, imm: f.imm })),
        _ => Err(invalid(word, ip)),
    }
}

fn decode_ldx(word: u64, ip: u32, f: &instruction::RawFields) -> Result<Decoded, Fault> {
    let mode = Mode::from_bits(instruction::mode_bits(f.opcode)).ok_or_else(|| invalid(word, ip))?;
    let size = Size::from_bits(instruction::size_bits(f.opcode)).ok_or_else(|| invalid(word, ip))?;
    if mode != Mode::Mem {
        return Err(invalid(word, ip));
    }
    let dst = check_register(f.dst)?;
    let src = check_register(f.src)?;
    Ok(Decoded::Complete(Instruction::Load {
        size,
        dst,
        src,
        offset: f.offset,
    }))
}

fn decode_st(word: u64, ip: u32, f: &instruction::RawFields) -> Result<Decoded, Fault> {
    let mode = Mode::from_bits(instruction::mode_bits(f.opcode)).ok_or_else(|| invalid(word, ip))?;
    let size = Size::from_bits(instruction::size_bits(f.opcode)).ok_or_else(|| invalid(word, ip))?;
    if mode != Mode::Mem {
        return Err(invalid(word, ip));
    }
    let dst = check_register(f.dst)?;
    Ok(Decoded::Complete(Instruction::StoreImm {
        size,
        dst,
        offset: f.offset,
        imm: f.imm,
    }))
}

fn decode_stx(word: u64, ip: u32, f: &instruction::RawFields) -> Result<Decoded, Fault> {
    let mode = Mode::from_bits(instruction::mode_bits(f.opcode)).ok_or_else(|| invalid(word, ip))?;
    let size = Size::from_bits(instruction::size_bits(f.opcode)).ok_or_else(|| invalid(word, ip))?;
    if mode != Mode::Mem {
        return Err(invalid(word, ip));
    }
    let dst = check_register(f.dst)?;
    let src = check_register(f.src)?;
    Ok(Decoded::Complete(Instruction::StoreReg {
        size,
        dst,
        offset: f.offset,
        src,
    }))
}

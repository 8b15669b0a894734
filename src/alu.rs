//! Arithmetic/logic unit: ADD, SUB, MUL, DIV, OR, AND, LSH, RSH, NEG,
//! MOD, XOR, MOV, ARSH, and the ENDC endianness conversion.
//!
//! ALU32 computes in 32-bit unsigned modular arithmetic and the result
//! is always zero-extended into the destination's 64-bit slot; ALU64
//! computes modulo 2⁶⁴. Every function here takes `is64` and returns
//! the already width-masked 64-bit value to write back to `dst`.

use crate::error::Fault;
use crate::instruction::{AluOp, EndWidth};

fn truncate(is64: bool, value: u64) -> u64 {
    if is64 {
        value
    } else {
        value as u32 as u64
    }
}

/// Apply `op` to `dst` and `operand` (already selected from the
/// register or the immediate by the caller) under the given width.
///
/// On `DivideByZero`, no value is returned: the caller (see
/// [`crate::vm`]) is responsible for writing the all-ones residue to
/// `dst` before propagating the fault.
///
/// Must not be called with `op == AluOp::Endc`; endianness conversion
/// is single-operand and handled by [`endian_convert`] instead.
pub fn compute(is64: bool, op: AluOp, dst: u64, operand: u64) -> Result<u64, Fault> {
    let d = truncate(is64, dst);
    let o = truncate(is64, operand);
    match op {
        AluOp::Add => Ok(truncate(is64, d.wrapping_add(o))),
        AluOp::Sub => Ok(truncate(is64, d.wrapping_sub(o))),
        AluOp::Mul => Ok(truncate(is64, d.wrapping_mul(o))),
        AluOp::Div => {
            if o == 0 {
                Err(Fault::DivideByZero)
            } else {
                Ok(truncate(is64, d / o))
            }
        }
        AluOp::Mod => {
            if o == 0 {
                Err(Fault::DivideByZero)
            } else {
                Ok(truncate(is64, d % o))
            }
        }
        AluOp::Or => Ok(truncate(is64, d | o)),
        AluOp::And => Ok(truncate(is64, d & o)),
        AluOp::Xor => Ok(truncate(is64, d ^ o)),
        AluOp::Lsh => Ok(shift_left(is64, d, o)),
        AluOp::Rsh => Ok(shift_right_logical(is64, d, o)),
        AluOp::Arsh => Ok(shift_right_arithmetic(is64, d, o)),
        AluOp::Neg => Ok(truncate(is64, 0u64.wrapping_sub(d))),
        AluOp::Mov => Ok(o),
        AluOp::Endc => unreachable!("ENDC is decoded into Instruction::Endian, not Instruction::Alu"),
    }
}

fn shift_left(is64: bool, value: u64, amount: u64) -> u64 {
    if is64 {
        value.wrapping_shl(amount as u32)
    } else {
        (value as u32).wrapping_shl(amount as u32) as u64
    }
}

fn shift_right_logical(is64: bool, value: u64, amount: u64) -> u64 {
    if is64 {
        value.wrapping_shr(amount as u32)
    } else {
        (value as u32).wrapping_shr(amount as u32) as u64
    }
}

/// Arithmetic (sign-preserving) right shift. For ALU32, `value` is
/// sign-extended from bit 31 before shifting; for ALU64, from bit 63.
fn shift_right_arithmetic(is64: bool, value: u64, amount: u64) -> u64 {
    if is64 {
        ((value as i64).wrapping_shr(amount as u32)) as u64
    } else {
        let narrow = value as u32 as i32;
        (narrow.wrapping_shr(amount as u32)) as u32 as u64
    }
}

/// Convert `value` to/from big-endian at `width`, as selected by
/// `ENDC`'s `source_bit` (`to_be`). The immediate's width selects how
/// many low bytes participate; bits above that width are always
/// cleared in the result.
pub fn endian_convert(to_be: bool, width: EndWidth, value: u64) -> u64 {
    let masked = match width {
        EndWidth::Bits16 => value & 0xffff,
        EndWidth::Bits32 => value & 0xffff_ffff,
        EndWidth::Bits64 => value,
    };
    if !to_be {
        return masked;
    }
    match width {
        EndWidth::Bits16 => (masked as u16).swap_bytes() as u64,
        EndWidth::Bits32 => (masked as u32).swap_bytes() as u64,
        EndWidth::Bits64 => masked.swap_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add32_truncates_and_zero_extends() {
        let result = compute(false, AluOp::Add, 0xffff_ffff, 1).unwrap();
        assert_eq!(result, 0);
    }

    #[test]
    fn add64_wraps_at_64_bits() {
        let result = compute(true, AluOp::Add, u64::MAX, 1).unwrap();
        assert_eq!(result, 0);
    }

    #[test]
    fn div_by_zero_faults() {
        let err = compute(true, AluOp::Div, 10, 0).unwrap_err();
        assert_eq!(err, Fault::DivideByZero);
        let err = compute(false, AluOp::Mod, 10, 0).unwrap_err();
        assert_eq!(err, Fault::DivideByZero);
    }

    #[test]
    fn div32_only_considers_low_32_bits_of_operand() {
        // operand's low 32 bits are zero even though the full value isn't
        let err = compute(false, AluOp::Div, 10, 0x1_0000_0000).unwrap_err();
        assert_eq!(err, Fault::DivideByZero);
    }

    #[test]
    fn arsh64_sign_extends_from_bit_63() {
        let result = compute(true, AluOp::Arsh, 0x8000_0000_0000_0000, 4).unwrap();
        assert_eq!(result, 0xf800_0000_0000_0000);
    }

    #[test]
    fn arsh32_sign_extends_from_bit_31() {
        let result = compute(false, AluOp::Arsh, 0x8000_0000, 4).unwrap();
        assert_eq!(result, 0xf800_0000);
    }

    #[test]
    fn neg_is_twos_complement_under_the_modulus() {
        assert_eq!(compute(true, AluOp::Neg, 1, 0).unwrap(), u64::MAX);
        assert_eq!(compute(false, AluOp::Neg, 1, 0).unwrap(), 0xffff_ffff);
    }

    #[test]
    fn mov_zero_extends_in_32_bit_mode() {
        let result = compute(false, AluOp::Mov, 0xffff_ffff_ffff_ffff, 0xffff_ffff).unwrap();
        assert_eq!(result, 0x0000_0000_ffff_ffff);
    }

    #[test]
    fn shift_amounts_wrap_at_the_operand_width() {
        // shifting a 32-bit value left by 32 wraps to a shift of 0
        let result = compute(false, AluOp::Lsh, 1, 32).unwrap();
        assert_eq!(result, 1);
    }

    #[test]
    fn endc_to_be16_round_trips_and_clears_high_bits() {
        let value = 0x1234_5678_9abc_0201u64;
        let once = endian_convert(true, EndWidth::Bits16, value);
        assert_eq!(once, 0x0102);
        let twice = endian_convert(true, EndWidth::Bits16, once);
        assert_eq!(twice, 0x0201);
    }

    #[test]
    fn endc_to_le_is_a_mask_only() {
        let value = 0xffff_ffff_ffff_ffffu64;
        assert_eq!(endian_convert(false, EndWidth::Bits32, value), 0xffff_ffff);
    }
}

//! Reference interpreter: executes one decoded instruction against
//! [`CpuState`].
//!
//! This is both the fallback target for instructions the translator does not
//! handle and the oracle the translator's output is tested against, so the
//! semantics here are written for clarity over speed. Instructions outside
//! its coverage return [`InterpError::Unimplemented`].

use ripple_ppc::{classify, Instruction, OpClass};
use ripple_types::{CrField, Fpr};
use thiserror::Error;

use crate::softfloat::{force_single, round_to_25_bits, single_to_double};
use crate::state::{CpuState, CR_EQ, CR_GT, CR_LT, CR_SO};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InterpError {
    #[error("unimplemented instruction {0:#010X}")]
    Unimplemented(u32),
}

/// Execute a single instruction, updating `state`.
pub fn execute(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    match classify(inst) {
        OpClass::AddImm => add_imm(state, inst),
        OpClass::LogicImm => logic_imm(state, inst),
        OpClass::AddImmCarry => add_imm_carry(state, inst),
        OpClass::SubfImmCarry => subf_imm_carry(state, inst),
        OpClass::MulImm => mul_imm(state, inst),
        OpClass::CmpImm => cmp_imm(state, inst),
        OpClass::Cmp => cmp(state, inst),
        OpClass::Add => add(state, inst),
        OpClass::AddExtended => add_extended(state, inst),
        OpClass::Subf => subf(state, inst),
        OpClass::SubfCarry => subf_carry(state, inst),
        OpClass::SubfExtended => subf_extended(state, inst),
        OpClass::Neg => neg(state, inst),
        OpClass::MulLow => mul_low(state, inst),
        OpClass::MulHigh => mul_high(state, inst),
        OpClass::DivSigned => div_signed(state, inst),
        OpClass::DivUnsigned => div_unsigned(state, inst),
        OpClass::Bool => boolean(state, inst),
        OpClass::ExtendSign => extend_sign(state, inst),
        OpClass::CountLeadingZeros => count_leading_zeros(state, inst),
        OpClass::ShiftLogical => shift_logical(state, inst),
        OpClass::ShiftRightAlgebraic => shift_right_algebraic(state, inst),
        OpClass::ShiftRightAlgebraicImm => shift_right_algebraic_imm(state, inst),
        OpClass::RotateImm => rotate_imm(state, inst),
        OpClass::RotateReg => rotate_reg(state, inst),
        OpClass::RotateInsert => rotate_insert(state, inst),
        OpClass::FpArith => fp_arith(state, inst),
        OpClass::FpMove => fp_move(state, inst),
        OpClass::FpSelect => fp_select(state, inst),
        OpClass::FpRound => fp_round(state, inst),
        OpClass::FpConvertToInt => fp_convert_to_int(state, inst),
        OpClass::FpCompare => fp_compare(state, inst),
        OpClass::Fallback => fallback(state, inst),
    }
}

fn update_cr0(state: &mut CpuState, value: u32) {
    state.set_cr_internal(CrField::new(0), value as i32 as i64 as u64);
}

/// 32-bit add with carry-in; returns the result and the carry-out.
fn carrying_add(a: u32, b: u32, carry: bool) -> (u32, bool) {
    let sum = u64::from(a) + u64::from(b) + u64::from(carry);
    (sum as u32, sum >> 32 != 0)
}

fn add_imm(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let shift = if inst.opcd() == 15 { 16 } else { 0 };
    let imm = (inst.simm() << shift) as u32;
    let base = if inst.ra_raw() == 0 {
        0
    } else {
        state.gpr[inst.ra().index()]
    };
    state.gpr[inst.rd().index()] = base.wrapping_add(imm);
    Ok(())
}

fn logic_imm(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let s = state.gpr[inst.rs().index()];
    let imm = inst.uimm();
    let (value, record) = match inst.opcd() {
        24 => (s | imm, false),
        25 => (s | (imm << 16), false),
        26 => (s ^ imm, false),
        27 => (s ^ (imm << 16), false),
        28 => (s & imm, true),
        29 => (s & (imm << 16), true),
        _ => unreachable!(),
    };
    state.gpr[inst.ra().index()] = value;
    if record {
        update_cr0(state, value);
    }
    Ok(())
}

fn add_imm_carry(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let (value, ca) = carrying_add(a, inst.simm() as u32, false);
    state.gpr[inst.rd().index()] = value;
    state.xer_ca = ca;
    if inst.opcd() == 13 {
        update_cr0(state, value);
    }
    Ok(())
}

fn subf_imm_carry(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let (value, ca) = carrying_add(!a, inst.simm() as u32, true);
    state.gpr[inst.rd().index()] = value;
    state.xer_ca = ca;
    Ok(())
}

fn mul_imm(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    state.gpr[inst.rd().index()] = a.wrapping_mul(inst.simm() as u32);
    Ok(())
}

fn set_cr_signed_diff(state: &mut CpuState, field: CrField, a: u32, b: u32) {
    let diff = (a as i32 as i64).wrapping_sub(b as i32 as i64) as u64;
    state.set_cr_internal(field, diff);
}

fn set_cr_unsigned_diff(state: &mut CpuState, field: CrField, a: u32, b: u32) {
    let diff = u64::from(a).wrapping_sub(u64::from(b));
    state.set_cr_internal(field, diff);
}

fn cmp_imm(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    if inst.opcd() == 11 {
        set_cr_signed_diff(state, inst.crfd(), a, inst.simm() as u32);
    } else {
        set_cr_unsigned_diff(state, inst.crfd(), a, inst.uimm());
    }
    Ok(())
}

fn cmp(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let b = state.gpr[inst.rb().index()];
    if inst.subop10() == 0 {
        set_cr_signed_diff(state, inst.crfd(), a, b);
    } else {
        set_cr_unsigned_diff(state, inst.crfd(), a, b);
    }
    Ok(())
}

fn add(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let b = state.gpr[inst.rb().index()];
    let (value, ca) = carrying_add(a, b, false);
    state.gpr[inst.rd().index()] = value;
    if inst.subop10() & 0x1FF == 10 {
        state.xer_ca = ca;
    }
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn add_extended(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let b = if inst.subop10() & 0x1FF == 138 {
        state.gpr[inst.rb().index()]
    } else {
        0 // addze
    };
    let (value, ca) = carrying_add(a, b, state.xer_ca);
    state.gpr[inst.rd().index()] = value;
    state.xer_ca = ca;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn subf(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let b = state.gpr[inst.rb().index()];
    let value = b.wrapping_sub(a);
    state.gpr[inst.rd().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn subf_carry(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let b = state.gpr[inst.rb().index()];
    let (value, ca) = carrying_add(!a, b, true);
    state.gpr[inst.rd().index()] = value;
    state.xer_ca = ca;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn subf_extended(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let b = if inst.subop10() & 0x1FF == 136 {
        state.gpr[inst.rb().index()]
    } else {
        0 // subfze
    };
    let (value, ca) = carrying_add(!a, b, state.xer_ca);
    state.gpr[inst.rd().index()] = value;
    state.xer_ca = ca;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn neg(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let value = 0u32.wrapping_sub(a);
    state.gpr[inst.rd().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn mul_low(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let b = state.gpr[inst.rb().index()];
    let value = a.wrapping_mul(b);
    state.gpr[inst.rd().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn mul_high(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let b = state.gpr[inst.rb().index()];
    let value = if inst.subop10() & 0x1FF == 75 {
        ((a as i32 as i64).wrapping_mul(b as i32 as i64) >> 32) as u32
    } else {
        ((u64::from(a) * u64::from(b)) >> 32) as u32
    };
    state.gpr[inst.rd().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn div_signed(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()] as i32;
    let b = state.gpr[inst.rb().index()] as i32;
    let value = if b == 0 || (a as u32 == 0x8000_0000 && b == -1) {
        // Degenerate cases saturate by dividend sign.
        if a < 0 {
            0xFFFF_FFFF
        } else {
            0
        }
    } else {
        a.wrapping_div(b) as u32
    };
    state.gpr[inst.rd().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn div_unsigned(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = state.gpr[inst.ra().index()];
    let b = state.gpr[inst.rb().index()];
    let value = if b == 0 { 0 } else { a / b };
    state.gpr[inst.rd().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn boolean(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let s = state.gpr[inst.rs().index()];
    let b = state.gpr[inst.rb().index()];
    let value = match inst.subop10() {
        28 => s & b,
        60 => s & !b,
        444 => s | b,
        412 => s | !b,
        316 => s ^ b,
        476 => !(s & b),
        124 => !(s | b),
        284 => !(s ^ b),
        _ => unreachable!(),
    };
    state.gpr[inst.ra().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn extend_sign(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let s = state.gpr[inst.rs().index()];
    let value = if inst.subop10() == 954 {
        s as u8 as i8 as i32 as u32
    } else {
        s as u16 as i16 as i32 as u32
    };
    state.gpr[inst.ra().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn count_leading_zeros(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let value = state.gpr[inst.rs().index()].leading_zeros();
    state.gpr[inst.ra().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn shift_logical(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let s = state.gpr[inst.rs().index()];
    let amount = state.gpr[inst.rb().index()] & 63;
    let wide = if inst.subop10() == 24 {
        u64::from(s) << amount
    } else {
        u64::from(s) >> amount
    };
    let value = wide as u32;
    state.gpr[inst.ra().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

/// Shared arithmetic-right-shift semantics for sraw/srawi: 64-bit shift of
/// the sign-extended value, carry set when the value is negative and any
/// 1-bits were shifted out.
fn sra_with_carry(value: u32, amount: u32) -> (u32, bool) {
    debug_assert!(amount < 64);
    let wide = value as i32 as i64;
    let result = (wide >> amount) as u32;
    let shifted_out = if amount == 0 {
        0
    } else {
        (wide as u64) & ((1u64 << amount) - 1)
    };
    (result, wide < 0 && shifted_out != 0)
}

fn shift_right_algebraic(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let s = state.gpr[inst.rs().index()];
    let amount = state.gpr[inst.rb().index()] & 63;
    let (value, ca) = sra_with_carry(s, amount);
    state.gpr[inst.ra().index()] = value;
    state.xer_ca = ca;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn shift_right_algebraic_imm(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let s = state.gpr[inst.rs().index()];
    let (value, ca) = sra_with_carry(s, inst.sh());
    state.gpr[inst.ra().index()] = value;
    state.xer_ca = ca;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn rotate_imm(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let s = state.gpr[inst.rs().index()];
    let value = s.rotate_left(inst.sh()) & inst.rotate_mask();
    state.gpr[inst.ra().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn rotate_reg(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let s = state.gpr[inst.rs().index()];
    let amount = state.gpr[inst.rb().index()] & 31;
    let value = s.rotate_left(amount) & inst.rotate_mask();
    state.gpr[inst.ra().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn rotate_insert(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let s = state.gpr[inst.rs().index()];
    let old = state.gpr[inst.ra().index()];
    let mask = inst.rotate_mask();
    let value = (s.rotate_left(inst.sh()) & mask) | (old & !mask);
    state.gpr[inst.ra().index()] = value;
    if inst.rc() {
        update_cr0(state, value);
    }
    Ok(())
}

fn ps0f(state: &CpuState, reg: Fpr) -> f64 {
    f64::from_bits(state.ps0(reg))
}

fn ps1f(state: &CpuState, reg: Fpr) -> f64 {
    f64::from_bits(state.ps1(reg))
}

fn fp_arith(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    if inst.rc() {
        return fallback(state, inst);
    }
    let single = matches!(inst.opcd(), 59 | 4);
    let paired = inst.opcd() == 4;
    let op = inst.subop5();

    // Multiplier input is reduced to 25 bits of mantissa for
    // single-precision multiplies.
    let c_bits = |state: &CpuState, lane: usize| {
        let bits = state.fpr[inst.fc().index()][lane];
        if single {
            round_to_25_bits(bits)
        } else {
            bits
        }
    };

    let eval = |state: &CpuState, lane: usize| -> f64 {
        let a = f64::from_bits(state.fpr[inst.fa().index()][lane]);
        let b = f64::from_bits(state.fpr[inst.fb().index()][lane]);
        let c = f64::from_bits(c_bits(state, lane));
        match op {
            18 => a / b,
            20 => a - b,
            21 => a + b,
            25 => a * c,
            28 => a.mul_add(c, -b),       // fmsub: A*C - B
            29 => a.mul_add(c, b),        // fmadd: A*C + B
            30 => -a.mul_add(c, -b),      // fnmsub: -(A*C - B)
            31 => -a.mul_add(c, b),       // fnmadd: -(A*C + B)
            _ => unreachable!(),
        }
    };

    let round = |x: f64| {
        if single {
            force_single(x.to_bits())
        } else {
            x.to_bits()
        }
    };

    let lane0 = round(eval(state, 0));
    if paired {
        let lane1 = round(eval(state, 1));
        state.set_ps0(inst.fd(), lane0);
        state.set_ps1(inst.fd(), lane1);
    } else if single {
        // Scalar single results are duplicated into both lanes.
        state.set_ps0(inst.fd(), lane0);
        state.set_ps1(inst.fd(), lane0);
    } else {
        state.set_ps0(inst.fd(), lane0);
    }
    Ok(())
}

fn fp_move(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    if inst.rc() {
        return fallback(state, inst);
    }
    let b = state.ps0(inst.fb());
    let value = match inst.subop10() {
        72 => b,                                    // fmr
        40 => b ^ 0x8000_0000_0000_0000,            // fneg
        264 => b & !0x8000_0000_0000_0000,          // fabs
        136 => b | 0x8000_0000_0000_0000,           // fnabs
        _ => unreachable!(),
    };
    state.set_ps0(inst.fd(), value);
    Ok(())
}

fn fp_select(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    if inst.rc() {
        return fallback(state, inst);
    }
    let a = ps0f(state, inst.fa());
    let value = if a >= 0.0 {
        state.ps0(inst.fc())
    } else {
        state.ps0(inst.fb())
    };
    state.set_ps0(inst.fd(), value);
    Ok(())
}

fn fp_round(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    if inst.rc() {
        return fallback(state, inst);
    }
    let value = force_single(state.ps0(inst.fb()));
    state.set_ps0(inst.fd(), value);
    state.set_ps1(inst.fd(), value);
    Ok(())
}

/// Truncating double-to-word conversion with guest saturation: NaN and
/// underflow saturate to 0x80000000, overflow to 0x7FFFFFFF.
#[must_use]
pub fn convert_to_word_truncate(value: f64) -> u32 {
    if value.is_nan() {
        0x8000_0000
    } else if value >= 2_147_483_648.0 {
        0x7FFF_FFFF
    } else if value < -2_147_483_648.0 {
        0x8000_0000
    } else {
        (value as i64) as u32
    }
}

fn fp_convert_to_int(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    if inst.rc() {
        return fallback(state, inst);
    }
    let word = convert_to_word_truncate(ps0f(state, inst.fb()));
    state.set_ps0(inst.fd(), 0xFFF8_0000_0000_0000 | u64::from(word));
    Ok(())
}

fn fp_compare(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    let a = ps0f(state, inst.fa());
    let b = ps0f(state, inst.fb());
    let bits = if a.is_nan() || b.is_nan() {
        CR_SO
    } else if a < b {
        CR_LT
    } else if a > b {
        CR_GT
    } else {
        CR_EQ
    };
    state.set_cr_bits(inst.crfd(), bits);
    Ok(())
}

fn fallback(state: &mut CpuState, inst: Instruction) -> Result<(), InterpError> {
    // A handful of instructions outside the translator's coverage, so blocks
    // mixing translated and interpreted code have something real to fall
    // back to.
    if inst.opcd() == 4 && matches!(inst.subop10(), 528 | 560 | 592 | 624) && !inst.rc() {
        let a = inst.fa();
        let b = inst.fb();
        let (lane0, lane1) = match inst.subop10() {
            528 => (state.ps0(a), state.ps0(b)), // ps_merge00
            560 => (state.ps0(a), state.ps1(b)), // ps_merge01
            592 => (state.ps1(a), state.ps0(b)), // ps_merge10
            624 => (state.ps1(a), state.ps1(b)), // ps_merge11
            _ => unreachable!(),
        };
        state.set_ps0(inst.fd(), lane0);
        state.set_ps1(inst.fd(), lane1);
        return Ok(());
    }
    Err(InterpError::Unimplemented(inst.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_types::Gpr;

    fn exec(state: &mut CpuState, word: u32) {
        execute(state, Instruction(word)).expect("covered instruction");
    }

    fn xo(opcd: u32, d: u32, a: u32, b: u32, subop10: u32, rc: u32) -> u32 {
        (opcd << 26) | (d << 21) | (a << 16) | (b << 11) | (subop10 << 1) | rc
    }

    #[test]
    fn addi_with_zero_ra_is_load_immediate() {
        let mut st = CpuState::new();
        st.gpr[0] = 0xDEAD_BEEF; // r0 must be ignored when RA = 0
        exec(&mut st, (14 << 26) | (3 << 21) | 0x1234);
        assert_eq!(st.gpr[3], 0x1234);
    }

    #[test]
    fn subfic_carry() {
        let mut st = CpuState::new();
        st.gpr[4] = 3;
        // subfic r3, r4, 5 -> 2, borrow clear so CA set
        exec(&mut st, (8 << 26) | (3 << 21) | (4 << 16) | 5);
        assert_eq!(st.gpr[3], 2);
        assert!(st.xer_ca);
        // subfic r3, r4, 2 -> borrow, CA clear
        st.gpr[4] = 3;
        exec(&mut st, (8 << 26) | (3 << 21) | (4 << 16) | 2);
        assert_eq!(st.gpr[3], 0xFFFF_FFFF);
        assert!(!st.xer_ca);
    }

    #[test]
    fn divw_saturates() {
        let mut st = CpuState::new();
        st.gpr[4] = 0x8000_0000;
        st.gpr[5] = 0xFFFF_FFFF;
        exec(&mut st, xo(31, 3, 4, 5, 491, 0));
        assert_eq!(st.gpr[3], 0xFFFF_FFFF);
        st.gpr[4] = 7;
        st.gpr[5] = 0;
        exec(&mut st, xo(31, 3, 4, 5, 491, 0));
        assert_eq!(st.gpr[3], 0);
        st.gpr[4] = 0x8000_0001; // negative dividend, zero divisor
        exec(&mut st, xo(31, 3, 4, 5, 491, 0));
        assert_eq!(st.gpr[3], 0xFFFF_FFFF);
    }

    #[test]
    fn sraw_wide_amounts_fill_with_sign() {
        let mut st = CpuState::new();
        st.gpr[4] = 0x8000_0000;
        st.gpr[5] = 40; // amount in 32..63
        exec(&mut st, xo(31, 4, 3, 5, 792, 0));
        assert_eq!(st.gpr[3], 0xFFFF_FFFF);
        assert!(st.xer_ca);
        st.gpr[4] = 0x4000_0000;
        exec(&mut st, xo(31, 4, 3, 5, 792, 0));
        assert_eq!(st.gpr[3], 0);
        assert!(!st.xer_ca);
    }

    #[test]
    fn record_form_updates_cr0() {
        let mut st = CpuState::new();
        st.gpr[4] = 0xFF00_FF00;
        st.gpr[5] = 0x0F0F_0F0F;
        exec(&mut st, xo(31, 4, 3, 5, 28, 1)); // and. r3, r4, r5
        assert_eq!(st.gpr[3], 0x0F00_0F00);
        assert_eq!(st.cr_bits(CrField::new(0)), CR_GT);
    }

    #[test]
    fn fmadd_variants_match_reference() {
        let mut st = CpuState::new();
        let a = 3.0f64;
        let c = 5.0f64;
        let b = 7.0f64;
        st.set_ps0(Fpr::new(1), a.to_bits());
        st.set_ps0(Fpr::new(2), b.to_bits());
        st.set_ps0(Fpr::new(3), c.to_bits());
        let enc = |op5: u32| (63 << 26) | (4 << 21) | (1 << 16) | (2 << 11) | (3 << 6) | (op5 << 1);
        let expect = [
            (29, a * c + b),
            (28, a * c - b),
            (31, -(a * c + b)),
            (30, -(a * c - b)),
        ];
        for (op5, want) in expect {
            exec(&mut st, enc(op5));
            assert_eq!(f64::from_bits(st.ps0(Fpr::new(4))), want, "op5 {op5}");
        }
    }

    #[test]
    fn fctiwz_packs_high_word() {
        let mut st = CpuState::new();
        st.set_ps0(Fpr::new(2), (-1.75f64).to_bits());
        exec(&mut st, (63 << 26) | (1 << 21) | (2 << 11) | (15 << 1));
        assert_eq!(st.ps0(Fpr::new(1)), 0xFFF8_0000_FFFF_FFFF);
        st.set_ps0(Fpr::new(2), f64::NAN.to_bits());
        exec(&mut st, (63 << 26) | (1 << 21) | (2 << 11) | (15 << 1));
        assert_eq!(st.ps0(Fpr::new(1)), 0xFFF8_0000_8000_0000);
    }

    #[test]
    fn unknown_instruction_reports_word() {
        let mut st = CpuState::new();
        let err = execute(&mut st, Instruction(0)).unwrap_err();
        assert_eq!(err, InterpError::Unimplemented(0));
    }

    #[test]
    fn gpr_index_type_matches_state_layout() {
        let mut st = CpuState::new();
        for (i, r) in Gpr::all().enumerate() {
            st.gpr[r.index()] = i as u32;
        }
        assert_eq!(st.gpr[31], 31);
    }
}

//! Guest instruction word for a 32-bit PowerPC (Gekko-class) CPU.
//!
//! [`Instruction`] wraps the raw big-endian instruction word and exposes the
//! named bit fields; downstream crates never poke raw bits. [`classify`]
//! resolves the primary opcode and extended opcode into a closed [`OpClass`]
//! tag that names the translation generator (or the interpreter) responsible
//! for the instruction, so dispatch is a single exhaustive `match` instead of
//! nested sub-opcode switches.

use ripple_types::{CrField, Fpr, Gpr};

pub mod encode;

/// A raw 32-bit guest instruction word.
///
/// Field names follow the architecture's conventions: bit 0 is the most
/// significant bit of the word, so the primary opcode lives in the top six
/// bits of the `u32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction(pub u32);

impl Instruction {
    #[must_use]
    pub fn opcd(self) -> u32 {
        self.0 >> 26
    }

    /// 10-bit extended opcode (X/XL/XFX forms, and XO forms including the
    /// overflow-enable bit).
    #[must_use]
    pub fn subop10(self) -> u32 {
        (self.0 >> 1) & 0x3FF
    }

    /// 5-bit extended opcode (A-form floating arithmetic).
    #[must_use]
    pub fn subop5(self) -> u32 {
        (self.0 >> 1) & 0x1F
    }

    /// Destination GPR (D field).
    #[must_use]
    pub fn rd(self) -> Gpr {
        Gpr::new(((self.0 >> 21) & 31) as u8)
    }

    /// Source GPR in the D slot (S field, store-style encodings).
    #[must_use]
    pub fn rs(self) -> Gpr {
        self.rd()
    }

    #[must_use]
    pub fn ra(self) -> Gpr {
        Gpr::new(((self.0 >> 16) & 31) as u8)
    }

    #[must_use]
    pub fn rb(self) -> Gpr {
        Gpr::new(((self.0 >> 11) & 31) as u8)
    }

    /// Raw A field, for encodings where 0 means "the literal zero" rather
    /// than r0.
    #[must_use]
    pub fn ra_raw(self) -> u32 {
        (self.0 >> 16) & 31
    }

    #[must_use]
    pub fn fd(self) -> Fpr {
        Fpr::new(((self.0 >> 21) & 31) as u8)
    }

    #[must_use]
    pub fn fa(self) -> Fpr {
        Fpr::new(((self.0 >> 16) & 31) as u8)
    }

    #[must_use]
    pub fn fb(self) -> Fpr {
        Fpr::new(((self.0 >> 11) & 31) as u8)
    }

    #[must_use]
    pub fn fc(self) -> Fpr {
        Fpr::new(((self.0 >> 6) & 31) as u8)
    }

    /// Sign-extended 16-bit immediate.
    #[must_use]
    pub fn simm(self) -> i32 {
        self.0 as u16 as i16 as i32
    }

    /// Zero-extended 16-bit immediate.
    #[must_use]
    pub fn uimm(self) -> u32 {
        u32::from(self.0 as u16)
    }

    /// Shift amount (M-form and srawi).
    #[must_use]
    pub fn sh(self) -> u32 {
        (self.0 >> 11) & 31
    }

    /// Mask begin bit (M-form).
    #[must_use]
    pub fn mb(self) -> u32 {
        (self.0 >> 6) & 31
    }

    /// Mask end bit (M-form).
    #[must_use]
    pub fn me(self) -> u32 {
        (self.0 >> 1) & 31
    }

    /// Destination CR field of a comparison.
    #[must_use]
    pub fn crfd(self) -> CrField {
        CrField::new(((self.0 >> 23) & 7) as u8)
    }

    /// Record bit: the result is additionally compared against zero into cr0.
    #[must_use]
    pub fn rc(self) -> bool {
        self.0 & 1 != 0
    }

    /// The 32-bit rotate mask selected by the `mb()`/`me()` fields. A wrapped
    /// range (`mb > me`) selects the complement band.
    #[must_use]
    pub fn rotate_mask(self) -> u32 {
        mask32(self.mb(), self.me())
    }

    /// Whether this instruction writes the carry bit.
    #[must_use]
    pub fn defines_carry(self) -> bool {
        match self.opcd() {
            8 | 12 | 13 => true, // subfic, addic, addic.
            31 => {
                matches!(self.subop10(), 792 | 824) // sraw, srawi
                    || matches!(self.subop10() & 0x1FF, 8 | 10 | 136 | 138 | 200 | 202)
            }
            _ => false,
        }
    }

    /// Whether this instruction consumes the carry bit.
    #[must_use]
    pub fn reads_carry(self) -> bool {
        // adde, subfe, addze, subfze
        self.opcd() == 31 && matches!(self.subop10() & 0x1FF, 136 | 138 | 200 | 202)
    }
}

/// Build the rotate mask with 1-bits from architectural bit `mb` through `me`
/// inclusive (bit 0 = MSB). `mb > me` wraps.
#[must_use]
pub fn mask32(mb: u32, me: u32) -> u32 {
    debug_assert!(mb < 32 && me < 32);
    let begin = u32::MAX >> mb;
    let end = (u32::MAX >> me) >> 1; // bits strictly below me
    let band = begin ^ end;
    if mb <= me {
        band
    } else {
        !(end ^ begin)
    }
}

/// Closed classification of the instruction word: which generator handles it.
///
/// One tag per generator, not per mnemonic; generators re-read the sub-opcode
/// for the variants they cover (the FMA family, the boolean operations, the
/// shifted-immediate forms). `Fallback` routes to the interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpClass {
    /// addi, addis.
    AddImm,
    /// ori, oris, xori, xoris, andi., andis.
    LogicImm,
    /// addic, addic.
    AddImmCarry,
    /// subfic.
    SubfImmCarry,
    /// mulli.
    MulImm,
    /// cmpi, cmpli.
    CmpImm,
    /// cmp, cmpl.
    Cmp,
    /// add, addc.
    Add,
    /// adde, addze.
    AddExtended,
    /// subf.
    Subf,
    /// subfc.
    SubfCarry,
    /// subfe, subfze.
    SubfExtended,
    /// neg.
    Neg,
    /// mullw.
    MulLow,
    /// mulhw, mulhwu.
    MulHigh,
    /// divw.
    DivSigned,
    /// divwu.
    DivUnsigned,
    /// and, andc, or, orc, xor, nand, nor, eqv.
    Bool,
    /// extsb, extsh.
    ExtendSign,
    /// cntlzw.
    CountLeadingZeros,
    /// slw, srw.
    ShiftLogical,
    /// sraw.
    ShiftRightAlgebraic,
    /// srawi.
    ShiftRightAlgebraicImm,
    /// rlwinm.
    RotateImm,
    /// rlwnm.
    RotateReg,
    /// rlwimi.
    RotateInsert,
    /// Scalar/paired add, sub, mul, div and the fused multiply-add family,
    /// in both precisions.
    FpArith,
    /// fmr, fneg, fabs, fnabs.
    FpMove,
    /// fsel.
    FpSelect,
    /// frsp.
    FpRound,
    /// fctiwz.
    FpConvertToInt,
    /// fcmpu, fcmpo.
    FpCompare,
    /// Everything else: interpreter fallback.
    Fallback,
}

/// A-form floating arithmetic sub-opcodes covered by the `FpArith` generator.
const FP_ARITH_SUBOPS: [u32; 8] = [18, 20, 21, 25, 28, 29, 30, 31];

#[must_use]
pub fn classify(inst: Instruction) -> OpClass {
    match inst.opcd() {
        14 | 15 => OpClass::AddImm,
        24..=29 => OpClass::LogicImm,
        12 | 13 => OpClass::AddImmCarry,
        8 => OpClass::SubfImmCarry,
        7 => OpClass::MulImm,
        10 | 11 => OpClass::CmpImm,
        20 => OpClass::RotateInsert,
        21 => OpClass::RotateImm,
        23 => OpClass::RotateReg,
        31 => classify_op31(inst),
        59 => {
            if FP_ARITH_SUBOPS.contains(&inst.subop5()) {
                OpClass::FpArith
            } else {
                OpClass::Fallback
            }
        }
        63 => classify_op63(inst),
        4 => {
            // Paired-single arithmetic; permutes and the rest fall back.
            if matches!(inst.subop5(), 18 | 20 | 21 | 25 | 28 | 29 | 30 | 31) {
                OpClass::FpArith
            } else {
                OpClass::Fallback
            }
        }
        _ => OpClass::Fallback,
    }
}

fn classify_op31(inst: Instruction) -> OpClass {
    // X-form opcodes first (the full 10-bit value is significant), then the
    // XO-form arithmetic with the overflow-enable bit masked off.
    match inst.subop10() {
        0 | 32 => return OpClass::Cmp,
        28 | 60 | 124 | 284 | 316 | 412 | 444 | 476 => return OpClass::Bool,
        922 | 954 => return OpClass::ExtendSign,
        26 => return OpClass::CountLeadingZeros,
        24 | 536 => return OpClass::ShiftLogical,
        792 => return OpClass::ShiftRightAlgebraic,
        824 => return OpClass::ShiftRightAlgebraicImm,
        _ => {}
    }
    match inst.subop10() & 0x1FF {
        266 | 10 => OpClass::Add,
        138 | 202 => OpClass::AddExtended,
        40 => OpClass::Subf,
        8 => OpClass::SubfCarry,
        136 | 200 => OpClass::SubfExtended,
        104 => OpClass::Neg,
        235 => OpClass::MulLow,
        75 | 11 => OpClass::MulHigh,
        491 => OpClass::DivSigned,
        459 => OpClass::DivUnsigned,
        _ => OpClass::Fallback,
    }
}

fn classify_op63(inst: Instruction) -> OpClass {
    if FP_ARITH_SUBOPS.contains(&inst.subop5()) {
        return OpClass::FpArith;
    }
    if inst.subop5() == 23 {
        return OpClass::FpSelect;
    }
    match inst.subop10() {
        72 | 40 | 264 | 136 => OpClass::FpMove,
        12 => OpClass::FpRound,
        15 => OpClass::FpConvertToInt,
        0 => OpClass::FpCompare,
        32 => OpClass::FpCompare,
        _ => OpClass::Fallback,
    }
}

//! Symbolic host operations and the assembler that records them.
//!
//! The translator never commits to a concrete host encoding; it emits
//! [`HostOp`] values against an ARM-flavored abstract machine: 16 integer
//! registers (64-bit, with 32-bit operations zero-extending), 16 two-lane
//! vector registers, NZCV flags, and typed access to the guest register
//! file. Immediate operands are uniformly available where a real encoder
//! would materialize them. [`crate::exec`] gives the op stream an executable
//! meaning; a machine-code encoder would be a drop-in replacement for it.

use ripple_types::{Cond, CrField, Fpr, Gpr, HostFpReg, HostReg, Width};

/// Number of host integer registers the abstract machine exposes.
pub const HOST_GPR_COUNT: usize = 16;
/// Number of host vector registers.
pub const HOST_FPR_COUNT: usize = 16;

/// Integer registers handed out by the register cache, callee-saved first so
/// helper calls disturb as few bindings as possible.
pub const ALLOCATABLE_GPRS: [u8; 12] = [6, 7, 8, 9, 10, 11, 0, 1, 2, 3, 4, 5];
/// Vector registers handed out by the FPR cache.
pub const ALLOCATABLE_FPRS: [u8; 12] = [6, 7, 8, 9, 10, 11, 0, 1, 2, 3, 4, 5];

/// Registers a helper call is allowed to clobber.
pub fn gpr_is_caller_saved(reg: HostReg) -> bool {
    reg.0 < 6
}

pub fn fpr_is_caller_saved(reg: HostFpReg) -> bool {
    reg.0 < 6
}

/// Vector scratch registers reserved for the conversion emitters; never
/// handed out by the cache and outside the caller-saved set.
pub const FP_SCRATCH0: HostFpReg = HostFpReg(14);
pub const FP_SCRATCH1: HostFpReg = HostFpReg(15);

/// A branch target. Targets are created unresolved and bound exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Label(pub u32);

/// Register-or-immediate source operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Reg(HostReg),
    Imm(u64),
}

impl From<HostReg> for Operand {
    fn from(reg: HostReg) -> Self {
        Operand::Reg(reg)
    }
}

/// Out-of-line routines the emitted code may call. Helpers follow the usual
/// call convention: every caller-saved register (integer and vector) is
/// clobbered, as are the flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Helper {
    /// Bit-exact widening of the single in the source's lane 0 into the
    /// destination's lane 0 (see `ripple_cpu_core::softfloat`).
    SingleToDouble,
}

/// One symbolic host instruction.
///
/// Integer ops carry a [`Width`]; 32-bit forms zero-extend into the host
/// register. Scalar vector ops (`pair == false`) write lane 0 and leave the
/// destination's lane 1 as it was. Vector lanes hold double bit patterns,
/// except after the narrow ops, which leave a single bit pattern
/// zero-extended in each affected lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostOp {
    MovImm { dst: HostReg, imm: u64 },
    Mov { w: Width, dst: HostReg, src: HostReg },
    Mvn { w: Width, dst: HostReg, src: HostReg },

    Add { w: Width, set_flags: bool, dst: HostReg, a: HostReg, b: Operand },
    /// dst = a + b + C.
    Adc { w: Width, set_flags: bool, dst: HostReg, a: HostReg, b: Operand },
    Sub { w: Width, set_flags: bool, dst: HostReg, a: HostReg, b: Operand },
    /// dst = a - b - (1 - C).
    Sbc { w: Width, set_flags: bool, dst: HostReg, a: HostReg, b: Operand },
    Neg { w: Width, dst: HostReg, src: HostReg },

    And { w: Width, dst: HostReg, a: HostReg, b: Operand },
    Bic { w: Width, dst: HostReg, a: HostReg, b: Operand },
    Orr { w: Width, dst: HostReg, a: HostReg, b: Operand },
    Orn { w: Width, dst: HostReg, a: HostReg, b: Operand },
    Eor { w: Width, dst: HostReg, a: HostReg, b: Operand },
    Eon { w: Width, dst: HostReg, a: HostReg, b: Operand },

    /// Shift amount is masked to the width (31 or 63) like the hardware
    /// variable-shift forms.
    Lsl { w: Width, dst: HostReg, src: HostReg, amount: Operand },
    Lsr { w: Width, dst: HostReg, src: HostReg, amount: Operand },
    Asr { w: Width, dst: HostReg, src: HostReg, amount: Operand },
    Ror { w: Width, dst: HostReg, src: HostReg, amount: Operand },

    Clz { w: Width, dst: HostReg, src: HostReg },
    /// Sign-extend the low 8 bits within a 32-bit result.
    Sxtb { dst: HostReg, src: HostReg },
    Sxth { dst: HostReg, src: HostReg },
    /// Sign-extend the low 32 bits to 64.
    Sxtw { dst: HostReg, src: HostReg },

    /// 32-bit bit-field extract: dst = (src >> lsb) & mask(width).
    Ubfx { dst: HostReg, src: HostReg, lsb: u32, width: u32 },
    /// 32-bit insert-in-zeroes: dst = (src & mask(width)) << lsb.
    Ubfiz { dst: HostReg, src: HostReg, lsb: u32, width: u32 },
    /// 32-bit bit-field insert: dst[lsb..lsb+width] = src[0..width].
    Bfi { dst: HostReg, src: HostReg, lsb: u32, width: u32 },
    /// 32-bit low insert: dst[0..width] = src[lsb..lsb+width].
    Bfxil { dst: HostReg, src: HostReg, lsb: u32, width: u32 },

    Mul { w: Width, dst: HostReg, a: HostReg, b: HostReg },
    /// 64-bit product of the sign-extended low words.
    SMull { dst: HostReg, a: HostReg, b: HostReg },
    UMull { dst: HostReg, a: HostReg, b: HostReg },
    /// Quotient; division by zero yields zero, and the most negative
    /// dividend divided by -1 yields itself, as on the hardware this models.
    SDiv { w: Width, dst: HostReg, a: HostReg, b: HostReg },
    UDiv { w: Width, dst: HostReg, a: HostReg, b: HostReg },

    Cmp { w: Width, a: Operand, b: Operand },
    Cmn { w: Width, a: Operand, b: Operand },
    Cset { dst: HostReg, cond: Cond },
    Csel { w: Width, dst: HostReg, t: HostReg, f: HostReg, cond: Cond },

    LoadGpr { dst: HostReg, gpr: Gpr },
    StoreGpr { src: HostReg, gpr: Gpr },
    LoadCarry { dst: HostReg },
    StoreCarry { src: Operand },
    LoadCr { dst: HostReg, field: CrField },
    StoreCr { src: HostReg, field: CrField },
    /// Both lanes.
    LoadFpr { dst: HostFpReg, fpr: Fpr },
    StoreFpr { src: HostFpReg, fpr: Fpr },

    B { target: Label },
    Bc { cond: Cond, target: Label },
    Cbz { w: Width, reg: HostReg, target: Label },
    Cbnz { w: Width, reg: HostReg, target: Label },
    CallHelper { helper: Helper, dst: HostFpReg, src: HostFpReg },
    /// Re-execute one guest instruction in the interpreter. Clobbers
    /// caller-saved registers and flags; every deferred guest-state write
    /// must be flushed first.
    CallInterpreter { inst: u32 },

    FMov { dst: HostFpReg, src: HostFpReg },
    /// Duplicate the source's lane 0 into both destination lanes.
    FDup { dst: HostFpReg, src: HostFpReg },
    FMovLane { dst: HostFpReg, dst_lane: u8, src: HostFpReg, src_lane: u8 },

    FAdd { single: bool, pair: bool, dst: HostFpReg, a: HostFpReg, b: HostFpReg },
    FSub { single: bool, pair: bool, dst: HostFpReg, a: HostFpReg, b: HostFpReg },
    FMul { single: bool, pair: bool, dst: HostFpReg, a: HostFpReg, b: HostFpReg },
    FDiv { single: bool, pair: bool, dst: HostFpReg, a: HostFpReg, b: HostFpReg },
    /// dst = acc + n * m, fused.
    FMadd { single: bool, pair: bool, dst: HostFpReg, n: HostFpReg, m: HostFpReg, acc: HostFpReg },
    /// dst = acc - n * m.
    FMsub { single: bool, pair: bool, dst: HostFpReg, n: HostFpReg, m: HostFpReg, acc: HostFpReg },
    /// dst = -acc - n * m.
    FNmadd { single: bool, pair: bool, dst: HostFpReg, n: HostFpReg, m: HostFpReg, acc: HostFpReg },
    /// dst = -acc + n * m.
    FNmsub { single: bool, pair: bool, dst: HostFpReg, n: HostFpReg, m: HostFpReg, acc: HostFpReg },

    /// Sign flip on the double bit pattern.
    FNeg { pair: bool, dst: HostFpReg, src: HostFpReg },
    FAbs { pair: bool, dst: HostFpReg, src: HostFpReg },

    /// Lane-0 comparison setting NZCV; `None` compares against +0.0.
    /// Unordered sets C and V, equal sets Z and C, less sets N, greater
    /// sets C.
    FCmp { single: bool, a: HostFpReg, b: Option<HostFpReg> },
    /// Lane-0 conditional select on the current flags.
    FCsel { dst: HostFpReg, t: HostFpReg, f: HostFpReg, cond: Cond },

    /// Native widen of the single in lane 0 (lane 1 preserved). Quiets
    /// signalling NaNs; flushes denormal inputs when the host lacks
    /// guest-accurate denormal handling.
    FWiden { dst: HostFpReg, src: HostFpReg },
    FWidenPair { dst: HostFpReg, src: HostFpReg },
    /// Round lane 0 to single precision (lane 1 preserved), leaving the
    /// single bit pattern in the lane. Denormal results flush to signed
    /// zero.
    FNarrow { dst: HostFpReg, src: HostFpReg },
    FNarrowPair { dst: HostFpReg, src: HostFpReg },
    /// Truncating double-to-word conversion into lane 0, saturating the way
    /// the guest expects (NaN to 0x80000000).
    FToI32 { dst: HostFpReg, src: HostFpReg },

    VAndImm { dst: HostFpReg, src: HostFpReg, imm: u64 },
    VOrImm { dst: HostFpReg, src: HostFpReg, imm: u64 },
    /// Per-lane wrapping 64-bit integer add.
    VAdd64 { dst: HostFpReg, a: HostFpReg, b: HostFpReg },
}

/// Records host ops and resolves labels.
#[derive(Debug, Default)]
pub struct Assembler {
    ops: Vec<HostOp>,
    labels: Vec<Option<usize>>,
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: HostOp) {
        self.ops.push(op);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Create an unresolved label.
    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label((self.labels.len() - 1) as u32)
    }

    /// Bind `label` to the next op to be pushed.
    pub fn bind(&mut self, label: Label) {
        let slot = &mut self.labels[label.0 as usize];
        assert!(slot.is_none(), "label bound twice");
        *slot = Some(self.ops.len());
    }

    /// Finish assembly, asserting every label was bound.
    #[must_use]
    pub fn finish(self) -> (Vec<HostOp>, Vec<usize>) {
        let labels = self
            .labels
            .into_iter()
            .enumerate()
            .map(|(i, t)| t.unwrap_or_else(|| panic!("label {i} never bound")))
            .collect();
        (self.ops, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_resolve_to_op_indices() {
        let mut asm = Assembler::new();
        let skip = asm.label();
        asm.push(HostOp::B { target: skip });
        asm.push(HostOp::MovImm { dst: HostReg(0), imm: 1 });
        asm.bind(skip);
        asm.push(HostOp::MovImm { dst: HostReg(0), imm: 2 });
        let (ops, labels) = asm.finish();
        assert_eq!(ops.len(), 3);
        assert_eq!(labels[skip.0 as usize], 2);
    }

    #[test]
    #[should_panic(expected = "never bound")]
    fn unbound_label_is_a_bug() {
        let mut asm = Assembler::new();
        let l = asm.label();
        asm.push(HostOp::B { target: l });
        let _ = asm.finish();
    }
}

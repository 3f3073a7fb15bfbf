//! Per-block analysis run before translation.
//!
//! The only dataflow the translator needs ahead of time is carry liveness:
//! an instruction that defines XER.CA only has to record the result if some
//! later instruction reads it before the next definition, or if the
//! definition survives to the end of the block. CA is architectural state,
//! so it is live at the block boundary, and anything routed through the
//! interpreter counts as a reader because the interpreter sees the guest
//! register file directly.

use ripple_ppc::{classify, Instruction, OpClass};

use crate::{JitDisable, JitOptions};

/// Whether `inst` will be executed by the interpreter instead of native
/// host ops. Record-form floating-point instructions go to the interpreter
/// wholesale rather than teaching every float emitter about CR1.
pub(crate) fn uses_interpreter(inst: Instruction, opts: &JitOptions) -> bool {
    match classify(inst) {
        OpClass::Fallback => true,
        OpClass::FpArith
        | OpClass::FpMove
        | OpClass::FpSelect
        | OpClass::FpRound
        | OpClass::FpConvertToInt
        | OpClass::FpCompare => {
            if inst.rc() {
                return true;
            }
            if inst.opcd() == 4 {
                opts.disable.contains(JitDisable::PAIRED)
            } else {
                opts.disable.contains(JitDisable::FLOAT)
            }
        }
        _ => opts.disable.contains(JitDisable::INTEGER),
    }
}

/// Where the guest carry bit currently lives during translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CarryFlag {
    /// In the guest register file; nothing deferred.
    InGuestState,
    /// In the host C flag. Valid only until the next flag-clobbering op, so
    /// this state never survives past the instruction that set it.
    InHostFlags,
    ConstantTrue,
    ConstantFalse,
}

#[derive(Debug)]
pub struct BlockAnalysis {
    wants_ca: Vec<bool>,
}

impl BlockAnalysis {
    pub fn analyze(block: &[Instruction], opts: &JitOptions) -> Self {
        let mut wants_ca = vec![false; block.len()];
        let mut live = true;
        for (i, inst) in block.iter().enumerate().rev() {
            if inst.defines_carry() && !uses_interpreter(*inst, opts) {
                wants_ca[i] = live;
                live = false;
            }
            if inst.reads_carry() || uses_interpreter(*inst, opts) {
                live = true;
            }
        }
        Self { wants_ca }
    }

    /// Whether the carry defined by instruction `i` is ever consumed.
    #[must_use]
    pub fn wants_ca(&self, i: usize) -> bool {
        self.wants_ca[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_ppc::encode;

    fn block(words: &[u32]) -> Vec<Instruction> {
        words.iter().copied().map(Instruction).collect()
    }

    fn analyze(words: &[u32]) -> BlockAnalysis {
        BlockAnalysis::analyze(&block(words), &JitOptions::default())
    }

    #[test]
    fn carry_consumed_by_extended_add() {
        let a = analyze(&[encode::addic(3, 4, 1), encode::adde(5, 6, 7, false)]);
        assert!(a.wants_ca(0));
        assert!(a.wants_ca(1));
    }

    #[test]
    fn overwritten_carry_is_dead() {
        let a = analyze(&[
            encode::addic(3, 4, 1),
            encode::add(8, 9, 10, false),
            encode::subfic(5, 6, 2),
        ]);
        assert!(!a.wants_ca(0));
        assert!(!a.wants_ca(1));
        // The last definition is live out of the block.
        assert!(a.wants_ca(2));
    }

    #[test]
    fn read_after_intervening_definition() {
        let a = analyze(&[
            encode::addic(3, 4, 1),
            encode::addc(5, 6, 7, false),
            encode::subfe(8, 9, 10, false),
        ]);
        assert!(!a.wants_ca(0));
        assert!(a.wants_ca(1));
        assert!(a.wants_ca(2));
    }

    #[test]
    fn interpreter_routed_instruction_keeps_carry_live() {
        let a = analyze(&[
            encode::addic(3, 4, 1),
            encode::ps_merge00(0, 1, 2),
            encode::addic(5, 6, 2),
        ]);
        // The merge goes through the interpreter, which reads guest state.
        assert!(a.wants_ca(0));
        assert!(a.wants_ca(2));
    }
}

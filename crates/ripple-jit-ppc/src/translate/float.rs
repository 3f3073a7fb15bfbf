//! Floating-point instruction emitters.
//!
//! The payoff here is the single-representation fast path: when every source
//! of a single-precision operation is already held in single form, the op is
//! emitted as native single arithmetic and the result stays single, skipping
//! both the widen on the way in and the narrow-plus-widen on the way out.
//! The mixed path computes in double and narrows, which is also what the
//! interpreter does.
//!
//! Record-form FP instructions never reach these emitters; they are routed
//! to the interpreter during classification.

use ripple_cpu_core::state::{cr_to_internal, CR_EQ, CR_GT, CR_LT, CR_SO};
use ripple_ppc::Instruction;
use ripple_types::{Cond, HostFpReg};

use super::Translator;
use crate::emit::{HostOp, FP_SCRATCH0, FP_SCRATCH1};
use crate::fprcache::Rep;

/// Map a guest multiply-add minor opcode onto the host's fused forms. The
/// guest computes a*c +/- b; the host accumulates into `acc`.
fn fma_op(
    sub: u32,
    single: bool,
    pair: bool,
    dst: HostFpReg,
    n: HostFpReg,
    m: HostFpReg,
    acc: HostFpReg,
) -> HostOp {
    match sub {
        // a*c + b
        29 => HostOp::FMadd { single, pair, dst, n, m, acc },
        // a*c - b
        28 => HostOp::FNmsub { single, pair, dst, n, m, acc },
        // -(a*c + b)
        31 => HostOp::FNmadd { single, pair, dst, n, m, acc },
        // -(a*c - b) = b - a*c
        30 => HostOp::FMsub { single, pair, dst, n, m, acc },
        _ => unreachable!(),
    }
}

impl Translator {
    /// Round the multiplier operand of a single-precision multiply to 25
    /// bits of mantissa, the way the guest FPU does. Returns the rounded
    /// value in a reserved scratch so no cache state moves.
    fn round_multiplier(&mut self, src: HostFpReg) -> HostFpReg {
        self.asm.push(HostOp::VAndImm {
            dst: FP_SCRATCH0,
            src,
            imm: 0xFFFF_FFFF_F800_0000,
        });
        self.asm.push(HostOp::VAndImm { dst: FP_SCRATCH1, src, imm: 0x0800_0000 });
        self.asm.push(HostOp::VAdd64 { dst: FP_SCRATCH0, a: FP_SCRATCH0, b: FP_SCRATCH1 });
        FP_SCRATCH0
    }

    pub(super) fn fp_arith(&mut self, inst: Instruction) {
        let opcd = inst.opcd();
        let single = opcd != 63;
        let pair = opcd == 4;
        let sub = inst.subop5();
        let fd = inst.fd();
        let fa = inst.fa();
        let fb = inst.fb();
        let fc = inst.fc();
        let fma = matches!(sub, 28..=31);
        let uses_b = fma || matches!(sub, 18 | 20 | 21);
        let uses_c = fma || sub == 25;

        let all_single = self.fprs.is_single(fa)
            && (!uses_b || self.fprs.is_single(fb))
            && (!uses_c || self.fprs.is_single(fc));
        if single && all_single {
            // Our own narrows produced these lanes, so they are already
            // rounded singles with denormals flushed; a 25-bit multiplier
            // round would be a no-op.
            let a = self.fprs.read_single(fa);
            let b = uses_b.then(|| self.fprs.read_single(fb));
            let c = uses_c.then(|| self.fprs.read_single(fc));
            let d = self.fprs.bind_write(&mut self.asm, &mut self.gprs, fd, Rep::Single, false);
            let op = match sub {
                21 => HostOp::FAdd { single: true, pair, dst: d, a, b: b.unwrap() },
                20 => HostOp::FSub { single: true, pair, dst: d, a, b: b.unwrap() },
                18 => HostOp::FDiv { single: true, pair, dst: d, a, b: b.unwrap() },
                25 => HostOp::FMul { single: true, pair, dst: d, a, b: c.unwrap() },
                28..=31 => fma_op(sub, true, pair, d, a, c.unwrap(), b.unwrap()),
                _ => unreachable!(),
            };
            self.asm.push(op);
            if !pair {
                self.asm.push(HostOp::FDup { dst: d, src: d });
            }
            self.fprs.set_store_safe(fd, true);
            return;
        }

        // Double path. A single-form multiplier is already 24-bit, so only a
        // true double needs the 25-bit round.
        let c_needs_round = uses_c && single && !self.fprs.is_single(fc);
        let a = self.fprs.read_double(&mut self.asm, &mut self.gprs, fa);
        let b = uses_b.then(|| self.fprs.read_double(&mut self.asm, &mut self.gprs, fb));
        let c = uses_c.then(|| {
            let reg = self.fprs.read_double(&mut self.asm, &mut self.gprs, fc);
            if c_needs_round {
                self.round_multiplier(reg)
            } else {
                reg
            }
        });
        let d = if single {
            self.fprs.bind_write(&mut self.asm, &mut self.gprs, fd, Rep::Single, false)
        } else {
            self.fprs.bind_write(&mut self.asm, &mut self.gprs, fd, Rep::Double, true)
        };
        let op = match sub {
            21 => HostOp::FAdd { single: false, pair, dst: d, a, b: b.unwrap() },
            20 => HostOp::FSub { single: false, pair, dst: d, a, b: b.unwrap() },
            18 => HostOp::FDiv { single: false, pair, dst: d, a, b: b.unwrap() },
            25 => HostOp::FMul { single: false, pair, dst: d, a, b: c.unwrap() },
            28..=31 => fma_op(sub, false, pair, d, a, c.unwrap(), b.unwrap()),
            _ => unreachable!(),
        };
        self.asm.push(op);
        if pair {
            self.asm.push(HostOp::FNarrowPair { dst: d, src: d });
            self.fprs.set_store_safe(fd, true);
        } else if single {
            self.asm.push(HostOp::FNarrow { dst: d, src: d });
            self.asm.push(HostOp::FDup { dst: d, src: d });
            self.fprs.set_store_safe(fd, true);
        } else {
            self.fprs.set_store_safe(fd, false);
        }
    }

    pub(super) fn fp_move(&mut self, inst: Instruction) {
        let fd = inst.fd();
        let b = self.fprs.read_double(&mut self.asm, &mut self.gprs, inst.fb());
        // ps1 of the destination survives; bring the old value in.
        let d = self.fprs.bind_write(&mut self.asm, &mut self.gprs, fd, Rep::Double, true);
        match inst.subop10() {
            72 => {
                if d != b {
                    self.asm.push(HostOp::FMovLane { dst: d, dst_lane: 0, src: b, src_lane: 0 });
                }
            }
            40 => self.asm.push(HostOp::FNeg { pair: false, dst: d, src: b }),
            264 => self.asm.push(HostOp::FAbs { pair: false, dst: d, src: b }),
            136 => {
                self.asm.push(HostOp::FAbs { pair: false, dst: d, src: b });
                self.asm.push(HostOp::FNeg { pair: false, dst: d, src: d });
            }
            _ => unreachable!(),
        }
        self.fprs.set_store_safe(fd, false);
    }

    pub(super) fn fp_select(&mut self, inst: Instruction) {
        let fd = inst.fd();
        let a = self.fprs.read_double(&mut self.asm, &mut self.gprs, inst.fa());
        let b = self.fprs.read_double(&mut self.asm, &mut self.gprs, inst.fb());
        let c = self.fprs.read_double(&mut self.asm, &mut self.gprs, inst.fc());
        let d = self.fprs.bind_write(&mut self.asm, &mut self.gprs, fd, Rep::Double, true);
        self.asm.push(HostOp::FCmp { single: false, a, b: None });
        // Ge is false for unordered, so a NaN selector picks b like the
        // guest's a >= 0.0 test.
        self.asm.push(HostOp::FCsel { dst: d, t: c, f: b, cond: Cond::Ge });
        self.fprs.set_store_safe(fd, false);
    }

    pub(super) fn fp_round(&mut self, inst: Instruction) {
        let fd = inst.fd();
        let fb = inst.fb();
        if self.fprs.is_single(fb) {
            // Already rounded to single; the round is a duplication.
            let b = self.fprs.read_single(fb);
            let d = self.fprs.bind_write(&mut self.asm, &mut self.gprs, fd, Rep::Single, false);
            self.asm.push(HostOp::FDup { dst: d, src: b });
        } else {
            let b = self.fprs.read_double(&mut self.asm, &mut self.gprs, fb);
            let d = self.fprs.bind_write(&mut self.asm, &mut self.gprs, fd, Rep::Single, false);
            self.asm.push(HostOp::FNarrow { dst: d, src: b });
            self.asm.push(HostOp::FDup { dst: d, src: d });
        }
        self.fprs.set_store_safe(fd, true);
    }

    pub(super) fn fp_convert_to_int(&mut self, inst: Instruction) {
        let fd = inst.fd();
        let b = self.fprs.read_double(&mut self.asm, &mut self.gprs, inst.fb());
        self.asm.push(HostOp::FToI32 { dst: FP_SCRATCH0, src: b });
        self.asm.push(HostOp::VOrImm {
            dst: FP_SCRATCH0,
            src: FP_SCRATCH0,
            imm: 0xFFF8_0000_0000_0000,
        });
        let d = self.fprs.bind_write(&mut self.asm, &mut self.gprs, fd, Rep::Double, true);
        self.asm.push(HostOp::FMovLane { dst: d, dst_lane: 0, src: FP_SCRATCH0, src_lane: 0 });
        self.fprs.set_store_safe(fd, false);
    }

    pub(super) fn fp_compare(&mut self, inst: Instruction) {
        let fa = inst.fa();
        let fb = inst.fb();
        // A single compare flushes denormal inputs on non-native hosts, so
        // it is only safe when the lanes are known denormal-free.
        let both_single = self.fprs.is_single(fa)
            && self.fprs.is_single(fb)
            && (self.opts.host_denormals_native
                || (self.fprs.is_store_safe(fa) && self.fprs.is_store_safe(fb)));
        let (a, b, single) = if both_single {
            (self.fprs.read_single(fa), self.fprs.read_single(fb), true)
        } else {
            let a = self.fprs.read_double(&mut self.asm, &mut self.gprs, fa);
            let b = self.fprs.read_double(&mut self.asm, &mut self.gprs, fb);
            (a, b, false)
        };
        let cr = self.gprs.bind_cr(&mut self.asm, inst.crfd());
        let unordered = self.asm.label();
        let done = self.asm.label();
        self.asm.push(HostOp::FCmp { single, a, b: Some(b) });
        self.asm.push(HostOp::MovImm { dst: cr, imm: cr_to_internal(CR_EQ) });
        self.asm.push(HostOp::Bc { cond: Cond::Vs, target: unordered });
        self.asm.push(HostOp::Bc { cond: Cond::Eq, target: done });
        self.asm.push(HostOp::MovImm { dst: cr, imm: cr_to_internal(CR_GT) });
        self.asm.push(HostOp::Bc { cond: Cond::Gt, target: done });
        self.asm.push(HostOp::MovImm { dst: cr, imm: cr_to_internal(CR_LT) });
        self.asm.push(HostOp::B { target: done });
        self.asm.bind(unordered);
        self.asm.push(HostOp::MovImm { dst: cr, imm: cr_to_internal(CR_SO) });
        self.asm.bind(done);
    }
}

#[cfg(test)]
mod tests {
    use ripple_ppc::{encode, Instruction};
    use ripple_types::Fpr;

    use crate::emit::HostOp;
    use crate::{translate, JitOptions};

    fn translated(words: &[u32]) -> Vec<HostOp> {
        let block: Vec<_> = words.iter().copied().map(Instruction).collect();
        translate(&block, JitOptions::default()).unwrap().ops
    }

    fn count<F: Fn(&HostOp) -> bool>(ops: &[HostOp], f: F) -> usize {
        ops.iter().filter(|op| f(op)).count()
    }

    #[test]
    fn single_chain_stays_in_single_form() {
        // fadds f1, f2, f3 ; fmuls f4, f1, f1 -- the second op consumes the
        // first result without widening or re-narrowing it.
        let ops = translated(&[encode::fadds(1, 2, 3), encode::fmuls(4, 1, 1)]);
        assert_eq!(count(&ops, |op| matches!(op, HostOp::FNarrow { .. })), 1);
        assert_eq!(
            count(&ops, |op| matches!(op, HostOp::FMul { single: true, .. })),
            1
        );
        // Both results flush as store-safe singles: one widen per register
        // at the block end, nothing in between.
        assert_eq!(count(&ops, |op| matches!(op, HostOp::FWidenPair { .. })), 2);
    }

    #[test]
    fn double_multiply_rounds_the_multiplier_for_singles() {
        // fmuls with a c operand fresh from the guest file gets the 25-bit
        // mantissa round; the double-precision fmul does not.
        let ops = translated(&[encode::fmuls(1, 2, 3)]);
        assert_eq!(count(&ops, |op| matches!(op, HostOp::VAdd64 { .. })), 1);

        let ops = translated(&[encode::fmul(1, 2, 3)]);
        assert_eq!(count(&ops, |op| matches!(op, HostOp::VAdd64 { .. })), 0);
    }

    #[test]
    fn paired_arithmetic_narrows_both_lanes() {
        let ops = translated(&[encode::ps_add(1, 2, 3)]);
        assert_eq!(count(&ops, |op| matches!(op, HostOp::FNarrowPair { .. })), 1);
        assert_eq!(count(&ops, |op| matches!(op, HostOp::FDup { .. })), 0);
    }

    #[test]
    fn scalar_double_keeps_second_lane() {
        // The destination is loaded first so its ps1 survives the write.
        let ops = translated(&[encode::fadd(1, 2, 3)]);
        let d = ops
            .iter()
            .find_map(|op| match op {
                HostOp::FAdd { dst, .. } => Some(*dst),
                _ => None,
            })
            .expect("no FAdd emitted");
        assert!(ops.contains(&HostOp::LoadFpr { dst: d, fpr: Fpr::new(1) }));
    }

    #[test]
    fn move_of_a_single_form_value_leaves_single_form() {
        // fmr writes only ps0 while ps1 of the destination keeps its old
        // double, so the moved value is read as a double and a compare
        // against it cannot use the single fast path.
        let ops = translated(&[
            encode::fadds(1, 2, 3),
            encode::fmr(4, 1),
            encode::fcmpu(0, 4, 1),
        ]);
        assert_eq!(
            count(&ops, |op| matches!(op, HostOp::FCmp { single: false, .. })),
            1
        );
        assert_eq!(
            count(&ops, |op| matches!(op, HostOp::FCmp { single: true, .. })),
            0
        );
    }

    #[test]
    fn compare_of_fresh_doubles_is_a_double_compare() {
        let ops = translated(&[encode::fcmpu(0, 1, 2)]);
        assert_eq!(
            count(&ops, |op| matches!(op, HostOp::FCmp { single: false, .. })),
            1
        );
    }

    #[test]
    fn compare_of_known_singles_skips_the_widen() {
        let ops = translated(&[encode::fadds(1, 2, 3), encode::fsubs(4, 5, 6), encode::fcmpu(0, 1, 4)]);
        assert_eq!(
            count(&ops, |op| matches!(op, HostOp::FCmp { single: true, .. })),
            1
        );
    }
}

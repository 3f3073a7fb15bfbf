//! Guest floating-point register cache.
//!
//! A bound guest FPR is held in one of two lane representations:
//! [`Rep::Double`] (each lane is a double bit pattern, matching the guest
//! register file) or [`Rep::Single`] (each lane is a single bit pattern,
//! zero-extended, as left behind by the narrow ops). Keeping results in
//! single form lets chains of single-precision arithmetic skip the
//! round-trip through double entirely; the cost is that anything that needs
//! the double value has to widen first.
//!
//! Widening is where precision can leak. The native widen flushes denormal
//! inputs on hosts without guest-accurate denormal handling, so it is only
//! emitted when the cache can prove the lanes are safe: every single
//! representation produced by this translator has already had denormal
//! outputs flushed to zero, recorded per register in `store_safe`. When
//! neither that bit nor the host guarantee holds, the widen goes through a
//! runtime check per lane, calling the bit-exact helper for anything that is
//! not a normal nonzero single.
//!
//! Helper calls clobber every caller-saved register. Before emitting one,
//! the integer cache is flushed and every other caller-saved vector binding
//! is written back; the value being widened rides out the calls in the
//! reserved scratch registers.

use ripple_types::{Cond, Fpr, HostFpReg};

use crate::emit::{
    fpr_is_caller_saved, Assembler, Helper, HostOp, ALLOCATABLE_FPRS, FP_SCRATCH0, FP_SCRATCH1,
    HOST_FPR_COUNT,
};
use crate::regcache::RegCache;

/// Lane representation of a bound register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rep {
    Double,
    Single,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Binding {
    Unbound,
    Host { reg: HostFpReg, rep: Rep, dirty: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Free,
    Fpr(Fpr),
}

#[derive(Debug)]
pub struct FprCache {
    bindings: [Binding; 32],
    slots: [Slot; HOST_FPR_COUNT],
    last_use: [u64; HOST_FPR_COUNT],
    tick: u64,
    fence: u64,
    /// Bit per guest FPR: its single lanes are known free of denormals and
    /// signalling NaNs, so the native widen reproduces the helper exactly.
    store_safe: u32,
    host_denormals_native: bool,
}

impl FprCache {
    #[must_use]
    pub fn new(host_denormals_native: bool) -> Self {
        Self {
            bindings: [Binding::Unbound; 32],
            slots: [Slot::Free; HOST_FPR_COUNT],
            last_use: [0; HOST_FPR_COUNT],
            tick: 0,
            fence: 0,
            store_safe: 0,
            host_denormals_native,
        }
    }

    pub fn begin_instruction(&mut self) {
        self.tick += 1;
        self.fence = self.tick;
    }

    fn touch(&mut self, reg: HostFpReg) {
        self.tick += 1;
        self.last_use[reg.index()] = self.tick;
    }

    #[must_use]
    pub fn is_store_safe(&self, fpr: Fpr) -> bool {
        self.store_safe & (1 << fpr.index()) != 0
    }

    pub fn set_store_safe(&mut self, fpr: Fpr, safe: bool) {
        if safe {
            self.store_safe |= 1 << fpr.index();
        } else {
            self.store_safe &= !(1 << fpr.index());
        }
    }

    /// Interpreter fallback may rewrite any register behind our back.
    pub fn clear_store_safe(&mut self) {
        self.store_safe = 0;
    }

    #[must_use]
    pub fn is_single(&self, fpr: Fpr) -> bool {
        matches!(self.bindings[fpr.index()], Binding::Host { rep: Rep::Single, .. })
    }

    fn fast_widen_ok(&self, fpr: Fpr) -> bool {
        self.is_store_safe(fpr) || self.host_denormals_native
    }

    /// True if reading `fpr` as a double would go through the checked
    /// helper path.
    #[must_use]
    pub fn widen_is_slow(&self, fpr: Fpr) -> bool {
        self.is_single(fpr) && !self.fast_widen_ok(fpr)
    }

    fn alloc(&mut self, asm: &mut Assembler, gprs: &mut RegCache) -> HostFpReg {
        for &i in &ALLOCATABLE_FPRS {
            if self.slots[usize::from(i)] == Slot::Free {
                let reg = HostFpReg(i);
                self.touch(reg);
                return reg;
            }
        }
        let victim = ALLOCATABLE_FPRS
            .iter()
            .map(|&i| HostFpReg(i))
            .filter(|r| self.last_use[r.index()] < self.fence)
            .min_by_key(|r| self.last_use[r.index()])
            .expect("out of host vector registers");
        let Slot::Fpr(owner) = self.slots[victim.index()] else {
            unreachable!("allocated slot without an owner");
        };
        self.spill(asm, gprs, owner);
        self.touch(victim);
        victim
    }

    fn spill(&mut self, asm: &mut Assembler, gprs: &mut RegCache, fpr: Fpr) {
        if self.is_single(fpr) {
            self.widen_in_place(asm, gprs, fpr);
        }
        let Binding::Host { reg, dirty, .. } = self.bindings[fpr.index()] else {
            unreachable!("spilling an unbound register");
        };
        if dirty {
            asm.push(HostOp::StoreFpr { src: reg, fpr });
        }
        self.slots[reg.index()] = Slot::Free;
        self.bindings[fpr.index()] = Binding::Unbound;
    }

    /// Host register holding `fpr` as doubles, widening first if it is bound
    /// in single form.
    pub fn read_double(&mut self, asm: &mut Assembler, gprs: &mut RegCache, fpr: Fpr) -> HostFpReg {
        match self.bindings[fpr.index()] {
            Binding::Host { reg, rep: Rep::Double, .. } => {
                self.touch(reg);
                reg
            }
            Binding::Host { reg, rep: Rep::Single, .. } => {
                self.widen_in_place(asm, gprs, fpr);
                self.touch(reg);
                reg
            }
            Binding::Unbound => {
                let reg = self.alloc(asm, gprs);
                asm.push(HostOp::LoadFpr { dst: reg, fpr });
                self.slots[reg.index()] = Slot::Fpr(fpr);
                self.bindings[fpr.index()] = Binding::Host { reg, rep: Rep::Double, dirty: false };
                reg
            }
        }
    }

    /// Host register holding `fpr` in single form. Callers check
    /// [`is_single`](Self::is_single) first; asking for a double-form
    /// register as singles is a translator bug, not a conversion request.
    pub fn read_single(&mut self, fpr: Fpr) -> HostFpReg {
        match self.bindings[fpr.index()] {
            Binding::Host { reg, rep: Rep::Single, .. } => {
                self.touch(reg);
                reg
            }
            _ => panic!("register is not in single representation"),
        }
    }

    /// Host register about to receive a new value for `fpr` in `rep` form.
    /// With `load` the current double value is brought in first, for writes
    /// that keep part of the old register.
    pub fn bind_write(
        &mut self,
        asm: &mut Assembler,
        gprs: &mut RegCache,
        fpr: Fpr,
        rep: Rep,
        load: bool,
    ) -> HostFpReg {
        if load {
            assert_eq!(rep, Rep::Double, "partial writes only make sense on doubles");
            let reg = self.read_double(asm, gprs, fpr);
            self.bindings[fpr.index()] = Binding::Host { reg, rep, dirty: true };
            return reg;
        }
        if let Binding::Host { reg, .. } = self.bindings[fpr.index()] {
            self.touch(reg);
            self.bindings[fpr.index()] = Binding::Host { reg, rep, dirty: true };
            return reg;
        }
        let reg = self.alloc(asm, gprs);
        self.slots[reg.index()] = Slot::Fpr(fpr);
        self.bindings[fpr.index()] = Binding::Host { reg, rep, dirty: true };
        reg
    }

    fn widen_in_place(&mut self, asm: &mut Assembler, gprs: &mut RegCache, fpr: Fpr) {
        let Binding::Host { reg, rep: Rep::Single, dirty } = self.bindings[fpr.index()] else {
            unreachable!("widening a register that is not bound single");
        };
        if self.fast_widen_ok(fpr) {
            asm.push(HostOp::FWidenPair { dst: reg, src: reg });
            self.bindings[fpr.index()] = Binding::Host { reg, rep: Rep::Double, dirty };
            return;
        }

        // Checked path. Helper calls ahead: vacate every caller-saved
        // register first. The value itself survives in the scratches.
        gprs.flush_caller_saved(asm);
        for other in Fpr::all() {
            if other == fpr {
                continue;
            }
            if let Binding::Host { reg: other_reg, .. } = self.bindings[other.index()] {
                if fpr_is_caller_saved(other_reg) {
                    assert!(
                        !self.widen_is_slow(other),
                        "more than one binding on the checked widen path"
                    );
                    self.spill(asm, gprs, other);
                }
            }
        }

        asm.push(HostOp::FMov { dst: FP_SCRATCH1, src: reg });
        asm.push(HostOp::FMovLane { dst: FP_SCRATCH0, dst_lane: 0, src: FP_SCRATCH1, src_lane: 1 });
        widen_lane_checked(asm, FP_SCRATCH0);
        widen_lane_checked(asm, FP_SCRATCH1);
        asm.push(HostOp::FMovLane { dst: FP_SCRATCH1, dst_lane: 1, src: FP_SCRATCH0, src_lane: 0 });
        asm.push(HostOp::FMov { dst: reg, src: FP_SCRATCH1 });
        self.bindings[fpr.index()] = Binding::Host { reg, rep: Rep::Double, dirty };
    }

    /// Write every binding back to the guest register file and drop it.
    pub fn flush_all(&mut self, asm: &mut Assembler, gprs: &mut RegCache) {
        for fpr in Fpr::all() {
            if let Binding::Host { .. } = self.bindings[fpr.index()] {
                self.spill(asm, gprs, fpr);
            }
        }
    }

    /// Write back and drop every binding living in a caller-saved register.
    pub fn flush_caller_saved(&mut self, asm: &mut Assembler, gprs: &mut RegCache) {
        for fpr in Fpr::all() {
            if let Binding::Host { reg, .. } = self.bindings[fpr.index()] {
                if fpr_is_caller_saved(reg) {
                    self.spill(asm, gprs, fpr);
                }
            }
        }
    }
}

/// Widen the single in `reg`'s lane 0 in place. Normal nonzero values take
/// the native conversion; zeroes, denormals and NaNs go through the
/// bit-exact helper. Caller-saved registers must already be flushed.
fn widen_lane_checked(asm: &mut Assembler, reg: HostFpReg) {
    let slow = asm.label();
    let done = asm.label();
    asm.push(HostOp::FCmp { single: true, a: reg, b: None });
    asm.push(HostOp::Bc { cond: Cond::Vs, target: slow });
    asm.push(HostOp::Bc { cond: Cond::Eq, target: slow });
    asm.push(HostOp::FWiden { dst: reg, src: reg });
    asm.push(HostOp::B { target: done });
    asm.bind(slow);
    asm.push(HostOp::CallHelper { helper: Helper::SingleToDouble, dst: reg, src: reg });
    asm.bind(done);
}

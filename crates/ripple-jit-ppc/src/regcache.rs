//! Guest integer register cache.
//!
//! Tracks where each guest GPR currently lives: still in the guest register
//! file, folded to a known 32-bit constant, or bound to a host register.
//! Constants stay compile-time-only until an instruction actually needs them
//! in a register, which is what lets long immediate-build sequences collapse
//! without emitting a single host op. CR fields borrow host registers from
//! the same pool in their 64-bit internal encoding.
//!
//! Host registers also back short-lived scratch values. Scratches and any
//! binding touched since `begin_instruction` are never eviction candidates,
//! so a source read earlier in the same instruction cannot be silently
//! repurposed as a destination.

use ripple_types::{CrField, Gpr, HostReg};

use crate::emit::{gpr_is_caller_saved, Assembler, HostOp, ALLOCATABLE_GPRS, HOST_GPR_COUNT};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Binding {
    /// Value lives only in the guest register file.
    Unbound,
    /// Value is a known constant, not yet materialized anywhere.
    Imm(u32),
    /// Value lives in `reg`; `dirty` means the guest file is stale.
    Host { reg: HostReg, dirty: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Free,
    Scratch,
    Gpr(Gpr),
    Cr(CrField),
}

#[derive(Debug)]
pub struct RegCache {
    bindings: [Binding; 32],
    cr: [Option<HostReg>; 8],
    slots: [Slot; HOST_GPR_COUNT],
    last_use: [u64; HOST_GPR_COUNT],
    tick: u64,
    /// Slots used at or after this tick belong to the current instruction.
    fence: u64,
}

impl Default for RegCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RegCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: [Binding::Unbound; 32],
            cr: [None; 8],
            slots: [Slot::Free; HOST_GPR_COUNT],
            last_use: [0; HOST_GPR_COUNT],
            tick: 0,
            fence: 0,
        }
    }

    /// Mark the start of a guest instruction; everything touched before this
    /// point becomes fair game for eviction again.
    pub fn begin_instruction(&mut self) {
        self.tick += 1;
        self.fence = self.tick;
    }

    fn touch(&mut self, reg: HostReg) {
        self.tick += 1;
        self.last_use[reg.index()] = self.tick;
    }

    fn spill(&mut self, asm: &mut Assembler, reg: HostReg) {
        match self.slots[reg.index()] {
            Slot::Free => {}
            Slot::Scratch => panic!("evicting a live scratch register"),
            Slot::Gpr(gpr) => {
                if let Binding::Host { dirty: true, .. } = self.bindings[gpr.index()] {
                    asm.push(HostOp::StoreGpr { src: reg, gpr });
                }
                self.bindings[gpr.index()] = Binding::Unbound;
            }
            Slot::Cr(field) => {
                asm.push(HostOp::StoreCr { src: reg, field });
                self.cr[field.index()] = None;
            }
        }
        self.slots[reg.index()] = Slot::Free;
    }

    fn alloc(&mut self, asm: &mut Assembler) -> HostReg {
        for &i in &ALLOCATABLE_GPRS {
            if self.slots[usize::from(i)] == Slot::Free {
                let reg = HostReg(i);
                self.touch(reg);
                return reg;
            }
        }
        let victim = ALLOCATABLE_GPRS
            .iter()
            .map(|&i| HostReg(i))
            .filter(|r| {
                self.slots[r.index()] != Slot::Scratch && self.last_use[r.index()] < self.fence
            })
            .min_by_key(|r| self.last_use[r.index()])
            .expect("out of host registers");
        self.spill(asm, victim);
        self.touch(victim);
        victim
    }

    /// Host register holding the current value of `gpr`, loading or
    /// materializing it if needed.
    pub fn read(&mut self, asm: &mut Assembler, gpr: Gpr) -> HostReg {
        match self.bindings[gpr.index()] {
            Binding::Host { reg, .. } => {
                self.touch(reg);
                reg
            }
            Binding::Imm(value) => {
                let reg = self.alloc(asm);
                asm.push(HostOp::MovImm { dst: reg, imm: u64::from(value) });
                self.slots[reg.index()] = Slot::Gpr(gpr);
                self.bindings[gpr.index()] = Binding::Host { reg, dirty: true };
                reg
            }
            Binding::Unbound => {
                let reg = self.alloc(asm);
                asm.push(HostOp::LoadGpr { dst: reg, gpr });
                self.slots[reg.index()] = Slot::Gpr(gpr);
                self.bindings[gpr.index()] = Binding::Host { reg, dirty: false };
                reg
            }
        }
    }

    /// Host register about to receive a new value for `gpr`. With `load` the
    /// old value is brought in first, for destinations that are only
    /// partially overwritten.
    pub fn bind_write(&mut self, asm: &mut Assembler, gpr: Gpr, load: bool) -> HostReg {
        if load {
            let reg = self.read(asm, gpr);
            if let Binding::Host { dirty, .. } = &mut self.bindings[gpr.index()] {
                *dirty = true;
            }
            return reg;
        }
        if let Binding::Host { reg, .. } = self.bindings[gpr.index()] {
            self.touch(reg);
            self.bindings[gpr.index()] = Binding::Host { reg, dirty: true };
            return reg;
        }
        let reg = self.alloc(asm);
        self.slots[reg.index()] = Slot::Gpr(gpr);
        self.bindings[gpr.index()] = Binding::Host { reg, dirty: true };
        reg
    }

    /// The known constant value of `gpr`, if the cache has one.
    #[must_use]
    pub fn imm(&self, gpr: Gpr) -> Option<u32> {
        match self.bindings[gpr.index()] {
            Binding::Imm(value) => Some(value),
            _ => None,
        }
    }

    /// Record that `gpr` now holds `value`, without emitting anything.
    pub fn set_imm(&mut self, gpr: Gpr, value: u32) {
        if let Binding::Host { reg, .. } = self.bindings[gpr.index()] {
            self.slots[reg.index()] = Slot::Free;
        }
        self.bindings[gpr.index()] = Binding::Imm(value);
    }

    /// Claim a host register for a transient value. Must be released before
    /// the next instruction.
    pub fn scratch(&mut self, asm: &mut Assembler) -> HostReg {
        let reg = self.alloc(asm);
        self.slots[reg.index()] = Slot::Scratch;
        reg
    }

    pub fn release(&mut self, reg: HostReg) {
        assert_eq!(self.slots[reg.index()], Slot::Scratch, "releasing a non-scratch register");
        self.slots[reg.index()] = Slot::Free;
    }

    /// Host register for CR field `field`, in the internal 64-bit encoding.
    /// The caller overwrites it completely, so the guest value is never
    /// loaded; the register is dirty from the moment it is handed out.
    pub fn bind_cr(&mut self, asm: &mut Assembler, field: CrField) -> HostReg {
        if let Some(reg) = self.cr[field.index()] {
            self.touch(reg);
            return reg;
        }
        let reg = self.alloc(asm);
        self.slots[reg.index()] = Slot::Cr(field);
        self.cr[field.index()] = Some(reg);
        reg
    }

    /// Write every deferred value back to the guest register file and drop
    /// all bindings.
    pub fn flush_all(&mut self, asm: &mut Assembler) {
        for &i in &ALLOCATABLE_GPRS {
            assert_ne!(self.slots[usize::from(i)], Slot::Scratch, "flush with a live scratch");
            self.spill(asm, HostReg(i));
        }
        for gpr in Gpr::all() {
            if let Binding::Imm(value) = self.bindings[gpr.index()] {
                let reg = self.alloc(asm);
                asm.push(HostOp::MovImm { dst: reg, imm: u64::from(value) });
                asm.push(HostOp::StoreGpr { src: reg, gpr });
                self.slots[reg.index()] = Slot::Free;
                self.bindings[gpr.index()] = Binding::Unbound;
            }
        }
    }

    /// Write back and drop everything living in a caller-saved register, so
    /// a helper call cannot destroy deferred state. Constants survive; they
    /// occupy no register.
    pub fn flush_caller_saved(&mut self, asm: &mut Assembler) {
        for &i in &ALLOCATABLE_GPRS {
            let reg = HostReg(i);
            if !gpr_is_caller_saved(reg) {
                continue;
            }
            assert_ne!(self.slots[reg.index()], Slot::Scratch, "helper call with a live scratch");
            self.spill(asm, reg);
        }
    }

    /// True if `gpr` is bound dirty or folded to a constant, i.e. the guest
    /// register file does not hold its current value.
    #[must_use]
    pub fn is_deferred(&self, gpr: Gpr) -> bool {
        match self.bindings[gpr.index()] {
            Binding::Unbound => false,
            Binding::Imm(_) => true,
            Binding::Host { dirty, .. } => dirty,
        }
    }
}

//! Integer instruction emitters.
//!
//! Every emitter folds operands known at compile time before touching the
//! assembler: constant results stay in the register cache as immediates, so
//! guest immediate-building idioms (lis/ori pairs, li chains) cost nothing
//! until a real computation consumes them. Carry-defining emitters only
//! record CA when the block analysis says someone reads it.

use ripple_ppc::Instruction;
use ripple_types::Width::{W32, W64};
use ripple_types::{Cond, Gpr, HostReg};

use super::Translator;
use crate::block::CarryFlag;
use crate::emit::{HostOp, Operand};

/// 32-bit add with carry-in; mirrors the guest CA definition.
fn carrying_add(a: u32, b: u32, carry: bool) -> (u32, bool) {
    let sum = u64::from(a) + u64::from(b) + u64::from(carry);
    (sum as u32, sum >> 32 != 0)
}

impl Translator {
    fn carry_const(&self) -> Option<bool> {
        match self.carry {
            CarryFlag::ConstantTrue => Some(true),
            CarryFlag::ConstantFalse => Some(false),
            _ => None,
        }
    }

    /// Copy `src`'s value into `dst`, register-to-register. A no-op when the
    /// destination already is the source.
    fn emit_copy(&mut self, inst: Instruction, dst: Gpr, src_reg: HostReg, src: Gpr) {
        if dst == src {
            self.record(inst, src_reg);
            return;
        }
        let d = self.gprs.bind_write(&mut self.asm, dst, false);
        self.asm.push(HostOp::Mov { w: W32, dst: d, src: src_reg });
        self.record(inst, d);
    }

    pub(super) fn add_imm(&mut self, inst: Instruction) {
        let shift = if inst.opcd() == 15 { 16 } else { 0 };
        let imm = (inst.simm() << shift) as u32;
        if inst.ra_raw() == 0 {
            self.gprs.set_imm(inst.rd(), imm);
            return;
        }
        if let Some(a) = self.gprs.imm(inst.ra()) {
            self.gprs.set_imm(inst.rd(), a.wrapping_add(imm));
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.ra());
        let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
        self.asm.push(HostOp::Add {
            w: W32,
            set_flags: false,
            dst: d,
            a: s,
            b: Operand::Imm(u64::from(imm)),
        });
    }

    pub(super) fn logic_imm(&mut self, inst: Instruction) {
        let ra = inst.ra();
        let rs = inst.rs();
        let raw = inst.uimm();
        let (imm, record) = match inst.opcd() {
            24 | 26 => (raw, false),
            25 | 27 => (raw << 16, false),
            28 => (raw, true),
            29 => (raw << 16, true),
            _ => unreachable!(),
        };
        let xor = matches!(inst.opcd(), 26 | 27);
        if let Some(s) = self.gprs.imm(rs) {
            let value = if record {
                s & imm
            } else if xor {
                s ^ imm
            } else {
                s | imm
            };
            self.gprs.set_imm(ra, value);
            if record {
                self.cr0_from_imm(value);
            }
            return;
        }
        if imm == 0 && !record && ra == rs {
            // ori/xori with nothing to do; the canonical guest nop.
            return;
        }
        let s = self.gprs.read(&mut self.asm, rs);
        let d = self.gprs.bind_write(&mut self.asm, ra, false);
        let b = Operand::Imm(u64::from(imm));
        if record {
            self.asm.push(HostOp::And { w: W32, dst: d, a: s, b });
            self.cr0_from_reg(d);
        } else if xor {
            self.asm.push(HostOp::Eor { w: W32, dst: d, a: s, b });
        } else {
            self.asm.push(HostOp::Orr { w: W32, dst: d, a: s, b });
        }
    }

    pub(super) fn add_imm_carry(&mut self, inst: Instruction) {
        let imm = inst.simm() as u32;
        let record = inst.opcd() == 13;
        if let Some(a) = self.gprs.imm(inst.ra()) {
            let (value, ca) = carrying_add(a, imm, false);
            self.gprs.set_imm(inst.rd(), value);
            self.set_carry_constant(ca);
            if record {
                self.cr0_from_imm(value);
            }
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.ra());
        let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
        self.asm.push(HostOp::Add {
            w: W32,
            set_flags: self.wants_ca,
            dst: d,
            a: s,
            b: Operand::Imm(u64::from(imm)),
        });
        self.set_carry_from_flags();
        if record {
            self.cr0_from_reg(d);
        }
    }

    pub(super) fn subf_imm_carry(&mut self, inst: Instruction) {
        let imm = inst.simm() as u32;
        if let Some(a) = self.gprs.imm(inst.ra()) {
            let (value, ca) = carrying_add(!a, imm, true);
            self.gprs.set_imm(inst.rd(), value);
            self.set_carry_constant(ca);
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.ra());
        let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
        if imm == u32::MAX {
            // !a + 0xFFFFFFFF + 1 is !a with a guaranteed carry, and the
            // usual imm+1 trick below would wrap.
            self.asm.push(HostOp::Mvn { w: W32, dst: d, src: s });
            self.set_carry_constant(true);
            return;
        }
        self.asm.push(HostOp::Mvn { w: W32, dst: d, src: s });
        self.asm.push(HostOp::Add {
            w: W32,
            set_flags: self.wants_ca,
            dst: d,
            a: d,
            b: Operand::Imm(u64::from(imm + 1)),
        });
        self.set_carry_from_flags();
    }

    /// d = src * imm with the usual strength reductions. Returns the result
    /// register, or `None` when the product folded to a constant zero.
    fn mul_by_constant(&mut self, dst: Gpr, src: Gpr, imm: u32) -> Option<HostReg> {
        match imm {
            0 => {
                self.gprs.set_imm(dst, 0);
                None
            }
            1 => {
                let s = self.gprs.read(&mut self.asm, src);
                if dst == src {
                    return Some(s);
                }
                let d = self.gprs.bind_write(&mut self.asm, dst, false);
                self.asm.push(HostOp::Mov { w: W32, dst: d, src: s });
                Some(d)
            }
            u32::MAX => {
                let s = self.gprs.read(&mut self.asm, src);
                let d = self.gprs.bind_write(&mut self.asm, dst, false);
                self.asm.push(HostOp::Neg { w: W32, dst: d, src: s });
                Some(d)
            }
            _ if imm.is_power_of_two() => {
                let s = self.gprs.read(&mut self.asm, src);
                let d = self.gprs.bind_write(&mut self.asm, dst, false);
                self.asm.push(HostOp::Lsl {
                    w: W32,
                    dst: d,
                    src: s,
                    amount: Operand::Imm(u64::from(imm.trailing_zeros())),
                });
                Some(d)
            }
            _ => {
                let s = self.gprs.read(&mut self.asm, src);
                let t = self.gprs.scratch(&mut self.asm);
                self.asm.push(HostOp::MovImm { dst: t, imm: u64::from(imm) });
                let d = self.gprs.bind_write(&mut self.asm, dst, false);
                self.asm.push(HostOp::Mul { w: W32, dst: d, a: s, b: t });
                self.gprs.release(t);
                Some(d)
            }
        }
    }

    pub(super) fn mul_imm(&mut self, inst: Instruction) {
        let imm = inst.simm() as u32;
        if let Some(a) = self.gprs.imm(inst.ra()) {
            self.gprs.set_imm(inst.rd(), a.wrapping_mul(imm));
            return;
        }
        let _ = self.mul_by_constant(inst.rd(), inst.ra(), imm);
    }

    pub(super) fn cmp_imm(&mut self, inst: Instruction) {
        let field = inst.crfd();
        if inst.opcd() == 11 {
            let b = i64::from(inst.simm());
            if let Some(a) = self.gprs.imm(inst.ra()) {
                let diff = i64::from(a as i32).wrapping_sub(b) as u64;
                let cr = self.gprs.bind_cr(&mut self.asm, field);
                self.asm.push(HostOp::MovImm { dst: cr, imm: diff });
                return;
            }
            let a = self.gprs.read(&mut self.asm, inst.ra());
            let cr = self.gprs.bind_cr(&mut self.asm, field);
            self.asm.push(HostOp::Sxtw { dst: cr, src: a });
            self.asm.push(HostOp::Sub {
                w: W64,
                set_flags: false,
                dst: cr,
                a: cr,
                b: Operand::Imm(b as u64),
            });
        } else {
            let b = inst.uimm();
            if let Some(a) = self.gprs.imm(inst.ra()) {
                let diff = u64::from(a).wrapping_sub(u64::from(b));
                let cr = self.gprs.bind_cr(&mut self.asm, field);
                self.asm.push(HostOp::MovImm { dst: cr, imm: diff });
                return;
            }
            let a = self.gprs.read(&mut self.asm, inst.ra());
            let cr = self.gprs.bind_cr(&mut self.asm, field);
            self.asm.push(HostOp::Sub {
                w: W64,
                set_flags: false,
                dst: cr,
                a,
                b: Operand::Imm(u64::from(b)),
            });
        }
    }

    pub(super) fn cmp(&mut self, inst: Instruction) {
        let field = inst.crfd();
        let signed = inst.subop10() == 0;
        let a_imm = self.gprs.imm(inst.ra());
        let b_imm = self.gprs.imm(inst.rb());
        if let (Some(a), Some(b)) = (a_imm, b_imm) {
            let diff = if signed {
                i64::from(a as i32).wrapping_sub(i64::from(b as i32)) as u64
            } else {
                u64::from(a).wrapping_sub(u64::from(b))
            };
            let cr = self.gprs.bind_cr(&mut self.asm, field);
            self.asm.push(HostOp::MovImm { dst: cr, imm: diff });
            return;
        }
        if signed {
            let a = self.gprs.read(&mut self.asm, inst.ra());
            if let Some(b) = b_imm {
                let cr = self.gprs.bind_cr(&mut self.asm, field);
                self.asm.push(HostOp::Sxtw { dst: cr, src: a });
                self.asm.push(HostOp::Sub {
                    w: W64,
                    set_flags: false,
                    dst: cr,
                    a: cr,
                    b: Operand::Imm(b as i32 as i64 as u64),
                });
                return;
            }
            let b = self.gprs.read(&mut self.asm, inst.rb());
            let cr = self.gprs.bind_cr(&mut self.asm, field);
            self.asm.push(HostOp::Sxtw { dst: cr, src: a });
            let t = self.gprs.scratch(&mut self.asm);
            self.asm.push(HostOp::Sxtw { dst: t, src: b });
            self.asm.push(HostOp::Sub {
                w: W64,
                set_flags: false,
                dst: cr,
                a: cr,
                b: Operand::Reg(t),
            });
            self.gprs.release(t);
        } else {
            let a = self.gprs.read(&mut self.asm, inst.ra());
            let b = match b_imm {
                Some(b) => Operand::Imm(u64::from(b)),
                None => Operand::Reg(self.gprs.read(&mut self.asm, inst.rb())),
            };
            let cr = self.gprs.bind_cr(&mut self.asm, field);
            self.asm.push(HostOp::Sub { w: W64, set_flags: false, dst: cr, a, b });
        }
    }

    pub(super) fn add(&mut self, inst: Instruction) {
        let carrying = inst.subop10() & 0x1FF == 10;
        let a_imm = self.gprs.imm(inst.ra());
        let b_imm = self.gprs.imm(inst.rb());
        if let (Some(a), Some(b)) = (a_imm, b_imm) {
            let (value, ca) = carrying_add(a, b, false);
            self.gprs.set_imm(inst.rd(), value);
            if carrying {
                self.set_carry_constant(ca);
            }
            self.record_imm(inst, value);
            return;
        }
        let (s, b) = match (a_imm, b_imm) {
            (Some(a), None) => {
                (self.gprs.read(&mut self.asm, inst.rb()), Operand::Imm(u64::from(a)))
            }
            (None, Some(b)) => {
                (self.gprs.read(&mut self.asm, inst.ra()), Operand::Imm(u64::from(b)))
            }
            (None, None) => {
                let a = self.gprs.read(&mut self.asm, inst.ra());
                let b = self.gprs.read(&mut self.asm, inst.rb());
                (a, Operand::Reg(b))
            }
            (Some(_), Some(_)) => unreachable!(),
        };
        let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
        self.asm.push(HostOp::Add {
            w: W32,
            set_flags: carrying && self.wants_ca,
            dst: d,
            a: s,
            b,
        });
        if carrying {
            self.set_carry_from_flags();
        }
        self.record(inst, d);
    }

    /// Shared emission for the carry-unknown immediate pair of an extended
    /// add: value = x + y + CA. The carry-out only depends on x + y, so it
    /// resolves to a constant in all but one case.
    fn extended_imm_pair(&mut self, inst: Instruction, x: u32, y: u32) {
        let sum = u64::from(x) + u64::from(y);
        let c = self.carry_value();
        let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
        self.asm.push(HostOp::Add {
            w: W32,
            set_flags: false,
            dst: d,
            a: c,
            b: Operand::Imm(sum & 0xFFFF_FFFF),
        });
        self.gprs.release(c);
        if sum > 0xFFFF_FFFF {
            self.set_carry_constant(true);
        } else if sum < 0xFFFF_FFFF {
            self.set_carry_constant(false);
        } else if self.carry == CarryFlag::InHostFlags {
            // CA out equals CA in; the record is still accurate, but a
            // flags-borne carry must not outlive this instruction.
            self.set_carry_from_flags();
        }
        self.record(inst, d);
    }

    pub(super) fn add_extended(&mut self, inst: Instruction) {
        let addze = inst.subop10() & 0x1FF == 202;
        let a_imm = self.gprs.imm(inst.ra());
        let b_imm = if addze { Some(0) } else { self.gprs.imm(inst.rb()) };
        if let (Some(a), Some(b)) = (a_imm, b_imm) {
            if let Some(c) = self.carry_const() {
                let (value, ca) = carrying_add(a, b, c);
                self.gprs.set_imm(inst.rd(), value);
                self.set_carry_constant(ca);
                self.record_imm(inst, value);
            } else {
                self.extended_imm_pair(inst, a, b);
            }
            return;
        }
        let (s, b) = if addze {
            (self.gprs.read(&mut self.asm, inst.ra()), Operand::Imm(0))
        } else {
            match (a_imm, b_imm) {
                (Some(a), None) => {
                    (self.gprs.read(&mut self.asm, inst.rb()), Operand::Imm(u64::from(a)))
                }
                (None, Some(b)) => {
                    (self.gprs.read(&mut self.asm, inst.ra()), Operand::Imm(u64::from(b)))
                }
                (None, None) => {
                    let a = self.gprs.read(&mut self.asm, inst.ra());
                    let b = self.gprs.read(&mut self.asm, inst.rb());
                    (a, Operand::Reg(b))
                }
                (Some(_), Some(_)) => unreachable!(),
            }
        };
        self.load_carry_into_flags();
        let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
        self.asm.push(HostOp::Adc { w: W32, set_flags: self.wants_ca, dst: d, a: s, b });
        self.set_carry_from_flags();
        self.record(inst, d);
    }

    pub(super) fn subf(&mut self, inst: Instruction) {
        if inst.ra() == inst.rb() {
            self.gprs.set_imm(inst.rd(), 0);
            self.record_imm(inst, 0);
            return;
        }
        let a_imm = self.gprs.imm(inst.ra());
        let b_imm = self.gprs.imm(inst.rb());
        if let (Some(a), Some(b)) = (a_imm, b_imm) {
            let value = b.wrapping_sub(a);
            self.gprs.set_imm(inst.rd(), value);
            self.record_imm(inst, value);
            return;
        }
        let d = match (a_imm, b_imm) {
            (Some(a), None) => {
                let b = self.gprs.read(&mut self.asm, inst.rb());
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Sub {
                    w: W32,
                    set_flags: false,
                    dst: d,
                    a: b,
                    b: Operand::Imm(u64::from(a)),
                });
                d
            }
            (None, Some(b)) => {
                let a = self.gprs.read(&mut self.asm, inst.ra());
                let t = self.gprs.scratch(&mut self.asm);
                self.asm.push(HostOp::MovImm { dst: t, imm: u64::from(b) });
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Sub {
                    w: W32,
                    set_flags: false,
                    dst: d,
                    a: t,
                    b: Operand::Reg(a),
                });
                self.gprs.release(t);
                d
            }
            (None, None) => {
                let a = self.gprs.read(&mut self.asm, inst.ra());
                let b = self.gprs.read(&mut self.asm, inst.rb());
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Sub {
                    w: W32,
                    set_flags: false,
                    dst: d,
                    a: b,
                    b: Operand::Reg(a),
                });
                d
            }
            (Some(_), Some(_)) => unreachable!(),
        };
        self.record(inst, d);
    }

    pub(super) fn subf_carry(&mut self, inst: Instruction) {
        // b - a; the host subtract leaves C = "no borrow", which is exactly
        // the guest CA for subtraction.
        if inst.ra() == inst.rb() {
            self.gprs.set_imm(inst.rd(), 0);
            self.set_carry_constant(true);
            self.record_imm(inst, 0);
            return;
        }
        let a_imm = self.gprs.imm(inst.ra());
        let b_imm = self.gprs.imm(inst.rb());
        if let (Some(a), Some(b)) = (a_imm, b_imm) {
            let (value, ca) = carrying_add(!a, b, true);
            self.gprs.set_imm(inst.rd(), value);
            self.set_carry_constant(ca);
            self.record_imm(inst, value);
            return;
        }
        let set_flags = self.wants_ca;
        let d = match (a_imm, b_imm) {
            (Some(a), None) => {
                let b = self.gprs.read(&mut self.asm, inst.rb());
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Sub {
                    w: W32,
                    set_flags,
                    dst: d,
                    a: b,
                    b: Operand::Imm(u64::from(a)),
                });
                d
            }
            (None, Some(b)) => {
                let a = self.gprs.read(&mut self.asm, inst.ra());
                let t = self.gprs.scratch(&mut self.asm);
                self.asm.push(HostOp::MovImm { dst: t, imm: u64::from(b) });
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Sub {
                    w: W32,
                    set_flags,
                    dst: d,
                    a: t,
                    b: Operand::Reg(a),
                });
                self.gprs.release(t);
                d
            }
            (None, None) => {
                let a = self.gprs.read(&mut self.asm, inst.ra());
                let b = self.gprs.read(&mut self.asm, inst.rb());
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Sub {
                    w: W32,
                    set_flags,
                    dst: d,
                    a: b,
                    b: Operand::Reg(a),
                });
                d
            }
            (Some(_), Some(_)) => unreachable!(),
        };
        self.set_carry_from_flags();
        self.record(inst, d);
    }

    pub(super) fn subf_extended(&mut self, inst: Instruction) {
        let subfze = inst.subop10() & 0x1FF == 200;
        let a_imm = self.gprs.imm(inst.ra());
        let b_imm = if subfze { Some(0) } else { self.gprs.imm(inst.rb()) };
        if let (Some(a), Some(b)) = (a_imm, b_imm) {
            if let Some(c) = self.carry_const() {
                let (value, ca) = carrying_add(!a, b, c);
                self.gprs.set_imm(inst.rd(), value);
                self.set_carry_constant(ca);
                self.record_imm(inst, value);
            } else {
                self.extended_imm_pair(inst, !a, b);
            }
            return;
        }
        let d = match (a_imm, b_imm) {
            (Some(a), None) => {
                // b + !a + CA, with the subtract-with-carry doing the invert.
                let b = self.gprs.read(&mut self.asm, inst.rb());
                self.load_carry_into_flags();
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Sbc {
                    w: W32,
                    set_flags: self.wants_ca,
                    dst: d,
                    a: b,
                    b: Operand::Imm(u64::from(a)),
                });
                d
            }
            (None, Some(b)) => {
                let a = self.gprs.read(&mut self.asm, inst.ra());
                self.load_carry_into_flags();
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Mvn { w: W32, dst: d, src: a });
                self.asm.push(HostOp::Adc {
                    w: W32,
                    set_flags: self.wants_ca,
                    dst: d,
                    a: d,
                    b: Operand::Imm(u64::from(b)),
                });
                d
            }
            (None, None) => {
                let a = self.gprs.read(&mut self.asm, inst.ra());
                let b = self.gprs.read(&mut self.asm, inst.rb());
                self.load_carry_into_flags();
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Sbc {
                    w: W32,
                    set_flags: self.wants_ca,
                    dst: d,
                    a: b,
                    b: Operand::Reg(a),
                });
                d
            }
            (Some(_), Some(_)) => unreachable!(),
        };
        self.set_carry_from_flags();
        self.record(inst, d);
    }

    pub(super) fn neg(&mut self, inst: Instruction) {
        if let Some(a) = self.gprs.imm(inst.ra()) {
            let value = 0u32.wrapping_sub(a);
            self.gprs.set_imm(inst.rd(), value);
            self.record_imm(inst, value);
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.ra());
        let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
        self.asm.push(HostOp::Neg { w: W32, dst: d, src: s });
        self.record(inst, d);
    }

    pub(super) fn mul_low(&mut self, inst: Instruction) {
        let a_imm = self.gprs.imm(inst.ra());
        let b_imm = self.gprs.imm(inst.rb());
        if let (Some(a), Some(b)) = (a_imm, b_imm) {
            let value = a.wrapping_mul(b);
            self.gprs.set_imm(inst.rd(), value);
            self.record_imm(inst, value);
            return;
        }
        let d = match (a_imm, b_imm) {
            (Some(v), None) => self.mul_by_constant(inst.rd(), inst.rb(), v),
            (None, Some(v)) => self.mul_by_constant(inst.rd(), inst.ra(), v),
            (None, None) => {
                let a = self.gprs.read(&mut self.asm, inst.ra());
                let b = self.gprs.read(&mut self.asm, inst.rb());
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Mul { w: W32, dst: d, a, b });
                Some(d)
            }
            (Some(_), Some(_)) => unreachable!(),
        };
        match d {
            Some(d) => self.record(inst, d),
            None => self.record_imm(inst, 0),
        }
    }

    pub(super) fn mul_high(&mut self, inst: Instruction) {
        let signed = inst.subop10() & 0x1FF == 75;
        if let (Some(a), Some(b)) = (self.gprs.imm(inst.ra()), self.gprs.imm(inst.rb())) {
            let value = if signed {
                (i64::from(a as i32).wrapping_mul(i64::from(b as i32)) >> 32) as u32
            } else {
                ((u64::from(a) * u64::from(b)) >> 32) as u32
            };
            self.gprs.set_imm(inst.rd(), value);
            self.record_imm(inst, value);
            return;
        }
        let a = self.gprs.read(&mut self.asm, inst.ra());
        let b = self.gprs.read(&mut self.asm, inst.rb());
        let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
        if signed {
            self.asm.push(HostOp::SMull { dst: d, a, b });
        } else {
            self.asm.push(HostOp::UMull { dst: d, a, b });
        }
        self.asm.push(HostOp::Lsr { w: W64, dst: d, src: d, amount: Operand::Imm(32) });
        self.record(inst, d);
    }

    fn div_signed_fold(a: u32, b: u32) -> u32 {
        let (a, b) = (a as i32, b as i32);
        if b == 0 || (a as u32 == 0x8000_0000 && b == -1) {
            if a < 0 {
                0xFFFF_FFFF
            } else {
                0
            }
        } else {
            a.wrapping_div(b) as u32
        }
    }

    pub(super) fn div_signed(&mut self, inst: Instruction) {
        let a_imm = self.gprs.imm(inst.ra());
        let b_imm = self.gprs.imm(inst.rb());
        if let (Some(a), Some(b)) = (a_imm, b_imm) {
            let value = Self::div_signed_fold(a, b);
            self.gprs.set_imm(inst.rd(), value);
            self.record_imm(inst, value);
            return;
        }
        if let Some(b) = b_imm {
            if b == 0 {
                // Degenerate quotient saturates by dividend sign.
                let a = self.gprs.read(&mut self.asm, inst.ra());
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::Asr { w: W32, dst: d, src: a, amount: Operand::Imm(31) });
                self.record(inst, d);
                return;
            }
            if b != u32::MAX {
                let a = self.gprs.read(&mut self.asm, inst.ra());
                let t = self.gprs.scratch(&mut self.asm);
                self.asm.push(HostOp::MovImm { dst: t, imm: u64::from(b) });
                let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
                self.asm.push(HostOp::SDiv { w: W32, dst: d, a, b: t });
                self.gprs.release(t);
                self.record(inst, d);
                return;
            }
            // b == -1 can still hit the 0x80000000 overflow case; take the
            // general checked path.
        }
        let a = self.gprs.read(&mut self.asm, inst.ra());
        let b = self.gprs.read(&mut self.asm, inst.rb());
        let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
        let degenerate = self.asm.label();
        let divide = self.asm.label();
        let done = self.asm.label();
        self.asm.push(HostOp::Cbz { w: W32, reg: b, target: degenerate });
        self.asm.push(HostOp::Cmn { w: W32, a: Operand::Reg(b), b: Operand::Imm(1) });
        self.asm.push(HostOp::Bc { cond: Cond::Ne, target: divide });
        self.asm.push(HostOp::Cmp { w: W32, a: Operand::Reg(a), b: Operand::Imm(0x8000_0000) });
        self.asm.push(HostOp::Bc { cond: Cond::Ne, target: divide });
        self.asm.bind(degenerate);
        self.asm.push(HostOp::Asr { w: W32, dst: d, src: a, amount: Operand::Imm(31) });
        self.asm.push(HostOp::B { target: done });
        self.asm.bind(divide);
        self.asm.push(HostOp::SDiv { w: W32, dst: d, a, b });
        self.asm.bind(done);
        self.record(inst, d);
    }

    pub(super) fn div_unsigned(&mut self, inst: Instruction) {
        let a_imm = self.gprs.imm(inst.ra());
        let b_imm = self.gprs.imm(inst.rb());
        if let (Some(a), Some(b)) = (a_imm, b_imm) {
            let value = if b == 0 { 0 } else { a / b };
            self.gprs.set_imm(inst.rd(), value);
            self.record_imm(inst, value);
            return;
        }
        if let Some(b) = b_imm {
            if b == 0 {
                self.gprs.set_imm(inst.rd(), 0);
                self.record_imm(inst, 0);
                return;
            }
            let a = self.gprs.read(&mut self.asm, inst.ra());
            let t = self.gprs.scratch(&mut self.asm);
            self.asm.push(HostOp::MovImm { dst: t, imm: u64::from(b) });
            let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
            self.asm.push(HostOp::UDiv { w: W32, dst: d, a, b: t });
            self.gprs.release(t);
            self.record(inst, d);
            return;
        }
        let a = self.gprs.read(&mut self.asm, inst.ra());
        let b = self.gprs.read(&mut self.asm, inst.rb());
        let d = self.gprs.bind_write(&mut self.asm, inst.rd(), false);
        // The host op already yields zero for a zero divisor.
        self.asm.push(HostOp::UDiv { w: W32, dst: d, a, b });
        self.record(inst, d);
    }

    pub(super) fn boolean(&mut self, inst: Instruction) {
        let sub = inst.subop10();
        let ra = inst.ra();
        let rs = inst.rs();
        let rb = inst.rb();
        if let (Some(s), Some(b)) = (self.gprs.imm(rs), self.gprs.imm(rb)) {
            let value = match sub {
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
            self.gprs.set_imm(ra, value);
            self.record_imm(inst, value);
            return;
        }
        if rs == rb {
            match sub {
                316 | 60 => {
                    self.gprs.set_imm(ra, 0);
                    self.record_imm(inst, 0);
                }
                284 | 412 => {
                    self.gprs.set_imm(ra, u32::MAX);
                    self.record_imm(inst, u32::MAX);
                }
                28 | 444 => {
                    let s = self.gprs.read(&mut self.asm, rs);
                    self.emit_copy(inst, ra, s, rs);
                }
                476 | 124 => {
                    let s = self.gprs.read(&mut self.asm, rs);
                    let d = self.gprs.bind_write(&mut self.asm, ra, false);
                    self.asm.push(HostOp::Mvn { w: W32, dst: d, src: s });
                    self.record(inst, d);
                }
                _ => unreachable!(),
            }
            return;
        }
        // One constant operand. The complement ops fold the complement into
        // the immediate where the operation allows it.
        let one_imm = match (self.gprs.imm(rs), self.gprs.imm(rb)) {
            (None, Some(v)) => Some((v, rs)),
            (Some(v), None) if matches!(sub, 28 | 444 | 316 | 476 | 124 | 284) => Some((v, rb)),
            _ => None,
        };
        if let Some((v, src)) = one_imm {
            let s = self.gprs.read(&mut self.asm, src);
            let d = self.gprs.bind_write(&mut self.asm, ra, false);
            match sub {
                28 => self.asm.push(HostOp::And { w: W32, dst: d, a: s, b: Operand::Imm(u64::from(v)) }),
                60 => self.asm.push(HostOp::And { w: W32, dst: d, a: s, b: Operand::Imm(u64::from(!v)) }),
                444 => self.asm.push(HostOp::Orr { w: W32, dst: d, a: s, b: Operand::Imm(u64::from(v)) }),
                412 => self.asm.push(HostOp::Orr { w: W32, dst: d, a: s, b: Operand::Imm(u64::from(!v)) }),
                316 => self.asm.push(HostOp::Eor { w: W32, dst: d, a: s, b: Operand::Imm(u64::from(v)) }),
                284 => self.asm.push(HostOp::Eor { w: W32, dst: d, a: s, b: Operand::Imm(u64::from(!v)) }),
                476 => {
                    self.asm.push(HostOp::And { w: W32, dst: d, a: s, b: Operand::Imm(u64::from(v)) });
                    self.asm.push(HostOp::Mvn { w: W32, dst: d, src: d });
                }
                124 => {
                    self.asm.push(HostOp::Orr { w: W32, dst: d, a: s, b: Operand::Imm(u64::from(v)) });
                    self.asm.push(HostOp::Mvn { w: W32, dst: d, src: d });
                }
                _ => unreachable!(),
            }
            self.record(inst, d);
            return;
        }
        let s = self.gprs.read(&mut self.asm, rs);
        let b = self.gprs.read(&mut self.asm, rb);
        let d = self.gprs.bind_write(&mut self.asm, ra, false);
        let b = Operand::Reg(b);
        match sub {
            28 => self.asm.push(HostOp::And { w: W32, dst: d, a: s, b }),
            60 => self.asm.push(HostOp::Bic { w: W32, dst: d, a: s, b }),
            444 => self.asm.push(HostOp::Orr { w: W32, dst: d, a: s, b }),
            412 => self.asm.push(HostOp::Orn { w: W32, dst: d, a: s, b }),
            316 => self.asm.push(HostOp::Eor { w: W32, dst: d, a: s, b }),
            284 => self.asm.push(HostOp::Eon { w: W32, dst: d, a: s, b }),
            476 => {
                self.asm.push(HostOp::And { w: W32, dst: d, a: s, b });
                self.asm.push(HostOp::Mvn { w: W32, dst: d, src: d });
            }
            124 => {
                self.asm.push(HostOp::Orr { w: W32, dst: d, a: s, b });
                self.asm.push(HostOp::Mvn { w: W32, dst: d, src: d });
            }
            _ => unreachable!(),
        }
        self.record(inst, d);
    }

    pub(super) fn extend_sign(&mut self, inst: Instruction) {
        let byte = inst.subop10() == 954;
        if let Some(s) = self.gprs.imm(inst.rs()) {
            let value = if byte {
                s as u8 as i8 as i32 as u32
            } else {
                s as u16 as i16 as i32 as u32
            };
            self.gprs.set_imm(inst.ra(), value);
            self.record_imm(inst, value);
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.rs());
        let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
        if byte {
            self.asm.push(HostOp::Sxtb { dst: d, src: s });
        } else {
            self.asm.push(HostOp::Sxth { dst: d, src: s });
        }
        self.record(inst, d);
    }

    pub(super) fn count_leading_zeros(&mut self, inst: Instruction) {
        if let Some(s) = self.gprs.imm(inst.rs()) {
            let value = s.leading_zeros();
            self.gprs.set_imm(inst.ra(), value);
            self.record_imm(inst, value);
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.rs());
        let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
        self.asm.push(HostOp::Clz { w: W32, dst: d, src: s });
        self.record(inst, d);
    }

    pub(super) fn shift_logical(&mut self, inst: Instruction) {
        let left = inst.subop10() == 24;
        let s_imm = self.gprs.imm(inst.rs());
        let b_imm = self.gprs.imm(inst.rb());
        if let (Some(s), Some(b)) = (s_imm, b_imm) {
            let amount = b & 63;
            let value = if left {
                (u64::from(s) << amount) as u32
            } else {
                (u64::from(s) >> amount) as u32
            };
            self.gprs.set_imm(inst.ra(), value);
            self.record_imm(inst, value);
            return;
        }
        if let Some(b) = b_imm {
            let amount = b & 63;
            if amount >= 32 {
                self.gprs.set_imm(inst.ra(), 0);
                self.record_imm(inst, 0);
                return;
            }
            let s = self.gprs.read(&mut self.asm, inst.rs());
            if amount == 0 {
                self.emit_copy(inst, inst.ra(), s, inst.rs());
                return;
            }
            let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
            let amount = Operand::Imm(u64::from(amount));
            if left {
                self.asm.push(HostOp::Lsl { w: W32, dst: d, src: s, amount });
            } else {
                self.asm.push(HostOp::Lsr { w: W32, dst: d, src: s, amount });
            }
            self.record(inst, d);
            return;
        }
        // The 64-bit shift of the zero-extended value gets the amount-ge-32
        // cases right for free; only a left shift needs a truncation after.
        let s = self.gprs.read(&mut self.asm, inst.rs());
        let b = self.gprs.read(&mut self.asm, inst.rb());
        let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
        if left {
            self.asm.push(HostOp::Lsl { w: W64, dst: d, src: s, amount: Operand::Reg(b) });
            self.asm.push(HostOp::Mov { w: W32, dst: d, src: d });
        } else {
            self.asm.push(HostOp::Lsr { w: W64, dst: d, src: s, amount: Operand::Reg(b) });
        }
        self.record(inst, d);
    }

    /// Arithmetic right shift by a compile-time amount, shared by srawi and
    /// sraw with a constant shift register. `amount` may be up to 63.
    fn sra_imm(&mut self, inst: Instruction, amount: u32) {
        debug_assert!(amount < 64);
        if let Some(s) = self.gprs.imm(inst.rs()) {
            let wide = i64::from(s as i32);
            let value = (wide >> amount) as u32;
            let shifted_out = if amount == 0 { 0 } else { (wide as u64) & ((1 << amount) - 1) };
            self.gprs.set_imm(inst.ra(), value);
            self.set_carry_constant(wide < 0 && shifted_out != 0);
            self.record_imm(inst, value);
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.rs());
        if amount == 0 {
            self.set_carry_constant(false);
            self.emit_copy(inst, inst.ra(), s, inst.rs());
            return;
        }
        if amount >= 32 {
            // Pure sign fill; CA is the sign bit itself (a negative value
            // always loses 1-bits at these widths).
            let ca = if self.wants_ca {
                let t = self.gprs.scratch(&mut self.asm);
                self.asm.push(HostOp::Lsr { w: W32, dst: t, src: s, amount: Operand::Imm(31) });
                Some(t)
            } else {
                None
            };
            let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
            self.asm.push(HostOp::Asr { w: W32, dst: d, src: s, amount: Operand::Imm(31) });
            if let Some(t) = ca {
                self.set_carry_from_reg(t);
                self.gprs.release(t);
            }
            self.record(inst, d);
            return;
        }
        let ca = if self.wants_ca {
            // CA = sign bit & (any shifted-out bit).
            let t = self.gprs.scratch(&mut self.asm);
            self.asm.push(HostOp::Lsl {
                w: W32,
                dst: t,
                src: s,
                amount: Operand::Imm(u64::from(32 - amount)),
            });
            self.asm.push(HostOp::Cmp { w: W32, a: Operand::Reg(t), b: Operand::Imm(0) });
            self.asm.push(HostOp::Cset { dst: t, cond: Cond::Ne });
            let sign = self.gprs.scratch(&mut self.asm);
            self.asm.push(HostOp::Asr { w: W32, dst: sign, src: s, amount: Operand::Imm(31) });
            self.asm.push(HostOp::And { w: W32, dst: t, a: t, b: Operand::Reg(sign) });
            self.gprs.release(sign);
            Some(t)
        } else {
            None
        };
        let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
        self.asm.push(HostOp::Asr { w: W32, dst: d, src: s, amount: Operand::Imm(u64::from(amount)) });
        if let Some(t) = ca {
            self.set_carry_from_reg(t);
            self.gprs.release(t);
        }
        self.record(inst, d);
    }

    pub(super) fn shift_right_algebraic_imm(&mut self, inst: Instruction) {
        self.sra_imm(inst, inst.sh());
    }

    pub(super) fn shift_right_algebraic(&mut self, inst: Instruction) {
        if let Some(b) = self.gprs.imm(inst.rb()) {
            self.sra_imm(inst, b & 63);
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.rs());
        let b = self.gprs.read(&mut self.asm, inst.rb());
        let wide = self.gprs.scratch(&mut self.asm);
        self.asm.push(HostOp::Sxtw { dst: wide, src: s });
        let ca = if self.wants_ca {
            // mask = (1 << amount) - 1; CA = sign & (wide & mask != 0).
            let mask = self.gprs.scratch(&mut self.asm);
            self.asm.push(HostOp::MovImm { dst: mask, imm: 1 });
            self.asm.push(HostOp::Lsl { w: W64, dst: mask, src: mask, amount: Operand::Reg(b) });
            self.asm.push(HostOp::Sub {
                w: W64,
                set_flags: false,
                dst: mask,
                a: mask,
                b: Operand::Imm(1),
            });
            self.asm.push(HostOp::And { w: W64, dst: mask, a: mask, b: Operand::Reg(wide) });
            self.asm.push(HostOp::Cmp { w: W64, a: Operand::Reg(mask), b: Operand::Imm(0) });
            self.asm.push(HostOp::Cset { dst: mask, cond: Cond::Ne });
            let sign = self.gprs.scratch(&mut self.asm);
            self.asm.push(HostOp::Lsr { w: W64, dst: sign, src: wide, amount: Operand::Imm(63) });
            self.asm.push(HostOp::And { w: W32, dst: mask, a: mask, b: Operand::Reg(sign) });
            self.gprs.release(sign);
            Some(mask)
        } else {
            None
        };
        let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
        self.asm.push(HostOp::Asr { w: W64, dst: d, src: wide, amount: Operand::Reg(b) });
        self.asm.push(HostOp::Mov { w: W32, dst: d, src: d });
        self.gprs.release(wide);
        if let Some(t) = ca {
            self.set_carry_from_reg(t);
            self.gprs.release(t);
        }
        self.record(inst, d);
    }

    pub(super) fn rotate_imm(&mut self, inst: Instruction) {
        let sh = inst.sh();
        let mask = inst.rotate_mask();
        if let Some(s) = self.gprs.imm(inst.rs()) {
            let value = s.rotate_left(sh) & mask;
            self.gprs.set_imm(inst.ra(), value);
            self.record_imm(inst, value);
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.rs());
        if mask == u32::MAX {
            if sh == 0 {
                self.emit_copy(inst, inst.ra(), s, inst.rs());
                return;
            }
            let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
            self.asm.push(HostOp::Ror {
                w: W32,
                dst: d,
                src: s,
                amount: Operand::Imm(u64::from(32 - sh)),
            });
            self.record(inst, d);
            return;
        }
        if sh == 0 {
            let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
            self.asm.push(HostOp::And { w: W32, dst: d, a: s, b: Operand::Imm(u64::from(mask)) });
            self.record(inst, d);
            return;
        }
        let mb = inst.mb();
        let me = inst.me();
        if me == 31 && sh + mb >= 32 {
            // srwi pattern: the rotate only feeds bits shifted down from the
            // top, so it is a plain field extract.
            let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
            self.asm.push(HostOp::Ubfx { dst: d, src: s, lsb: 32 - sh, width: 32 - mb });
            self.record(inst, d);
            return;
        }
        if me == 31 - sh && sh + mb < 32 {
            // slwi pattern.
            let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
            self.asm.push(HostOp::Ubfiz { dst: d, src: s, lsb: sh, width: 32 - sh - mb });
            self.record(inst, d);
            return;
        }
        let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
        self.asm.push(HostOp::Ror {
            w: W32,
            dst: d,
            src: s,
            amount: Operand::Imm(u64::from(32 - sh)),
        });
        self.asm.push(HostOp::And { w: W32, dst: d, a: d, b: Operand::Imm(u64::from(mask)) });
        self.record(inst, d);
    }

    pub(super) fn rotate_reg(&mut self, inst: Instruction) {
        let mask = inst.rotate_mask();
        let s_imm = self.gprs.imm(inst.rs());
        let b_imm = self.gprs.imm(inst.rb());
        if let (Some(s), Some(b)) = (s_imm, b_imm) {
            let value = s.rotate_left(b & 31) & mask;
            self.gprs.set_imm(inst.ra(), value);
            self.record_imm(inst, value);
            return;
        }
        if let Some(b) = b_imm {
            // Same shapes as the immediate rotate.
            let sh = b & 31;
            let s = self.gprs.read(&mut self.asm, inst.rs());
            if mask == u32::MAX && sh == 0 {
                self.emit_copy(inst, inst.ra(), s, inst.rs());
                return;
            }
            let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
            if sh != 0 {
                self.asm.push(HostOp::Ror {
                    w: W32,
                    dst: d,
                    src: s,
                    amount: Operand::Imm(u64::from((32 - sh) & 31)),
                });
                if mask != u32::MAX {
                    self.asm.push(HostOp::And {
                        w: W32,
                        dst: d,
                        a: d,
                        b: Operand::Imm(u64::from(mask)),
                    });
                }
            } else {
                self.asm.push(HostOp::And { w: W32, dst: d, a: s, b: Operand::Imm(u64::from(mask)) });
            }
            self.record(inst, d);
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.rs());
        let b = self.gprs.read(&mut self.asm, inst.rb());
        // rotl(s, b) = rotr(s, -b); the rotate masks the amount itself.
        let t = self.gprs.scratch(&mut self.asm);
        self.asm.push(HostOp::Neg { w: W32, dst: t, src: b });
        let d = self.gprs.bind_write(&mut self.asm, inst.ra(), false);
        self.asm.push(HostOp::Ror { w: W32, dst: d, src: s, amount: Operand::Reg(t) });
        self.gprs.release(t);
        if mask != u32::MAX {
            self.asm.push(HostOp::And { w: W32, dst: d, a: d, b: Operand::Imm(u64::from(mask)) });
        }
        self.record(inst, d);
    }

    pub(super) fn rotate_insert(&mut self, inst: Instruction) {
        let sh = inst.sh();
        let mask = inst.rotate_mask();
        let s_imm = self.gprs.imm(inst.rs());
        if mask == u32::MAX {
            // Full-width insert ignores the old value entirely.
            self.rotate_imm(inst);
            return;
        }
        if let (Some(s), Some(old)) = (s_imm, self.gprs.imm(inst.ra())) {
            let value = (s.rotate_left(sh) & mask) | (old & !mask);
            self.gprs.set_imm(inst.ra(), value);
            self.record_imm(inst, value);
            return;
        }
        if let Some(s) = s_imm {
            let insert = s.rotate_left(sh) & mask;
            let d = self.gprs.bind_write(&mut self.asm, inst.ra(), true);
            self.asm.push(HostOp::And { w: W32, dst: d, a: d, b: Operand::Imm(u64::from(!mask)) });
            self.asm.push(HostOp::Orr { w: W32, dst: d, a: d, b: Operand::Imm(u64::from(insert)) });
            self.record(inst, d);
            return;
        }
        let s = self.gprs.read(&mut self.asm, inst.rs());
        let mb = inst.mb();
        let me = inst.me();
        if mb <= me && sh == 31 - me {
            let d = self.gprs.bind_write(&mut self.asm, inst.ra(), true);
            self.asm.push(HostOp::Bfi { dst: d, src: s, lsb: 31 - me, width: me - mb + 1 });
            self.record(inst, d);
            return;
        }
        if mb <= me && me == 31 && (sh == 0 || sh + mb >= 32) {
            let d = self.gprs.bind_write(&mut self.asm, inst.ra(), true);
            self.asm.push(HostOp::Bfxil { dst: d, src: s, lsb: (32 - sh) & 31, width: 32 - mb });
            self.record(inst, d);
            return;
        }
        let t = self.gprs.scratch(&mut self.asm);
        self.asm.push(HostOp::Ror {
            w: W32,
            dst: t,
            src: s,
            amount: Operand::Imm(u64::from((32 - sh) & 31)),
        });
        self.asm.push(HostOp::And { w: W32, dst: t, a: t, b: Operand::Imm(u64::from(mask)) });
        let d = self.gprs.bind_write(&mut self.asm, inst.ra(), true);
        self.asm.push(HostOp::And { w: W32, dst: d, a: d, b: Operand::Imm(u64::from(!mask)) });
        self.asm.push(HostOp::Orr { w: W32, dst: d, a: d, b: Operand::Reg(t) });
        self.gprs.release(t);
        self.record(inst, d);
    }
}

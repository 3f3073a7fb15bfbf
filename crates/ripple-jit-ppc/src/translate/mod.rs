//! Block translation: guest instructions in, host ops out.
//!
//! One [`Translator`] lives for the duration of a block. It owns the
//! assembler and both register caches, plus the deferred carry state. Guest
//! state writes are deferred as long as possible; everything is written back
//! at the block boundary and before every interpreter call.
//!
//! Emitters deal with flags carefully. The host C flag may carry the guest
//! CA between two adjacent instructions, but never further, and a branchy
//! sequence must bind its registers and finish all cache traffic before the
//! first branch so that every arm sees the same compile-time state.

mod float;
mod integer;

use ripple_ppc::{classify, Instruction, OpClass};
use ripple_types::{Cond, CrField, HostReg};
use ripple_types::Width::W32;

use crate::block::{uses_interpreter, BlockAnalysis, CarryFlag};
use crate::emit::{Assembler, HostOp, Operand};
use crate::fprcache::FprCache;
use crate::regcache::RegCache;
use crate::{JitOptions, Program, TranslateError, MAX_BLOCK_LEN};

/// Translate a straight-line block of guest instructions.
pub fn translate(block: &[Instruction], opts: JitOptions) -> Result<Program, TranslateError> {
    if block.is_empty() {
        return Err(TranslateError::EmptyBlock);
    }
    if block.len() > MAX_BLOCK_LEN {
        return Err(TranslateError::BlockTooLarge(block.len()));
    }
    let analysis = BlockAnalysis::analyze(block, &opts);
    let mut t = Translator::new(opts);
    for (i, &inst) in block.iter().enumerate() {
        t.gprs.begin_instruction();
        t.fprs.begin_instruction();
        t.wants_ca = analysis.wants_ca(i);
        t.next_reads_carry = block.get(i + 1).is_some_and(|next| next.reads_carry());

        if uses_interpreter(inst, &t.opts) {
            t.fallback(inst);
            continue;
        }
        match classify(inst) {
            OpClass::AddImm => t.add_imm(inst),
            OpClass::LogicImm => t.logic_imm(inst),
            OpClass::AddImmCarry => t.add_imm_carry(inst),
            OpClass::SubfImmCarry => t.subf_imm_carry(inst),
            OpClass::MulImm => t.mul_imm(inst),
            OpClass::CmpImm => t.cmp_imm(inst),
            OpClass::Cmp => t.cmp(inst),
            OpClass::Add => t.add(inst),
            OpClass::AddExtended => t.add_extended(inst),
            OpClass::Subf => t.subf(inst),
            OpClass::SubfCarry => t.subf_carry(inst),
            OpClass::SubfExtended => t.subf_extended(inst),
            OpClass::Neg => t.neg(inst),
            OpClass::MulLow => t.mul_low(inst),
            OpClass::MulHigh => t.mul_high(inst),
            OpClass::DivSigned => t.div_signed(inst),
            OpClass::DivUnsigned => t.div_unsigned(inst),
            OpClass::Bool => t.boolean(inst),
            OpClass::ExtendSign => t.extend_sign(inst),
            OpClass::CountLeadingZeros => t.count_leading_zeros(inst),
            OpClass::ShiftLogical => t.shift_logical(inst),
            OpClass::ShiftRightAlgebraic => t.shift_right_algebraic(inst),
            OpClass::ShiftRightAlgebraicImm => t.shift_right_algebraic_imm(inst),
            OpClass::RotateImm => t.rotate_imm(inst),
            OpClass::RotateReg => t.rotate_reg(inst),
            OpClass::RotateInsert => t.rotate_insert(inst),
            OpClass::FpArith => t.fp_arith(inst),
            OpClass::FpMove => t.fp_move(inst),
            OpClass::FpSelect => t.fp_select(inst),
            OpClass::FpRound => t.fp_round(inst),
            OpClass::FpConvertToInt => t.fp_convert_to_int(inst),
            OpClass::FpCompare => t.fp_compare(inst),
            OpClass::Fallback => unreachable!("routed to the interpreter above"),
        }
    }
    t.flush_carry();
    t.fprs.flush_all(&mut t.asm, &mut t.gprs);
    t.gprs.flush_all(&mut t.asm);
    let (ops, labels) = t.asm.finish();
    Ok(Program { ops, labels })
}

struct Translator {
    opts: JitOptions,
    asm: Assembler,
    gprs: RegCache,
    fprs: FprCache,
    carry: CarryFlag,
    /// Whether the carry defined by the current instruction is consumed.
    wants_ca: bool,
    /// Whether the directly following instruction reads CA; only then may a
    /// result carry stay in the host flags.
    next_reads_carry: bool,
}

impl Translator {
    fn new(opts: JitOptions) -> Self {
        Self {
            opts,
            asm: Assembler::new(),
            gprs: RegCache::new(),
            fprs: FprCache::new(opts.host_denormals_native),
            carry: CarryFlag::InGuestState,
            wants_ca: false,
            next_reads_carry: false,
        }
    }

    /// Hand one instruction to the interpreter. All deferred state has to be
    /// in the guest register file on both sides of the call.
    fn fallback(&mut self, inst: Instruction) {
        self.flush_carry();
        self.fprs.flush_all(&mut self.asm, &mut self.gprs);
        self.gprs.flush_all(&mut self.asm);
        self.fprs.clear_store_safe();
        self.asm.push(HostOp::CallInterpreter { inst: inst.0 });
    }

    /// Write a deferred carry back to the guest register file.
    fn flush_carry(&mut self) {
        match self.carry {
            CarryFlag::InGuestState => return,
            CarryFlag::ConstantTrue => {
                self.asm.push(HostOp::StoreCarry { src: Operand::Imm(1) });
            }
            CarryFlag::ConstantFalse => {
                self.asm.push(HostOp::StoreCarry { src: Operand::Imm(0) });
            }
            CarryFlag::InHostFlags => {
                let t = self.gprs.scratch(&mut self.asm);
                self.asm.push(HostOp::Cset { dst: t, cond: Cond::Cs });
                self.asm.push(HostOp::StoreCarry { src: Operand::Reg(t) });
                self.gprs.release(t);
            }
        }
        self.carry = CarryFlag::InGuestState;
    }

    /// Make the host C flag equal to the guest CA, wherever it currently
    /// lives. Must run before the flag-setting op that consumes it.
    fn load_carry_into_flags(&mut self) {
        match self.carry {
            CarryFlag::InHostFlags => {}
            CarryFlag::ConstantTrue => {
                // 0 - 0 leaves C set.
                self.asm.push(HostOp::Cmp { w: W32, a: Operand::Imm(0), b: Operand::Imm(0) });
            }
            CarryFlag::ConstantFalse => {
                // 0 + 1 leaves C clear.
                self.asm.push(HostOp::Cmn { w: W32, a: Operand::Imm(0), b: Operand::Imm(1) });
            }
            CarryFlag::InGuestState => {
                let t = self.gprs.scratch(&mut self.asm);
                self.asm.push(HostOp::LoadCarry { dst: t });
                // t - 1: no borrow exactly when CA was set.
                self.asm.push(HostOp::Cmp { w: W32, a: Operand::Reg(t), b: Operand::Imm(1) });
                self.gprs.release(t);
            }
        }
    }

    /// Current carry as a 0/1 value in a scratch register. Only for the
    /// paths where the carry is not known at compile time.
    fn carry_value(&mut self) -> HostReg {
        let t = self.gprs.scratch(&mut self.asm);
        match self.carry {
            CarryFlag::InHostFlags => self.asm.push(HostOp::Cset { dst: t, cond: Cond::Cs }),
            CarryFlag::InGuestState => self.asm.push(HostOp::LoadCarry { dst: t }),
            CarryFlag::ConstantTrue | CarryFlag::ConstantFalse => {
                unreachable!("constant carries fold at compile time")
            }
        }
        t
    }

    /// Record a known carry result.
    fn set_carry_constant(&mut self, value: bool) {
        if !self.wants_ca {
            return;
        }
        self.carry = if value { CarryFlag::ConstantTrue } else { CarryFlag::ConstantFalse };
    }

    /// Record a carry result currently sitting in the host C flag.
    fn set_carry_from_flags(&mut self) {
        if !self.wants_ca {
            return;
        }
        if self.next_reads_carry {
            self.carry = CarryFlag::InHostFlags;
            return;
        }
        let t = self.gprs.scratch(&mut self.asm);
        self.asm.push(HostOp::Cset { dst: t, cond: Cond::Cs });
        self.asm.push(HostOp::StoreCarry { src: Operand::Reg(t) });
        self.gprs.release(t);
        self.carry = CarryFlag::InGuestState;
    }

    /// Record a carry result held as 0/1 in `reg`.
    fn set_carry_from_reg(&mut self, reg: HostReg) {
        if !self.wants_ca {
            return;
        }
        if self.next_reads_carry {
            // reg - 1: C set exactly when reg is 1.
            self.asm.push(HostOp::Cmp { w: W32, a: Operand::Reg(reg), b: Operand::Imm(1) });
            self.carry = CarryFlag::InHostFlags;
        } else {
            self.asm.push(HostOp::StoreCarry { src: Operand::Reg(reg) });
            self.carry = CarryFlag::InGuestState;
        }
    }

    fn cr0_from_reg(&mut self, reg: HostReg) {
        let cr = self.gprs.bind_cr(&mut self.asm, CrField::new(0));
        self.asm.push(HostOp::Sxtw { dst: cr, src: reg });
    }

    fn cr0_from_imm(&mut self, value: u32) {
        let cr = self.gprs.bind_cr(&mut self.asm, CrField::new(0));
        self.asm.push(HostOp::MovImm { dst: cr, imm: value as i32 as i64 as u64 });
    }

    /// Record-form CR0 update from the register holding the result.
    fn record(&mut self, inst: Instruction, reg: HostReg) {
        if inst.rc() {
            self.cr0_from_reg(reg);
        }
    }

    fn record_imm(&mut self, inst: Instruction, value: u32) {
        if inst.rc() {
            self.cr0_from_imm(value);
        }
    }
}

//! Reference executor for the symbolic host ops.
//!
//! Runs a [`Program`] against a [`HostState`] and the guest [`CpuState`],
//! giving the op stream its executable meaning. Tests use it to compare
//! translated code against the interpreter; it is also the written-down
//! contract an encoder has to honor. Helper and interpreter calls scribble a
//! sentinel over every caller-saved register so violations of the flush
//! discipline show up as wrong guest state instead of passing silently.

use ripple_cpu_core::interp::{self, convert_to_word_truncate, InterpError};
use ripple_cpu_core::softfloat::{is_snan_single, single_to_double, DOUBLE_QUIET_BIT};
use ripple_cpu_core::CpuState;
use ripple_ppc::Instruction;
use ripple_types::{Cond, HostFpReg, HostReg, Width};
use thiserror::Error;

use crate::emit::{
    fpr_is_caller_saved, gpr_is_caller_saved, Helper, HostOp, Operand, HOST_FPR_COUNT,
    HOST_GPR_COUNT,
};
use crate::Program;

const GPR_CLOBBER: u64 = 0xDEAD_DEAD_DEAD_DEAD;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("interpreter fallback failed: {0}")]
    Interp(#[from] InterpError),
}

/// Host machine state: integer registers, vector registers, NZCV.
#[derive(Debug, Clone)]
pub struct HostState {
    pub gpr: [u64; HOST_GPR_COUNT],
    pub fpr: [[u64; 2]; HOST_FPR_COUNT],
    pub n: bool,
    pub z: bool,
    pub c: bool,
    pub v: bool,
    /// Whether the host floating-point unit handles denormal singles the way
    /// the guest does. When false, the native conversion and single-compare
    /// ops flush denormal inputs to zero, which is exactly the hazard the
    /// translator's slow paths exist to avoid.
    pub host_denormals_native: bool,
}

impl HostState {
    #[must_use]
    pub fn new(host_denormals_native: bool) -> Self {
        Self {
            gpr: [0; HOST_GPR_COUNT],
            fpr: [[0; 2]; HOST_FPR_COUNT],
            n: false,
            z: false,
            c: false,
            v: false,
            host_denormals_native,
        }
    }

    fn cond_holds(&self, cond: Cond) -> bool {
        match cond {
            Cond::Eq => self.z,
            Cond::Ne => !self.z,
            Cond::Cs => self.c,
            Cond::Cc => !self.c,
            Cond::Mi => self.n,
            Cond::Pl => !self.n,
            Cond::Vs => self.v,
            Cond::Vc => !self.v,
            Cond::Hi => self.c && !self.z,
            Cond::Ls => !(self.c && !self.z),
            Cond::Ge => self.n == self.v,
            Cond::Lt => self.n != self.v,
            Cond::Gt => !self.z && self.n == self.v,
            Cond::Le => !(!self.z && self.n == self.v),
        }
    }

    fn operand(&self, op: Operand) -> u64 {
        match op {
            Operand::Reg(r) => self.gpr[r.index()],
            Operand::Imm(v) => v,
        }
    }

    /// Width-aware write: 32-bit results zero-extend.
    fn write(&mut self, w: Width, dst: HostReg, value: u64) {
        self.gpr[dst.index()] = match w {
            Width::W32 => u64::from(value as u32),
            Width::W64 => value,
        };
    }

    /// a + b + carry_in, optionally updating NZCV. Subtraction goes through
    /// here with `b` complemented, matching the hardware flag convention.
    fn add_with_flags(&mut self, w: Width, a: u64, b: u64, carry_in: bool, set: bool) -> u64 {
        match w {
            Width::W32 => {
                let a = a as u32;
                let b = b as u32;
                let wide = u64::from(a) + u64::from(b) + u64::from(carry_in);
                let r = wide as u32;
                if set {
                    self.n = r >> 31 != 0;
                    self.z = r == 0;
                    self.c = wide >> 32 != 0;
                    self.v = (!(a ^ b) & (a ^ r)) >> 31 != 0;
                }
                u64::from(r)
            }
            Width::W64 => {
                let wide = u128::from(a) + u128::from(b) + u128::from(carry_in);
                let r = wide as u64;
                if set {
                    self.n = r >> 63 != 0;
                    self.z = r == 0;
                    self.c = wide >> 64 != 0;
                    self.v = (!(a ^ b) & (a ^ r)) >> 63 != 0;
                }
                r
            }
        }
    }

    fn clobber_caller_saved(&mut self) {
        for i in 0..HOST_GPR_COUNT {
            if gpr_is_caller_saved(HostReg(i as u8)) {
                self.gpr[i] = GPR_CLOBBER;
            }
        }
        for i in 0..HOST_FPR_COUNT {
            if fpr_is_caller_saved(HostFpReg(i as u8)) {
                self.fpr[i] = [GPR_CLOBBER; 2];
            }
        }
        self.n = true;
        self.z = false;
        self.c = true;
        self.v = true;
    }

    fn lane_f64(&self, reg: HostFpReg, lane: usize) -> f64 {
        f64::from_bits(self.fpr[reg.index()][lane])
    }

    fn lane_f32(&self, reg: HostFpReg, lane: usize) -> f32 {
        f32::from_bits(self.fpr[reg.index()][lane] as u32)
    }

    fn flush_single_input(&self, x: f32) -> f32 {
        if !self.host_denormals_native && x.is_subnormal() {
            if x.is_sign_negative() {
                -0.0
            } else {
                0.0
            }
        } else {
            x
        }
    }
}

/// Denormal single results flush to a signed zero, matching the guest's
/// non-IEEE single-precision mode.
fn flush_single_output(x: f32) -> f32 {
    if x.is_subnormal() {
        if x.is_sign_negative() {
            -0.0
        } else {
            0.0
        }
    } else {
        x
    }
}

fn shift_amount(w: Width, amount: u64) -> u32 {
    match w {
        Width::W32 => (amount & 31) as u32,
        Width::W64 => (amount & 63) as u32,
    }
}

fn bf_mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Execute `prog` to completion.
pub fn run(prog: &Program, host: &mut HostState, cpu: &mut CpuState) -> Result<(), ExecError> {
    let mut pc = 0usize;
    while pc < prog.ops.len() {
        let op = prog.ops[pc];
        pc += 1;
        match op {
            HostOp::MovImm { dst, imm } => host.gpr[dst.index()] = imm,
            HostOp::Mov { w, dst, src } => {
                let v = host.gpr[src.index()];
                host.write(w, dst, v);
            }
            HostOp::Mvn { w, dst, src } => {
                let v = !host.gpr[src.index()];
                host.write(w, dst, v);
            }
            HostOp::Add { w, set_flags, dst, a, b } => {
                let (a, b) = (host.gpr[a.index()], host.operand(b));
                let r = host.add_with_flags(w, a, b, false, set_flags);
                host.write(w, dst, r);
            }
            HostOp::Adc { w, set_flags, dst, a, b } => {
                let (a, b, c) = (host.gpr[a.index()], host.operand(b), host.c);
                let r = host.add_with_flags(w, a, b, c, set_flags);
                host.write(w, dst, r);
            }
            HostOp::Sub { w, set_flags, dst, a, b } => {
                let (a, b) = (host.gpr[a.index()], !host.operand(b));
                let r = host.add_with_flags(w, a, b, true, set_flags);
                host.write(w, dst, r);
            }
            HostOp::Sbc { w, set_flags, dst, a, b } => {
                let (a, b, c) = (host.gpr[a.index()], !host.operand(b), host.c);
                let r = host.add_with_flags(w, a, b, c, set_flags);
                host.write(w, dst, r);
            }
            HostOp::Neg { w, dst, src } => {
                let b = !host.gpr[src.index()];
                let r = host.add_with_flags(w, 0, b, true, false);
                host.write(w, dst, r);
            }
            HostOp::And { w, dst, a, b } => {
                let r = host.gpr[a.index()] & host.operand(b);
                host.write(w, dst, r);
            }
            HostOp::Bic { w, dst, a, b } => {
                let r = host.gpr[a.index()] & !host.operand(b);
                host.write(w, dst, r);
            }
            HostOp::Orr { w, dst, a, b } => {
                let r = host.gpr[a.index()] | host.operand(b);
                host.write(w, dst, r);
            }
            HostOp::Orn { w, dst, a, b } => {
                let r = host.gpr[a.index()] | !host.operand(b);
                host.write(w, dst, r);
            }
            HostOp::Eor { w, dst, a, b } => {
                let r = host.gpr[a.index()] ^ host.operand(b);
                host.write(w, dst, r);
            }
            HostOp::Eon { w, dst, a, b } => {
                let r = host.gpr[a.index()] ^ !host.operand(b);
                host.write(w, dst, r);
            }
            HostOp::Lsl { w, dst, src, amount } => {
                let amt = shift_amount(w, host.operand(amount));
                let r = match w {
                    Width::W32 => u64::from((host.gpr[src.index()] as u32) << amt),
                    Width::W64 => host.gpr[src.index()] << amt,
                };
                host.write(w, dst, r);
            }
            HostOp::Lsr { w, dst, src, amount } => {
                let amt = shift_amount(w, host.operand(amount));
                let r = match w {
                    Width::W32 => u64::from((host.gpr[src.index()] as u32) >> amt),
                    Width::W64 => host.gpr[src.index()] >> amt,
                };
                host.write(w, dst, r);
            }
            HostOp::Asr { w, dst, src, amount } => {
                let amt = shift_amount(w, host.operand(amount));
                let r = match w {
                    Width::W32 => ((host.gpr[src.index()] as u32 as i32) >> amt) as u32 as u64,
                    Width::W64 => ((host.gpr[src.index()] as i64) >> amt) as u64,
                };
                host.write(w, dst, r);
            }
            HostOp::Ror { w, dst, src, amount } => {
                let amt = shift_amount(w, host.operand(amount));
                let r = match w {
                    Width::W32 => u64::from((host.gpr[src.index()] as u32).rotate_right(amt)),
                    Width::W64 => host.gpr[src.index()].rotate_right(amt),
                };
                host.write(w, dst, r);
            }
            HostOp::Clz { w, dst, src } => {
                let r = match w {
                    Width::W32 => u64::from((host.gpr[src.index()] as u32).leading_zeros()),
                    Width::W64 => u64::from(host.gpr[src.index()].leading_zeros()),
                };
                host.write(w, dst, r);
            }
            HostOp::Sxtb { dst, src } => {
                let r = host.gpr[src.index()] as u8 as i8 as i32 as u32;
                host.write(Width::W32, dst, u64::from(r));
            }
            HostOp::Sxth { dst, src } => {
                let r = host.gpr[src.index()] as u16 as i16 as i32 as u32;
                host.write(Width::W32, dst, u64::from(r));
            }
            HostOp::Sxtw { dst, src } => {
                host.gpr[dst.index()] = host.gpr[src.index()] as u32 as i32 as i64 as u64;
            }
            HostOp::Ubfx { dst, src, lsb, width } => {
                let r = ((host.gpr[src.index()] as u32) >> lsb) & bf_mask(width);
                host.write(Width::W32, dst, u64::from(r));
            }
            HostOp::Ubfiz { dst, src, lsb, width } => {
                let r = ((host.gpr[src.index()] as u32) & bf_mask(width)) << lsb;
                host.write(Width::W32, dst, u64::from(r));
            }
            HostOp::Bfi { dst, src, lsb, width } => {
                let mask = bf_mask(width) << lsb;
                let field = ((host.gpr[src.index()] as u32) << lsb) & mask;
                let r = ((host.gpr[dst.index()] as u32) & !mask) | field;
                host.write(Width::W32, dst, u64::from(r));
            }
            HostOp::Bfxil { dst, src, lsb, width } => {
                let mask = bf_mask(width);
                let field = ((host.gpr[src.index()] as u32) >> lsb) & mask;
                let r = ((host.gpr[dst.index()] as u32) & !mask) | field;
                host.write(Width::W32, dst, u64::from(r));
            }
            HostOp::Mul { w, dst, a, b } => {
                let r = host.gpr[a.index()].wrapping_mul(host.gpr[b.index()]);
                host.write(w, dst, r);
            }
            HostOp::SMull { dst, a, b } => {
                let a = host.gpr[a.index()] as u32 as i32 as i64;
                let b = host.gpr[b.index()] as u32 as i32 as i64;
                host.gpr[dst.index()] = a.wrapping_mul(b) as u64;
            }
            HostOp::UMull { dst, a, b } => {
                let a = u64::from(host.gpr[a.index()] as u32);
                let b = u64::from(host.gpr[b.index()] as u32);
                host.gpr[dst.index()] = a * b;
            }
            HostOp::SDiv { w, dst, a, b } => {
                let r = match w {
                    Width::W32 => {
                        let a = host.gpr[a.index()] as u32 as i32;
                        let b = host.gpr[b.index()] as u32 as i32;
                        if b == 0 {
                            0
                        } else {
                            a.wrapping_div(b) as u32 as u64
                        }
                    }
                    Width::W64 => {
                        let a = host.gpr[a.index()] as i64;
                        let b = host.gpr[b.index()] as i64;
                        if b == 0 {
                            0
                        } else {
                            a.wrapping_div(b) as u64
                        }
                    }
                };
                host.write(w, dst, r);
            }
            HostOp::UDiv { w, dst, a, b } => {
                let r = match w {
                    Width::W32 => {
                        let a = host.gpr[a.index()] as u32;
                        let b = host.gpr[b.index()] as u32;
                        if b == 0 {
                            0
                        } else {
                            u64::from(a / b)
                        }
                    }
                    Width::W64 => {
                        let a = host.gpr[a.index()];
                        let b = host.gpr[b.index()];
                        if b == 0 {
                            0
                        } else {
                            a / b
                        }
                    }
                };
                host.write(w, dst, r);
            }
            HostOp::Cmp { w, a, b } => {
                let (a, b) = (host.operand(a), !host.operand(b));
                host.add_with_flags(w, a, b, true, true);
            }
            HostOp::Cmn { w, a, b } => {
                let (a, b) = (host.operand(a), host.operand(b));
                host.add_with_flags(w, a, b, false, true);
            }
            HostOp::Cset { dst, cond } => {
                host.gpr[dst.index()] = u64::from(host.cond_holds(cond));
            }
            HostOp::Csel { w, dst, t, f, cond } => {
                let r = if host.cond_holds(cond) {
                    host.gpr[t.index()]
                } else {
                    host.gpr[f.index()]
                };
                host.write(w, dst, r);
            }
            HostOp::LoadGpr { dst, gpr } => host.gpr[dst.index()] = u64::from(cpu.gpr[gpr.index()]),
            HostOp::StoreGpr { src, gpr } => cpu.gpr[gpr.index()] = host.gpr[src.index()] as u32,
            HostOp::LoadCarry { dst } => host.gpr[dst.index()] = u64::from(cpu.xer_ca),
            HostOp::StoreCarry { src } => cpu.xer_ca = host.operand(src) != 0,
            HostOp::LoadCr { dst, field } => host.gpr[dst.index()] = cpu.cr_internal(field),
            HostOp::StoreCr { src, field } => cpu.set_cr_internal(field, host.gpr[src.index()]),
            HostOp::LoadFpr { dst, fpr } => {
                host.fpr[dst.index()] = [cpu.ps0(fpr), cpu.ps1(fpr)];
            }
            HostOp::StoreFpr { src, fpr } => {
                cpu.set_ps0(fpr, host.fpr[src.index()][0]);
                cpu.set_ps1(fpr, host.fpr[src.index()][1]);
            }
            HostOp::B { target } => pc = prog.labels[target.0 as usize],
            HostOp::Bc { cond, target } => {
                if host.cond_holds(cond) {
                    pc = prog.labels[target.0 as usize];
                }
            }
            HostOp::Cbz { w, reg, target } => {
                let v = match w {
                    Width::W32 => u64::from(host.gpr[reg.index()] as u32),
                    Width::W64 => host.gpr[reg.index()],
                };
                if v == 0 {
                    pc = prog.labels[target.0 as usize];
                }
            }
            HostOp::Cbnz { w, reg, target } => {
                let v = match w {
                    Width::W32 => u64::from(host.gpr[reg.index()] as u32),
                    Width::W64 => host.gpr[reg.index()],
                };
                if v != 0 {
                    pc = prog.labels[target.0 as usize];
                }
            }
            HostOp::CallHelper { helper, dst, src } => {
                let arg = host.fpr[src.index()][0] as u32;
                let ret = match helper {
                    Helper::SingleToDouble => single_to_double(arg),
                };
                host.clobber_caller_saved();
                host.fpr[dst.index()][0] = ret;
            }
            HostOp::CallInterpreter { inst } => {
                interp::execute(cpu, Instruction(inst))?;
                host.clobber_caller_saved();
            }
            HostOp::FMov { dst, src } => host.fpr[dst.index()] = host.fpr[src.index()],
            HostOp::FDup { dst, src } => {
                let lane = host.fpr[src.index()][0];
                host.fpr[dst.index()] = [lane, lane];
            }
            HostOp::FMovLane { dst, dst_lane, src, src_lane } => {
                host.fpr[dst.index()][usize::from(dst_lane)] =
                    host.fpr[src.index()][usize::from(src_lane)];
            }
            HostOp::FAdd { single, pair, dst, a, b } => {
                fp_bin(host, single, pair, dst, a, b, |a, b| a + b, |a, b| a + b);
            }
            HostOp::FSub { single, pair, dst, a, b } => {
                fp_bin(host, single, pair, dst, a, b, |a, b| a - b, |a, b| a - b);
            }
            HostOp::FMul { single, pair, dst, a, b } => {
                fp_bin(host, single, pair, dst, a, b, |a, b| a * b, |a, b| a * b);
            }
            HostOp::FDiv { single, pair, dst, a, b } => {
                fp_bin(host, single, pair, dst, a, b, |a, b| a / b, |a, b| a / b);
            }
            HostOp::FMadd { single, pair, dst, n, m, acc } => {
                fp_fma(host, single, pair, dst, n, m, acc, |n, m, a| n.mul_add(m, a), |n, m, a| {
                    n.mul_add(m, a)
                });
            }
            HostOp::FMsub { single, pair, dst, n, m, acc } => {
                fp_fma(host, single, pair, dst, n, m, acc, |n, m, a| (-n).mul_add(m, a), |n, m, a| {
                    (-n).mul_add(m, a)
                });
            }
            HostOp::FNmadd { single, pair, dst, n, m, acc } => {
                fp_fma(host, single, pair, dst, n, m, acc, |n, m, a| -n.mul_add(m, a), |n, m, a| {
                    -n.mul_add(m, a)
                });
            }
            HostOp::FNmsub { single, pair, dst, n, m, acc } => {
                fp_fma(host, single, pair, dst, n, m, acc, |n, m, a| n.mul_add(m, -a), |n, m, a| {
                    n.mul_add(m, -a)
                });
            }
            HostOp::FNeg { pair, dst, src } => {
                let lanes = host.fpr[src.index()];
                let flip = |x: u64| x ^ 0x8000_0000_0000_0000;
                host.fpr[dst.index()][0] = flip(lanes[0]);
                if pair {
                    host.fpr[dst.index()][1] = flip(lanes[1]);
                }
            }
            HostOp::FAbs { pair, dst, src } => {
                let lanes = host.fpr[src.index()];
                let clear = |x: u64| x & !0x8000_0000_0000_0000;
                host.fpr[dst.index()][0] = clear(lanes[0]);
                if pair {
                    host.fpr[dst.index()][1] = clear(lanes[1]);
                }
            }
            HostOp::FCmp { single, a, b } => {
                let (x, y) = if single {
                    let x = host.flush_single_input(host.lane_f32(a, 0));
                    let y = match b {
                        Some(b) => host.flush_single_input(host.lane_f32(b, 0)),
                        None => 0.0,
                    };
                    (f64::from(x), f64::from(y))
                } else {
                    let x = host.lane_f64(a, 0);
                    let y = b.map_or(0.0, |b| host.lane_f64(b, 0));
                    (x, y)
                };
                if x.is_nan() || y.is_nan() {
                    (host.n, host.z, host.c, host.v) = (false, false, true, true);
                } else if x == y {
                    (host.n, host.z, host.c, host.v) = (false, true, true, false);
                } else if x < y {
                    (host.n, host.z, host.c, host.v) = (true, false, false, false);
                } else {
                    (host.n, host.z, host.c, host.v) = (false, false, true, false);
                }
            }
            HostOp::FCsel { dst, t, f, cond } => {
                let r = if host.cond_holds(cond) {
                    host.fpr[t.index()][0]
                } else {
                    host.fpr[f.index()][0]
                };
                host.fpr[dst.index()][0] = r;
            }
            HostOp::FWiden { dst, src } => {
                let bits = host.fpr[src.index()][0] as u32;
                host.fpr[dst.index()][0] = widen_native(host, bits);
            }
            HostOp::FWidenPair { dst, src } => {
                let lanes = host.fpr[src.index()];
                host.fpr[dst.index()][0] = widen_native(host, lanes[0] as u32);
                host.fpr[dst.index()][1] = widen_native(host, lanes[1] as u32);
            }
            HostOp::FNarrow { dst, src } => {
                let bits = ripple_cpu_core::softfloat::narrow_round(host.fpr[src.index()][0]);
                host.fpr[dst.index()][0] = u64::from(bits);
            }
            HostOp::FNarrowPair { dst, src } => {
                let lanes = host.fpr[src.index()];
                host.fpr[dst.index()][0] =
                    u64::from(ripple_cpu_core::softfloat::narrow_round(lanes[0]));
                host.fpr[dst.index()][1] =
                    u64::from(ripple_cpu_core::softfloat::narrow_round(lanes[1]));
            }
            HostOp::FToI32 { dst, src } => {
                let word = convert_to_word_truncate(host.lane_f64(src, 0));
                host.fpr[dst.index()][0] = u64::from(word);
            }
            HostOp::VAndImm { dst, src, imm } => {
                let lanes = host.fpr[src.index()];
                host.fpr[dst.index()] = [lanes[0] & imm, lanes[1] & imm];
            }
            HostOp::VOrImm { dst, src, imm } => {
                let lanes = host.fpr[src.index()];
                host.fpr[dst.index()] = [lanes[0] | imm, lanes[1] | imm];
            }
            HostOp::VAdd64 { dst, a, b } => {
                let a = host.fpr[a.index()];
                let b = host.fpr[b.index()];
                host.fpr[dst.index()] = [a[0].wrapping_add(b[0]), a[1].wrapping_add(b[1])];
            }
        }
    }
    Ok(())
}

fn widen_native(host: &HostState, bits: u32) -> u64 {
    let f = f32::from_bits(bits);
    if !host.host_denormals_native && f.is_subnormal() {
        return single_to_double(bits & 0x8000_0000);
    }
    let mut wide = single_to_double(bits);
    if is_snan_single(bits) {
        wide |= DOUBLE_QUIET_BIT;
    }
    wide
}

fn fp_bin(
    host: &mut HostState,
    single: bool,
    pair: bool,
    dst: HostFpReg,
    a: HostFpReg,
    b: HostFpReg,
    fd: impl Fn(f64, f64) -> f64,
    fs: impl Fn(f32, f32) -> f32,
) {
    let lanes = if pair { 0..2 } else { 0..1 };
    for lane in lanes {
        let r = if single {
            let x = host.flush_single_input(host.lane_f32(a, lane));
            let y = host.flush_single_input(host.lane_f32(b, lane));
            u64::from(flush_single_output(fs(x, y)).to_bits())
        } else {
            fd(host.lane_f64(a, lane), host.lane_f64(b, lane)).to_bits()
        };
        host.fpr[dst.index()][lane] = r;
    }
}

#[allow(clippy::too_many_arguments)]
fn fp_fma(
    host: &mut HostState,
    single: bool,
    pair: bool,
    dst: HostFpReg,
    n: HostFpReg,
    m: HostFpReg,
    acc: HostFpReg,
    fd: impl Fn(f64, f64, f64) -> f64,
    fs: impl Fn(f32, f32, f32) -> f32,
) {
    let lanes = if pair { 0..2 } else { 0..1 };
    for lane in lanes {
        let r = if single {
            let x = host.flush_single_input(host.lane_f32(n, lane));
            let y = host.flush_single_input(host.lane_f32(m, lane));
            let z = host.flush_single_input(host.lane_f32(acc, lane));
            u64::from(flush_single_output(fs(x, y, z)).to_bits())
        } else {
            fd(host.lane_f64(n, lane), host.lane_f64(m, lane), host.lane_f64(acc, lane)).to_bits()
        };
        host.fpr[dst.index()][lane] = r;
    }
}

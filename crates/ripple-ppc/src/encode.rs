//! Instruction-word builders.
//!
//! Thin encoders for the instruction forms the workspace deals in, used by
//! tests and tooling to assemble guest code without magic-number soup. Field
//! order follows the assembly mnemonics (destination first).

fn d_form(opcd: u32, d: u8, a: u8, imm: u16) -> u32 {
    (opcd << 26) | (u32::from(d) << 21) | (u32::from(a) << 16) | u32::from(imm)
}

fn x_form(opcd: u32, d: u8, a: u8, b: u8, subop10: u32, rc: bool) -> u32 {
    (opcd << 26)
        | (u32::from(d) << 21)
        | (u32::from(a) << 16)
        | (u32::from(b) << 11)
        | (subop10 << 1)
        | u32::from(rc)
}

fn a_form(opcd: u32, d: u8, a: u8, b: u8, c: u8, subop5: u32, rc: bool) -> u32 {
    (opcd << 26)
        | (u32::from(d) << 21)
        | (u32::from(a) << 16)
        | (u32::from(b) << 11)
        | (u32::from(c) << 6)
        | (subop5 << 1)
        | u32::from(rc)
}

pub fn addi(rt: u8, ra: u8, imm: i16) -> u32 {
    d_form(14, rt, ra, imm as u16)
}

pub fn addis(rt: u8, ra: u8, imm: i16) -> u32 {
    d_form(15, rt, ra, imm as u16)
}

pub fn addic(rt: u8, ra: u8, imm: i16) -> u32 {
    d_form(12, rt, ra, imm as u16)
}

pub fn addic_rc(rt: u8, ra: u8, imm: i16) -> u32 {
    d_form(13, rt, ra, imm as u16)
}

pub fn subfic(rt: u8, ra: u8, imm: i16) -> u32 {
    d_form(8, rt, ra, imm as u16)
}

pub fn mulli(rt: u8, ra: u8, imm: i16) -> u32 {
    d_form(7, rt, ra, imm as u16)
}

pub fn cmpwi(crf: u8, ra: u8, imm: i16) -> u32 {
    d_form(11, crf << 2, ra, imm as u16)
}

pub fn cmplwi(crf: u8, ra: u8, imm: u16) -> u32 {
    d_form(10, crf << 2, ra, imm)
}

pub fn ori(ra: u8, rs: u8, imm: u16) -> u32 {
    d_form(24, rs, ra, imm)
}

pub fn oris(ra: u8, rs: u8, imm: u16) -> u32 {
    d_form(25, rs, ra, imm)
}

pub fn xori(ra: u8, rs: u8, imm: u16) -> u32 {
    d_form(26, rs, ra, imm)
}

pub fn xoris(ra: u8, rs: u8, imm: u16) -> u32 {
    d_form(27, rs, ra, imm)
}

pub fn andi_rc(ra: u8, rs: u8, imm: u16) -> u32 {
    d_form(28, rs, ra, imm)
}

pub fn andis_rc(ra: u8, rs: u8, imm: u16) -> u32 {
    d_form(29, rs, ra, imm)
}

fn m_form(opcd: u32, ra: u8, rs: u8, sh: u8, mb: u8, me: u8, rc: bool) -> u32 {
    (opcd << 26)
        | (u32::from(rs) << 21)
        | (u32::from(ra) << 16)
        | (u32::from(sh) << 11)
        | (u32::from(mb) << 6)
        | (u32::from(me) << 1)
        | u32::from(rc)
}

pub fn rlwinm(ra: u8, rs: u8, sh: u8, mb: u8, me: u8, rc: bool) -> u32 {
    m_form(21, ra, rs, sh, mb, me, rc)
}

pub fn rlwnm(ra: u8, rs: u8, rb: u8, mb: u8, me: u8, rc: bool) -> u32 {
    m_form(23, ra, rs, rb, mb, me, rc)
}

pub fn rlwimi(ra: u8, rs: u8, sh: u8, mb: u8, me: u8, rc: bool) -> u32 {
    m_form(20, ra, rs, sh, mb, me, rc)
}

macro_rules! xo_ops {
    ($($name:ident => $subop:expr,)*) => {
        $(
            pub fn $name(rt: u8, ra: u8, rb: u8, rc: bool) -> u32 {
                x_form(31, rt, ra, rb, $subop, rc)
            }
        )*
    };
}

xo_ops! {
    add => 266,
    addc => 10,
    adde => 138,
    subf => 40,
    subfc => 8,
    subfe => 136,
    mullw => 235,
    mulhw => 75,
    mulhwu => 11,
    divw => 491,
    divwu => 459,
}

macro_rules! xo_unary_ops {
    ($($name:ident => $subop:expr,)*) => {
        $(
            pub fn $name(rt: u8, ra: u8, rc: bool) -> u32 {
                x_form(31, rt, ra, 0, $subop, rc)
            }
        )*
    };
}

xo_unary_ops! {
    addze => 202,
    subfze => 200,
    neg => 104,
}

macro_rules! logic_ops {
    ($($name:ident => $subop:expr,)*) => {
        $(
            pub fn $name(ra: u8, rs: u8, rb: u8, rc: bool) -> u32 {
                x_form(31, rs, ra, rb, $subop, rc)
            }
        )*
    };
}

logic_ops! {
    and => 28,
    andc => 60,
    or => 444,
    orc => 412,
    xor => 316,
    nand => 476,
    nor => 124,
    eqv => 284,
    slw => 24,
    srw => 536,
    sraw => 792,
}

pub fn srawi(ra: u8, rs: u8, sh: u8, rc: bool) -> u32 {
    x_form(31, rs, ra, sh, 824, rc)
}

pub fn extsb(ra: u8, rs: u8, rc: bool) -> u32 {
    x_form(31, rs, ra, 0, 954, rc)
}

pub fn extsh(ra: u8, rs: u8, rc: bool) -> u32 {
    x_form(31, rs, ra, 0, 922, rc)
}

pub fn cntlzw(ra: u8, rs: u8, rc: bool) -> u32 {
    x_form(31, rs, ra, 0, 26, rc)
}

pub fn cmpw(crf: u8, ra: u8, rb: u8) -> u32 {
    x_form(31, crf << 2, ra, rb, 0, false)
}

pub fn cmplw(crf: u8, ra: u8, rb: u8) -> u32 {
    x_form(31, crf << 2, ra, rb, 32, false)
}

macro_rules! fp_ab_ops {
    ($($name:ident => ($opcd:expr, $subop:expr),)*) => {
        $(
            pub fn $name(frt: u8, fra: u8, frb: u8) -> u32 {
                a_form($opcd, frt, fra, frb, 0, $subop, false)
            }
        )*
    };
}

fp_ab_ops! {
    fadd => (63, 21),
    fadds => (59, 21),
    fsub => (63, 20),
    fsubs => (59, 20),
    fdiv => (63, 18),
    fdivs => (59, 18),
    ps_add => (4, 21),
    ps_sub => (4, 20),
    ps_div => (4, 18),
}

macro_rules! fp_ac_ops {
    ($($name:ident => ($opcd:expr, $subop:expr),)*) => {
        $(
            pub fn $name(frt: u8, fra: u8, frc: u8) -> u32 {
                a_form($opcd, frt, fra, 0, frc, $subop, false)
            }
        )*
    };
}

fp_ac_ops! {
    fmul => (63, 25),
    fmuls => (59, 25),
    ps_mul => (4, 25),
}

macro_rules! fp_fma_ops {
    ($($name:ident => ($opcd:expr, $subop:expr),)*) => {
        $(
            pub fn $name(frt: u8, fra: u8, frc: u8, frb: u8) -> u32 {
                a_form($opcd, frt, fra, frb, frc, $subop, false)
            }
        )*
    };
}

fp_fma_ops! {
    fmadd => (63, 29),
    fmadds => (59, 29),
    fmsub => (63, 28),
    fmsubs => (59, 28),
    fnmadd => (63, 31),
    fnmadds => (59, 31),
    fnmsub => (63, 30),
    fnmsubs => (59, 30),
    ps_madd => (4, 29),
}

pub fn fsel(frt: u8, fra: u8, frc: u8, frb: u8) -> u32 {
    a_form(63, frt, fra, frb, frc, 23, false)
}

macro_rules! fp_b_ops {
    ($($name:ident => $subop:expr,)*) => {
        $(
            pub fn $name(frt: u8, frb: u8) -> u32 {
                x_form(63, frt, 0, frb, $subop, false)
            }
        )*
    };
}

fp_b_ops! {
    fmr => 72,
    fneg => 40,
    fabs => 264,
    fnabs => 136,
    frsp => 12,
    fctiwz => 15,
}

pub fn fcmpu(crf: u8, fra: u8, frb: u8) -> u32 {
    x_form(63, crf << 2, fra, frb, 0, false)
}

pub fn fcmpo(crf: u8, fra: u8, frb: u8) -> u32 {
    x_form(63, crf << 2, fra, frb, 32, false)
}

pub fn ps_merge00(frt: u8, fra: u8, frb: u8) -> u32 {
    x_form(4, frt, fra, frb, 528, false)
}

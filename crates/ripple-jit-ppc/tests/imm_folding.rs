//! Immediate folding: blocks built around compile-time-known values must
//! still leave the exact guest state the interpreter produces, including
//! CR0 for record forms that fold away completely.

mod common;

use common::{assert_matches, random_int_state, rng};
use rand::Rng;
use ripple_cpu_core::CpuState;
use ripple_ppc::encode;

#[test]
fn immediate_build_then_consume() {
    let st = CpuState::new();
    assert_matches(
        &[
            encode::addis(3, 0, 0x8000u16 as i16),
            encode::ori(3, 3, 0x1234),
            encode::addi(4, 3, -1),
            encode::add(5, 3, 4, true),
        ],
        &st,
    );
}

#[test]
fn record_forms_on_folded_constants() {
    let st = CpuState::new();
    // andi. of two known constants never emits arithmetic but must still
    // set CR0, here to EQ, then to GT.
    assert_matches(
        &[
            encode::addi(3, 0, 0x0F0F),
            encode::andi_rc(4, 3, 0xF0F0),
            encode::andis_rc(5, 3, 0xFFFF),
            encode::ori(6, 3, 0x00F0),
            encode::andi_rc(7, 6, 0x00FF),
        ],
        &st,
    );
}

#[test]
fn mulli_strength_reductions() {
    let mut r = rng(0x9A17);
    for _ in 0..50 {
        let st = random_int_state(&mut r);
        for imm in [0i16, 1, -1, 2, 16, 10, -6, 0x7FFF] {
            assert_matches(&[encode::mulli(3, 4, imm)], &st);
            // Folded operand variant.
            assert_matches(&[encode::addi(4, 0, 100), encode::mulli(3, 4, imm)], &st);
        }
    }
}

#[test]
fn subfic_extremes() {
    let mut r = rng(0x51BF);
    for _ in 0..50 {
        let st = random_int_state(&mut r);
        for imm in [0i16, 1, -1, 0x7FFF, -0x8000] {
            assert_matches(&[encode::subfic(3, 4, imm)], &st);
        }
    }
}

#[test]
fn compares_on_constants_and_registers() {
    let mut r = rng(0xC019);
    for _ in 0..50 {
        let st = random_int_state(&mut r);
        assert_matches(
            &[
                encode::cmpwi(0, 4, -5),
                encode::cmplwi(1, 4, 0xFFFF),
                encode::addi(5, 0, -5),
                encode::cmpwi(2, 5, -5),
                encode::cmplwi(3, 5, 0xFFFB),
            ],
            &st,
        );
    }
}

#[test]
fn unary_record_forms() {
    let mut r = rng(0x11ED);
    for _ in 0..50 {
        let st = random_int_state(&mut r);
        assert_matches(&[encode::neg(3, 4, true)], &st);
        assert_matches(&[encode::extsb(3, 4, true)], &st);
        assert_matches(&[encode::extsh(3, 4, true)], &st);
        assert_matches(&[encode::cntlzw(3, 4, true)], &st);
        // Same, with a folded source.
        assert_matches(&[encode::addi(4, 0, -96), encode::extsb(3, 4, true)], &st);
        assert_matches(&[encode::addi(4, 0, 0), encode::cntlzw(3, 4, true)], &st);
    }
}

#[test]
fn random_immediate_chains() {
    let mut r = rng(0xF01D);
    for _ in 0..300 {
        let st = random_int_state(&mut r);
        let mut block = Vec::new();
        for _ in 0..r.gen_range(2..8) {
            let rt = r.gen_range(0..8u8);
            let ra = r.gen_range(0..8u8);
            let imm = r.gen::<u16>();
            block.push(match r.gen_range(0..8) {
                0 => encode::addi(rt, ra, imm as i16),
                1 => encode::addis(rt, ra, imm as i16),
                2 => encode::ori(rt, ra, imm),
                3 => encode::oris(rt, ra, imm),
                4 => encode::xori(rt, ra, imm),
                5 => encode::xoris(rt, ra, imm),
                6 => encode::andi_rc(rt, ra, imm),
                _ => encode::andis_rc(rt, ra, imm),
            });
        }
        assert_matches(&block, &st);
    }
}

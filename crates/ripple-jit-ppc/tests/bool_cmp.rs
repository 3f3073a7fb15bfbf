//! Boolean ops and compares. The interesting cases are the same-register
//! collapses, the complement folds when one side is a known constant, and
//! compares landing in every CR field.

mod common;

use common::{assert_matches, random_int_state, rng};
use rand::Rng;
use ripple_ppc::encode;

type BoolOp = fn(u8, u8, u8, bool) -> u32;

const BOOL_OPS: [BoolOp; 8] = [
    encode::and,
    encode::andc,
    encode::or,
    encode::orc,
    encode::xor,
    encode::nand,
    encode::nor,
    encode::eqv,
];

#[test]
fn boolean_ops_on_registers() {
    let mut r = rng(0xB001);
    for op in BOOL_OPS {
        for _ in 0..100 {
            let st = random_int_state(&mut r);
            assert_matches(&[op(3, 4, 5, true)], &st);
        }
    }
}

#[test]
fn same_register_collapses() {
    let mut r = rng(0xB002);
    for op in BOOL_OPS {
        for _ in 0..50 {
            let st = random_int_state(&mut r);
            // rs == rb turns each op into a move, a complement, or a
            // constant; CR0 still has to come out right.
            assert_matches(&[op(3, 4, 4, true)], &st);
            assert_matches(&[op(3, 3, 3, true)], &st);
        }
    }
}

#[test]
fn one_constant_operand() {
    let mut r = rng(0xB003);
    for op in BOOL_OPS {
        for imm in [0i16, -1, 0x00FF, -0x8000] {
            for _ in 0..20 {
                let st = random_int_state(&mut r);
                assert_matches(&[encode::addi(4, 0, imm), op(3, 4, 5, true)], &st);
                assert_matches(&[encode::addi(5, 0, imm), op(3, 4, 5, true)], &st);
            }
        }
    }
}

#[test]
fn compares_across_cr_fields() {
    let mut r = rng(0xB004);
    for _ in 0..200 {
        let st = random_int_state(&mut r);
        assert_matches(
            &[
                encode::cmpw(0, 3, 4),
                encode::cmplw(1, 3, 4),
                encode::cmpwi(2, 3, 0),
                encode::cmplwi(3, 3, 0x8000),
                encode::cmpw(4, 4, 4),
                encode::cmplw(7, 5, 6),
            ],
            &st,
        );
    }
}

#[test]
fn compare_then_record_form_reuses_fields() {
    let mut r = rng(0xB005);
    for _ in 0..200 {
        let st = random_int_state(&mut r);
        // Record form overwrites a CR0 set by an explicit compare.
        assert_matches(
            &[encode::cmpw(0, 3, 4), encode::and(5, 3, 4, true)],
            &st,
        );
        assert_matches(
            &[encode::or(5, 3, 4, true), encode::cmpw(0, 5, 3)],
            &st,
        );
    }
}

#[test]
fn random_boolean_blocks() {
    let mut r = rng(0xB006);
    for _ in 0..400 {
        let st = random_int_state(&mut r);
        let mut block = Vec::new();
        for _ in 0..r.gen_range(2..9) {
            let d = r.gen_range(0..8u8);
            let s = r.gen_range(0..8u8);
            let b = r.gen_range(0..8u8);
            let rc = r.gen();
            if r.gen_bool(0.2) {
                block.push(encode::cmpw(r.gen_range(0..8u8), s, b));
            } else {
                let op = BOOL_OPS[r.gen_range(0..BOOL_OPS.len())];
                block.push(op(d, s, b, rc));
            }
        }
        assert_matches(&block, &st);
    }
}

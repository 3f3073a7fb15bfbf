//! Shifts and rotate-mask forms, including the carry that srawi/sraw
//! derive from the bits shifted out and the bitfield shapes rlwinm and
//! rlwimi strength-reduce to.

mod common;

use common::{assert_matches, random_int_state, rng};
use rand::Rng;
use ripple_ppc::encode;

#[test]
fn logical_shifts_by_register() {
    let mut r = rng(0x5417);
    for amount in [0u16, 1, 31, 32, 33, 63, 64, 100] {
        for _ in 0..50 {
            let st = random_int_state(&mut r);
            let load = encode::addi(5, 0, amount as i16);
            assert_matches(&[load, encode::slw(3, 4, 5, true)], &st);
            assert_matches(&[load, encode::srw(3, 4, 5, true)], &st);
            // Amount from guest state rather than a folded immediate.
            assert_matches(&[encode::slw(3, 4, 5, false)], &st);
            assert_matches(&[encode::srw(3, 4, 5, false)], &st);
        }
    }
}

#[test]
fn arithmetic_shift_carry() {
    let mut r = rng(0x5418);
    for _ in 0..100 {
        let st = random_int_state(&mut r);
        for sh in [0u8, 1, 7, 16, 31] {
            assert_matches(&[encode::srawi(3, 4, sh, true)], &st);
            // CA must feed an extended op, not just land in guest state.
            assert_matches(
                &[encode::srawi(3, 4, sh, false), encode::addze(5, 3, true)],
                &st,
            );
        }
        assert_matches(&[encode::sraw(3, 4, 5, true)], &st);
        assert_matches(
            &[encode::sraw(3, 4, 5, false), encode::adde(6, 3, 3, false)],
            &st,
        );
        // Amounts 32..63 force the all-bits-out path.
        for amount in [32i16, 33, 63] {
            assert_matches(
                &[
                    encode::addi(5, 0, amount),
                    encode::sraw(3, 4, 5, false),
                    encode::addze(6, 3, true),
                ],
                &st,
            );
        }
    }
}

#[test]
fn rotate_mask_shapes() {
    let mut r = rng(0x5419);
    for _ in 0..100 {
        let st = random_int_state(&mut r);
        // srwi and slwi patterns.
        assert_matches(&[encode::rlwinm(3, 4, 28, 4, 31, true)], &st);
        assert_matches(&[encode::rlwinm(3, 4, 4, 0, 27, true)], &st);
        // Plain rotate (full mask) and rotate of zero.
        assert_matches(&[encode::rlwinm(3, 4, 13, 0, 31, false)], &st);
        assert_matches(&[encode::rlwinm(3, 4, 0, 8, 23, true)], &st);
        // Wrapped mask, mb > me.
        assert_matches(&[encode::rlwinm(3, 4, 7, 29, 2, true)], &st);
        // Folded source.
        assert_matches(
            &[encode::addis(4, 0, 0x12EF), encode::rlwinm(3, 4, 20, 16, 31, true)],
            &st,
        );
    }
}

#[test]
fn rotate_by_register() {
    let mut r = rng(0x541A);
    for _ in 0..100 {
        let st = random_int_state(&mut r);
        assert_matches(&[encode::rlwnm(3, 4, 5, 0, 31, true)], &st);
        assert_matches(&[encode::rlwnm(3, 4, 5, 8, 23, false)], &st);
        assert_matches(&[encode::rlwnm(3, 4, 5, 24, 7, true)], &st);
        // Amount folded to a constant collapses to the immediate form.
        assert_matches(
            &[encode::addi(5, 0, 45), encode::rlwnm(3, 4, 5, 4, 27, true)],
            &st,
        );
    }
}

#[test]
fn rotate_insert_shapes() {
    let mut r = rng(0x541B);
    for _ in 0..100 {
        let st = random_int_state(&mut r);
        // Insert-from-low (bfi shape): sh == 31 - me.
        assert_matches(&[encode::rlwimi(3, 4, 24, 4, 7, true)], &st);
        // Insert-at-bottom (bfxil shape): me == 31, sh + mb >= 32.
        assert_matches(&[encode::rlwimi(3, 4, 28, 24, 31, false)], &st);
        assert_matches(&[encode::rlwimi(3, 4, 0, 16, 31, true)], &st);
        // General rotate-and-insert, and a wrapped mask.
        assert_matches(&[encode::rlwimi(3, 4, 9, 5, 20, true)], &st);
        assert_matches(&[encode::rlwimi(3, 4, 9, 25, 3, false)], &st);
        // Destination aliases the source.
        assert_matches(&[encode::rlwimi(3, 3, 16, 0, 15, true)], &st);
        // Known inserted value.
        assert_matches(
            &[encode::addi(4, 0, -1), encode::rlwimi(3, 4, 12, 10, 21, true)],
            &st,
        );
    }
}

#[test]
fn random_shift_blocks() {
    let mut r = rng(0x541C);
    for _ in 0..400 {
        let st = random_int_state(&mut r);
        let mut block = Vec::new();
        for _ in 0..r.gen_range(2..8) {
            let d = r.gen_range(0..8u8);
            let s = r.gen_range(0..8u8);
            let b = r.gen_range(0..8u8);
            let sh = r.gen_range(0..32u8);
            let mb = r.gen_range(0..32u8);
            let me = r.gen_range(0..32u8);
            let rc = r.gen();
            block.push(match r.gen_range(0..6) {
                0 => encode::slw(d, s, b, rc),
                1 => encode::srw(d, s, b, rc),
                2 => encode::sraw(d, s, b, rc),
                3 => encode::srawi(d, s, sh, rc),
                4 => encode::rlwinm(d, s, sh, mb, me, rc),
                _ => encode::rlwimi(d, s, sh, mb, me, rc),
            });
        }
        assert_matches(&block, &st);
    }
}

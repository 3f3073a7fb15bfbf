//! Interpreter routing: instructions outside native coverage run one at a
//! time through the interpreter, and everything deferred in the caches
//! (immediates, dirty registers, a pending carry) must be flushed first.

mod common;

use common::{
    assert_block_matches, assert_matches, finite_double, random_int_state, rng, set_double,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use ripple_cpu_core::CpuState;
use ripple_jit_ppc::{JitDisable, JitOptions};
use ripple_ppc::encode;

fn ps_merge(subop10: u32, frt: u8, fra: u8, frb: u8) -> u32 {
    (4 << 26) | (u32::from(frt) << 21) | (u32::from(fra) << 16) | (u32::from(frb) << 11)
        | (subop10 << 1)
}

fn random_fp_state(r: &mut ChaCha8Rng) -> CpuState {
    let mut st = random_int_state(r);
    for i in 0..16 {
        st.fpr[i] = [r.gen(), r.gen()];
    }
    st
}

fn disabled(classes: JitDisable) -> JitOptions {
    JitOptions {
        disable: classes,
        ..JitOptions::default()
    }
}

#[test]
fn merge_variants_round_trip_lanes() {
    let mut r = rng(0xFB01);
    for subop in [528u32, 560, 592, 624] {
        for _ in 0..100 {
            let st = random_fp_state(&mut r);
            assert_matches(&[ps_merge(subop, 1, 8, 9)], &st);
            assert_matches(&[ps_merge(subop, 1, 1, 1)], &st);
        }
    }
}

#[test]
fn deferred_state_reaches_the_interpreter() {
    let mut r = rng(0xFB02);
    for _ in 0..200 {
        let st = random_fp_state(&mut r);
        // Dirty immediates, a pending carry and single-form floats all
        // have to land in guest state before the interpreter call, and
        // the carry must still be live for adde afterwards.
        assert_matches(
            &[
                encode::addi(3, 0, 0x7777),
                encode::addc(4, 3, 5, false),
                encode::fadds(1, 8, 9),
                ps_merge(560, 2, 1, 10),
                encode::adde(6, 4, 3, true),
                encode::fmul(3, 2, 11),
            ],
            &st,
        );
    }
}

#[test]
fn interpreted_results_feed_native_code() {
    let mut r = rng(0xFB03);
    for _ in 0..200 {
        let st = random_fp_state(&mut r);
        // The merge output is reloaded by the native fadd that follows.
        assert_matches(
            &[ps_merge(592, 1, 8, 9), encode::fadd(2, 1, 10)],
            &st,
        );
    }
}

#[test]
fn disabled_integer_class_is_interpreted() {
    let mut r = rng(0xFB04);
    for _ in 0..100 {
        let st = random_int_state(&mut r);
        assert_block_matches(
            &[
                encode::addi(3, 0, 5),
                encode::addc(4, 3, 5, true),
                encode::adde(6, 4, 3, true),
                encode::rlwinm(7, 6, 12, 4, 27, true),
                encode::divw(8, 7, 6, true),
            ],
            disabled(JitDisable::INTEGER),
            &st,
        );
    }
}

#[test]
fn disabled_float_classes_are_interpreted() {
    let mut r = rng(0xFB05);
    for _ in 0..100 {
        let mut st = random_fp_state(&mut r);
        for i in 0..16 {
            set_double(&mut st, i, finite_double(&mut r));
        }
        let scalar = [
            encode::fadds(1, 8, 9),
            encode::fmul(2, 1, 10),
            encode::frsp(3, 2),
            encode::fcmpu(0, 1, 3),
        ];
        assert_block_matches(&scalar, disabled(JitDisable::FLOAT), &st);

        let paired = [encode::ps_add(1, 8, 9), encode::ps_mul(2, 1, 1)];
        assert_block_matches(&paired, disabled(JitDisable::PAIRED), &st);

        // Disabling PAIRED must leave scalar float translation alone and
        // vice versa.
        assert_block_matches(&scalar, disabled(JitDisable::PAIRED), &st);
        assert_block_matches(&paired, disabled(JitDisable::FLOAT), &st);
    }
}

#[test]
fn mixed_disabled_and_native_classes() {
    let mut r = rng(0xFB06);
    for _ in 0..100 {
        let mut st = random_fp_state(&mut r);
        for i in 0..16 {
            set_double(&mut st, i, finite_double(&mut r));
        }
        // Integer work stays native while every float goes to the
        // interpreter, with register traffic in both directions.
        assert_block_matches(
            &[
                encode::addc(3, 4, 5, false),
                encode::fadd(1, 8, 9),
                encode::adde(6, 3, 3, true),
                encode::fcmpu(2, 1, 8),
            ],
            disabled(JitDisable::FLOAT | JitDisable::PAIRED),
            &st,
        );
    }
}

//! Conversions and compares: fctiwz saturation and NaN handling, frsp on
//! values in and out of single range, and both compare forms across the
//! ordered, unordered and equal outcomes.

mod common;

use common::{assert_block_matches, assert_matches, finite_double, random_int_state, rng, set_double};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use ripple_cpu_core::CpuState;
use ripple_jit_ppc::JitOptions;
use ripple_ppc::encode;

fn state_with_doubles(r: &mut ChaCha8Rng) -> CpuState {
    let mut st = random_int_state(r);
    for i in 0..16 {
        set_double(&mut st, i, finite_double(r));
    }
    st
}

#[test]
fn convert_to_word_edges() {
    let mut r = rng(0xFC01);
    let edges = [
        0.0f64,
        -0.0,
        0.5,
        -0.5,
        1.999_999,
        -1.999_999,
        2147483647.0,
        2147483647.9,
        2147483648.0,
        -2147483648.0,
        -2147483648.9,
        -2147483649.0,
        1e300,
        -1e300,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NAN,
        -f64::NAN,
    ];
    for v in edges {
        for _ in 0..10 {
            let mut st = state_with_doubles(&mut r);
            set_double(&mut st, 8, v);
            // ps1 of the destination survives; the packed high word is
            // part of the result.
            st.fpr[1] = [r.gen(), r.gen()];
            assert_matches(&[encode::fctiwz(1, 8)], &st);
        }
    }
}

#[test]
fn convert_random_doubles() {
    let mut r = rng(0xFC02);
    for _ in 0..500 {
        let mut st = state_with_doubles(&mut r);
        st.fpr[8] = [r.gen(), r.gen()];
        assert_matches(&[encode::fctiwz(1, 8)], &st);
    }
}

#[test]
fn round_to_single_of_doubles() {
    let mut r = rng(0xFC03);
    let edges = [
        0.0f64,
        -0.0,
        1.0 + f64::EPSILON,
        f64::from(f32::MIN_POSITIVE) / 2.0,
        -f64::from(f32::MIN_POSITIVE) / 2.0,
        f64::from(f32::MAX) * 2.0,
        1e-300,
        f64::NAN,
    ];
    for native in [false, true] {
        let opts = JitOptions {
            host_denormals_native: native,
            ..JitOptions::default()
        };
        for v in edges {
            let mut st = state_with_doubles(&mut r);
            set_double(&mut st, 8, v);
            assert_block_matches(&[encode::frsp(1, 8)], opts, &st);
        }
        for _ in 0..200 {
            let st = state_with_doubles(&mut r);
            assert_block_matches(&[encode::frsp(1, 8)], opts, &st);
        }
    }
}

#[test]
fn round_to_single_of_single() {
    let mut r = rng(0xFC04);
    for _ in 0..200 {
        let st = state_with_doubles(&mut r);
        // The second frsp sees a value already in single form and both
        // lanes of f2 take the rounded value.
        assert_matches(&[encode::frsp(1, 8), encode::frsp(2, 1)], &st);
        assert_matches(&[encode::fadds(1, 8, 9), encode::frsp(2, 1)], &st);
    }
}

#[test]
fn compare_outcomes() {
    let mut r = rng(0xFC05);
    let values = [
        0.0f64,
        -0.0,
        1.0,
        -1.0,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NAN,
    ];
    for a in values {
        for b in values {
            let mut st = state_with_doubles(&mut r);
            set_double(&mut st, 8, a);
            set_double(&mut st, 9, b);
            assert_matches(&[encode::fcmpu(0, 8, 9)], &st);
            assert_matches(&[encode::fcmpo(5, 8, 9)], &st);
        }
    }
}

#[test]
fn compare_of_single_results() {
    let mut r = rng(0xFC06);
    for native in [false, true] {
        let opts = JitOptions {
            host_denormals_native: native,
            ..JitOptions::default()
        };
        for _ in 0..200 {
            let st = state_with_doubles(&mut r);
            // Both operands land in single form before the compare.
            assert_block_matches(
                &[
                    encode::fadds(1, 8, 9),
                    encode::fsubs(2, 8, 9),
                    encode::fcmpu(3, 1, 2),
                ],
                opts,
                &st,
            );
            // Mixed: one single-form operand, one fresh double.
            assert_block_matches(
                &[encode::fmuls(1, 8, 9), encode::fcmpu(0, 1, 10)],
                opts,
                &st,
            );
        }
    }
}

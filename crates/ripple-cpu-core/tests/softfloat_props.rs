use proptest::prelude::*;
use ripple_cpu_core::softfloat::{
    double_to_single, force_single, is_snan_double, is_snan_single, narrow_round, round_to_25_bits,
    single_to_double, SINGLE_EXP, SINGLE_FRAC,
};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 4096,
        .. ProptestConfig::default()
    })]

    #[test]
    fn widen_then_narrow_is_identity(bits in any::<u32>()) {
        prop_assert_eq!(double_to_single(single_to_double(bits)), bits);
    }

    #[test]
    fn widen_agrees_with_hardware_for_non_nans(bits in any::<u32>()) {
        prop_assume!(!f32::from_bits(bits).is_nan());
        prop_assert_eq!(
            single_to_double(bits),
            f64::from(f32::from_bits(bits)).to_bits()
        );
    }

    #[test]
    fn widen_keeps_snan_signalling(frac in 1u32..=SINGLE_FRAC) {
        let snan = SINGLE_EXP | (frac & !(1 << 22));
        prop_assume!(is_snan_single(snan));
        prop_assert!(is_snan_double(single_to_double(snan)));
    }

    #[test]
    fn narrow_round_never_yields_a_subnormal(bits in any::<u64>()) {
        let s = narrow_round(bits);
        prop_assert!(s & SINGLE_EXP != 0 || s & SINGLE_FRAC == 0, "{s:#010X}");
    }

    #[test]
    fn force_single_is_idempotent(bits in any::<u64>()) {
        let once = force_single(bits);
        prop_assert_eq!(force_single(once), once);
    }

    #[test]
    fn multiplier_round_clears_the_low_mantissa(bits in any::<u64>()) {
        // Bits 27..0 must come out clear: the dropped 26 plus the carry
        // bit itself, which either was clear or was consumed by the add.
        prop_assert_eq!(round_to_25_bits(bits) & 0x0FFF_FFFF, 0);
    }
}

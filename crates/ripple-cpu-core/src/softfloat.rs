//! Bit-exact conversions between the single and double floating formats.
//!
//! The guest FPU register file stores doubles, but single-precision values
//! move in and out of it constantly. These routines replicate the hardware's
//! format conversion exactly: denormals are preserved (normalized on
//! widening), signalling NaNs stay signalling, and no rounding ever happens.
//! They back the translator's slow conversion path and the interpreter.

pub const DOUBLE_SIGN: u64 = 0x8000_0000_0000_0000;
pub const DOUBLE_EXP: u64 = 0x7FF0_0000_0000_0000;
pub const DOUBLE_FRAC: u64 = 0x000F_FFFF_FFFF_FFFF;
pub const DOUBLE_QUIET_BIT: u64 = 1 << 51;

pub const SINGLE_EXP: u32 = 0x7F80_0000;
pub const SINGLE_FRAC: u32 = 0x007F_FFFF;
pub const SINGLE_QUIET_BIT: u32 = 1 << 22;

#[must_use]
pub fn is_snan_single(bits: u32) -> bool {
    bits & SINGLE_EXP == SINGLE_EXP
        && bits & SINGLE_FRAC != 0
        && bits & SINGLE_QUIET_BIT == 0
}

#[must_use]
pub fn is_snan_double(bits: u64) -> bool {
    bits & DOUBLE_EXP == DOUBLE_EXP
        && bits & DOUBLE_FRAC != 0
        && bits & DOUBLE_QUIET_BIT == 0
}

/// Widen a single bit pattern to the equivalent double, exactly.
///
/// Normal values are rebiased with the three exponent padding bits derived
/// from the top exponent bit; subnormals are normalized into the double's
/// larger exponent range; zeros, infinities and NaNs keep their payload
/// (including the quiet bit) untouched.
#[must_use]
pub fn single_to_double(value: u32) -> u64 {
    let x = u64::from(value);
    let exp = (x >> 23) & 0xFF;
    let frac = x & 0x007F_FFFF;

    if exp > 0 && exp < 255 {
        let y = u64::from(exp >> 7 == 0);
        let z = y << 61 | y << 60 | y << 59;
        ((x & 0xC000_0000) << 32) | z | ((x & 0x3FFF_FFFF) << 29)
    } else if exp == 0 && frac != 0 {
        // Subnormal: shift the fraction up until the hidden bit appears.
        let mut exp = 1023 - 126;
        let mut frac = frac;
        loop {
            frac <<= 1;
            exp -= 1;
            if frac & 0x0080_0000 != 0 {
                break;
            }
        }
        ((x & 0x8000_0000) << 32) | (u64::from(exp as u32) << 52) | ((frac & 0x007F_FFFF) << 29)
    } else {
        // Zero, infinity or NaN: replicate the top exponent bit.
        let y = exp >> 7;
        let z = y << 61 | y << 60 | y << 59;
        ((x & 0xC000_0000) << 32) | z | ((x & 0x3FFF_FFFF) << 29)
    }
}

/// Narrow a double bit pattern to the single format, exactly, the way the
/// register file does it for stores: pure bit extraction for values in
/// single range, denormalization for small-exponent values, and the same
/// extraction for the out-of-range remainder (where hardware behavior is
/// documented as undefined).
#[must_use]
pub fn double_to_single(value: u64) -> u32 {
    let exp = ((value >> 52) & 0x7FF) as u32;
    if exp > 896 || value & !DOUBLE_SIGN == 0 {
        (((value >> 32) & 0xC000_0000) | ((value >> 29) & 0x3FFF_FFFF)) as u32
    } else if exp >= 874 {
        let mut t = (0x8000_0000u64 | ((value & DOUBLE_FRAC) >> 21)) as u32;
        t >>= 905 - exp;
        t | (((value >> 32) & 0x8000_0000) as u32)
    } else {
        (((value >> 32) & 0xC000_0000) | ((value >> 29) & 0x3FFF_FFFF)) as u32
    }
}

/// Round a double to single precision arithmetically (round-to-nearest),
/// flushing subnormal results to a signed zero and quieting NaNs, and return
/// the single bit pattern. This is the semantics of the rounding step inside
/// single-precision arithmetic and of `frsp`.
#[must_use]
pub fn narrow_round(value: u64) -> u32 {
    let f = f64::from_bits(value);
    if f.is_nan() {
        return double_to_single(value) | SINGLE_QUIET_BIT;
    }
    let bits = (f as f32).to_bits();
    if bits & SINGLE_EXP == 0 && bits & SINGLE_FRAC != 0 {
        // Subnormal result: flushed to zero, sign preserved.
        return bits & 0x8000_0000;
    }
    bits
}

/// Round a double to single precision and widen back: the double bit pattern
/// of the single-rounded value.
#[must_use]
pub fn force_single(value: u64) -> u64 {
    single_to_double(narrow_round(value))
}

/// Truncate a value's mantissa to 25 bits with round-to-odd-style carry, the
/// precision the multiplier input is reduced to for single-precision
/// multiplies: `(x & 0xFFFF_FFFF_F800_0000) + (x & 0x0800_0000)`.
#[must_use]
pub fn round_to_25_bits(value: u64) -> u64 {
    (value & 0xFFFF_FFFF_F800_0000).wrapping_add(value & 0x0800_0000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_preserves_simple_values() {
        for v in [0.0f32, -0.0, 1.0, -1.5, 1234.5678, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(
                f64::from_bits(single_to_double(v.to_bits())),
                f64::from(v),
                "{v}"
            );
        }
    }

    #[test]
    fn widen_preserves_subnormals_exactly() {
        // Smallest positive subnormal single.
        let tiny = 1u32;
        let wide = single_to_double(tiny);
        assert_eq!(f64::from_bits(wide), f64::from(f32::from_bits(tiny)));
        assert_eq!(double_to_single(wide), tiny);
    }

    #[test]
    fn widen_keeps_snan_signalling() {
        let snan = 0x7F80_0001u32; // signalling NaN, payload 1
        let wide = single_to_double(snan);
        assert!(is_snan_double(wide));
        assert_eq!(double_to_single(wide), snan);
    }

    #[test]
    fn narrow_of_widened_is_identity() {
        for bits in [
            0u32,
            0x8000_0000,
            0x3F80_0000, // 1.0
            0x0000_0001, // min subnormal
            0x007F_FFFF, // max subnormal
            0x7F7F_FFFF, // max normal
            0x7FC0_0000, // quiet NaN
            0x7F80_0001, // signalling NaN
            0xFF80_0000, // -inf
        ] {
            assert_eq!(double_to_single(single_to_double(bits)), bits, "{bits:#010X}");
        }
    }

    #[test]
    fn narrow_round_flushes_subnormal_results() {
        // A double just below the smallest normal single rounds to a
        // subnormal, which gets flushed to signed zero.
        let small = (f32::MIN_POSITIVE / 2.0) as f64;
        assert_eq!(narrow_round(small.to_bits()), 0);
        assert_eq!(narrow_round((-small).to_bits()), 0x8000_0000);
    }

    #[test]
    fn narrow_round_quiets_nan() {
        let wide_snan = single_to_double(0x7F80_0001);
        let rounded = narrow_round(wide_snan);
        assert_eq!(rounded & SINGLE_QUIET_BIT, SINGLE_QUIET_BIT);
    }

    #[test]
    fn round_to_25_bits_boundaries() {
        // Mantissa bits below bit 27 are dropped; bit 27 rounds up.
        assert_eq!(round_to_25_bits(0), 0);
        assert_eq!(round_to_25_bits(0x07FF_FFFF), 0);
        assert_eq!(round_to_25_bits(0x0800_0000), 0x1000_0000);
        assert_eq!(round_to_25_bits(0xFFFF_FFFF), 0xF800_0000 + 0x0800_0000);
    }
}

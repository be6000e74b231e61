//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Round a f64 and clamp it to the u8 range, returning 0 for non-finite values.
#[must_use]
pub fn round_f64_to_u8(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    let clamped = value.round().clamp(0.0, f64::from(u8::MAX));
    cast::<f64, u8>(clamped).unwrap_or(0)
}

/// Whole percentage of `part` over `total`, rounded half away from zero.
///
/// A zero `total` yields 0.
#[must_use]
pub fn percent(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    round_f64_to_u8(100.0 * usize_to_f64(part) / usize_to_f64(total))
}

/// Saturating conversion used for XP arithmetic on user-supplied minutes.
#[must_use]
pub fn clamp_u64_to_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_handles_non_finite_and_range() {
        assert_eq!(round_f64_to_u8(f64::NAN), 0);
        assert_eq!(round_f64_to_u8(f64::INFINITY), 0);
        assert_eq!(round_f64_to_u8(-3.0), 0);
        assert_eq!(round_f64_to_u8(999.0), u8::MAX);
        assert_eq!(round_f64_to_u8(32.5), 33);
    }

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(4, 4), 100);
    }

    #[test]
    fn clamp_saturates() {
        assert_eq!(clamp_u64_to_u32(7), 7);
        assert_eq!(clamp_u64_to_u32(u64::MAX), u32::MAX);
    }
}

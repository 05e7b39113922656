//! Error metrics between two results of the same product.
//!
//! Blocked and vectorized paths sum in a different order than the naive
//! loops, so results agree to a tolerance rather than bit for bit.

/// Largest `|expected[i] - actual[i]|`.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn max_abs_diff(expected: &[f32], actual: &[f32]) -> f32 {
    assert_eq!(expected.len(), actual.len(), "length mismatch");
    expected
        .iter()
        .zip(actual)
        .map(|(e, a)| (e - a).abs())
        .fold(0.0, f32::max)
}

/// Largest `|expected - actual| / max(|expected|, 1)`.
///
/// Relative for entries above one in magnitude, absolute below, so exact
/// zeros in the reference do not blow the metric up.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn max_rel_error(expected: &[f32], actual: &[f32]) -> f32 {
    assert_eq!(expected.len(), actual.len(), "length mismatch");
    expected
        .iter()
        .zip(actual)
        .map(|(e, a)| (e - a).abs() / e.abs().max(1.0))
        .fold(0.0, f32::max)
}

/// Relative tolerance for a reduction of depth `k`.
///
/// 1e-4 up to k = 4096, growing linearly beyond that.
pub fn tolerance_for_depth(k: usize) -> f32 {
    1e-4 * (k as f32 / 4096.0).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_zero() {
        let x = [1.0, -2.0, 3.5];
        assert_eq!(max_abs_diff(&x, &x), 0.0);
        assert_eq!(max_rel_error(&x, &x), 0.0);
    }

    #[test]
    fn test_relative_scales_large_values() {
        let expected = [1000.0, 0.0];
        let actual = [1001.0, 0.5];
        assert_eq!(max_abs_diff(&expected, &actual), 1.0);
        // 1/1000 for the first entry, 0.5 absolute for the zero.
        assert_eq!(max_rel_error(&expected, &actual), 0.5);
    }

    #[test]
    fn test_tolerance_grows_past_4096() {
        assert_eq!(tolerance_for_depth(1), 1e-4);
        assert_eq!(tolerance_for_depth(4096), 1e-4);
        assert!(tolerance_for_depth(8192) > 1e-4);
    }
}

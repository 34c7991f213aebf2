//! Numeric helpers for bounded cells and leaf conversions.
//!
//! Bounded cells clamp and quantize every incoming number; these helpers keep
//! that arithmetic in one place so the clamping law is tested once.

/// Clamp `value` into `[min, max]` and snap it to the nearest multiple of
/// `step` measured from `min`.
///
/// A `step` of zero disables quantization. When `max - min` is not a whole
/// number of steps, the highest reachable value is the last full step below
/// `max`, so the result never leaves the range.
///
/// # Examples
/// ```
/// use cogwork::numeric::quantize;
/// assert_eq!(quantize(7.4, 0.0, 10.0, 0.5), 7.5);
/// assert_eq!(quantize(-3.0, 0.0, 10.0, 1.0), 0.0);
/// assert_eq!(quantize(9.9, 0.0, 10.0, 3.0), 9.0);
/// ```
#[must_use]
pub fn quantize(value: f64, min: f64, max: f64, step: f64) -> f64 {
    let clamped = value.clamp(min, max);
    if step <= 0.0 {
        return clamped;
    }
    let max_steps = ((max - min) / step).floor();
    let steps = ((clamped - min) / step).round().clamp(0.0, max_steps);
    min + steps * step
}

/// Move `current` towards `target` by `rate` of the remaining distance for
/// each of `ticks` ticks, snapping once the gap is negligible.
#[must_use]
pub fn approach(current: f64, target: f64, rate: f64, ticks: u32) -> f64 {
    let mut value = current;
    for _ in 0..ticks {
        value += (target - value) * rate;
        if (target - value).abs() < 1e-9 {
            return target;
        }
    }
    value
}

/// Convert a finite `f64` into `f32`, asserting that it fits the target type.
#[expect(
    clippy::cast_possible_truncation,
    reason = "Callers only pass finite values produced by bounded cells."
)]
#[must_use]
pub fn expect_f32(value: f64) -> f32 {
    debug_assert!(value.is_finite(), "expected finite f64 for f32 conversion");
    value as f32
}

/// Floor the value into the `u8` domain, returning `None` when out of range
/// or not finite.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "The floored value is validated against the u8 domain."
)]
#[must_use]
pub fn floor_to_u8(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    let floored = value.floor();
    if floored < f64::from(u8::MIN) || floored > f64::from(u8::MAX) {
        return None;
    }
    Some(floored as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(-100.0)]
    #[case(-0.3)]
    #[case(0.0)]
    #[case(2.49)]
    #[case(2.51)]
    #[case(9.99)]
    #[case(1e9)]
    fn quantized_values_obey_clamping_law(#[case] input: f64) {
        let (min, max, step) = (-1.0, 10.0, 0.75);
        let value = quantize(input, min, max, step);
        assert!((min..=max).contains(&value), "{value} escaped range");
        let steps = (value - min) / step;
        assert_relative_eq!(steps, steps.round(), epsilon = 1e-9);
    }

    #[rstest]
    fn zero_step_only_clamps() {
        assert_relative_eq!(quantize(3.3, 0.0, 5.0, 0.0), 3.3);
        assert_relative_eq!(quantize(7.0, 0.0, 5.0, 0.0), 5.0);
    }

    #[rstest]
    fn approach_converges_on_target() {
        let value = approach(0.0, 1.0, 0.5, 2);
        assert_relative_eq!(value, 0.75);
        assert_relative_eq!(approach(0.0, 1.0, 1.0, 1), 1.0);
    }

    #[rstest]
    #[case(12.7, Some(12))]
    #[case(255.9, Some(255))]
    #[case(256.0, None)]
    #[case(-0.5, None)]
    #[case(f64::NAN, None)]
    fn floor_to_u8_respects_domain(#[case] input: f64, #[case] expected: Option<u8>) {
        assert_eq!(floor_to_u8(input), expected);
    }
}

//! Vector helpers for velocity clamping and the force field.
use glam::Vec3;

/// Scales `vector` down so its length does not exceed `max`.
///
/// Non-finite input collapses to the zero vector so a corrupted physics
/// reading cannot leak into the machine.
///
/// # Examples
/// ```
/// use cogwork::vector_math::clamp_length;
/// use glam::Vec3;
/// let clamped = clamp_length(Vec3::new(30.0, 40.0, 0.0), 5.0);
/// assert!((clamped.length() - 5.0).abs() < 1e-5);
/// assert_eq!(clamp_length(Vec3::new(f32::NAN, 0.0, 0.0), 5.0), Vec3::ZERO);
/// ```
#[must_use]
pub fn clamp_length(vector: Vec3, max: f32) -> Vec3 {
    if !vector.is_finite() {
        return Vec3::ZERO;
    }
    vector.clamp_length_max(max.max(0.0))
}

/// Force exerted on a body at `at` by a source at `from` with the combined
/// `strength` of both participants.
///
/// Positive strength attracts, negative repels. The magnitude falls off with
/// the square of the distance; `epsilon` is added to the squared distance to
/// keep coincident bodies finite, and bodies further apart than `cutoff`
/// exert nothing.
#[must_use]
pub fn inverse_square(at: Vec3, from: Vec3, strength: f32, epsilon: f32, cutoff: f32) -> Vec3 {
    let offset = from - at;
    let d2 = offset.length_squared();
    if d2 > cutoff * cutoff {
        return Vec3::ZERO;
    }
    let direction = offset.try_normalize().unwrap_or(Vec3::ZERO);
    direction * (strength / (d2 + epsilon))
}

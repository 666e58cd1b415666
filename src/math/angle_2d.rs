use std::f64::consts::{PI, TAU};

use super::Vector3;

/// Plan bearing of a direction vector, in radians, measured anticlockwise from +X.
#[must_use]
pub fn vector_bearing(v: &Vector3) -> f64 {
    v.y.atan2(v.x)
}

/// Unit plan direction for a bearing.
#[must_use]
pub fn direction(angle: f64) -> Vector3 {
    Vector3::new(angle.cos(), angle.sin(), 0.0)
}

/// Normalizes an angle into `(-PI, PI]`.
#[must_use]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle.rem_euclid(TAU);
    if a > PI {
        a -= TAU;
    }
    a
}

/// Smallest unsigned angle between two bearings, in `[0, PI]`.
#[must_use]
pub fn angle_between(a: f64, b: f64) -> f64 {
    normalize_angle(b - a).abs()
}

/// Returns `true` when `angle` lies strictly inside the shorter sweep
/// from `from` to `to`, `margin` radians clear of both ends.
#[must_use]
pub fn strictly_between(angle: f64, from: f64, to: f64, margin: f64) -> bool {
    let delta = normalize_angle(to - from);
    let offset = normalize_angle(angle - from);
    if delta >= 0.0 {
        offset > margin && offset < delta - margin
    } else {
        offset < -margin && offset > delta + margin
    }
}

/// Bearing halfway along the shorter sweep from `a` to `b`.
#[must_use]
pub fn bisect(a: f64, b: f64) -> f64 {
    normalize_angle(a + normalize_angle(b - a) * 0.5)
}

/// Interpolates along the shorter sweep from `a` to `b`.
#[must_use]
pub fn lerp_angle(a: f64, b: f64, t: f64) -> f64 {
    normalize_angle(a + normalize_angle(b - a) * t)
}

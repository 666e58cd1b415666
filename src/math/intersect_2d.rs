use super::{Point3, Vector3, TOLERANCE};

/// Parametric 2D line-line intersection.
///
/// Given lines `p1 + t * d1` and `p2 + u * d2`, returns `(t, u)` if not parallel.
#[must_use]
pub fn line_line_intersect_2d(
    p1: &Point3,
    d1: &Vector3,
    p2: &Point3,
    d2: &Vector3,
) -> Option<(f64, f64)> {
    let cross = d1.x * d2.y - d1.y * d2.x;
    if cross.abs() < TOLERANCE {
        return None;
    }
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let t = (dx * d2.y - dy * d2.x) / cross;
    let u = (dx * d1.y - dy * d1.x) / cross;
    Some((t, u))
}

/// Bounded segment-segment intersection in 2D.
///
/// Returns `(intersection_point, t, u)` where `t` and `u` are in `[0, 1]`.
/// The elevation of the returned point is interpolated along segment `a`.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point3,
    a1: &Point3,
    b0: &Point3,
    b1: &Point3,
) -> Option<(Point3, f64, f64)> {
    let da = a1 - a0;
    let db = b1 - b0;

    let cross = da.x * db.y - da.y * db.x;
    if cross.abs() < TOLERANCE {
        return None;
    }

    let dx = b0.x - a0.x;
    let dy = b0.y - a0.y;
    let t = (dx * db.y - dy * db.x) / cross;
    let u = (dx * da.y - dy * da.x) / cross;

    // Use a small epsilon to include endpoints.
    let eps = TOLERANCE;
    if t >= -eps && t <= 1.0 + eps && u >= -eps && u <= 1.0 + eps {
        let t_clamped = t.clamp(0.0, 1.0);
        Some((point_at(a0, &da, t_clamped), t_clamped, u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Linear interpolation in 3D: `origin + dir * t`.
#[must_use]
pub fn point_at(origin: &Point3, dir: &Vector3, t: f64) -> Point3 {
    Point3::new(origin.x + dir.x * t, origin.y + dir.y * t, origin.z + dir.z * t)
}

/// Twice the signed area of triangle `(a, b, c)` in plan.
///
/// Positive when `c` lies to the left of `a -> b`.
#[must_use]
pub fn orientation_2d(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Orientation-predicate test for a proper crossing of two plan segments.
///
/// Segments that merely touch (an endpoint lying on the other segment) or
/// overlap collinearly do not count as crossing.
#[must_use]
pub fn segments_properly_cross(a0: &Point3, a1: &Point3, b0: &Point3, b1: &Point3) -> bool {
    let scale = (a1 - a0).xy().norm().max((b1 - b0).xy().norm()).max(1.0);
    let eps = TOLERANCE * scale * scale;
    let o1 = orientation_2d(a0, a1, b0);
    let o2 = orientation_2d(a0, a1, b1);
    let o3 = orientation_2d(b0, b1, a0);
    let o4 = orientation_2d(b0, b1, a1);
    let strictly_opposite = |p: f64, q: f64| (p > eps && q < -eps) || (p < -eps && q > eps);
    strictly_opposite(o1, o2) && strictly_opposite(o3, o4)
}

/// Proper crossing of two plan segments.
///
/// Returns the crossing point (elevation interpolated along `a`) and the
/// parameters on both segments when [`segments_properly_cross`] holds.
#[must_use]
pub fn segment_crossing_2d(
    a0: &Point3,
    a1: &Point3,
    b0: &Point3,
    b1: &Point3,
) -> Option<(Point3, f64, f64)> {
    if !segments_properly_cross(a0, a1, b0, b1) {
        return None;
    }
    segment_segment_intersect_2d(a0, a1, b0, b1)
}

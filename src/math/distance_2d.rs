use super::Point3;

/// Returns the minimum distance from point `(px, py)` to the line segment
/// from `(ax, ay)` to `(bx, by)`.
#[must_use]
pub fn point_to_segment_dist(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let (cx, cy, _) = closest_on_segment(px, py, ax, ay, bx, by);
    (px - cx).hypot(py - cy)
}

/// Closest point on segment `a -> b` to `p`, in plan, with its parameter.
///
/// The elevation of the result is interpolated along the segment.
#[must_use]
pub fn closest_point_on_segment(p: &Point3, a: &Point3, b: &Point3) -> (Point3, f64) {
    let (x, y, t) = closest_on_segment(p.x, p.y, a.x, a.y, b.x, b.y);
    (Point3::new(x, y, a.z + (b.z - a.z) * t), t)
}

fn closest_on_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> (f64, f64, f64) {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-20 {
        // Degenerate segment (zero length).
        return (ax, ay, 0.0);
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    (ax + t * dx, ay + t * dy, t)
}


#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn segment_dist_perpendicular_projection() {
        // Point (1, 1) to segment (0,0)→(2,0). Closest at (1,0), dist = 1.
        let d = point_to_segment_dist(1.0, 1.0, 0.0, 0.0, 2.0, 0.0);
        assert!((d - 1.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn segment_dist_endpoint_closest() {
        let d = point_to_segment_dist(-1.0, 0.0, 0.0, 0.0, 2.0, 0.0);
        assert!((d - 1.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn segment_dist_degenerate() {
        // Zero-length segment: distance is point-to-point.
        let d = point_to_segment_dist(3.0, 4.0, 0.0, 0.0, 0.0, 0.0);
        assert!((d - 5.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn closest_point_interpolates_elevation() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(4.0, 0.0, 8.0);
        let (c, t) = closest_point_on_segment(&Point3::new(1.0, 3.0, 0.0), &a, &b);
        assert!((t - 0.25).abs() < TOL);
        assert!((c.x - 1.0).abs() < TOL);
        assert!((c.z - 2.0).abs() < TOL);
    }
}

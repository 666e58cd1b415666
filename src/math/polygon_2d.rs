use super::{Point3, Vector3, TOLERANCE};

/// Computes the signed area of a polygon in the XY plane (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise. A repeated closing
/// vertex contributes nothing, so closed and open encodings give the same area.
#[must_use]
pub fn signed_area_2d(points: &[Point3]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Even-odd point-in-polygon test in plan.
///
/// Points on the boundary may be reported either way.
#[must_use]
pub fn point_in_polygon_2d(point: &Point3, polygon: &[Point3]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = &polygon[i];
        let pj = &polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = pj.x + (point.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Returns `true` when `point` lies inside `polygon` and at least `margin`
/// away from every edge.
#[must_use]
pub fn point_strictly_inside_2d(point: &Point3, polygon: &[Point3], margin: f64) -> bool {
    if !point_in_polygon_2d(point, polygon) {
        return false;
    }
    let n = polygon.len();
    (0..n).all(|i| {
        let a = &polygon[i];
        let b = &polygon[(i + 1) % n];
        super::distance_2d::point_to_segment_dist(point.x, point.y, a.x, a.y, b.x, b.y) > margin
    })
}

/// Computes the normalized plan direction from point `a` to point `b`.
///
/// Returns `None` if the segment has zero plan length.
#[must_use]
pub fn segment_direction(a: &Point3, b: &Point3) -> Option<Vector3> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len < TOLERANCE {
        return None;
    }
    Some(Vector3::new(dx / len, dy / len, 0.0))
}

/// Returns the left-pointing normal of a direction vector in the XY plane.
#[must_use]
pub fn left_normal(dir: Vector3) -> Vector3 {
    Vector3::new(-dir.y, dir.x, 0.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn square() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn signed_area_ccw_square() {
        assert!((signed_area_2d(&square()) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_cw_square() {
        let pts: Vec<Point3> = square().into_iter().rev().collect();
        assert!((signed_area_2d(&pts) + 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_ignores_closing_vertex() {
        let mut pts = square();
        pts.push(pts[0]);
        assert!((signed_area_2d(&pts) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_degenerate() {
        assert!((signed_area_2d(&[Point3::new(0.0, 0.0, 0.0)])).abs() < TOLERANCE);
        assert!((signed_area_2d(&[])).abs() < TOLERANCE);
    }

    #[test]
    fn point_in_square() {
        let sq = square();
        assert!(point_in_polygon_2d(&Point3::new(0.5, 0.5, 0.0), &sq));
        assert!(!point_in_polygon_2d(&Point3::new(1.5, 0.5, 0.0), &sq));
        assert!(!point_in_polygon_2d(&Point3::new(0.5, -0.1, 0.0), &sq));
    }

    #[test]
    fn strictly_inside_respects_margin() {
        let sq = square();
        assert!(point_strictly_inside_2d(&Point3::new(0.5, 0.5, 0.0), &sq, 0.1));
        assert!(!point_strictly_inside_2d(&Point3::new(0.05, 0.5, 0.0), &sq, 0.1));
    }

    #[test]
    fn segment_direction_basic() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 4.0, 7.0);
        let dir = segment_direction(&a, &b).unwrap();
        assert!((dir.x - 0.6).abs() < TOLERANCE);
        assert!((dir.y - 0.8).abs() < TOLERANCE);
        assert!(dir.z.abs() < TOLERANCE);
    }

    #[test]
    fn segment_direction_zero_length() {
        let a = Point3::new(1.0, 1.0, 0.0);
        let b = Point3::new(1.0, 1.0, 5.0);
        assert!(segment_direction(&a, &b).is_none());
    }

    #[test]
    fn left_normal_turns_anticlockwise() {
        let l = left_normal(Vector3::new(1.0, 0.0, 0.0));
        assert!((l.y - 1.0).abs() < TOLERANCE);
        assert!(l.x.abs() < TOLERANCE);
    }
}

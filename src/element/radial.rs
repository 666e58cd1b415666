use super::CornerType;
use crate::math::{plan_distance, Point3};

/// A projected radial taking part in overlap resolution.
///
/// `current_terminus` starts at `surface_hit` and only ever moves towards
/// `origin`.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapRadial {
    /// Index of the vertex this radial was derived from.
    pub vertex: usize,
    pub origin: Point3,
    pub surface_hit: Point3,
    pub current_terminus: Point3,
    /// Radial whose toe cut this one short.
    pub truncating_radial: Option<usize>,
    pub corner_type: CornerType,
    /// Set when the radial contributes nothing to the boundary.
    pub removed: bool,
}

impl OverlapRadial {
    #[must_use]
    pub fn new(vertex: usize, origin: Point3, surface_hit: Point3, corner_type: CornerType) -> Self {
        Self {
            vertex,
            origin,
            surface_hit,
            current_terminus: surface_hit,
            truncating_radial: None,
            corner_type,
            removed: false,
        }
    }

    /// Plan length of the untruncated ray.
    #[must_use]
    pub fn full_length(&self) -> f64 {
        plan_distance(&self.origin, &self.surface_hit)
    }

    /// Plan length from origin to the current terminus.
    #[must_use]
    pub fn current_length(&self) -> f64 {
        plan_distance(&self.origin, &self.current_terminus)
    }

    /// Rise per unit plan distance along the ray.
    #[must_use]
    pub fn slope(&self) -> f64 {
        let len = self.full_length();
        if len < crate::math::TOLERANCE {
            0.0
        } else {
            (self.surface_hit.z - self.origin.z) / len
        }
    }

    #[must_use]
    pub fn is_ascending(&self) -> bool {
        self.slope() > 0.0
    }

    /// Ray elevation at plan point `p`, measured by plan distance from the origin.
    #[must_use]
    pub fn elevation_at(&self, p: &Point3) -> f64 {
        self.origin.z + self.slope() * plan_distance(&self.origin, p)
    }

    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncating_radial.is_some()
    }

    #[must_use]
    pub fn is_degenerate(&self, tolerance: f64) -> bool {
        self.full_length() <= tolerance
    }

    /// Moves the terminus to `point` when that shortens the radial.
    ///
    /// Returns `true` if the terminus moved.
    pub fn truncate_to(&mut self, point: Point3, by: Option<usize>) -> bool {
        if plan_distance(&self.origin, &point) >= self.current_length() {
            return false;
        }
        self.current_terminus = Point3::new(point.x, point.y, self.elevation_at(&point));
        self.truncating_radial = by;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radial() -> OverlapRadial {
        OverlapRadial::new(
            0,
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(10.0, 0.0, 0.0),
            CornerType::Normal,
        )
    }

    #[test]
    fn slope_and_elevation() {
        let r = radial();
        assert!((r.slope() + 0.5).abs() < 1e-12);
        assert!(!r.is_ascending());
        assert!((r.elevation_at(&Point3::new(4.0, 0.0, 0.0)) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn truncation_is_monotone() {
        let mut r = radial();
        assert!(r.truncate_to(Point3::new(6.0, 0.0, 99.0), Some(3)));
        assert!((r.current_terminus.z - 2.0).abs() < 1e-12);
        assert_eq!(r.truncating_radial, Some(3));
        assert!(!r.truncate_to(Point3::new(8.0, 0.0, 0.0), Some(4)));
        assert_eq!(r.truncating_radial, Some(3));
        assert!((r.current_length() - 6.0).abs() < 1e-12);
    }
}

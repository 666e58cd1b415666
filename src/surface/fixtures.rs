//! Test surfaces: a dense grid TIN and one with deliberately broken topology.

use super::{DrapeStatus, Intercept, NextCrossing, PointLocation, TerrainSurface, Tin, TriangleId};
use crate::math::Point3;

/// Grid TIN of `cells` x `cells` squares of side `spacing` from the origin,
/// with elevations from `z`.
///
/// # Panics
///
/// Panics if `cells` is zero.
#[allow(clippy::unwrap_used)]
pub fn grid(cells: u32, spacing: f64, z: impl Fn(f64, f64) -> f64) -> Tin {
    let mut points = Vec::new();
    for i in 0..=cells {
        for j in 0..=cells {
            let (x, y) = (f64::from(i) * spacing, f64::from(j) * spacing);
            points.push(Point3::new(x, y, z(x, y)));
        }
    }
    Tin::from_points(&points).unwrap()
}

/// Level ground at `elevation` whose edge walk never advances.
///
/// Every plan point lies in triangle 0. With `backwards` set the walk
/// reports a crossing behind the entry parameter instead of none at all.
#[derive(Debug, Clone, Copy)]
pub struct StalledSurface {
    pub elevation: f64,
    pub backwards: bool,
}

impl TerrainSurface for StalledSurface {
    fn locate_point(&self, _p: &Point3) -> PointLocation {
        PointLocation::Triangle(0)
    }

    fn drape_point(&self, _p: &Point3) -> (Option<f64>, DrapeStatus) {
        (Some(self.elevation), DrapeStatus::Inside)
    }

    fn triangle(&self, _id: TriangleId) -> [Point3; 3] {
        let z = self.elevation;
        [
            Point3::new(-1e6, -1e6, z),
            Point3::new(1e6, -1e6, z),
            Point3::new(0.0, 1e6, z),
        ]
    }

    fn walk_next_edge_crossing(
        &self,
        from: &Point3,
        _to: &Point3,
        _current: TriangleId,
        t_enter: f64,
    ) -> Option<NextCrossing> {
        self.backwards.then_some(NextCrossing::Crosses {
            t: t_enter - 0.5,
            point: *from,
            next: PointLocation::Triangle(0),
        })
    }

    fn closest_hull_edge(&self, _p: &Point3) -> Option<(Point3, Point3)> {
        None
    }

    fn find_hull_or_void_intercept(&self, _from: &Point3, _to: &Point3) -> Option<Intercept> {
        None
    }
}

//! Splitting slope toes where they cross on and off a bench surface.

use crate::math::intersect_2d::point_at;
use crate::math::{plan_distance, Point3};
use crate::surface::{PointLocation, TerrainSurface};

/// Upper bound on boundary crossings searched along one toe segment.
const MAX_CROSSINGS_PER_SEGMENT: usize = 256;

/// A piece of toe polyline and whether it lies on the bench surface.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchPiece {
    pub points: Vec<Point3>,
    pub on_bench: bool,
}

/// Splits `toe` wherever it crosses the hull or a void of `bench`.
///
/// Consecutive pieces with the same membership are merged, so the result
/// alternates between on-bench and off-bench pieces.
#[must_use]
pub fn split_on_bench(toe: &[Point3], bench: &dyn TerrainSurface, tolerance: f64) -> Vec<BenchPiece> {
    let mut pieces: Vec<BenchPiece> = Vec::new();
    for w in toe.windows(2) {
        let cuts = crossings_along(&w[0], &w[1], bench, tolerance);
        let mut stations = Vec::with_capacity(cuts.len() + 2);
        stations.push(w[0]);
        stations.extend(cuts);
        stations.push(w[1]);

        for s in stations.windows(2) {
            if plan_distance(&s[0], &s[1]) <= tolerance {
                continue;
            }
            let mid = Point3::new((s[0].x + s[1].x) * 0.5, (s[0].y + s[1].y) * 0.5, 0.0);
            let on_bench = matches!(bench.locate_point(&mid), PointLocation::Triangle(_));
            match pieces.last_mut() {
                Some(last) if last.on_bench == on_bench => last.points.push(s[1]),
                _ => pieces.push(BenchPiece {
                    points: vec![s[0], s[1]],
                    on_bench,
                }),
            }
        }
    }
    pieces
}

/// Points where `a -> b` crosses a hull or void edge of `bench`, in order.
/// Elevations are taken from the toe, not the bench.
fn crossings_along(a: &Point3, b: &Point3, bench: &dyn TerrainSurface, tolerance: f64) -> Vec<Point3> {
    let length = plan_distance(a, b);
    if length <= tolerance {
        return Vec::new();
    }
    let dir = b - a;
    let step = (tolerance / length).max(1e-9);

    let mut cuts = Vec::new();
    let mut s = 0.0;
    for _ in 0..MAX_CROSSINGS_PER_SEGMENT {
        let from = point_at(a, &dir, s);
        let Some(hit) = bench.find_hull_or_void_intercept(&from, b) else {
            break;
        };
        let at = s + (1.0 - s) * hit.t;
        if at >= 1.0 - step {
            break;
        }
        if at > step && cuts.last().is_none_or(|c| plan_distance(c, &point_at(a, &dir, at)) > tolerance) {
            cuts.push(point_at(a, &dir, at));
        }
        s = at + step;
    }
    cuts
}

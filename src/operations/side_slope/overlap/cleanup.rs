//! Passes run after radial-radial truncation has settled.

use super::sweep::sweep_crossings;
use crate::element::OverlapRadial;
use crate::math::intersect_2d::point_at;
use crate::math::polygon_2d::point_strictly_inside_2d;
use crate::math::{plan_distance, Point3};

/// Cuts radials whose toe runs back across a non-incident edge of the
/// element baseline. Returns the number of radials truncated.
pub fn truncate_at_baseline(radials: &mut [OverlapRadial], closed: bool, tolerance: f64) -> usize {
    let n = radials.len();
    let edge_count = if closed { n } else { n.saturating_sub(1) };
    let edges: Vec<(usize, usize)> = (0..edge_count)
        .map(|e| (e, (e + 1) % n))
        .filter(|&(a, b)| plan_distance(&radials[a].origin, &radials[b].origin) > tolerance)
        .collect();

    let mut segments: Vec<(Point3, Point3)> = radials
        .iter()
        .map(|r| (r.origin, r.current_terminus))
        .collect();
    segments.extend(edges.iter().map(|&(a, b)| (radials[a].origin, radials[b].origin)));

    let is_edge = |s: usize| s >= n;
    let incident = |radial: usize, edge: usize| {
        let (a, b) = edges[edge - n];
        let origin = &radials[radial].origin;
        a == radial
            || b == radial
            || plan_distance(origin, &radials[a].origin) <= tolerance
            || plan_distance(origin, &radials[b].origin) <= tolerance
    };
    let crossings = sweep_crossings(&segments, |i, j| {
        if is_edge(i) == is_edge(j) {
            return false;
        }
        let (r, e) = if is_edge(i) { (j, i) } else { (i, j) };
        !radials[r].removed && !incident(r, e)
    });

    let mut truncated = 0;
    for c in crossings {
        let (r, t) = if is_edge(c.a) { (c.b, c.tb) } else { (c.a, c.ta) };
        let radial = &mut radials[r];
        let point = point_at(&radial.origin, &(radial.current_terminus - radial.origin), t);
        if radial.truncate_to(point, None) {
            truncated += 1;
        }
    }
    truncated
}

/// Marks radials whose toe lies inside the toe quadrilateral of their
/// surviving neighbours, where at least one neighbour has been truncated.
///
/// Repeats until stable. Returns the number of radials removed.
pub fn remove_covered(radials: &mut [OverlapRadial], closed: bool, tolerance: f64) -> usize {
    let n = radials.len();
    let mut removed = 0;
    loop {
        let mut changed = false;
        for i in 0..n {
            if radials[i].removed {
                continue;
            }
            let (Some(prev), Some(next)) = (neighbour(radials, i, closed, false), neighbour(radials, i, closed, true))
            else {
                continue;
            };
            if prev == next || !(radials[prev].is_truncated() || radials[next].is_truncated()) {
                continue;
            }
            let quad = [
                radials[prev].origin,
                radials[prev].current_terminus,
                radials[next].current_terminus,
                radials[next].origin,
            ];
            if point_strictly_inside_2d(&radials[i].current_terminus, &quad, tolerance) {
                radials[i].removed = true;
                removed += 1;
                changed = true;
            }
        }
        if !changed {
            return removed;
        }
    }
}

/// Nearest surviving radial before (or after) `i`.
fn neighbour(radials: &[OverlapRadial], i: usize, closed: bool, forward: bool) -> Option<usize> {
    let n = radials.len();
    let mut j = i;
    for _ in 1..n {
        j = match (forward, closed) {
            (true, _) if j + 1 < n => j + 1,
            (true, true) => 0,
            (false, _) if j > 0 => j - 1,
            (false, true) => n - 1,
            _ => return None,
        };
        if !radials[j].removed {
            return Some(j);
        }
    }
    None
}

//! Sweep-line scan for proper crossings among plan segments.

use crate::math::intersect_2d::segment_crossing_2d;
use crate::math::Point3;

/// A proper crossing between segments `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub a: usize,
    pub b: usize,
    pub point: Point3,
    /// Parameter of the crossing along `a`.
    pub ta: f64,
    /// Parameter of the crossing along `b`.
    pub tb: f64,
}

/// Finds every pair of segments that properly cross.
///
/// Segments are entered in order of their lower x; each entering segment is
/// tested against the active set, from which segments ending left of it have
/// been retired. `accept` filters candidate pairs before the crossing test.
pub fn sweep_crossings(
    segments: &[(Point3, Point3)],
    mut accept: impl FnMut(usize, usize) -> bool,
) -> Vec<Crossing> {
    let min_x = |i: usize| segments[i].0.x.min(segments[i].1.x);
    let max_x = |i: usize| segments[i].0.x.max(segments[i].1.x);

    let mut order: Vec<usize> = (0..segments.len()).collect();
    order.sort_by(|&i, &j| min_x(i).total_cmp(&min_x(j)));

    let mut active: Vec<usize> = Vec::new();
    let mut crossings = Vec::new();
    for &i in &order {
        let lo = min_x(i);
        active.retain(|&j| max_x(j) >= lo);
        for &j in &active {
            if !accept(i, j) {
                continue;
            }
            let (a0, a1) = &segments[i];
            let (b0, b1) = &segments[j];
            if let Some((point, ta, tb)) = segment_crossing_2d(a0, a1, b0, b1) {
                crossings.push(Crossing { a: i, b: j, point, ta, tb });
            }
        }
        active.push(i);
    }
    crossings
}

//! Tie-break rules and truncation bookkeeping for crossing radials.

use crate::element::{CornerType, OverlapRadial};
use crate::math::{plan_distance, Point3};

/// Which radial(s) of a crossing pair are cut back to the crossing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    TruncateA,
    TruncateB,
    TruncateBoth,
}

/// Decides which of two crossing radials loses at `point`.
///
/// Equal elevations favour cutting a concave radial, otherwise both. Two
/// descending rays cut the lower one, two ascending rays the higher one,
/// and a mixed pair always cuts the ascending ray.
#[must_use]
pub fn tie_break(a: &OverlapRadial, b: &OverlapRadial, point: &Point3, elevation_tolerance: f64) -> Verdict {
    let za = a.elevation_at(point);
    let zb = b.elevation_at(point);
    if (za - zb).abs() <= elevation_tolerance {
        let a_concave = a.corner_type == CornerType::Concave;
        let b_concave = b.corner_type == CornerType::Concave;
        return match (a_concave, b_concave) {
            (true, false) => Verdict::TruncateA,
            (false, true) => Verdict::TruncateB,
            _ => Verdict::TruncateBoth,
        };
    }
    match (a.is_ascending(), b.is_ascending()) {
        (false, false) => {
            if za < zb {
                Verdict::TruncateA
            } else {
                Verdict::TruncateB
            }
        }
        (true, true) => {
            if za > zb {
                Verdict::TruncateA
            } else {
                Verdict::TruncateB
            }
        }
        (true, false) => Verdict::TruncateA,
        (false, true) => Verdict::TruncateB,
    }
}

/// Whether `winner` was itself defeated, directly or through a chain, by
/// the radial that already truncated `loser`, or by `loser` itself.
///
/// Such a truncation would rest on a crossing that is no longer current.
#[must_use]
pub fn is_superseded(radials: &[OverlapRadial], loser: usize, winner: usize) -> bool {
    let prior = radials[loser].truncating_radial;
    let mut seen = vec![winner];
    let mut cursor = radials[winner].truncating_radial;
    while let Some(c) = cursor {
        if c == loser || Some(c) == prior {
            return true;
        }
        if seen.contains(&c) {
            return false;
        }
        seen.push(c);
        cursor = radials[c].truncating_radial;
    }
    false
}

/// Gives every truncated terminus the elevation of the surface that cut it.
///
/// The cutting radial's ray is used when the terminus lies within its
/// remaining extent; otherwise the chain of truncators is followed with an
/// explicit stack until one covers the point.
pub fn propagate_elevations(radials: &mut [OverlapRadial], tolerance: f64) {
    for i in 0..radials.len() {
        if radials[i].removed {
            continue;
        }
        let Some(first) = radials[i].truncating_radial else {
            continue;
        };
        let p = radials[i].current_terminus;
        let mut stack = vec![first];
        let mut visited = vec![i];
        let mut z = None;
        while let Some(w) = stack.pop() {
            let r = &radials[w];
            z = Some(r.elevation_at(&p));
            let covers = plan_distance(&r.origin, &p) <= r.current_length() + tolerance;
            visited.push(w);
            match r.truncating_radial {
                Some(next) if !covers && !visited.contains(&next) => stack.push(next),
                _ => break,
            }
        }
        if let Some(z) = z {
            radials[i].current_terminus.z = z;
        }
    }
}

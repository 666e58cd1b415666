mod radial;
mod vertex;

pub use radial::OverlapRadial;
pub use vertex::{CornerType, Genesis, SideSlopeVertex, SlopeTargetKind, VertexStatus};

use crate::math::{plan_distance, Point3};

/// Whether the vertex table describes a closed element: at least four entries
/// with coincident first and last positions.
#[must_use]
pub fn is_closed(vertices: &[SideSlopeVertex], pp_tolerance: f64) -> bool {
    match (vertices.first(), vertices.last()) {
        (Some(first), Some(last)) if vertices.len() >= 4 => {
            plan_distance(&first.position, &last.position) <= pp_tolerance
        }
        _ => false,
    }
}

/// Plan positions of the vertex table.
#[must_use]
pub fn positions(vertices: &[SideSlopeVertex]) -> Vec<Point3> {
    vertices.iter().map(|v| v.position).collect()
}

/// Index of the previous vertex, wrapping over the closing duplicate when closed.
#[must_use]
pub fn prev_index(i: usize, len: usize, closed: bool) -> Option<usize> {
    if i > 0 {
        Some(i - 1)
    } else if closed && len >= 2 {
        Some(len - 2)
    } else {
        None
    }
}

/// Index of the next vertex, wrapping over the closing duplicate when closed.
#[must_use]
pub fn next_index(i: usize, len: usize, closed: bool) -> Option<usize> {
    if i + 1 < len {
        if closed && i + 2 == len {
            Some(0)
        } else {
            Some(i + 1)
        }
    } else if closed && len >= 2 {
        Some(1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f64, y: f64) -> SideSlopeVertex {
        SideSlopeVertex::new(Point3::new(x, y, 0.0), SlopeTargetKind::ToSurface, 0.5, 0.5)
    }

    #[test]
    fn closed_needs_four_entries() {
        let tri = vec![vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(0.0, 0.0)];
        assert!(!is_closed(&tri, 1e-6));
        let quad = vec![vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(1.0, 1.0), vertex(0.0, 0.0)];
        assert!(is_closed(&quad, 1e-6));
    }

    #[test]
    fn neighbours_skip_closing_duplicate() {
        // 0 1 2 3(=0)
        assert_eq!(prev_index(0, 4, true), Some(2));
        assert_eq!(next_index(2, 4, true), Some(0));
        assert_eq!(next_index(3, 4, true), Some(1));
        assert_eq!(prev_index(0, 4, false), None);
        assert_eq!(next_index(3, 4, false), None);
        assert_eq!(next_index(1, 4, false), Some(2));
    }
}

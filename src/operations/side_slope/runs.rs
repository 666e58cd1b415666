//! Splitting a projected element into runs of active radials.

use crate::element::{OverlapRadial, SideSlopeVertex};

/// A maximal stretch of consecutive active vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRun {
    /// Vertex-table indices, in element order.
    pub indices: Vec<usize>,
    /// Whether the run wraps all the way round a closed element.
    pub closed: bool,
}

impl ActiveRun {
    /// Radials of this run, one per vertex that reached a terminal point.
    #[must_use]
    pub fn radials(&self, vertices: &[SideSlopeVertex]) -> Vec<OverlapRadial> {
        self.indices
            .iter()
            .map(|&i| {
                let v = &vertices[i];
                OverlapRadial::new(i, v.position, v.terminal_point, v.corner_type)
            })
            .collect()
    }
}

/// Splits `vertices` at inactive vertices.
///
/// A closed element whose vertices are all active yields a single closed run
/// that excludes the closing duplicate. Otherwise every run is open; on a
/// closed element the run crossing the seam is joined across it. Runs with
/// fewer than two vertices are dropped.
#[must_use]
pub fn split_active_runs(vertices: &[SideSlopeVertex], closed: bool) -> Vec<ActiveRun> {
    let len = if closed { vertices.len().saturating_sub(1) } else { vertices.len() };
    if len == 0 {
        return Vec::new();
    }

    let first_inactive = (0..len).find(|&i| !vertices[i].is_active());
    let (start, span) = match (closed, first_inactive) {
        (true, None) => {
            let indices: Vec<usize> = (0..len).collect();
            return if indices.len() < 2 {
                Vec::new()
            } else {
                vec![ActiveRun { indices, closed: true }]
            };
        }
        // Start just past an inactive vertex so no run straddles the seam.
        (true, Some(k)) => (k + 1, len),
        (false, _) => (0, len),
    };

    let mut runs = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    for step in 0..span {
        let i = (start + step) % len;
        if vertices[i].is_active() {
            current.push(i);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs.into_iter()
        .filter(|indices| indices.len() >= 2)
        .map(|indices| ActiveRun { indices, closed: false })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{SlopeTargetKind, VertexStatus};
    use crate::math::Point3;

    fn element(coords: &[(f64, f64)], inactive: &[usize]) -> Vec<SideSlopeVertex> {
        coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                let mut v = SideSlopeVertex::new(Point3::new(x, y, 0.0), SlopeTargetKind::ToSurface, 0.5, 0.5);
                if inactive.contains(&i) {
                    v.status = VertexStatus::Inactive;
                }
                v
            })
            .collect()
    }

    const SQUARE: [(f64, f64); 5] = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)];

    #[test]
    fn fully_active_closed_element_is_one_closed_run() {
        let runs = split_active_runs(&element(&SQUARE, &[]), true);
        assert_eq!(runs, vec![ActiveRun { indices: vec![0, 1, 2, 3], closed: true }]);
    }

    #[test]
    fn open_element_splits_at_inactive_vertex() {
        let coords = [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0), (5.0, 0.0)];
        let runs = split_active_runs(&element(&coords, &[2]), false);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].indices, vec![0, 1]);
        assert_eq!(runs[1].indices, vec![3, 4, 5]);
        assert!(runs.iter().all(|r| !r.closed));
    }

    #[test]
    fn closed_run_joins_across_the_seam() {
        let runs = split_active_runs(&element(&SQUARE, &[1]), true);
        assert_eq!(runs, vec![ActiveRun { indices: vec![2, 3, 0], closed: false }]);
    }

    #[test]
    fn single_vertex_runs_are_dropped() {
        let coords = [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)];
        let runs = split_active_runs(&element(&coords, &[1, 3]), false);
        assert!(runs.is_empty());
    }

    #[test]
    fn radials_keep_vertex_indices() {
        let mut vs = element(&SQUARE, &[]);
        vs[1].terminal_point = Point3::new(15.0, -5.0, -2.0);
        let run = &split_active_runs(&vs, true)[0];
        let radials = run.radials(&vs);
        assert_eq!(radials.len(), 4);
        assert_eq!(radials[1].vertex, 1);
        assert_eq!(radials[1].surface_hit, Point3::new(15.0, -5.0, -2.0));
        assert_eq!(radials[1].current_terminus, radials[1].surface_hit);
    }
}

//! Boundary and hole extraction for one resolved run.
//!
//! Base and toe polylines are inserted into a constrained Delaunay
//! triangulation, faces are classified by parity flood fill, and the edges
//! between interior and exterior faces are chained into loops.

use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use super::bench::split_on_bench;
use super::overlap::sweep_crossings;
use crate::config::Side;
use crate::diagnostics::{DiagnosticsContext, Stage};
use crate::element::OverlapRadial;
use crate::error::{InputError, Result};
use crate::math::polygon_2d::signed_area_2d;
use crate::math::{plan_distance, Point3};
use crate::model::{BenchSegment, FeatureKind, FeatureStore, SurfaceModel};
use crate::surface::TerrainSurface;

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Builds the surface model of one resolved run.
pub struct BoundaryExtractor<'a> {
    side: Side,
    closed: bool,
    exterior: bool,
    tolerance: f64,
    bench: Option<&'a dyn TerrainSurface>,
}

impl<'a> BoundaryExtractor<'a> {
    /// Creates an extractor for a run on `side`.
    #[must_use]
    pub fn new(side: Side, closed: bool, tolerance: f64) -> Self {
        Self {
            side,
            closed,
            exterior: true,
            tolerance,
            bench: None,
        }
    }

    /// Whether slopes of a closed run point away from the enclosed area.
    #[must_use]
    pub fn with_exterior(mut self, exterior: bool) -> Self {
        self.exterior = exterior;
        self
    }

    /// Splits slope toes against `bench`.
    #[must_use]
    pub fn with_bench(mut self, bench: Option<&'a dyn TerrainSurface>) -> Self {
        self.bench = bench;
        self
    }

    /// Stores boundary, holes, toes and breaklines of `radials` in a new model.
    ///
    /// # Errors
    ///
    /// Returns `InputError::Degenerate` if a constraint point cannot be
    /// inserted into the triangulation.
    pub fn execute(&self, radials: Vec<OverlapRadial>, diagnostics: &mut DiagnosticsContext) -> Result<SurfaceModel> {
        let mut model = SurfaceModel::new(self.side, self.closed);

        let base = dedup_chain(radials.iter().map(|r| r.origin), self.tolerance);
        let toe = dedup_chain(
            radials.iter().filter(|r| !r.removed).map(|r| r.current_terminus),
            self.tolerance,
        );

        let loops = self.constraint_loops(&base, &toe);
        let (outers, holes) = self.extract_loops(&loops, diagnostics)?;
        for outer in outers {
            model.store_feature(FeatureKind::Hull, outer);
        }
        for hole in holes {
            model.store_feature(FeatureKind::Hole, hole);
        }

        let toe_line = if self.closed { close_ring(&toe) } else { toe };
        self.store_toe(&mut model, toe_line);

        for r in radials.iter().filter(|r| !r.removed && !r.is_degenerate(self.tolerance)) {
            model.store_feature(FeatureKind::Breakline, vec![r.origin, r.current_terminus]);
        }
        if base.len() >= 2 {
            let base_line = if self.closed { close_ring(&base) } else { base };
            model.store_feature(FeatureKind::Breakline, base_line);
        }

        diagnostics.record(
            Stage::Boundary,
            &format!(
                "{:?} run: boundary {}, {} holes, {} toes",
                self.side,
                if model.boundary().is_some() { "found" } else { "missing" },
                model.holes().len(),
                model.slope_toes().len()
            ),
        );
        model.set_radials(radials);
        Ok(model)
    }

    /// Closed constraint loops bounding the batter.
    fn constraint_loops(&self, base: &[Point3], toe: &[Point3]) -> Vec<Vec<Point3>> {
        match (self.closed, self.exterior) {
            (true, true) => vec![toe.to_vec()],
            (true, false) => vec![base.to_vec(), toe.to_vec()],
            // Base forward, then the last radial, the toe backwards and the first radial.
            (false, _) => {
                let mut ring = base.to_vec();
                ring.extend(toe.iter().rev());
                vec![dedup_ring(ring, self.tolerance)]
            }
        }
    }

    fn store_toe(&self, model: &mut SurfaceModel, toe: Vec<Point3>) {
        if toe.len() < 2 {
            return;
        }
        let Some(bench) = self.bench else {
            model.store_feature(FeatureKind::SlopeToe, toe);
            return;
        };
        for piece in split_on_bench(&toe, bench, self.tolerance) {
            let feature = model.store_feature(FeatureKind::SlopeToe, piece.points);
            model.push_bench_segment(BenchSegment {
                feature,
                on_bench: piece.on_bench,
            });
        }
    }

    /// Triangulates the constraint loops and returns the anticlockwise outer
    /// loops, largest first, and the clockwise holes.
    fn extract_loops(
        &self,
        loops: &[Vec<Point3>],
        diagnostics: &mut DiagnosticsContext,
    ) -> Result<(Vec<Vec<Point3>>, Vec<Vec<Point3>>)> {
        let segments: Vec<(Point3, Point3)> = loops
            .iter()
            .filter(|l| l.len() >= 3)
            .flat_map(|l| (0..l.len()).map(move |i| (l[i], l[(i + 1) % l.len()])))
            .filter(|(a, b)| plan_distance(a, b) > self.tolerance)
            .collect();
        if segments.len() < 3 {
            return Ok((Vec::new(), Vec::new()));
        }

        let mut cdt = Cdt::new();
        let mut elevations: HashMap<usize, f64> = HashMap::new();
        let mut skipped = 0;
        for (a, b) in node_segments(&segments) {
            let from = insert_point(&mut cdt, &mut elevations, &a)?;
            let to = insert_point(&mut cdt, &mut elevations, &b)?;
            if from == to {
                continue;
            }
            if cdt.can_add_constraint(from, to) {
                cdt.add_constraint(from, to);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            diagnostics.constraints_skipped += skipped;
            diagnostics.record(Stage::Boundary, &format!("skipped {skipped} crossing constraint edges"));
        }

        let interior = classify_interior_faces(&cdt);
        let mut outers = Vec::new();
        let mut holes = Vec::new();
        for ring in chain_boundary_edges(&cdt, &interior) {
            let points: Vec<Point3> = ring
                .iter()
                .map(|&v| {
                    let p = cdt.vertex(v).position();
                    Point3::new(p.x, p.y, elevations.get(&v.index()).copied().unwrap_or(0.0))
                })
                .collect();
            let area = signed_area_2d(&points);
            if area > 0.0 {
                outers.push((area, points));
            } else if area < 0.0 {
                holes.push(points);
            }
        }
        outers.sort_by(|x, y| y.0.total_cmp(&x.0));
        Ok((outers.into_iter().map(|(_, p)| p).collect(), holes))
    }
}

/// Splits every segment at its proper crossings with the others so the
/// triangulation never sees two crossing constraints.
fn node_segments(segments: &[(Point3, Point3)]) -> Vec<(Point3, Point3)> {
    let mut splits: Vec<Vec<(f64, Point3)>> = vec![Vec::new(); segments.len()];
    for c in sweep_crossings(segments, |_, _| true) {
        splits[c.a].push((c.ta, c.point));
        splits[c.b].push((c.tb, c.point));
    }
    let mut out = Vec::with_capacity(segments.len());
    for (&(a, b), mut cuts) in segments.iter().zip(splits) {
        cuts.sort_by(|x, y| x.0.total_cmp(&y.0));
        let mut prev = a;
        for (_, p) in cuts {
            out.push((prev, p));
            prev = p;
        }
        out.push((prev, b));
    }
    out
}

fn insert_point(cdt: &mut Cdt, elevations: &mut HashMap<usize, f64>, p: &Point3) -> Result<FixedVertexHandle> {
    let handle = cdt
        .insert(SpadePoint2::new(p.x, p.y))
        .map_err(|e: InsertionError| InputError::Degenerate(format!("boundary point ({}, {}): {e}", p.x, p.y)))?;
    elevations.entry(handle.index()).or_insert(p.z);
    Ok(handle)
}

/// Inner faces enclosed by an odd number of constraint loops.
///
/// Parity starts at the hull faces, odd behind a constrained hull edge, and
/// flips across every constraint edge on the way in.
fn classify_interior_faces(cdt: &Cdt) -> HashSet<usize> {
    let mut parity: Vec<Option<bool>> = vec![None; cdt.num_all_faces()];
    let mut queue: VecDeque<FixedFaceHandle<InnerTag>> = VecDeque::new();

    for edge in cdt.convex_hull() {
        let Some(face) = [edge.face(), edge.rev().face()].into_iter().find_map(|f| f.as_inner()) else {
            continue;
        };
        let slot = &mut parity[face.fix().index()];
        if slot.is_none() {
            *slot = Some(cdt.is_constraint_edge(edge.as_undirected().fix()));
            queue.push_back(face.fix());
        }
    }

    while let Some(face) = queue.pop_front() {
        let odd = parity[face.index()] == Some(true);
        for edge in cdt.face(face).adjacent_edges() {
            let Some(next) = edge.rev().face().as_inner() else {
                continue;
            };
            let slot = &mut parity[next.fix().index()];
            if slot.is_none() {
                *slot = Some(odd != cdt.is_constraint_edge(edge.as_undirected().fix()));
                queue.push_back(next.fix());
            }
        }
    }

    parity
        .into_iter()
        .enumerate()
        .filter_map(|(i, odd)| (odd == Some(true)).then_some(i))
        .collect()
}

/// Chains the edges separating interior faces from the rest into closed
/// vertex loops. Each loop keeps the interior on its left.
fn chain_boundary_edges(cdt: &Cdt, interior: &HashSet<usize>) -> Vec<Vec<FixedVertexHandle>> {
    let mut outgoing: HashMap<FixedVertexHandle, Vec<FixedVertexHandle>> = HashMap::new();
    let mut edge_count = 0;
    for face in cdt.inner_faces() {
        if !interior.contains(&face.fix().index()) {
            continue;
        }
        for edge in face.adjacent_edges() {
            let outside = edge
                .rev()
                .face()
                .as_inner()
                .is_none_or(|f| !interior.contains(&f.fix().index()));
            if outside {
                outgoing.entry(edge.from().fix()).or_default().push(edge.to().fix());
                edge_count += 1;
            }
        }
    }

    let mut loops = Vec::new();
    let mut starts: Vec<FixedVertexHandle> = outgoing.keys().copied().collect();
    starts.sort_by_key(|v| v.index());
    for start in starts {
        while outgoing.get(&start).is_some_and(|out| !out.is_empty()) {
            let mut ring = vec![start];
            let mut current = start;
            let mut closed = false;
            for _ in 0..edge_count {
                let Some(next) = outgoing.get_mut(&current).and_then(Vec::pop) else {
                    break;
                };
                if next == start {
                    closed = true;
                    break;
                }
                ring.push(next);
                current = next;
            }
            if closed && ring.len() >= 3 {
                loops.push(ring);
            }
        }
    }
    loops
}

/// Drops consecutive points closer than `tolerance`.
fn dedup_chain(points: impl Iterator<Item = Point3>, tolerance: f64) -> Vec<Point3> {
    let mut out: Vec<Point3> = Vec::new();
    for p in points {
        if out.last().is_none_or(|q| plan_distance(q, &p) > tolerance) {
            out.push(p);
        }
    }
    out
}

/// Like [`dedup_chain`], also dropping a last point that repeats the first.
fn dedup_ring(points: Vec<Point3>, tolerance: f64) -> Vec<Point3> {
    let mut out = dedup_chain(points.into_iter(), tolerance);
    while out.len() > 1 && plan_distance(&out[0], &out[out.len() - 1]) <= tolerance {
        out.pop();
    }
    out
}

fn close_ring(points: &[Point3]) -> Vec<Point3> {
    let mut out = points.to_vec();
    if let Some(&first) = points.first() {
        out.push(first);
    }
    out
}

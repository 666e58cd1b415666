use crate::config::SideSlopeParams;
use crate::diagnostics::{DiagnosticsContext, Stage};
use crate::element::{is_closed, positions, Genesis, SideSlopeVertex, SlopeTargetKind, VertexStatus};
use crate::error::{try_grow, AllocationError, GeometryError, InputError, Result};
use crate::math::distance_2d::closest_point_on_segment;
use crate::math::intersect_2d::segment_segment_intersect_2d;
use crate::math::polygon_2d::signed_area_2d;
use crate::math::{plan_distance, Point3, TOLERANCE};
use crate::surface::{PointLocation, SurfaceRegistry, TerrainSurface};

/// What the preprocessor did to the vertex table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessReport {
    pub closed: bool,
    /// The table was reversed to make a closed element anticlockwise.
    pub reversed: bool,
    pub transitions_inserted: usize,
    pub deactivated: usize,
}

/// Cleans and annotates an element's vertex table before projection.
pub struct ElementPreprocessor<'a> {
    surfaces: &'a SurfaceRegistry,
    pp_tolerance: f64,
    elevation_tolerance: f64,
}

impl<'a> ElementPreprocessor<'a> {
    #[must_use]
    pub fn new(surfaces: &'a SurfaceRegistry, params: &SideSlopeParams) -> Self {
        Self {
            surfaces,
            pp_tolerance: params.pp_tolerance,
            elevation_tolerance: params.elevation_tolerance,
        }
    }

    /// Runs every preprocessing step in order.
    ///
    /// # Errors
    ///
    /// Returns `InputError` for degenerate, self-intersecting or zero-area
    /// elements and for unregistered surface handles, and `AllocationError`
    /// if the table cannot grow.
    pub fn execute(
        &self,
        vertices: &mut Vec<SideSlopeVertex>,
        diagnostics: &mut DiagnosticsContext,
    ) -> Result<PreprocessReport> {
        self.check_surfaces(vertices)?;
        dedupe(vertices, self.pp_tolerance);
        if vertices.len() < 2 {
            return Err(InputError::Degenerate(format!(
                "{} distinct vertices, at least 2 required",
                vertices.len()
            ))
            .into());
        }
        let closed = is_closed(vertices, self.pp_tolerance);
        if closed {
            let first = vertices[0].position;
            if let Some(last) = vertices.last_mut() {
                last.position = first;
            }
        }

        detect_knots(vertices, closed)?;
        let reversed = if closed { orient_anticlockwise(vertices)? } else { false };

        let mut inserted = insert_elevation_transitions(vertices, self.pp_tolerance, self.elevation_tolerance)?;
        inserted += insert_cut_fill_transitions(vertices, self.surfaces, self.pp_tolerance, self.elevation_tolerance)?;
        inserted += insert_slope_to_transitions(vertices, self.surfaces, self.pp_tolerance)?;
        if inserted > 0 {
            diagnostics.transitions_inserted += inserted;
            diagnostics.record(Stage::Preprocess, &format!("inserted {inserted} transition vertices"));
        }

        let unsolved = assign_nominal_slopes(vertices, self.surfaces, self.elevation_tolerance);
        for error in &unsolved {
            diagnostics.record_deactivation(Stage::Preprocess, error);
        }
        let deactivated = unsolved.len();

        Ok(PreprocessReport {
            closed,
            reversed,
            transitions_inserted: inserted,
            deactivated,
        })
    }

    fn check_surfaces(&self, vertices: &[SideSlopeVertex]) -> std::result::Result<(), InputError> {
        for (i, v) in vertices.iter().enumerate() {
            for id in [v.target_surface, v.limit_surface].into_iter().flatten() {
                if self.surfaces.get(id).is_none() {
                    return Err(InputError::UnknownSurface { vertex: i });
                }
            }
        }
        Ok(())
    }
}

/// Removes consecutive vertices within `tolerance` of each other.
///
/// A closed table of three entries collapses to an open two-vertex element.
/// Returns the number of vertices removed.
pub fn dedupe(vertices: &mut Vec<SideSlopeVertex>, tolerance: f64) -> usize {
    let before = vertices.len();
    vertices.dedup_by(|b, a| plan_distance(&a.position, &b.position) <= tolerance);
    if vertices.len() == 3 && plan_distance(&vertices[0].position, &vertices[2].position) <= tolerance {
        vertices.pop();
    }
    before - vertices.len()
}

/// Fails if any two non-adjacent segments of the element touch or cross.
///
/// # Errors
///
/// Returns `InputError::SelfIntersecting` naming the first offending pair.
pub fn detect_knots(vertices: &[SideSlopeVertex], closed: bool) -> std::result::Result<(), InputError> {
    let pts = positions(vertices);
    let seg_count = pts.len().saturating_sub(1);
    for i in 0..seg_count {
        for j in (i + 2)..seg_count {
            // The closing segment is adjacent to the first.
            if closed && i == 0 && j == seg_count - 1 {
                continue;
            }
            if let Some((point, _, _)) = segment_segment_intersect_2d(&pts[i], &pts[i + 1], &pts[j], &pts[j + 1]) {
                return Err(InputError::SelfIntersecting {
                    segment_a: i,
                    segment_b: j,
                    point,
                });
            }
        }
    }
    Ok(())
}

/// Reverses a closed element wound clockwise. Returns `true` if reversed.
///
/// # Errors
///
/// Returns `InputError::ZeroArea` if the element encloses no area.
pub fn orient_anticlockwise(vertices: &mut [SideSlopeVertex]) -> std::result::Result<bool, InputError> {
    let area = signed_area_2d(&positions(vertices));
    if area.abs() < TOLERANCE {
        return Err(InputError::ZeroArea);
    }
    if area < 0.0 {
        vertices.reverse();
        return Ok(true);
    }
    Ok(false)
}

/// Inserts a vertex wherever consecutive vertices straddle their target
/// elevation.
///
/// # Errors
///
/// Returns `AllocationError` if the table cannot grow.
pub fn insert_elevation_transitions(
    vertices: &mut Vec<SideSlopeVertex>,
    pp_tolerance: f64,
    elevation_tolerance: f64,
) -> std::result::Result<usize, AllocationError> {
    insert_transitions(vertices, Genesis::ElevationTransition, pp_tolerance, |a, b| {
        let target = match a.option {
            SlopeTargetKind::ToElevation { elevation } => elevation,
            _ => return None,
        };
        let da = a.position.z - target;
        let db = b.position.z - target;
        if !straddles(da, db, elevation_tolerance) {
            return None;
        }
        let t = da / (da - db);
        let p = lerp(&a.position, &b.position, t);
        Some(Point3::new(p.x, p.y, target))
    })
}

/// Inserts a vertex wherever the element crosses between cut and fill
/// relative to its target surface.
///
/// # Errors
///
/// Returns `AllocationError` if the table cannot grow.
pub fn insert_cut_fill_transitions(
    vertices: &mut Vec<SideSlopeVertex>,
    surfaces: &SurfaceRegistry,
    pp_tolerance: f64,
    elevation_tolerance: f64,
) -> std::result::Result<usize, AllocationError> {
    insert_transitions(vertices, Genesis::CutFillTransition, pp_tolerance, |a, b| {
        if !a.option.needs_surface() || a.target_surface != b.target_surface {
            return None;
        }
        let surface = surfaces.get(a.target_surface?)?;
        let da = a.position.z - surface.drape_point(&a.position).0?;
        let db = b.position.z - surface.drape_point(&b.position).0?;
        if !straddles(da, db, elevation_tolerance) {
            return None;
        }
        Some(lerp(&a.position, &b.position, da / (da - db)))
    })
}

/// Inserts a vertex wherever the element crosses on or off its
/// slope-to-object surface.
///
/// # Errors
///
/// Returns `AllocationError` if the table cannot grow.
pub fn insert_slope_to_transitions(
    vertices: &mut Vec<SideSlopeVertex>,
    surfaces: &SurfaceRegistry,
    pp_tolerance: f64,
) -> std::result::Result<usize, AllocationError> {
    insert_transitions(vertices, Genesis::SlopeToTransition, pp_tolerance, |a, b| {
        if a.limit_surface != b.limit_surface {
            return None;
        }
        let surface = surfaces.get(a.limit_surface?)?;
        let inside = |p: &Point3| matches!(surface.locate_point(p), PointLocation::Triangle(_));
        if inside(&a.position) == inside(&b.position) {
            return None;
        }
        let hit = surface.find_hull_or_void_intercept(&a.position, &b.position)?;
        Some(lerp(&a.position, &b.position, hit.t))
    })
}

/// Sets each vertex's signed nominal slope and deactivates vertices whose
/// target cannot be met.
///
/// Returns one recovered [`GeometryError::NoSolution`] per deactivated vertex.
pub fn assign_nominal_slopes(
    vertices: &mut [SideSlopeVertex],
    surfaces: &SurfaceRegistry,
    elevation_tolerance: f64,
) -> Vec<GeometryError> {
    let mut unsolved = Vec::new();
    for (i, v) in vertices.iter_mut().enumerate() {
        if !v.is_active() {
            continue;
        }
        match nominal_slope(v, surfaces, elevation_tolerance) {
            Some(slope) => {
                v.slope = slope;
                v.status = VertexStatus::Active;
            }
            None => {
                v.status = VertexStatus::Inactive;
                unsolved.push(GeometryError::NoSolution {
                    vertex: i,
                    point: v.position,
                });
            }
        }
    }
    unsolved
}

fn nominal_slope(v: &SideSlopeVertex, surfaces: &SurfaceRegistry, elevation_tolerance: f64) -> Option<f64> {
    let z = v.position.z;
    let rise = match v.option {
        SlopeTargetKind::ToElevation { elevation } => Some(elevation - z),
        SlopeTargetKind::ToDeltaElevation { delta } => Some(delta),
        SlopeTargetKind::ToHorizontalOffset { .. } => None,
        _ => {
            let surface = projection_surface(v, surfaces)?;
            Some(ground_elevation(surface, &v.position)? - z)
        }
    };

    if v.is_forced {
        let slope = v.forced_slope;
        return match rise {
            // A forced slope pointing away from the target never reaches it.
            Some(r) if r.abs() > elevation_tolerance && (slope == 0.0 || slope.signum() != r.signum()) => None,
            _ if slope.is_finite() => Some(slope),
            _ => None,
        };
    }

    let slope = match rise {
        Some(r) if r > elevation_tolerance => v.cut_slope.abs(),
        _ => -v.fill_slope.abs(),
    };
    if !slope.is_finite() {
        return None;
    }
    let needs_rise = rise.is_some_and(|r| r.abs() > elevation_tolerance);
    if slope == 0.0 && needs_rise && !v.option.needs_surface() {
        return None;
    }
    Some(slope)
}

/// Surface a vertex projects onto: its slope-to-object surface when the
/// origin lies over it, otherwise its target surface.
pub(crate) fn projection_surface<'s>(
    v: &SideSlopeVertex,
    surfaces: &'s SurfaceRegistry,
) -> Option<&'s dyn TerrainSurface> {
    if let Some(limit) = v.limit_surface.and_then(|id| surfaces.get(id)) {
        if matches!(limit.locate_point(&v.position), PointLocation::Triangle(_)) {
            return Some(limit);
        }
    }
    v.target_surface.and_then(|id| surfaces.get(id))
}

/// Ground elevation under `p`, using the nearest hull point when `p` is off
/// the surface.
fn ground_elevation(surface: &dyn TerrainSurface, p: &Point3) -> Option<f64> {
    if let (Some(z), _) = surface.drape_point(p) {
        return Some(z);
    }
    let (a, b) = surface.closest_hull_edge(p)?;
    Some(closest_point_on_segment(p, &a, &b).0.z)
}

fn straddles(da: f64, db: f64, tolerance: f64) -> bool {
    (da > tolerance && db < -tolerance) || (da < -tolerance && db > tolerance)
}

fn lerp(a: &Point3, b: &Point3, t: f64) -> Point3 {
    a + (b - a) * t
}

fn insert_transitions(
    vertices: &mut Vec<SideSlopeVertex>,
    genesis: Genesis,
    pp_tolerance: f64,
    mut split: impl FnMut(&SideSlopeVertex, &SideSlopeVertex) -> Option<Point3>,
) -> std::result::Result<usize, AllocationError> {
    let mut out: Vec<SideSlopeVertex> = Vec::new();
    try_grow(&mut out, vertices.len())?;
    let mut inserted = 0;
    for (i, v) in vertices.iter().enumerate() {
        out.push(v.clone());
        let Some(next) = vertices.get(i + 1) else {
            continue;
        };
        if let Some(p) = split(v, next) {
            if plan_distance(&p, &v.position) > pp_tolerance && plan_distance(&p, &next.position) > pp_tolerance {
                try_grow(&mut out, 1)?;
                out.push(v.derive_at(p, genesis));
                inserted += 1;
            }
        }
    }
    *vertices = out;
    Ok(inserted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::surface::Tin;

    fn vertex(x: f64, y: f64, z: f64) -> SideSlopeVertex {
        SideSlopeVertex::new(Point3::new(x, y, z), SlopeTargetKind::ToSurface, 0.5, 0.5)
    }

    fn ring(coords: &[(f64, f64)], z: f64) -> Vec<SideSlopeVertex> {
        let mut vs: Vec<_> = coords.iter().map(|&(x, y)| vertex(x, y, z)).collect();
        vs.push(vs[0].clone());
        vs
    }

    fn flat_registry(z: f64) -> (SurfaceRegistry, crate::surface::SurfaceId) {
        let mut reg = SurfaceRegistry::new();
        let id = reg.insert(Tin::flat(-100.0, -100.0, 100.0, 100.0, z).unwrap());
        (reg, id)
    }

    #[test]
    fn dedupe_removes_consecutive_duplicates() {
        let mut vs = vec![
            vertex(0.0, 0.0, 0.0),
            vertex(0.0, 0.00001, 0.0),
            vertex(5.0, 0.0, 0.0),
            vertex(5.0, 5.0, 0.0),
        ];
        assert_eq!(dedupe(&mut vs, 1e-3), 1);
        assert_eq!(vs.len(), 3);
    }

    #[test]
    fn closed_triangle_of_three_entries_becomes_open_pair() {
        let mut vs = vec![vertex(0.0, 0.0, 0.0), vertex(5.0, 0.0, 0.0), vertex(0.0, 0.0, 0.0)];
        dedupe(&mut vs, 1e-6);
        assert_eq!(vs.len(), 2);
        assert!(!is_closed(&vs, 1e-6));
    }

    #[test]
    fn figure_eight_is_a_knot() {
        let vs = ring(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)], 0.0);
        match detect_knots(&vs, true) {
            Err(InputError::SelfIntersecting { point, .. }) => {
                assert!((point.x - 5.0).abs() < 1e-9 && (point.y - 5.0).abs() < 1e-9);
            }
            other => panic!("expected knot, got {other:?}"),
        }
    }

    #[test]
    fn square_has_no_knot() {
        let vs = ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)], 0.0);
        assert!(detect_knots(&vs, true).is_ok());
    }

    #[test]
    fn clockwise_ring_is_reversed() {
        let mut vs = ring(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)], 0.0);
        assert!(orient_anticlockwise(&mut vs).unwrap());
        assert!(signed_area_2d(&positions(&vs)) > 0.0);
        assert!(!orient_anticlockwise(&mut vs).unwrap());
    }

    #[test]
    fn zero_area_ring_rejected() {
        let mut vs = ring(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)], 0.0);
        assert!(matches!(orient_anticlockwise(&mut vs), Err(InputError::ZeroArea)));
    }

    #[test]
    fn elevation_transition_inserted_at_target() {
        let target = SlopeTargetKind::ToElevation { elevation: 5.0 };
        let mut vs = vec![
            SideSlopeVertex::new(Point3::new(0.0, 0.0, 0.0), target, 0.5, 0.5),
            SideSlopeVertex::new(Point3::new(10.0, 0.0, 10.0), target, 0.5, 0.5),
        ];
        let n = insert_elevation_transitions(&mut vs, 1e-6, 1e-6).unwrap();
        assert_eq!(n, 1);
        assert_eq!(vs.len(), 3);
        assert_eq!(vs[1].genesis, Genesis::ElevationTransition);
        assert!((vs[1].position.x - 5.0).abs() < 1e-9);
        assert!((vs[1].position.z - 5.0).abs() < 1e-12);
        assert_eq!(insert_elevation_transitions(&mut vs, 1e-6, 1e-6).unwrap(), 0);
    }

    #[test]
    fn cut_fill_transition_on_flat_ground() {
        let (reg, id) = flat_registry(5.0);
        let mut vs = vec![
            vertex(0.0, 0.0, 2.0).with_target_surface(id),
            vertex(10.0, 0.0, 12.0).with_target_surface(id),
        ];
        let n = insert_cut_fill_transitions(&mut vs, &reg, 1e-6, 1e-6).unwrap();
        assert_eq!(n, 1);
        assert_eq!(vs[1].genesis, Genesis::CutFillTransition);
        assert!((vs[1].position.x - 3.0).abs() < 1e-9);
        assert!((vs[1].position.z - 5.0).abs() < 1e-9);
    }

    #[test]
    fn nominal_slopes_follow_cut_and_fill() {
        let (reg, id) = flat_registry(5.0);
        let mut vs = vec![
            SideSlopeVertex::new(Point3::new(0.0, 0.0, 2.0), SlopeTargetKind::ToSurface, 0.5, 0.25)
                .with_target_surface(id),
            SideSlopeVertex::new(Point3::new(10.0, 0.0, 8.0), SlopeTargetKind::ToSurface, 0.5, 0.25)
                .with_target_surface(id),
            SideSlopeVertex::new(Point3::new(20.0, 0.0, 8.0), SlopeTargetKind::ToElevation { elevation: 9.0 }, 0.0, 0.25),
        ];
        let unsolved = assign_nominal_slopes(&mut vs, &reg, 1e-6);
        assert_eq!(unsolved.len(), 1);
        assert!(matches!(unsolved[0], GeometryError::NoSolution { vertex: 2, .. }));
        assert!((vs[0].slope - 0.5).abs() < 1e-12);
        assert!((vs[1].slope + 0.25).abs() < 1e-12);
        assert_eq!(vs[2].status, VertexStatus::Inactive);
    }

    #[test]
    fn forced_slope_away_from_target_has_no_solution() {
        let reg = SurfaceRegistry::new();
        let mut vs = vec![SideSlopeVertex::new(
            Point3::new(0.0, 0.0, 10.0),
            SlopeTargetKind::ToElevation { elevation: 5.0 },
            0.5,
            0.5,
        )
        .with_forced_slope(0.5)];
        let unsolved = assign_nominal_slopes(&mut vs, &reg, 1e-6);
        assert_eq!(unsolved.len(), 1);
        let GeometryError::NoSolution { vertex, point } = unsolved[0] else {
            panic!("expected no solution, got {:?}", unsolved[0]);
        };
        assert_eq!(vertex, 0);
        assert_eq!(point, Point3::new(0.0, 0.0, 10.0));
        assert_eq!(vs[0].status, VertexStatus::Inactive);
    }

    #[test]
    fn unknown_surface_rejected() {
        let (reg, _) = flat_registry(0.0);
        let dangling = crate::surface::SurfaceId::default();
        let mut vs = vec![vertex(0.0, 0.0, 0.0), vertex(1.0, 0.0, 0.0).with_target_surface(dangling)];
        let pre = ElementPreprocessor::new(&reg, &SideSlopeParams::default());
        let mut diag = DiagnosticsContext::new();
        assert!(matches!(
            pre.execute(&mut vs, &mut diag),
            Err(crate::error::SideSlopeError::Input(InputError::UnknownSurface { vertex: 1 }))
        ));
    }

    #[test]
    fn preprocessing_is_idempotent() {
        let (reg, id) = flat_registry(0.0);
        let mut vs: Vec<SideSlopeVertex> = [(0.0, 0.0, 5.0), (0.0, 20.0, -3.0), (20.0, 20.0, 4.0), (20.0, 0.0, 5.0)]
            .iter()
            .map(|&(x, y, z)| vertex(x, y, z).with_target_surface(id))
            .collect();
        vs.push(vs[0].clone());
        let pre = ElementPreprocessor::new(&reg, &SideSlopeParams::default());
        let mut diag = DiagnosticsContext::new();
        let first = pre.execute(&mut vs, &mut diag).unwrap();
        assert!(first.closed);
        assert!(first.reversed);
        assert!(first.transitions_inserted >= 2);
        let snapshot = vs.clone();
        let second = pre.execute(&mut vs, &mut diag).unwrap();
        assert!(!second.reversed);
        assert_eq!(second.transitions_inserted, 0);
        assert_eq!(vs, snapshot);
    }
}

use super::preprocess::projection_surface;
use crate::config::SideSlopeParams;
use crate::diagnostics::{DiagnosticsContext, Stage};
use crate::element::{SideSlopeVertex, SlopeTargetKind, VertexStatus};
use crate::error::GeometryError;
use crate::math::angle_2d::direction;
use crate::math::intersect_2d::{point_at, segment_segment_intersect_2d};
use crate::math::{plan_distance, Point3, Vector3};
use crate::surface::{NextCrossing, PointLocation, SurfaceRegistry, TerrainSurface, TriangleId};

/// Most triangles a single radial may cross before the walk is abandoned.
const MAX_WALK_STEPS: usize = 1 << 20;

/// Parameter step used to step off a hull or void boundary into a triangle.
const ENTRY_NUDGE: f64 = 1e-9;

/// How a radial's projection ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionOutcome {
    /// The ray met its target: the terrain, an elevation, an offset or a limit.
    Intersected(Point3),
    /// The ray left the surface through its hull.
    TerminatedOnHull(Point3),
    /// The ray ran into a void.
    TerminatedOnVoid(Point3),
    /// No terminal point exists within the allowed radial length.
    NoIntersection,
}

impl ProjectionOutcome {
    #[must_use]
    pub fn terminal_point(self) -> Option<Point3> {
        match self {
            Self::Intersected(p) | Self::TerminatedOnHull(p) | Self::TerminatedOnVoid(p) => Some(p),
            Self::NoIntersection => None,
        }
    }
}

/// Constant-slope ray from a vertex origin.
#[derive(Debug, Clone, Copy)]
struct Ray {
    origin: Point3,
    /// Plan end point of the longest allowed ray.
    end: Point3,
    rise: f64,
}

impl Ray {
    fn new(origin: Point3, angle: f64, slope: f64, length: f64) -> Self {
        let d = direction(angle);
        Self {
            origin,
            end: Point3::new(origin.x + d.x * length, origin.y + d.y * length, origin.z + slope * length),
            rise: slope * length,
        }
    }

    fn at(&self, t: f64) -> Point3 {
        let d: Vector3 = self.end - self.origin;
        Point3::new(self.origin.x + d.x * t, self.origin.y + d.y * t, self.origin.z + self.rise * t)
    }
}

/// Casts vertex radials to their terminal points.
pub struct SurfaceProjector<'a> {
    surfaces: &'a SurfaceRegistry,
    max_radial_length: f64,
    elevation_tolerance: f64,
    parallel_boundary: Option<&'a [Point3]>,
}

impl<'a> SurfaceProjector<'a> {
    #[must_use]
    pub fn new(surfaces: &'a SurfaceRegistry, params: &SideSlopeParams) -> Self {
        Self {
            surfaces,
            max_radial_length: params.max_radial_length,
            elevation_tolerance: params.elevation_tolerance,
            parallel_boundary: None,
        }
    }

    /// Clips every radial at its first crossing with `boundary`.
    #[must_use]
    pub fn with_parallel_boundary(mut self, boundary: Option<&'a [Point3]>) -> Self {
        self.parallel_boundary = boundary.filter(|b| b.len() >= 2);
        self
    }

    /// Projects every active vertex. Returns the number deactivated.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::TopologyInconsistent` if a surface walk stalls.
    pub fn execute(
        &self,
        vertices: &mut [SideSlopeVertex],
        diagnostics: &mut DiagnosticsContext,
    ) -> Result<usize, GeometryError> {
        self.project_where(vertices, diagnostics, SideSlopeVertex::is_active)
    }

    /// Projects only vertices awaiting (re)projection.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::TopologyInconsistent` if a surface walk stalls.
    pub fn execute_pending(
        &self,
        vertices: &mut [SideSlopeVertex],
        diagnostics: &mut DiagnosticsContext,
    ) -> Result<usize, GeometryError> {
        self.project_where(vertices, diagnostics, |v| v.status == VertexStatus::PendingResolution)
    }

    fn project_where(
        &self,
        vertices: &mut [SideSlopeVertex],
        diagnostics: &mut DiagnosticsContext,
        selected: impl Fn(&SideSlopeVertex) -> bool,
    ) -> Result<usize, GeometryError> {
        let mut deactivated = 0;
        for (i, v) in vertices.iter_mut().enumerate() {
            if !selected(v) {
                continue;
            }
            match self.project(v, i)?.terminal_point() {
                Some(p) => {
                    v.terminal_point = p;
                    v.status = VertexStatus::Active;
                }
                None => {
                    let error = GeometryError::NoSolution {
                        vertex: i,
                        point: v.position,
                    };
                    v.terminal_point = v.position;
                    v.status = VertexStatus::Inactive;
                    deactivated += 1;
                    diagnostics.record_deactivation(Stage::Project, &error);
                }
            }
        }
        Ok(deactivated)
    }

    /// Computes the terminal point of one vertex's radial.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::TopologyInconsistent` if the surface walk
    /// cannot advance.
    pub fn project(&self, v: &SideSlopeVertex, index: usize) -> Result<ProjectionOutcome, GeometryError> {
        let outcome = match v.option {
            SlopeTargetKind::ToElevation { elevation } => self.fixed_rise(v, elevation - v.position.z),
            SlopeTargetKind::ToDeltaElevation { delta } => self.fixed_rise(v, delta),
            SlopeTargetKind::ToHorizontalOffset { offset } => self.fixed_length(v, offset),
            SlopeTargetKind::ToSurface => self.onto_surface(v, index, None)?,
            SlopeTargetKind::ToSurfaceWithOffsetLimit { offset } => self.onto_surface(v, index, Some(offset))?,
            SlopeTargetKind::ToSurfaceWithElevationLimit { elevation } => {
                let limit = rise_length(v.slope, elevation - v.position.z);
                self.onto_surface(v, index, limit)?
            }
            SlopeTargetKind::ToSurfaceWithDeltaLimit { delta } => {
                let limit = rise_length(v.slope, delta);
                self.onto_surface(v, index, limit)?
            }
        };
        Ok(match outcome {
            ProjectionOutcome::Intersected(p) => ProjectionOutcome::Intersected(self.clip(&v.position, p)),
            ProjectionOutcome::TerminatedOnHull(p) => ProjectionOutcome::TerminatedOnHull(self.clip(&v.position, p)),
            ProjectionOutcome::TerminatedOnVoid(p) => ProjectionOutcome::TerminatedOnVoid(self.clip(&v.position, p)),
            ProjectionOutcome::NoIntersection => ProjectionOutcome::NoIntersection,
        })
    }

    fn fixed_rise(&self, v: &SideSlopeVertex, rise: f64) -> ProjectionOutcome {
        if rise.abs() <= self.elevation_tolerance {
            return ProjectionOutcome::Intersected(v.position);
        }
        match rise_length(v.slope, rise) {
            Some(length) => self.fixed_length(v, length),
            None => ProjectionOutcome::NoIntersection,
        }
    }

    fn fixed_length(&self, v: &SideSlopeVertex, length: f64) -> ProjectionOutcome {
        if !(0.0..=self.max_radial_length).contains(&length) {
            return ProjectionOutcome::NoIntersection;
        }
        ProjectionOutcome::Intersected(Ray::new(v.position, v.angle, v.slope, length).end)
    }

    /// Walks the radial across the terrain until it meets the ground.
    ///
    /// With a `limit`, a ray still clear of the ground at that plan distance
    /// ends there instead of failing.
    fn onto_surface(
        &self,
        v: &SideSlopeVertex,
        index: usize,
        limit: Option<f64>,
    ) -> Result<ProjectionOutcome, GeometryError> {
        let Some(surface) = projection_surface(v, self.surfaces) else {
            return Ok(ProjectionOutcome::NoIntersection);
        };
        let length = limit.map_or(self.max_radial_length, |l| l.min(self.max_radial_length));
        let ray = Ray::new(v.position, v.angle, v.slope, length);

        let (mut current, mut t_enter) = match surface.locate_point(&ray.origin) {
            PointLocation::Triangle(t) => (t, 0.0),
            PointLocation::External | PointLocation::Void(_) => match self.enter(surface, &ray) {
                Some(entry) => entry,
                None => return Ok(ProjectionOutcome::NoIntersection),
            },
        };

        let mut start_gap = self.gap(surface, current, &ray, t_enter);
        if start_gap.abs() <= self.elevation_tolerance {
            return Ok(ProjectionOutcome::Intersected(ray.at(t_enter)));
        }

        for _ in 0..MAX_WALK_STEPS {
            let step = surface
                .walk_next_edge_crossing(&ray.origin, &ray.end, current, t_enter)
                .ok_or(GeometryError::TopologyInconsistent { vertex: index, point: ray.at(t_enter) })?;
            let (t_exit, next) = match step {
                NextCrossing::EndsInside => (1.0, None),
                NextCrossing::Crosses { t, next, .. } => (t.min(1.0), Some(next)),
            };
            if t_exit < t_enter {
                return Err(GeometryError::TopologyInconsistent { vertex: index, point: ray.at(t_enter) });
            }

            let end_gap = self.gap(surface, current, &ray, t_exit);
            if end_gap.abs() <= self.elevation_tolerance || end_gap.signum() != start_gap.signum() {
                let f = start_gap / (start_gap - end_gap);
                let t = t_enter + (t_exit - t_enter) * f.clamp(0.0, 1.0);
                return Ok(ProjectionOutcome::Intersected(ray.at(t)));
            }

            let hit = ray.at(t_exit);
            let boundary_point = Point3::new(hit.x, hit.y, surface.triangle_elevation(current, &hit));
            match next {
                None => {
                    return Ok(if limit.is_some() {
                        ProjectionOutcome::Intersected(ray.end)
                    } else {
                        ProjectionOutcome::NoIntersection
                    });
                }
                Some(PointLocation::Triangle(n)) => {
                    current = n;
                    t_enter = t_exit;
                    start_gap = end_gap;
                }
                Some(PointLocation::External) => return Ok(ProjectionOutcome::TerminatedOnHull(boundary_point)),
                Some(PointLocation::Void(_)) => return Ok(ProjectionOutcome::TerminatedOnVoid(boundary_point)),
            }
        }
        Err(GeometryError::TopologyInconsistent { vertex: index, point: ray.at(t_enter) })
    }

    /// Enters the surface from an origin lying outside it or in a void.
    fn enter(&self, surface: &dyn TerrainSurface, ray: &Ray) -> Option<(TriangleId, f64)> {
        let intercept = surface.find_hull_or_void_intercept(&ray.origin, &ray.end)?;
        let mut t = intercept.t;
        // A void origin's first crossing may be the void's own edge on the way out.
        for _ in 0..4 {
            let ahead = ray.at((t + ENTRY_NUDGE).min(1.0));
            if let PointLocation::Triangle(n) = surface.locate_point(&ahead) {
                return Some((n, t));
            }
            if t >= 1.0 {
                break;
            }
            let rest = surface.find_hull_or_void_intercept(&ahead, &ray.end)?;
            t = (t + ENTRY_NUDGE) + (1.0 - t - ENTRY_NUDGE) * rest.t;
        }
        None
    }

    /// Ray elevation minus ground elevation at parameter `t` within `tri`.
    fn gap(&self, surface: &dyn TerrainSurface, tri: TriangleId, ray: &Ray, t: f64) -> f64 {
        let p = ray.at(t);
        p.z - surface.triangle_elevation(tri, &p)
    }

    fn clip(&self, origin: &Point3, terminal: Point3) -> Point3 {
        let Some(boundary) = self.parallel_boundary else {
            return terminal;
        };
        if plan_distance(origin, &terminal) <= 0.0 {
            return terminal;
        }
        boundary
            .windows(2)
            .filter_map(|w| segment_segment_intersect_2d(origin, &terminal, &w[0], &w[1]))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(terminal, |(_, t, _)| point_at(origin, &(terminal - origin), t))
    }
}

/// Plan distance for a ray of `slope` to rise by `rise`, if it ever does.
fn rise_length(slope: f64, rise: f64) -> Option<f64> {
    if slope == 0.0 {
        return None;
    }
    let length = rise / slope;
    (length.is_finite() && length >= 0.0).then_some(length)
}

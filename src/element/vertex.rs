use crate::math::Point3;
use crate::surface::SurfaceId;

/// Termination rule for a vertex's radial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlopeTargetKind {
    /// Project until the ray meets the target surface.
    ToSurface,
    /// Project until the ray reaches a fixed elevation.
    ToElevation { elevation: f64 },
    /// Project a fixed plan distance.
    ToHorizontalOffset { offset: f64 },
    /// Project until the ray has risen or fallen by `delta`.
    ToDeltaElevation { delta: f64 },
    /// Project to the surface, but no further than `offset` in plan.
    ToSurfaceWithOffsetLimit { offset: f64 },
    /// Project to the surface, stopping early at `elevation`.
    ToSurfaceWithElevationLimit { elevation: f64 },
    /// Project to the surface, stopping early after a rise or fall of `delta`.
    ToSurfaceWithDeltaLimit { delta: f64 },
}

impl SlopeTargetKind {
    /// Whether the terminal point depends on terrain shape.
    #[must_use]
    pub fn needs_surface(self) -> bool {
        matches!(
            self,
            Self::ToSurface
                | Self::ToSurfaceWithOffsetLimit { .. }
                | Self::ToSurfaceWithElevationLimit { .. }
                | Self::ToSurfaceWithDeltaLimit { .. }
        )
    }

    /// Target elevation implied for a ray starting at `z`, if any.
    #[must_use]
    pub fn target_elevation(self, z: f64) -> Option<f64> {
        match self {
            Self::ToElevation { elevation } | Self::ToSurfaceWithElevationLimit { elevation } => {
                Some(elevation)
            }
            Self::ToDeltaElevation { delta } | Self::ToSurfaceWithDeltaLimit { delta } => {
                Some(z + delta)
            }
            _ => None,
        }
    }
}

/// Classification of a vertex relative to the side being sloped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CornerType {
    /// Radials converge: the slope side is inside the turn.
    Concave,
    #[default]
    Normal,
    /// Radials diverge: the slope side is outside the turn.
    Convex,
}

/// Participation of a vertex in projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexStatus {
    Inactive,
    #[default]
    Active,
    /// Active, but its radial still has to be (re)projected.
    PendingResolution,
}

/// Provenance of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Genesis {
    #[default]
    Original,
    ElevationTransition,
    CutFillTransition,
    SlopeToTransition,
    Stroked,
}

/// One vertex of a side-slope element, mutated in place through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SideSlopeVertex {
    pub position: Point3,
    pub option: SlopeTargetKind,
    /// Ascending slope magnitude (rise/run) used in cut.
    pub cut_slope: f64,
    /// Descending slope magnitude (fall/run) used in fill.
    pub fill_slope: f64,
    /// Signed slope used when `is_forced` is set.
    pub forced_slope: f64,
    pub is_forced: bool,
    pub corner_type: CornerType,
    pub status: VertexStatus,
    pub genesis: Genesis,
    /// Plan bearing of the radial, radians.
    pub angle: f64,
    /// Signed slope of the radial: positive rises away from the element.
    pub slope: f64,
    pub terminal_point: Point3,
    /// Surface used to decide cut or fill and to project onto.
    pub target_surface: Option<SurfaceId>,
    /// Surface for slope-to-object projection.
    pub limit_surface: Option<SurfaceId>,
}

impl SideSlopeVertex {
    /// Creates an active, original vertex with the given target and slopes.
    #[must_use]
    pub fn new(position: Point3, option: SlopeTargetKind, cut_slope: f64, fill_slope: f64) -> Self {
        Self {
            position,
            option,
            cut_slope,
            fill_slope,
            forced_slope: 0.0,
            is_forced: false,
            corner_type: CornerType::Normal,
            status: VertexStatus::Active,
            genesis: Genesis::Original,
            angle: 0.0,
            slope: 0.0,
            terminal_point: position,
            target_surface: None,
            limit_surface: None,
        }
    }

    /// Sets the surface projected onto and used for cut/fill decisions.
    #[must_use]
    pub fn with_target_surface(mut self, surface: SurfaceId) -> Self {
        self.target_surface = Some(surface);
        self
    }

    /// Sets the slope-to-object surface.
    #[must_use]
    pub fn with_limit_surface(mut self, surface: SurfaceId) -> Self {
        self.limit_surface = Some(surface);
        self
    }

    /// Forces the radial slope to `slope` (signed).
    #[must_use]
    pub fn with_forced_slope(mut self, slope: f64) -> Self {
        self.forced_slope = slope;
        self.is_forced = true;
        self
    }

    /// Whether the vertex participates in projection.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status != VertexStatus::Inactive
    }

    /// A vertex at `position` carrying this vertex's settings, marked with
    /// `genesis` and re-activated.
    #[must_use]
    pub fn derive_at(&self, position: Point3, genesis: Genesis) -> Self {
        Self {
            position,
            genesis,
            status: VertexStatus::Active,
            corner_type: CornerType::Normal,
            terminal_point: position,
            ..self.clone()
        }
    }

    /// Plan length of the projected radial.
    #[must_use]
    pub fn radial_length(&self) -> f64 {
        crate::math::plan_distance(&self.position, &self.terminal_point)
    }
}

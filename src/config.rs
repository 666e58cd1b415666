use crate::error::InputError;
use crate::surface::SurfaceId;

/// Turn angles within this many radians of a straight line classify a vertex
/// as [`CornerType::Normal`](crate::element::CornerType::Normal).
pub const NORMAL_ANGLE_TOLERANCE: f64 = 0.0001;

/// Largest deviation, in radians, allowed between a planar corner solution
/// and the level solution before the level solution is used instead (10°).
pub const MAX_PLANAR_DEVIATION: f64 = 10.0 * std::f64::consts::PI / 180.0;

/// Largest relative deviation of a blended reflex slope from the nominal
/// slope before the nominal slope is kept.
pub const MAX_SLOPE_DEVIATION: f64 = 0.25;

/// Side of the element, relative to its direction of travel, on which
/// slopes are projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeDirection {
    Left,
    Right,
    Both,
}

/// A single side of the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Sign applied to plan normals: `+1` for left, `-1` for right.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
        }
    }
}

impl SlopeDirection {
    /// The individual sides this direction expands to.
    #[must_use]
    pub fn sides(self) -> &'static [Side] {
        match self {
            Self::Left => &[Side::Left],
            Self::Right => &[Side::Right],
            Self::Both => &[Side::Left, Side::Right],
        }
    }

    /// The same direction as seen after reversing the element.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Both => Self::Both,
        }
    }
}

/// How sharp convex corners are filled when stroking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerMode {
    /// Toes follow straight legs meeting at the corner radial's toe.
    Square,
    /// Toes follow a circular arc around the corner.
    Round,
}

/// Parameters controlling side-slope generation.
#[derive(Debug, Clone, Copy)]
pub struct SideSlopeParams {
    /// Side(s) of the element to project on.
    pub direction: SlopeDirection,
    /// Corner fill used by the stroker.
    pub corner_mode: CornerMode,
    /// Maximum chord between toes around a convex corner. Zero disables stroking.
    pub stroke_tolerance: f64,
    /// Point-to-point tolerance used for de-duplication and snapping.
    pub pp_tolerance: f64,
    /// Elevations closer than this are considered equal.
    pub elevation_tolerance: f64,
    /// Longest plan distance a radial may travel before giving up.
    pub max_radial_length: f64,
    /// Surface whose hull splits slope toes into on-bench and off-bench pieces.
    pub bench_surface: Option<SurfaceId>,
}

impl Default for SideSlopeParams {
    fn default() -> Self {
        Self {
            direction: SlopeDirection::Right,
            corner_mode: CornerMode::Square,
            stroke_tolerance: 0.0,
            pp_tolerance: 1e-4,
            elevation_tolerance: 1e-4,
            max_radial_length: 10_000.0,
            bench_surface: None,
        }
    }
}

impl SideSlopeParams {
    /// Checks that every tolerance is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns `InputError::InvalidTolerance` naming the first offending field.
    pub fn validate(&self) -> Result<(), InputError> {
        let non_negative = [
            ("stroke_tolerance", self.stroke_tolerance),
            ("pp_tolerance", self.pp_tolerance),
            ("elevation_tolerance", self.elevation_tolerance),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(InputError::InvalidTolerance { name, value });
            }
        }
        if !self.max_radial_length.is_finite() || self.max_radial_length <= 0.0 {
            return Err(InputError::InvalidTolerance {
                name: "max_radial_length",
                value: self.max_radial_length,
            });
        }
        Ok(())
    }
}

use thiserror::Error;

use crate::math::Point3;

/// Top-level error type for side-slope generation.
#[derive(Debug, Error)]
pub enum SideSlopeError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// Errors caused by an unusable input element or parameter set.
///
/// These are reported before any projection work and never yield a partial
/// result.
#[derive(Debug, Error)]
pub enum InputError {
    #[error(
        "element self-intersects: segment {segment_a} crosses segment {segment_b} at ({}, {})",
        point.x,
        point.y
    )]
    SelfIntersecting {
        segment_a: usize,
        segment_b: usize,
        point: Point3,
    },

    #[error("degenerate element: {0}")]
    Degenerate(String),

    #[error("invalid tolerance {name} = {value}")]
    InvalidTolerance { name: &'static str, value: f64 },

    #[error("closed element has zero area and no valid corner")]
    ZeroArea,

    #[error("vertex {vertex} references a surface that is not registered")]
    UnknownSurface { vertex: usize },

    #[error("bench surface is not registered")]
    UnknownBenchSurface,
}

/// Errors raised while solving or projecting radials.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The vertex cannot satisfy its slope target. The pipeline recovers by
    /// deactivating the vertex.
    #[error("no solution for vertex {vertex} at ({}, {}, {})", point.x, point.y, point.z)]
    NoSolution { vertex: usize, point: Point3 },

    /// The surface walk found no edge to advance across.
    #[error(
        "surface topology inconsistent while walking radial of vertex {vertex} at ({}, {})",
        point.x,
        point.y
    )]
    TopologyInconsistent { vertex: usize, point: Point3 },
}

/// Growth of a working table failed.
#[derive(Debug, Error)]
#[error("failed to reserve space for {requested} entries")]
pub struct AllocationError {
    pub requested: usize,
}

/// Convenience type alias for results using [`SideSlopeError`].
pub type Result<T> = std::result::Result<T, SideSlopeError>;

/// Reserves `additional` slots in `table`, reporting failure as
/// [`AllocationError`] instead of aborting.
///
/// # Errors
///
/// Returns `AllocationError` if the allocator refuses the request.
pub fn try_grow<T>(table: &mut Vec<T>, additional: usize) -> std::result::Result<(), AllocationError> {
    table.try_reserve(additional).map_err(|_| AllocationError {
        requested: table.len().saturating_add(additional),
    })
}

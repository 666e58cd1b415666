//! Side-slope generation: projects batters from an element's vertices onto
//! terrain and builds one surface model per side and active run.
//!
//! The pipeline runs, per element:
//!
//! 1. [`ElementPreprocessor`] cleans the vertex table, rejects knots, orients
//!    closed elements anticlockwise and inserts transition vertices.
//! 2. Per side, [`CornerSolver`] classifies corners and fixes radial bearings
//!    and slopes, and [`SurfaceProjector`] casts every radial.
//! 3. [`CornerStroker`] fans extra radials around sharp convex corners, which
//!    are then projected as well.
//! 4. The table is split into active runs; [`OverlapResolver`] truncates
//!    crossing radials of each run and [`BoundaryExtractor`] stores the
//!    result in a [`SurfaceModel`].

pub mod bench;
pub mod boundary;
pub mod corner;
pub mod overlap;
pub mod preprocess;
pub mod project;
pub mod runs;
pub mod stroke;

use std::sync::atomic::{AtomicBool, Ordering};

pub use boundary::BoundaryExtractor;
pub use corner::{CornerSolution, CornerSolver};
pub use overlap::{OverlapReport, OverlapResolver};
pub use preprocess::{ElementPreprocessor, PreprocessReport};
pub use project::{ProjectionOutcome, SurfaceProjector};
pub use runs::{split_active_runs, ActiveRun};
pub use stroke::CornerStroker;

use crate::config::{Side, SideSlopeParams};
use crate::diagnostics::{DiagnosticsContext, Stage};
use crate::element::SideSlopeVertex;
use crate::error::{InputError, Result};
use crate::math::Point3;
use crate::model::SurfaceModel;
use crate::surface::{SurfaceRegistry, TerrainSurface};

/// Generates side slopes for one element.
pub struct CreateSideSlopes<'a> {
    surfaces: &'a SurfaceRegistry,
    params: SideSlopeParams,
    parallel_boundary: Option<&'a [Point3]>,
}

impl<'a> CreateSideSlopes<'a> {
    #[must_use]
    pub fn new(surfaces: &'a SurfaceRegistry, params: SideSlopeParams) -> Self {
        Self {
            surfaces,
            params,
            parallel_boundary: None,
        }
    }

    /// Clips every radial at its first crossing with `boundary`.
    #[must_use]
    pub fn with_parallel_boundary(mut self, boundary: Option<&'a [Point3]>) -> Self {
        self.parallel_boundary = boundary;
        self
    }

    /// Runs the pipeline on `vertices`.
    ///
    /// On return `vertices` holds the table of the last side processed,
    /// including transition and stroked vertices. An element without an
    /// active run yields no models.
    ///
    /// # Errors
    ///
    /// Returns `InputError` for invalid parameters or an unusable element,
    /// `GeometryError::TopologyInconsistent` if a surface walk stalls, and
    /// `AllocationError` if a working table cannot grow.
    pub fn execute(
        &self,
        vertices: &mut Vec<SideSlopeVertex>,
        diagnostics: &mut DiagnosticsContext,
    ) -> Result<Vec<SurfaceModel>> {
        self.params.validate()?;
        let bench = self.bench_surface()?;
        let _span = tracing::debug_span!("side_slopes", vertices = vertices.len()).entered();

        let report = ElementPreprocessor::new(self.surfaces, &self.params).execute(vertices, diagnostics)?;
        let direction = if report.reversed {
            self.params.direction.reversed()
        } else {
            self.params.direction
        };

        let preprocessed = vertices.clone();
        let mut models = Vec::new();
        for &side in direction.sides() {
            let mut table = preprocessed.clone();
            models.extend(self.process_side(&mut table, side, report.closed, bench, diagnostics)?);
            *vertices = table;
        }
        tracing::debug!(models = models.len(), "side slopes created");
        Ok(models)
    }

    fn bench_surface(&self) -> Result<Option<&'a dyn TerrainSurface>> {
        match self.params.bench_surface {
            None => Ok(None),
            Some(id) => match self.surfaces.get(id) {
                Some(surface) => Ok(Some(surface)),
                None => Err(InputError::UnknownBenchSurface.into()),
            },
        }
    }

    /// Solves, projects and resolves one side of a preprocessed table.
    fn process_side(
        &self,
        vertices: &mut Vec<SideSlopeVertex>,
        side: Side,
        closed: bool,
        bench: Option<&dyn TerrainSurface>,
        diagnostics: &mut DiagnosticsContext,
    ) -> Result<Vec<SurfaceModel>> {
        CornerSolver::new(side, closed).execute(vertices, diagnostics);

        let projector = SurfaceProjector::new(self.surfaces, &self.params).with_parallel_boundary(self.parallel_boundary);
        projector.execute(vertices, diagnostics)?;

        let stroked = CornerStroker::new(self.params.corner_mode, self.params.stroke_tolerance)
            .execute(vertices, side, closed, diagnostics)?;
        if stroked > 0 {
            projector.execute_pending(vertices, diagnostics)?;
        }

        let runs = split_active_runs(vertices, closed);
        diagnostics.record(Stage::Overlap, &format!("{side:?} side: {} active runs", runs.len()));

        let mut models = Vec::with_capacity(runs.len());
        for run in runs {
            let mut radials = run.radials(vertices);
            OverlapResolver::new(run.closed, self.params.pp_tolerance, self.params.elevation_tolerance)
                .execute(&mut radials, diagnostics);
            // Closed elements are anticlockwise, so their right side faces out.
            let model = BoundaryExtractor::new(side, run.closed, self.params.pp_tolerance)
                .with_exterior(side == Side::Right)
                .with_bench(bench)
                .execute(radials, diagnostics)?;
            models.push(model);
        }
        Ok(models)
    }
}

/// Generates side slopes for `vertices`. See [`CreateSideSlopes`].
///
/// # Errors
///
/// See [`CreateSideSlopes::execute`].
pub fn create_side_slopes(
    vertices: &mut Vec<SideSlopeVertex>,
    surfaces: &SurfaceRegistry,
    params: SideSlopeParams,
    parallel_boundary: Option<&[Point3]>,
    diagnostics: &mut DiagnosticsContext,
) -> Result<Vec<SurfaceModel>> {
    CreateSideSlopes::new(surfaces, params)
        .with_parallel_boundary(parallel_boundary)
        .execute(vertices, diagnostics)
}

/// Outcome of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// One entry per element processed, in input order.
    pub results: Vec<Result<Vec<SurfaceModel>>>,
    /// Set when the cancellation flag stopped the batch early.
    pub cancelled: bool,
}

/// Runs independent elements one after another.
///
/// An error aborts only the element it came from. The optional cancellation
/// flag is checked before each element is started.
pub struct SideSlopeBatch<'a> {
    operation: CreateSideSlopes<'a>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> SideSlopeBatch<'a> {
    #[must_use]
    pub fn new(surfaces: &'a SurfaceRegistry, params: SideSlopeParams) -> Self {
        Self {
            operation: CreateSideSlopes::new(surfaces, params),
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Processes `elements` in order until done or cancelled.
    #[must_use]
    pub fn execute(&self, elements: &mut [Vec<SideSlopeVertex>], diagnostics: &mut DiagnosticsContext) -> BatchOutcome {
        let mut results = Vec::with_capacity(elements.len());
        for (i, element) in elements.iter_mut().enumerate() {
            if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                tracing::debug!(processed = i, "side-slope batch cancelled");
                return BatchOutcome {
                    results,
                    cancelled: true,
                };
            }
            let result = self.operation.execute(element, diagnostics);
            if let Err(e) = &result {
                tracing::warn!(element = i, error = %e, "side-slope element failed");
            }
            results.push(result);
        }
        BatchOutcome {
            results,
            cancelled: false,
        }
    }
}

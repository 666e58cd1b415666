use crate::error::GeometryError;

/// Pipeline stage a diagnostic record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Corner,
    Project,
    Stroke,
    Overlap,
    Boundary,
}

/// Counters and trace hook threaded explicitly through one pipeline run.
///
/// The default context only counts; records are forwarded to `tracing` at
/// `debug` level, or `trace` when `verbose` is set.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticsContext {
    /// Emit every record at `trace` level in addition to counting it.
    pub verbose: bool,
    sequence: u64,
    /// Transition vertices inserted by the preprocessor.
    pub transitions_inserted: usize,
    /// Vertices deactivated because they had no solution.
    pub vertices_deactivated: usize,
    /// Corners that fell back to the level solution.
    pub level_fallbacks: usize,
    /// Radials added by the corner stroker.
    pub radials_stroked: usize,
    /// Truncations applied by the overlap resolver.
    pub truncations: usize,
    /// Radials removed because their toe was covered by a neighbour.
    pub radials_removed: usize,
    /// Constraint edges the boundary extractor could not insert.
    pub constraints_skipped: usize,
}

impl DiagnosticsContext {
    /// Creates a quiet context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that traces every record.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }

    /// Number of records seen so far.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Records a message for `stage`, returning its sequence number.
    pub fn record(&mut self, stage: Stage, message: &str) -> u64 {
        self.sequence += 1;
        if self.verbose {
            tracing::trace!(seq = self.sequence, ?stage, "{message}");
        } else {
            tracing::debug!(seq = self.sequence, ?stage, "{message}");
        }
        self.sequence
    }

    /// Counts a vertex deactivated by a recovered error and records the error.
    pub fn record_deactivation(&mut self, stage: Stage, error: &GeometryError) -> u64 {
        self.vertices_deactivated += 1;
        self.record(stage, &error.to_string())
    }
}

pub mod config;
pub mod diagnostics;
pub mod element;
pub mod error;
pub mod math;
pub mod model;
pub mod operations;
pub mod surface;

pub use config::{CornerMode, Side, SideSlopeParams, SlopeDirection};
pub use diagnostics::DiagnosticsContext;
pub use element::{SideSlopeVertex, SlopeTargetKind};
pub use error::{Result, SideSlopeError};
pub use model::SurfaceModel;
pub use operations::side_slope::{create_side_slopes, CreateSideSlopes, SideSlopeBatch};
pub use surface::{SurfaceRegistry, TerrainSurface, Tin};

pub mod side_slope;

pub use side_slope::{create_side_slopes, CreateSideSlopes, SideSlopeBatch};

pub mod bounds;
pub mod kernel;
pub mod point;
pub mod polygon;

pub use bounds::Bounds;
pub use point::Point;
pub use polygon::{BIN_ID, Polygon};

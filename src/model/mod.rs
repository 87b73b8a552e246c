pub mod polygon;
pub mod state;

pub use polygon::{Polygon, PolygonId, PolygonKind};
pub use state::{PolygonKey, SegmentationState};

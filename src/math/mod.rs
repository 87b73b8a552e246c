pub mod aabb;
pub mod distance_2d;
pub mod intersect_2d;
pub mod polygon_2d;

pub use aabb::Aabb;

/// 2D point type (image coordinates, in pixels).
pub type Point2 = nalgebra::Point2<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

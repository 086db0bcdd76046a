//! Floating-point Manhattan geometry.

pub mod point;
pub mod rect;
pub mod shape;
pub mod transform;

pub use point::Point;
pub use rect::{BoundBox, Rect};
pub use shape::Shape;
pub use transform::{
    Rotation, Transform, Transformation, TransformationBuilder, TransformationMatrix,
};

/// Tolerance used when comparing coordinates, in microns.
pub const EPSILON: f64 = 1e-6;

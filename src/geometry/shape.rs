//! Primitive shapes drawn on a single layer.

use serde::{Deserialize, Serialize};

use super::point::Point;
use super::rect::{BoundBox, Rect};
use super::transform::{Transform, Transformation};

/// An enumeration of the shapes a primitive cell can draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Rect(Rect),
    /// A centerline swept with a constant width.
    Path { points: Vec<Point>, width: f64 },
}

impl Shape {
    /// Creates a [`Shape::Path`].
    pub fn path(points: Vec<Point>, width: f64) -> Self {
        Self::Path { points, width }
    }
}

impl From<Rect> for Shape {
    fn from(value: Rect) -> Self {
        Self::Rect(value)
    }
}

impl BoundBox for Shape {
    fn bbox(&self) -> Option<Rect> {
        match self {
            Shape::Rect(r) => Some(*r),
            Shape::Path { points, width } => {
                Rect::from_points(points.iter().copied()).map(|r| r.expand(width / 2.))
            }
        }
    }
}

impl Transform for Shape {
    fn transform(&self, trans: &Transformation) -> Self {
        match self {
            Shape::Rect(r) => Shape::Rect(r.transform(trans)),
            Shape::Path { points, width } => Shape::Path {
                points: points.transform(trans),
                width: *width,
            },
        }
    }
}

//! Axis-aligned rectangles and bounding boxes.

use serde::{Deserialize, Serialize};

use super::point::Point;

/// An axis-aligned rectangle, specified by its lower-left and upper-right corners.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    p0: Point,
    p1: Point,
}

impl Rect {
    /// Creates a rectangle from any two opposite corners.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            p0: Point::new(a.x.min(b.x), a.y.min(b.y)),
            p1: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Creates a rectangle from its left, bottom, right, and top edges.
    pub fn from_sides(left: f64, bot: f64, right: f64, top: f64) -> Self {
        Self::new(Point::new(left, bot), Point::new(right, top))
    }

    /// Creates a rectangle of the given size centered at `center`.
    pub fn from_center(center: Point, w: f64, h: f64) -> Self {
        Self::from_sides(
            center.x - w / 2.,
            center.y - h / 2.,
            center.x + w / 2.,
            center.y + h / 2.,
        )
    }

    /// The smallest rectangle containing all of the given points.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Self::new(first, first);
        for p in iter {
            rect = rect.union(Self::new(p, p));
        }
        Some(rect)
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.p0.x
    }

    #[inline]
    pub fn bot(&self) -> f64 {
        self.p0.y
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.p1.x
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.p1.y
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.p1.x - self.p0.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.p1.y - self.p0.y
    }

    pub fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2., (self.p0.y + self.p1.y) / 2.)
    }

    /// The lower-left and upper-right corners.
    pub fn corners(&self) -> [Point; 2] {
        [self.p0, self.p1]
    }

    /// Expands each side of the rectangle outward by `amount`.
    pub fn expand(&self, amount: f64) -> Self {
        Self::from_sides(
            self.left() - amount,
            self.bot() - amount,
            self.right() + amount,
            self.top() + amount,
        )
    }

    /// The bounding union of two rectangles.
    pub fn union(&self, other: Rect) -> Self {
        Self::from_sides(
            self.left().min(other.left()),
            self.bot().min(other.bot()),
            self.right().max(other.right()),
            self.top().max(other.top()),
        )
    }

    /// Returns `true` if the interiors of the two rectangles overlap.
    ///
    /// Rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.bot() < other.top()
            && other.bot() < self.top()
    }
}

/// A geometric object that has an axis-aligned bounding box.
pub trait BoundBox {
    /// Computes the bounding box, or `None` if the object is empty.
    fn bbox(&self) -> Option<Rect>;
}

impl BoundBox for Rect {
    fn bbox(&self) -> Option<Rect> {
        Some(*self)
    }
}

impl<T: BoundBox> BoundBox for [T] {
    fn bbox(&self) -> Option<Rect> {
        self.iter().fold(None, |acc, item| union_opt(acc, item.bbox()))
    }
}

impl<T: BoundBox> BoundBox for Vec<T> {
    fn bbox(&self) -> Option<Rect> {
        self.as_slice().bbox()
    }
}

/// Unions two optional bounding boxes.
pub fn union_opt(a: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalizes_corners() {
        let r = Rect::new(Point::new(5., -1.), Point::new(-5., 3.));
        assert_eq!(r, Rect::from_sides(-5., -1., 5., 3.));
        assert_eq!(r.width(), 10.);
        assert_eq!(r.height(), 4.);
        assert_eq!(r.center(), Point::new(0., 1.));
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = Rect::from_sides(0., 0., 10., 10.);
        let b = Rect::from_sides(10., 0., 20., 10.);
        let c = Rect::from_sides(9., 9., 12., 12.);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn bbox_works_for_vecs() {
        let v = vec![
            Rect::from_sides(0., 0., 100., 200.),
            Rect::from_sides(-50., 20., 90., 250.),
        ];
        assert_eq!(v.bbox(), Some(Rect::from_sides(-50., 0., 100., 250.)));
        assert_eq!(Vec::<Rect>::new().bbox(), None);
    }
}

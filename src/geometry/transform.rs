//! Transformation types and traits.

use approx::AbsDiffEq;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use super::point::Point;
use super::rect::Rect;

/// A Manhattan rotation: 0, 90, 180, or 270 degrees counterclockwise.
///
/// Also used as the orientation of ports, where it names the outward-facing direction.
#[derive(
    Debug, Clone, Copy, Default, Eq, Hash, Ord, PartialOrd, PartialEq, Serialize_repr, Deserialize_repr,
)]
#[repr(u16)]
pub enum Rotation {
    /// 0 degrees; no rotation. Faces east.
    #[default]
    R0 = 0,
    /// 90 degrees counterclockwise. Faces north.
    R90 = 90,
    /// 180 degrees counterclockwise. Faces west.
    R180 = 180,
    /// 270 degrees counterclockwise. Faces south.
    R270 = 270,
}

impl Rotation {
    const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    #[inline]
    fn quarter_turns(self) -> usize {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    #[inline]
    fn from_quarter_turns(turns: usize) -> Self {
        Self::ALL[turns % 4]
    }

    /// The angle of this rotation, in degrees.
    pub fn degrees(&self) -> f64 {
        (*self as u16) as f64
    }

    /// The rotation pointing in the opposite direction.
    #[inline]
    pub fn opposite(self) -> Self {
        self + Rotation::R180
    }

    /// The unit vector pointed to by this rotation.
    pub fn direction(&self) -> [i8; 2] {
        match self {
            Rotation::R0 => [1, 0],
            Rotation::R90 => [0, 1],
            Rotation::R180 => [-1, 0],
            Rotation::R270 => [0, -1],
        }
    }

    /// The unit vector pointed to by this rotation, as a [`Point`].
    pub fn unit(&self) -> Point {
        let [x, y] = self.direction();
        Point::new(x as f64, y as f64)
    }

    /// Returns `true` if this rotation points along the x-axis.
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Rotation::R0 | Rotation::R180)
    }

    fn from_direction(dir: [i8; 2]) -> Self {
        match dir {
            [1, 0] => Rotation::R0,
            [0, 1] => Rotation::R90,
            [-1, 0] => Rotation::R180,
            [0, -1] => Rotation::R270,
            // Manhattan matrices map unit axis vectors to unit axis vectors.
            _ => unreachable!("non-Manhattan direction vector {dir:?}"),
        }
    }

    /// The transformation matrix representing this rotation.
    #[inline]
    pub fn transformation_matrix(&self) -> TransformationMatrix {
        TransformationMatrix::from(*self)
    }
}

impl std::ops::Add<Rotation> for Rotation {
    type Output = Rotation;
    fn add(self, rhs: Rotation) -> Self::Output {
        Self::from_quarter_turns(self.quarter_turns() + rhs.quarter_turns())
    }
}

impl std::ops::AddAssign for Rotation {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub<Rotation> for Rotation {
    type Output = Rotation;
    fn sub(self, rhs: Rotation) -> Self::Output {
        Self::from_quarter_turns(self.quarter_turns() + 4 - rhs.quarter_turns())
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}deg", *self as u16)
    }
}

/// A matrix representing a unitary Manhattan transformation.
///
/// Can represent rotations, reflections, or combinations of rotations/reflections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransformationMatrix([[i8; 2]; 2]);

impl TransformationMatrix {
    /// The identity transformation.
    ///
    /// Maps any point to itself.
    #[inline]
    pub const fn identity() -> Self {
        Self([[1, 0], [0, 1]])
    }

    /// Reflection across the y-axis, negating x-coordinates.
    #[inline]
    pub const fn mirror_x() -> Self {
        Self([[-1, 0], [0, 1]])
    }

    /// Reflection across the x-axis, negating y-coordinates.
    #[inline]
    pub const fn mirror_y() -> Self {
        Self([[1, 0], [0, -1]])
    }

    /// The determinant; `-1` for matrices that include a reflection.
    pub fn det(&self) -> i8 {
        let m = &self.0;
        m[0][0] * m[1][1] - m[0][1] * m[1][0]
    }

    /// The inverse of the transformation matrix.
    ///
    /// Manhattan matrices are orthogonal, so the inverse is the transpose.
    pub fn inverse(&self) -> Self {
        let m = &self.0;
        Self([[m[0][0], m[1][0]], [m[0][1], m[1][1]]])
    }

    /// Applies the matrix to a direction.
    pub fn apply_rotation(&self, dir: Rotation) -> Rotation {
        let [x, y] = dir.direction();
        let m = &self.0;
        Rotation::from_direction([m[0][0] * x + m[0][1] * y, m[1][0] * x + m[1][1] * y])
    }
}

impl From<Rotation> for TransformationMatrix {
    fn from(value: Rotation) -> Self {
        Self(match value {
            Rotation::R0 => [[1, 0], [0, 1]],
            Rotation::R90 => [[0, -1], [1, 0]],
            Rotation::R180 => [[-1, 0], [0, -1]],
            Rotation::R270 => [[0, 1], [-1, 0]],
        })
    }
}

impl Default for TransformationMatrix {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul<TransformationMatrix> for TransformationMatrix {
    type Output = Self;
    fn mul(self, rhs: TransformationMatrix) -> Self::Output {
        let (a, b) = (&self.0, &rhs.0);
        Self([
            [
                a[0][0] * b[0][0] + a[0][1] * b[1][0],
                a[0][0] * b[0][1] + a[0][1] * b[1][1],
            ],
            [
                a[1][0] * b[0][0] + a[1][1] * b[1][0],
                a[1][0] * b[0][1] + a[1][1] * b[1][1],
            ],
        ])
    }
}

impl std::ops::Mul<Point> for TransformationMatrix {
    type Output = Point;
    fn mul(self, rhs: Point) -> Self::Output {
        let m = &self.0;
        Point::new(
            m[0][0] as f64 * rhs.x + m[0][1] as f64 * rhs.y,
            m[1][0] as f64 * rhs.x + m[1][1] as f64 * rhs.y,
        )
    }
}

/// A transformation representing a Manhattan translation, rotation, and/or reflection of geometry.
///
/// This object does not support scaling of geometry, and as such all transformation matrices
/// are unitary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    /// The transformation matrix.
    pub(crate) mat: TransformationMatrix,
    /// The x-y translation applied after the transformation.
    pub(crate) b: Point,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transformation {
    /// Returns the identity transform, leaving any transformed object unmodified.
    pub const fn identity() -> Self {
        Self {
            mat: TransformationMatrix::identity(),
            b: Point::zero(),
        }
    }

    /// Returns a translation by `(x,y)`.
    pub const fn translate(x: f64, y: f64) -> Self {
        Self {
            mat: TransformationMatrix::identity(),
            b: Point::new(x, y),
        }
    }

    /// Returns a rotation by `angle` about the origin.
    pub fn rotate(angle: Rotation) -> Self {
        Self {
            mat: angle.transformation_matrix(),
            b: Point::zero(),
        }
    }

    /// Returns a rotation by `angle` about the point `center`.
    pub fn rotate_about(angle: Rotation, center: Point) -> Self {
        let mat = angle.transformation_matrix();
        Self {
            mat,
            b: center - mat * center,
        }
    }

    /// Returns a reflection across the vertical line `x = x0`.
    pub fn mirror_x(x0: f64) -> Self {
        Self {
            mat: TransformationMatrix::mirror_x(),
            b: Point::new(2. * x0, 0.),
        }
    }

    /// Returns a reflection across the horizontal line `y = y0`.
    pub fn mirror_y(y0: f64) -> Self {
        Self {
            mat: TransformationMatrix::mirror_y(),
            b: Point::new(0., 2. * y0),
        }
    }

    /// Returns a new [`TransformationBuilder`].
    #[inline]
    pub fn builder() -> TransformationBuilder {
        TransformationBuilder::default()
    }

    /// Create a new [`Transformation`] that is the cascade of `parent` and `child`.
    ///
    /// The child is applied first. Note this operation *is not* commutative.
    /// For example the set of transformations:
    /// * (a) Mirror across the x-axis, then
    /// * (b) Translate by (1,1)
    /// * (c) Place a point at (local coordinate) (1,1)
    ///
    /// Lands said point at (2,0) in top-level space,
    /// whereas reversing the order of (a) and (b) lands it at (2,-2).
    pub fn cascade(parent: Transformation, child: Transformation) -> Transformation {
        // The result-transform's origin is the parent's origin,
        // plus the parent-transformed child's origin
        let b = parent.mat * child.b + parent.b;
        let mat = parent.mat * child.mat;
        Self { mat, b }
    }

    /// Returns the transformation applying `self` and then `next`.
    #[inline]
    pub fn then(self, next: Transformation) -> Transformation {
        Self::cascade(next, self)
    }

    /// Returns the inverse [`Transformation`] of `self`.
    pub fn inv(&self) -> Transformation {
        let inv = self.mat.inverse();
        let invb = inv * self.b;
        Self { mat: inv, b: -invb }
    }

    /// The rotation/reflection part of this transformation.
    pub fn matrix(&self) -> TransformationMatrix {
        self.mat
    }

    /// Returns `true` if this transformation includes a reflection.
    pub fn is_mirrored(&self) -> bool {
        self.mat.det() < 0
    }

    /// Applies this transformation to a point.
    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        self.mat * p + self.b
    }

    /// Applies the rotation/reflection part of this transformation to a direction.
    #[inline]
    pub fn apply_rotation(&self, dir: Rotation) -> Rotation {
        self.mat.apply_rotation(dir)
    }
}

impl AbsDiffEq for Transformation {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        crate::geometry::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.mat == other.mat && self.b.abs_diff_eq(&other.b, epsilon)
    }
}

/// A builder for transformations applied in the canonical order:
/// rotate, then mirror, then translate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationBuilder {
    translation: Point,
    angle: Rotation,
    mirror_x: bool,
    mirror_y: bool,
}

impl TransformationBuilder {
    /// Specifies the x-y translation, applied last.
    pub fn translation(&mut self, point: impl Into<Point>) -> &mut Self {
        self.translation = point.into();
        self
    }

    /// Specifies the angle of rotation, applied first.
    pub fn angle(&mut self, angle: Rotation) -> &mut Self {
        self.angle = angle;
        self
    }

    /// Specifies whether to negate x-coordinates after rotating.
    pub fn mirror_x(&mut self, mirror_x: bool) -> &mut Self {
        self.mirror_x = mirror_x;
        self
    }

    /// Specifies whether to negate y-coordinates after rotating.
    pub fn mirror_y(&mut self, mirror_y: bool) -> &mut Self {
        self.mirror_y = mirror_y;
        self
    }

    /// Builds a [`Transformation`] from the specified parameters.
    pub fn build(&mut self) -> Transformation {
        let mut mat = self.angle.transformation_matrix();
        if self.mirror_x {
            mat = TransformationMatrix::mirror_x() * mat;
        }
        if self.mirror_y {
            mat = TransformationMatrix::mirror_y() * mat;
        }
        Transformation {
            mat,
            b: self.translation,
        }
    }
}

/// A trait for specifying how an object is changed by a [`Transformation`].
///
/// Takes in a reference to the object and returns the transformed version.
pub trait Transform: Sized {
    /// Applies matrix-vector [`Transformation`] `trans`.
    fn transform(&self, trans: &Transformation) -> Self;

    /// Translates the object by `p`.
    fn translate(&self, p: Point) -> Self {
        self.transform(&Transformation::translate(p.x, p.y))
    }
}

impl Transform for Point {
    fn transform(&self, trans: &Transformation) -> Self {
        trans.apply(*self)
    }
}

impl Transform for Rect {
    fn transform(&self, trans: &Transformation) -> Self {
        let [p0, p1] = self.corners();
        Rect::new(trans.apply(p0), trans.apply(p1))
    }
}

impl<T: Transform> Transform for Vec<T> {
    fn transform(&self, trans: &Transformation) -> Self {
        self.iter().map(|elt| elt.transform(trans)).collect()
    }
}

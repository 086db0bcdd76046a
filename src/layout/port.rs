//! Typed, oriented attachment points.

use approx::AbsDiffEq;
use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use super::layers::LayerSpec;
use super::{Error, Result};
use crate::geometry::{Point, Rotation, Transform, Transformation, EPSILON};

/// Whether a port carries light or current.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    Optical,
    Electrical,
}

impl PortKind {
    /// The conventional port name prefix for this kind (`o1`, `e2`, ...).
    pub fn prefix(&self) -> &'static str {
        match self {
            PortKind::Optical => "o",
            PortKind::Electrical => "e",
        }
    }
}

impl std::fmt::Display for PortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortKind::Optical => write!(f, "optical"),
            PortKind::Electrical => write!(f, "electrical"),
        }
    }
}

/// A named attachment point on the boundary of a cell.
///
/// The orientation points outward, away from the cell body.
/// Two ports connect when they coincide and face each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    name: ArcStr,
    center: Point,
    orientation: Rotation,
    width: f64,
    layer: LayerSpec,
    kind: PortKind,
}

impl Port {
    pub fn new(
        name: impl Into<ArcStr>,
        center: Point,
        orientation: Rotation,
        width: f64,
        layer: LayerSpec,
        kind: PortKind,
    ) -> Self {
        Self {
            name: name.into(),
            center,
            orientation,
            width,
            layer,
            kind,
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn center(&self) -> Point {
        self.center
    }

    #[inline]
    pub fn orientation(&self) -> Rotation {
        self.orientation
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn layer(&self) -> LayerSpec {
        self.layer
    }

    #[inline]
    pub fn kind(&self) -> PortKind {
        self.kind
    }

    /// Returns a copy of this port under a new name.
    pub fn named(&self, name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Checks that `self` can be joined to `other` under `allowance`.
    pub fn check_connection(
        &self,
        other: &Port,
        allowance: MismatchAllowance,
    ) -> std::result::Result<(), PortMismatch> {
        let mismatch = |kind| PortMismatch {
            port: self.name.clone(),
            other: other.name.clone(),
            kind,
        };
        if !allowance.kind && self.kind != other.kind {
            return Err(mismatch(MismatchKind::Kind {
                expected: other.kind,
                found: self.kind,
            }));
        }
        if !allowance.layer && self.layer != other.layer {
            return Err(mismatch(MismatchKind::Layer {
                expected: other.layer,
                found: self.layer,
            }));
        }
        if !allowance.width && !self.width.abs_diff_eq(&other.width, EPSILON) {
            return Err(mismatch(MismatchKind::Width {
                expected: other.width,
                found: self.width,
            }));
        }
        Ok(())
    }

    /// Checks that `self` and `other` coincide within `tolerance` and face each other.
    pub fn check_aligned(&self, other: &Port, tolerance: f64) -> Result<()> {
        let misaligned = |detail: String| Error::Misaligned {
            port: self.name.clone(),
            other: other.name.clone(),
            detail,
        };
        let distance = self.center.distance(other.center);
        if distance > tolerance {
            return Err(misaligned(format!(
                "centers ({}, {}) and ({}, {}) are {distance} apart",
                self.center.x, self.center.y, other.center.x, other.center.y
            )));
        }
        if self.orientation != other.orientation.opposite() {
            return Err(misaligned(format!(
                "orientations {} and {} are not anti-parallel",
                self.orientation, other.orientation
            )));
        }
        Ok(())
    }
}

impl Transform for Port {
    fn transform(&self, trans: &Transformation) -> Self {
        Self {
            center: trans.apply(self.center),
            orientation: trans.apply_rotation(self.orientation),
            ..self.clone()
        }
    }
}

impl AbsDiffEq for Port {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.name == other.name
            && self.orientation == other.orientation
            && self.layer == other.layer
            && self.kind == other.kind
            && self.center.abs_diff_eq(&other.center, epsilon)
            && self.width.abs_diff_eq(&other.width, epsilon)
    }
}

/// Which port attributes may differ across a connection.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct MismatchAllowance {
    pub width: bool,
    pub layer: bool,
    pub kind: bool,
}

impl MismatchAllowance {
    /// Every attribute must match.
    pub const NONE: Self = Self {
        width: false,
        layer: false,
        kind: false,
    };

    /// Used when landing a contact pad on a narrower wire.
    pub const WIDTH_AND_LAYER: Self = Self {
        width: true,
        layer: true,
        kind: false,
    };

    /// Used when a metal wire shadows an optical waveguide.
    pub const ALL: Self = Self {
        width: true,
        layer: true,
        kind: true,
    };
}

/// The attribute that differed across a rejected connection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MismatchKind {
    #[error("width {found} does not match {expected}")]
    Width { expected: f64, found: f64 },
    #[error("layer {found} does not match {expected}")]
    Layer {
        expected: LayerSpec,
        found: LayerSpec,
    },
    #[error("{found} port cannot join {expected} port")]
    Kind { expected: PortKind, found: PortKind },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot connect `{port}` to `{other}`: {kind}")]
pub struct PortMismatch {
    pub port: ArcStr,
    pub other: ArcStr,
    pub kind: MismatchKind,
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn wg(name: &str, center: Point, orientation: Rotation) -> Port {
        Port::new(
            name,
            center,
            orientation,
            0.5,
            LayerSpec(1, 0),
            PortKind::Optical,
        )
    }

    #[test]
    fn transform_round_trips_ports() {
        let port = wg("o1", Point::new(3., -4.5), Rotation::R90);
        let t = Transformation::builder()
            .angle(Rotation::R270)
            .mirror_x(true)
            .translation((120., 7.))
            .build();
        let moved = port.transform(&t);
        assert_eq!(moved.orientation(), Rotation::R180);
        let back = moved.transform(&t.inv());
        assert_abs_diff_eq!(back, port);
        let composed = Transformation::cascade(t, t.inv());
        assert_abs_diff_eq!(port.transform(&composed), port);
    }

    #[test]
    fn mismatches_are_reported() {
        let a = wg("o1", Point::zero(), Rotation::R0);
        let b = Port::new(
            "e1",
            Point::zero(),
            Rotation::R180,
            4.,
            LayerSpec(2, 0),
            PortKind::Electrical,
        );
        let err = a.check_connection(&b, MismatchAllowance::NONE).unwrap_err();
        assert!(matches!(err.kind, MismatchKind::Kind { .. }));
        let err = a
            .check_connection(
                &b,
                MismatchAllowance {
                    kind: true,
                    ..MismatchAllowance::NONE
                },
            )
            .unwrap_err();
        assert!(matches!(err.kind, MismatchKind::Layer { .. }));
        let err = a
            .check_connection(&b, MismatchAllowance::WIDTH_AND_LAYER)
            .unwrap_err();
        assert!(matches!(err.kind, MismatchKind::Kind { .. }));
        assert!(a.check_connection(&b, MismatchAllowance::ALL).is_ok());
    }

    #[test]
    fn alignment_requires_coincident_antiparallel_ports() {
        let a = wg("o2", Point::new(10., 0.), Rotation::R0);
        let b = wg("o1", Point::new(10., 1e-9), Rotation::R180);
        assert!(a.check_aligned(&b, EPSILON).is_ok());
        let c = wg("o1", Point::new(10., 0.), Rotation::R0);
        assert!(matches!(
            a.check_aligned(&c, EPSILON),
            Err(Error::Misaligned { .. })
        ));
        let d = wg("o1", Point::new(11., 0.), Rotation::R180);
        assert!(a.check_aligned(&d, EPSILON).is_err());
    }
}

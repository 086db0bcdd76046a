//! Parametric primitive cells.
//!
//! The device builder only asks a [`PrimitiveFactory`] for cells and reads back
//! their ports; it never looks at the shapes inside them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::Rotation;
use crate::layout::{Cell, LayerSpec, PortKind, Result};

pub mod basic;

pub use basic::BasicPrimitives;

/// The width, layer, and port kind of a drawn wire.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    pub width: f64,
    pub layer: LayerSpec,
    pub kind: PortKind,
}

impl CrossSection {
    pub const fn new(width: f64, layer: LayerSpec, kind: PortKind) -> Self {
        Self { width, layer, kind }
    }

    pub const fn optical(width: f64, layer: LayerSpec) -> Self {
        Self::new(width, layer, PortKind::Optical)
    }

    pub const fn electrical(width: f64, layer: LayerSpec) -> Self {
        Self::new(width, layer, PortKind::Electrical)
    }

    /// Names the `n`th port of a cell drawn with this cross section.
    pub(crate) fn port_name(&self, n: usize) -> String {
        format!("{}{}", self.kind.prefix(), n)
    }
}

/// The sweep of a circular bend, measured from its input.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BendAngle {
    /// +90 degrees.
    Left,
    /// -90 degrees.
    Right,
    /// +180 degrees.
    UTurnLeft,
    /// -180 degrees.
    UTurnRight,
}

impl BendAngle {
    pub fn degrees(&self) -> f64 {
        match self {
            BendAngle::Left => 90.,
            BendAngle::Right => -90.,
            BendAngle::UTurnLeft => 180.,
            BendAngle::UTurnRight => -180.,
        }
    }

    /// The direction the output port faces when the input faces west.
    pub fn output_orientation(&self) -> Rotation {
        match self {
            BendAngle::Left => Rotation::R90,
            BendAngle::Right => Rotation::R270,
            BendAngle::UTurnLeft | BendAngle::UTurnRight => Rotation::R180,
        }
    }
}

/// Two racetrack rings stacked between a bottom and a top bus waveguide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingPairParams {
    /// Gaps between bottom bus and ring 0, ring 0 and ring 1, ring 1 and top bus.
    pub gaps: [f64; 3],
    pub radii: [f64; 2],
    /// Length of each ring's horizontal straight sections.
    pub length_x: f64,
    /// Length of each ring's vertical straight sections.
    pub lengths_y: [f64; 2],
    pub xs: CrossSection,
}

impl RingPairParams {
    /// Height of the top bus centerline above the bottom bus centerline.
    pub fn top_bus_y(&self) -> f64 {
        let w = self.xs.width;
        3. * w
            + self.gaps.iter().sum::<f64>()
            + 2. * self.radii.iter().sum::<f64>()
            + self.lengths_y.iter().sum::<f64>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadArrayParams {
    pub count: usize,
    pub pitch: f64,
    /// Side length of each square pad.
    pub size: f64,
    /// The side of each pad that carries its port.
    pub orientation: Rotation,
    pub layer: LayerSpec,
}

/// Supplies primitive cells by parametric description.
///
/// Port conventions:
/// * Wires (`straight`, `bend`, `s_bend`) run from port 1, facing west at the
///   origin, to port 2.
/// * `rectangle` exposes ports 1 to 4 on its west, north, east, and south sides.
/// * `ring_pair` exposes `o1`/`o2` on the west/east ends of its bottom bus and
///   `o3`/`o4` on the west/east ends of its top bus.
/// * `pad_array` exposes `e1`..`eN`, one per pad, left to right.
/// * `grating_coupler` exposes `o1` facing south at the bottom of its footprint.
pub trait PrimitiveFactory {
    fn ring_pair(&self, params: &RingPairParams) -> Result<Arc<Cell>>;

    fn bend(&self, radius: f64, angle: BendAngle, xs: CrossSection) -> Result<Arc<Cell>>;

    fn straight(&self, length: f64, xs: CrossSection) -> Result<Arc<Cell>>;

    fn rectangle(&self, size: [f64; 2], layer: LayerSpec, kind: PortKind) -> Result<Arc<Cell>>;

    fn pad_array(&self, params: &PadArrayParams) -> Result<Arc<Cell>>;

    /// An S-shaped wire ending at `(size[0], size[1])`, facing east.
    fn s_bend(&self, size: [f64; 2], xs: CrossSection) -> Result<Arc<Cell>>;

    fn grating_coupler(&self, footprint: [f64; 2], xs: CrossSection) -> Result<Arc<Cell>>;
}

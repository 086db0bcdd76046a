//! Analytic placement of the four heater assemblies.
//!
//! One heater template is instanced once per [`Slot`]. The slot selects a
//! [`SlotVariant`] from a fixed table and an offset computed from a
//! [`HeaterView`] of the device parameters.

use serde::{Deserialize, Serialize};

use crate::blocks::ladder::LadderParams;
use crate::geometry::{Point, Rotation, Transformation};

pub mod heater;

pub use heater::{heater_template, place_heater, PlacedHeater};

/// One of the four heater positions: a ring within a stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Slot {
    stage: usize,
    ring: usize,
}

impl Slot {
    /// Every slot, in build order.
    pub const ALL: [Slot; 4] = [
        Slot { stage: 0, ring: 0 },
        Slot { stage: 0, ring: 1 },
        Slot { stage: 1, ring: 0 },
        Slot { stage: 1, ring: 1 },
    ];

    /// Returns `None` unless both `stage` and `ring` are 0 or 1.
    pub fn new(stage: usize, ring: usize) -> Option<Self> {
        (stage < 2 && ring < 2).then_some(Self { stage, ring })
    }

    #[inline]
    pub fn stage(&self) -> usize {
        self.stage
    }

    #[inline]
    pub fn ring(&self) -> usize {
        self.ring
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage {} ring {}", self.stage, self.ring)
    }
}

/// The symmetry applied to the heater template in a given slot.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotVariant {
    /// Rotation of the template's first bend.
    pub bend_rotation: Rotation,
    /// Negate x coordinates: mirror about the vertical stage axis.
    pub mirror_x: bool,
    /// Negate y coordinates: mirror about the horizontal axis.
    pub mirror_y: bool,
    /// Vertical shift applied to both contacts after they land on the heater.
    pub contact_dy: f64,
    /// Record the start contact's west side first, then the end contact's east side.
    /// Otherwise the end contact's west side comes first.
    pub start_first: bool,
}

/// Indexed by `[stage][ring]`.
pub const SLOT_TABLE: [[SlotVariant; 2]; 2] = [
    [
        SlotVariant {
            bend_rotation: Rotation::R270,
            mirror_x: false,
            mirror_y: false,
            contact_dy: -10.,
            start_first: true,
        },
        SlotVariant {
            bend_rotation: Rotation::R270,
            mirror_x: false,
            mirror_y: true,
            contact_dy: 10.,
            start_first: false,
        },
    ],
    [
        SlotVariant {
            bend_rotation: Rotation::R270,
            mirror_x: true,
            mirror_y: false,
            contact_dy: -10.,
            start_first: false,
        },
        SlotVariant {
            bend_rotation: Rotation::R270,
            mirror_x: true,
            mirror_y: true,
            contact_dy: 10.,
            start_first: true,
        },
    ],
];

impl SlotVariant {
    #[inline]
    pub fn for_slot(slot: Slot) -> &'static SlotVariant {
        &SLOT_TABLE[slot.stage][slot.ring]
    }

    /// Mirrors the template about the origin, then moves it to `offset`.
    pub fn transformation(&self, offset: Point) -> Transformation {
        Transformation::builder()
            .mirror_x(self.mirror_x)
            .mirror_y(self.mirror_y)
            .translation(offset)
            .build()
    }
}

/// The device parameters as seen by the heater phase.
///
/// Each ring pair is flipped onto the shared bus, so its rings are met in the
/// reverse order. The view reverses every per-ring list once, leaving the
/// source parameters untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaterView {
    pub radii: [[f64; 2]; 2],
    pub gaps: [[f64; 3]; 2],
    pub vertical_lengths: [f64; 2],
    pub coupling_length: f64,
    pub stage_distance: f64,
    pub wg_width: f64,
}

impl HeaterView {
    pub fn new(params: &LadderParams) -> Self {
        let reversed = |mut row: [f64; 2]| {
            row.reverse();
            row
        };
        let reversed_gaps = |mut row: [f64; 3]| {
            row.reverse();
            row
        };
        Self {
            radii: params.radii.map(reversed),
            gaps: params.gaps.map(reversed_gaps),
            vertical_lengths: reversed(params.vertical_lengths),
            coupling_length: params.coupling_length,
            stage_distance: params.stage_distance,
            wg_width: params.wg_width,
        }
    }

    /// Radius of the heater drawn in `slot`.
    #[inline]
    pub fn radius(&self, slot: Slot) -> f64 {
        self.radii[slot.stage][slot.ring]
    }

    /// Length of the vertical heater segment drawn in `slot`.
    #[inline]
    pub fn vertical_length(&self, slot: Slot) -> f64 {
        self.vertical_lengths[slot.ring]
    }
}

/// Location of the first bend's input in `slot`, before centering.
pub fn heater_offset(view: &HeaterView, slot: Slot) -> Point {
    let r = view.radii[slot.stage];
    let g = view.gaps[slot.stage];
    let v = view.vertical_lengths;
    let l = view.coupling_length;
    let w = view.wg_width;

    let mut x = -(l + 2. * r[0]);
    let mut y = r[0] + w + g[0];
    if slot.ring == 1 {
        x = -(l + r[0] + r[1]);
        y += r[0] + r[1] + v[0] + v[1] + w + g[1];
    }
    if slot.stage == 1 {
        x = view.stage_distance - x;
    }
    Point::new(x, y)
}

/// The complete placement decision for one slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HeaterPlacement {
    pub slot: Slot,
    pub offset: Point,
    pub variant: SlotVariant,
}

impl HeaterPlacement {
    #[inline]
    pub fn transformation(&self) -> Transformation {
        self.variant.transformation(self.offset)
    }
}

/// Computes the placement of every slot, in build order.
pub fn plan_heaters(view: &HeaterView) -> [HeaterPlacement; 4] {
    Slot::ALL.map(|slot| {
        let placement = HeaterPlacement {
            slot,
            offset: heater_offset(view, slot),
            variant: *SlotVariant::for_slot(slot),
        };
        log::trace!("planned heater at {slot}: {placement:?}");
        placement
    })
}

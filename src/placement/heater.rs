//! The heater template and its contacts.

use std::sync::Arc;

use super::HeaterPlacement;
use crate::geometry::{Rotation, Transformation};
use crate::layout::{Cell, CellBuilder, Instance, MismatchAllowance, Port, Result};
use crate::primitives::{BendAngle, CrossSection, PrimitiveFactory};

/// Draws a U-shaped heater that hugs half of a racetrack ring.
///
/// The template starts at the origin facing north (`e1`), turns down and east
/// through a quarter circle, runs `coupling_length` east, turns back north, and
/// ends after `vertical_length` (`e2`, also facing north).
pub fn heater_template<F: PrimitiveFactory + ?Sized>(
    factory: &F,
    radius: f64,
    coupling_length: f64,
    vertical_length: f64,
    bend_rotation: Rotation,
    xs: CrossSection,
) -> Result<Arc<Cell>> {
    let bend = factory.bend(radius, BendAngle::Left, xs)?;
    let horizontal = factory.straight(coupling_length, xs)?;
    let vertical = factory.straight(vertical_length, xs)?;
    let (p1, p2) = (xs.port_name(1), xs.port_name(2));

    let bend1 = Instance::with_transformation(
        "bend1",
        bend.clone(),
        Transformation::rotate(bend_rotation),
    );
    let mut straight1 = Instance::new("straight1", horizontal);
    straight1.connect(&p1, &bend1.port(&p2)?, MismatchAllowance::NONE)?;
    let mut bend2 = Instance::new("bend2", bend);
    bend2.connect(&p1, &straight1.port(&p2)?, MismatchAllowance::NONE)?;
    let mut straight2 = Instance::new("straight2", vertical);
    straight2.connect(&p1, &bend2.port(&p2)?, MismatchAllowance::NONE)?;

    let mut b = CellBuilder::new(format!(
        "heater_r{radius}_l{coupling_length}_v{vertical_length}"
    ));
    b.add_port(bend1.port(&p1)?.named("e1"))?;
    b.add_port(straight2.port(&p2)?.named("e2"))?;
    for inst in [bend1, straight1, bend2, straight2] {
        b.add_instance(inst);
    }
    Ok(b.finish())
}

/// A heater placed in its slot, with a contact pad on each end.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedHeater {
    pub heater: Instance,
    /// The contacts on the heater's `e1` and `e2` ends.
    pub contacts: [Instance; 2],
    /// The two contact sides recorded in the ledger, in slot order.
    pub ledger_ports: [Port; 2],
}

/// Places `template` according to `placement` and lands a `contact` on each end.
///
/// Contacts attach through their south (`e4`) and north (`e2`) sides, then shift by
/// `contact_dx` horizontally and the slot's `contact_dy` vertically.
pub fn place_heater(
    template: Arc<Cell>,
    contact: Arc<Cell>,
    placement: &HeaterPlacement,
    contact_dx: f64,
) -> Result<PlacedHeater> {
    let slot = placement.slot;
    let variant = placement.variant;
    let heater = Instance::with_transformation(
        format!("heater_{}_{}", slot.stage(), slot.ring()),
        template,
        placement.transformation(),
    );

    let mut start = Instance::new(
        format!("contact_{}_{}_start", slot.stage(), slot.ring()),
        contact.clone(),
    );
    start.connect("e4", &heater.port("e1")?, MismatchAllowance::WIDTH_AND_LAYER)?;
    start.translate_mut(contact_dx, variant.contact_dy);

    let mut end = Instance::new(
        format!("contact_{}_{}_end", slot.stage(), slot.ring()),
        contact,
    );
    end.connect("e2", &heater.port("e2")?, MismatchAllowance::WIDTH_AND_LAYER)?;
    end.translate_mut(contact_dx, variant.contact_dy);

    let ledger_ports = if variant.start_first {
        [start.port("e1")?, end.port("e3")?]
    } else {
        [end.port("e1")?, start.port("e3")?]
    };
    log::debug!(
        "placed heater at {slot}: contacts at ({}, {}) and ({}, {})",
        ledger_ports[0].center().x,
        ledger_ports[0].center().y,
        ledger_ports[1].center().x,
        ledger_ports[1].center().y,
    );

    Ok(PlacedHeater {
        heater,
        contacts: [start, end],
        ledger_ports,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::blocks::ladder::LadderParams;
    use crate::geometry::Point;
    use crate::layout::{LayerSpec, PortKind};
    use crate::placement::{plan_heaters, HeaterView, Slot};
    use crate::primitives::BasicPrimitives;

    const HEATER: CrossSection = CrossSection::electrical(4., LayerSpec(2, 0));

    #[test]
    fn template_ports_face_north() {
        let t = heater_template(
            &BasicPrimitives::default(),
            100.,
            20.,
            80.,
            Rotation::R270,
            HEATER,
        )
        .unwrap();
        let e1 = t.port("e1").unwrap();
        let e2 = t.port("e2").unwrap();
        assert_abs_diff_eq!(e1.center(), Point::zero());
        assert_abs_diff_eq!(e2.center(), Point::new(220., 80.));
        assert_eq!(e1.orientation(), Rotation::R90);
        assert_eq!(e2.orientation(), Rotation::R90);
    }

    fn placed(slot: Slot) -> PlacedHeater {
        let params = LadderParams::default();
        let view = HeaterView::new(&params);
        let factory = BasicPrimitives::default();
        let placement = plan_heaters(&view)
            .into_iter()
            .find(|p| p.slot == slot)
            .unwrap();
        let template = heater_template(
            &factory,
            view.radius(slot),
            view.coupling_length,
            view.vertical_length(slot),
            placement.variant.bend_rotation,
            HEATER,
        )
        .unwrap();
        let contact = factory
            .rectangle([10., 10.], LayerSpec(12, 0), PortKind::Electrical)
            .unwrap();
        place_heater(template, contact, &placement, -3.).unwrap()
    }

    fn assert_port(port: &Port, x: f64, y: f64, orientation: Rotation) {
        assert_abs_diff_eq!(port.center(), Point::new(x, y), epsilon = 1e-9);
        assert_eq!(port.orientation(), orientation);
    }

    #[test]
    fn contacts_land_on_each_slot() {
        let expected = [
            ((-228., 97.5, Rotation::R180), (-8., 177.5, Rotation::R180)),
            ((42., 443., Rotation::R180), (-278., 483., Rotation::R180)),
            ((402., 235.5, Rotation::R0), (722., 155.5, Rotation::R0)),
            ((672., 538., Rotation::R0), (452., 498., Rotation::R0)),
        ];
        for (slot, (a, b)) in Slot::ALL.into_iter().zip(expected) {
            let placed = placed(slot);
            assert_port(&placed.ledger_ports[0], a.0, a.1, a.2);
            assert_port(&placed.ledger_ports[1], b.0, b.1, b.2);
        }
    }

    #[test]
    fn mirrored_heater_keeps_chain_connected() {
        let placed = placed(Slot::ALL[3]);
        let e1 = placed.heater.port("e1").unwrap();
        let e2 = placed.heater.port("e2").unwrap();
        assert_port(&e1, 670., 533., Rotation::R270);
        assert_port(&e2, 450., 493., Rotation::R270);
    }
}

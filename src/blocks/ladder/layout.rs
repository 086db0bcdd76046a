use std::sync::Arc;

use super::LadderParams;
use crate::error::{Error, ErrorContext, Phase, Result, WithContext};
use crate::geometry::{BoundBox, Point, Rect, Rotation, Transformation, EPSILON};
use crate::layout::{
    Cell, CellBuilder, Instance, MismatchAllowance, Port, PortKind, PortLedger,
};
use crate::placement::{heater_template, place_heater, plan_heaters, HeaterView, Slot};
use crate::primitives::{
    BasicPrimitives, BendAngle, CrossSection, PadArrayParams, PrimitiveFactory, RingPairParams,
};
use crate::routing::{BundleParams, BundleRouter, ManhattanRouter};

/// Index at which the phase line contacts are spliced into the electrical ledger.
pub const PHASE_LINE_CONTACT_INDEX: usize = 4;

/// Names of the device ports exported by the ring phase, in routing order.
pub const DEVICE_PORTS: [&str; 4] = ["input", "drop", "through", "add"];

/// A fully placed, routed, and centered ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct Ladder {
    cell: Arc<Cell>,
    ledger: PortLedger,
}

impl Ladder {
    /// Runs every build phase with the reference primitives and router.
    pub fn build(params: LadderParams) -> Result<Self> {
        LadderBuilder::new(params)?.build()
    }

    #[inline]
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    /// The contacts collected while building, in final coordinates.
    #[inline]
    pub fn ledger(&self) -> &PortLedger {
        &self.ledger
    }
}

/// Assembles a ladder one phase at a time.
///
/// Phases must run in order: [`place_rings`](Self::place_rings),
/// [`place_heaters`](Self::place_heaters), [`place_phase_line`](Self::place_phase_line),
/// [`place_pads`](Self::place_pads), [`route`](Self::route), and finally
/// [`center`](Self::center), which consumes the builder.
#[derive(Debug)]
pub struct LadderBuilder<F = BasicPrimitives, R = ManhattanRouter> {
    params: LadderParams,
    factory: F,
    router: R,
    top: CellBuilder,
    ledger: PortLedger,
    pad_targets: Vec<Port>,
    /// Boxes of every bus waveguide, in the order the rings were placed.
    buses: Vec<Rect>,
    completed: Phase,
}

impl LadderBuilder {
    pub fn new(params: LadderParams) -> Result<Self> {
        Self::with_backends(params, BasicPrimitives::default(), ManhattanRouter::new())
    }
}

impl<F: PrimitiveFactory, R: BundleRouter> LadderBuilder<F, R> {
    /// Validates `params` and prepares an empty top cell.
    pub fn with_backends(params: LadderParams, factory: F, router: R) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            top: CellBuilder::new(params.name.clone()),
            params,
            factory,
            router,
            ledger: PortLedger::new(),
            pad_targets: Vec::new(),
            buses: Vec::new(),
            completed: Phase::Configure,
        })
    }

    #[inline]
    pub fn params(&self) -> &LadderParams {
        &self.params
    }

    #[inline]
    pub fn ledger(&self) -> &PortLedger {
        &self.ledger
    }

    /// The top cell under construction.
    #[inline]
    pub fn top(&self) -> &CellBuilder {
        &self.top
    }

    /// The last phase that ran to completion.
    #[inline]
    pub fn completed(&self) -> Phase {
        self.completed
    }

    fn begin(&self, requested: Phase) -> Result<ErrorContext> {
        let expected = match self.completed {
            Phase::Configure => Phase::Rings,
            Phase::Rings => Phase::Heaters,
            Phase::Heaters => Phase::PhaseLine,
            Phase::PhaseLine => Phase::Pads,
            Phase::Pads => Phase::Routing,
            Phase::Routing | Phase::Centering => Phase::Centering,
        };
        if requested != expected {
            return Err(Error::PhaseOrder {
                requested,
                expected,
            });
        }
        log::info!("starting {requested}");
        Ok(ErrorContext::phase(requested))
    }

    fn finish(&mut self, phase: Phase) {
        log::info!(
            "finished {phase}: {} electrical and {} optical contacts",
            self.ledger.electrical().len(),
            self.ledger.optical().len()
        );
        self.completed = phase;
    }

    fn wg(&self) -> CrossSection {
        CrossSection::optical(self.params.wg_width, self.params.layer_wg)
    }

    fn heater_metal(&self) -> CrossSection {
        CrossSection::electrical(self.params.heater_width, self.params.layer_heater)
    }

    fn contact(&self, context: ErrorContext) -> Result<Arc<Cell>> {
        let size = self.params.contact_size;
        self.factory
            .rectangle([size, size], self.params.layer_routing, PortKind::Electrical)
            .within(context)
    }

    fn ring_pair(&self, stage: usize, context: ErrorContext) -> Result<Arc<Cell>> {
        let p = &self.params;
        self.factory
            .ring_pair(&RingPairParams {
                gaps: p.gaps[stage],
                radii: p.radii[stage],
                length_x: p.coupling_length,
                lengths_y: p.vertical_lengths,
                xs: self.wg(),
            })
            .within(context)
    }

    /// Runs every remaining phase.
    pub fn build(mut self) -> Result<Ladder> {
        if self.completed < Phase::Rings {
            self.place_rings()?;
        }
        if self.completed < Phase::Heaters {
            self.place_heaters()?;
        }
        if self.completed < Phase::PhaseLine {
            self.place_phase_line()?;
        }
        if self.completed < Phase::Pads {
            self.place_pads()?;
        }
        if self.completed < Phase::Routing {
            self.route()?;
        }
        self.center()
    }

    /// Places both ring pairs on the shared bus and exports the device ports.
    ///
    /// Stage 0 attaches through its top-west port and stage 1 through its
    /// top-east port. Both pairs turn half a revolution and sit above the bus.
    pub fn place_rings(&mut self) -> Result<()> {
        let context = self.begin(Phase::Rings)?;
        let bus = Instance::new(
            "bus",
            self.factory
                .straight(self.params.stage_distance, self.wg())
                .within(context)?,
        );
        let mut stage0 = Instance::new("ring_pair_0", self.ring_pair(0, context)?);
        let mut stage1 = Instance::new("ring_pair_1", self.ring_pair(1, context)?);
        stage0
            .connect("o3", &bus.port("o1").within(context)?, MismatchAllowance::NONE)
            .within(context)?;
        stage1
            .connect("o4", &bus.port("o2").within(context)?, MismatchAllowance::NONE)
            .within(context)?;
        log::trace!("stage 0 ring pair at {:?}", stage0.transformation());
        log::trace!("stage 1 ring pair at {:?}", stage1.transformation());

        for (inst, a, b) in [
            (&bus, "o1", "o2"),
            (&stage0, "o1", "o2"),
            (&stage0, "o3", "o4"),
            (&stage1, "o1", "o2"),
            (&stage1, "o3", "o4"),
        ] {
            let a = inst.port(a).within(context)?;
            let b = inst.port(b).within(context)?;
            self.buses.extend(
                Rect::from_points([a.center(), b.center()]).map(|r| r.expand(a.width() / 2.)),
            );
        }

        self.ledger.append_optical(stage0.port("o1").within(context)?);
        self.ledger.append_optical(stage1.port("o2").within(context)?);

        let exported = [
            (&stage0, "o2"),
            (&stage0, "o4"),
            (&stage1, "o1"),
            (&stage1, "o3"),
        ];
        for (name, (inst, port)) in DEVICE_PORTS.iter().zip(exported) {
            let port = inst.port(port).within(context)?.named(*name);
            self.top.add_port(port).within(context)?;
        }

        self.top.add_instance(stage0);
        self.top.add_instance(stage1);
        self.top.add_instance(bus);
        self.finish(Phase::Rings);
        Ok(())
    }

    /// Instances the heater template in all four slots and records their contacts.
    pub fn place_heaters(&mut self) -> Result<()> {
        let context = self.begin(Phase::Heaters)?;
        let view = HeaterView::new(&self.params);
        let metal = self.heater_metal();
        let contact = self.contact(context)?;
        let contact_dx = -(self.params.contact_size - self.params.heater_width) / 2.;

        let mut placed_boxes: Vec<(Slot, Rect)> = Vec::with_capacity(4);
        for placement in plan_heaters(&view) {
            let slot = placement.slot;
            let context = ErrorContext::slot(Phase::Heaters, slot);
            let template = heater_template(
                &self.factory,
                view.radius(slot),
                view.coupling_length,
                view.vertical_length(slot),
                placement.variant.bend_rotation,
                metal,
            )
            .within(context)?;
            let placed = place_heater(template, contact.clone(), &placement, contact_dx)
                .within(context)?;
            let bbox = self.check_heater_clearance(&placed.heater, &placed_boxes, context)?;
            placed_boxes.push((slot, bbox));

            let [first, second] = placed.ledger_ports;
            self.ledger.append_electrical(first);
            self.ledger.append_electrical(second);
            self.top.add_instance(placed.heater);
            for inst in placed.contacts {
                self.top.add_instance(inst);
            }
        }

        // Stage 1 slots are planned ring 0 first; the pads run down stage 1 from ring 1.
        self.ledger.swap_last_pairs().within(context)?;
        self.finish(Phase::Heaters);
        Ok(())
    }

    /// Fails unless `heater` keeps clear of every bus and every heater placed before it.
    fn check_heater_clearance(
        &self,
        heater: &Instance,
        placed: &[(Slot, Rect)],
        context: ErrorContext,
    ) -> Result<Rect> {
        let bbox = heater
            .bbox()
            .ok_or_else(|| Error::invalid_geometry(context, "heater has no geometry"))?;
        let keepout = bbox.expand(EPSILON);
        if let Some(bus) = self.buses.iter().find(|bus| keepout.overlaps(bus)) {
            return Err(Error::invalid_geometry(
                context,
                format!("heater {bbox:?} does not clear bus waveguide {bus:?}"),
            ));
        }
        if let Some((slot, other)) = placed.iter().find(|(_, other)| keepout.overlaps(other)) {
            return Err(Error::invalid_geometry(
                context,
                format!("heater {bbox:?} does not clear the heater at {slot} {other:?}"),
            ));
        }
        log::trace!("heater clears all buses: {bbox:?}");
        Ok(bbox)
    }

    /// Joins the two far buses with an S-bend phase line and its heater.
    pub fn place_phase_line(&mut self) -> Result<()> {
        let context = self.begin(Phase::PhaseLine)?;
        let (start, end) = match self.ledger.optical() {
            [start, end, ..] => (start.clone(), end.clone()),
            _ => {
                return Err(Error::invalid_geometry(
                    context,
                    "phase line needs both far bus ends",
                ))
            }
        };

        let p = &self.params;
        let offset = p.phase_line_offset;
        let rise = [offset, offset];
        let fall = [offset, -offset - p.phase_line_mismatch()];
        let length = p.phase_line_length();
        let contact_size = p.contact_size;
        let contact_dy = (contact_size - p.heater_width) / 2.;

        let mut line = Vec::with_capacity(3);
        let mut metal = Vec::with_capacity(3);
        for (xs, insts, allowance) in [
            (self.wg(), &mut line, MismatchAllowance::NONE),
            (self.heater_metal(), &mut metal, MismatchAllowance::ALL),
        ] {
            let (p1, p2) = (xs.port_name(1), xs.port_name(2));
            let mut first = Instance::new(
                format!("phase_{}_bend1", xs.kind),
                self.factory.s_bend(rise, xs).within(context)?,
            );
            first.connect(&p1, &start, allowance).within(context)?;
            let mut straight = Instance::new(
                format!("phase_{}_straight", xs.kind),
                self.factory.straight(length, xs).within(context)?,
            );
            straight
                .connect(&p1, &first.port(&p2).within(context)?, MismatchAllowance::NONE)
                .within(context)?;
            let mut second = Instance::new(
                format!("phase_{}_bend2", xs.kind),
                self.factory.s_bend(fall, xs).within(context)?,
            );
            second
                .connect(&p1, &straight.port(&p2).within(context)?, MismatchAllowance::NONE)
                .within(context)?;
            insts.extend([first, straight, second]);
        }

        line[2]
            .port("o2")
            .within(context)?
            .check_aligned(&end, EPSILON)
            .within(context)?;

        let contact = self.contact(context)?;
        let mut c1 = Instance::new("phase_contact_1", contact.clone());
        c1.connect(
            "e3",
            &metal[0].port("e1").within(context)?,
            MismatchAllowance::WIDTH_AND_LAYER,
        )
        .within(context)?;
        c1.translate_mut(contact_size, contact_dy);
        let mut c2 = Instance::new("phase_contact_2", contact);
        c2.connect(
            "e1",
            &metal[2].port("e2").within(context)?,
            MismatchAllowance::WIDTH_AND_LAYER,
        )
        .within(context)?;
        c2.translate_mut(-contact_size, contact_dy);

        self.ledger
            .insert_electrical_at(
                PHASE_LINE_CONTACT_INDEX,
                [c1.port("e2").within(context)?, c2.port("e2").within(context)?],
            )
            .within(context)?;

        for inst in line.into_iter().chain(metal).chain([c1, c2]) {
            self.top.add_instance(inst);
        }
        self.finish(Phase::PhaseLine);
        Ok(())
    }

    /// Places the inner and outer pad arrays; the outer pads become routing targets.
    pub fn place_pads(&mut self) -> Result<()> {
        let context = self.begin(Phase::Pads)?;
        let p = &self.params;
        let dx = -(p.num_pads as f64) / 2. * p.pad_spacing + p.pad_size / 2.;
        let dy = p.pad_clearance;

        let mut arrays = Vec::with_capacity(2);
        for (name, size) in [
            ("pads_inner", p.pad_size),
            ("pads_outer", p.pad_size + 2. * p.pad_tolerance),
        ] {
            let cell = self
                .factory
                .pad_array(&PadArrayParams {
                    count: p.num_pads,
                    pitch: p.pad_spacing,
                    size,
                    orientation: Rotation::R270,
                    layer: p.layer_pad,
                })
                .within(context)?;
            arrays.push(Instance::with_transformation(
                name,
                cell,
                Transformation::translate(dx, dy),
            ));
        }

        if let Some(outer) = arrays.last() {
            self.pad_targets = outer.ports().collect();
        }
        for inst in arrays {
            self.top.add_instance(inst);
        }
        self.finish(Phase::Pads);
        Ok(())
    }

    /// Routes contacts to pads, places the fiber array, and routes the device ports to it.
    pub fn route(&mut self) -> Result<()> {
        let context = self.begin(Phase::Routing)?;
        let p = self.params.clone();
        let wg = self.wg();

        let electrical = BundleParams {
            separation: p.electrical_routing.separation,
            start_straight_length: p.electrical_routing.start_straight_length,
            end_straight_length: p.electrical_routing.end_straight_length,
            width: p.electrical_routing.width,
            layer: p.layer_routing,
            allow_width_mismatch: true,
            sort_ports: false,
        };
        let routes = self
            .router
            .route_bundle(
                "electrical_route",
                self.ledger.electrical(),
                &self.pad_targets,
                &electrical,
            )
            .within(context)?;
        self.add_routes(routes);

        let gratings = self.place_fiber_array(context, wg)?;

        let optical = BundleParams {
            separation: p.optical_routing.separation,
            start_straight_length: p.optical_routing.start_straight_length,
            end_straight_length: p.optical_routing.end_straight_length,
            width: wg.width,
            layer: wg.layer,
            allow_width_mismatch: true,
            sort_ports: true,
        };
        let mut devices = Vec::with_capacity(DEVICE_PORTS.len());
        for name in DEVICE_PORTS {
            devices.push(self.top.port(name).within(context)?.clone());
        }
        let routes = self
            .router
            .route_bundle("optical_route", &devices, &gratings[1..5], &optical)
            .within(context)?;
        self.add_routes(routes);

        self.place_loopback(context, wg, &gratings)?;
        self.finish(Phase::Routing);
        Ok(())
    }

    fn add_routes(&mut self, routes: Vec<Arc<Cell>>) {
        for route in routes {
            self.top
                .add_instance(Instance::new(route.name().clone(), route));
        }
    }

    /// Places the grating column and exports one `grating{i}` port per grating.
    fn place_fiber_array(&mut self, context: ErrorContext, wg: CrossSection) -> Result<Vec<Port>> {
        let fa = self.params.fiber_array.clone();
        let grating = self
            .factory
            .grating_coupler(fa.grating_size, wg)
            .within(context)?;
        let stub = self.factory.straight(wg.width, wg).within(context)?;

        let mut ports = Vec::with_capacity(fa.num_gratings);
        for i in 0..fa.num_gratings {
            let center = Point::new(
                -fa.clearance,
                (i as f64 - 1.5) * fa.spacing + 250.,
            );
            let gc = Instance::with_transformation(
                format!("grating_{i}"),
                grating.clone(),
                Transformation::translate(center.x, center.y)
                    .then(Transformation::rotate_about(Rotation::R90, center)),
            );
            let mut tap = Instance::new(format!("grating_{i}_stub"), stub.clone());
            tap.connect("o1", &gc.port("o1").within(context)?, MismatchAllowance::NONE)
                .within(context)?;
            let port = tap.port("o2").within(context)?.named(format!("grating{i}"));
            self.top.add_port(port.clone()).within(context)?;
            ports.push(port);
            self.top.add_instance(gc);
            self.top.add_instance(tap);
        }
        Ok(ports)
    }

    /// Loops the first grating back to the last one.
    fn place_loopback(
        &mut self,
        context: ErrorContext,
        wg: CrossSection,
        gratings: &[Port],
    ) -> Result<()> {
        let (first, last) = match gratings {
            [first, .., last] => (first, last),
            _ => {
                return Err(Error::invalid_geometry(
                    context,
                    "loopback needs at least two gratings",
                ))
            }
        };
        let radius = self.params.optical_routing.loopback_radius;
        let length = self.params.optical_routing.loopback_straight_length;

        let mut ends = Vec::with_capacity(2);
        for (i, (port, angle)) in [(first, BendAngle::UTurnRight), (last, BendAngle::UTurnLeft)]
            .into_iter()
            .enumerate()
        {
            let mut bend = Instance::new(
                format!("loopback_bend{i}"),
                self.factory.bend(radius, angle, wg).within(context)?,
            );
            bend.connect("o1", port, MismatchAllowance::NONE)
                .within(context)?;
            let mut straight = Instance::new(
                format!("loopback_straight{i}"),
                self.factory.straight(length, wg).within(context)?,
            );
            straight
                .connect("o1", &bend.port("o2").within(context)?, MismatchAllowance::NONE)
                .within(context)?;
            ends.push(straight.port("o2").within(context)?);
            self.top.add_instance(bend);
            self.top.add_instance(straight);
        }

        let params = BundleParams {
            separation: 0.,
            start_straight_length: radius,
            end_straight_length: radius,
            width: wg.width,
            layer: wg.layer,
            allow_width_mismatch: false,
            sort_ports: false,
        };
        let route = self
            .router
            .route_single("loopback_route", &ends[0], &ends[1], &params)
            .within(context)?;
        self.add_routes(vec![route]);
        Ok(())
    }

    /// Moves the whole device left by half the stage distance and freezes it.
    pub fn center(mut self) -> Result<Ladder> {
        self.begin(Phase::Centering)?;
        let dx = -self.params.stage_distance / 2.;
        self.top.translate_all(dx, 0.);
        self.ledger
            .transform_mut(&Transformation::translate(dx, 0.));
        self.finish(Phase::Centering);
        Ok(Ladder {
            cell: self.top.finish(),
            ledger: self.ledger,
        })
    }
}

//! Immutable cells and their transformed instances.

use std::sync::Arc;

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::layers::LayerSpec;
use super::port::{MismatchAllowance, Port};
use super::{Error, Result};
use crate::geometry::rect::union_opt;
use crate::geometry::{BoundBox, Rect, Shape, Transform, Transformation};

/// A shape drawn on a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub layer: LayerSpec,
    pub shape: Shape,
}

impl BoundBox for Element {
    fn bbox(&self) -> Option<Rect> {
        self.shape.bbox()
    }
}

impl Transform for Element {
    fn transform(&self, trans: &Transformation) -> Self {
        Self {
            layer: self.layer,
            shape: self.shape.transform(trans),
        }
    }
}

/// A named container of shapes and transformed child instances.
///
/// Cells are immutable once built; see [`CellBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    name: ArcStr,
    elements: Vec<Element>,
    instances: Vec<Instance>,
    ports: IndexMap<ArcStr, Port>,
}

impl Cell {
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    #[inline]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// The cell's ports, in the order they were added.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn port(&self, name: &str) -> Result<&Port> {
        self.ports.get(name).ok_or_else(|| Error::MissingPort {
            cell: self.name.clone(),
            port: name.into(),
        })
    }

    /// Resolves every shape in the hierarchy into this cell's coordinate frame.
    ///
    /// Elements are emitted depth-first in insertion order.
    pub fn flatten(&self) -> Vec<Element> {
        let mut out = Vec::new();
        self.flatten_into(&Transformation::identity(), &mut out);
        out
    }

    fn flatten_into(&self, trans: &Transformation, out: &mut Vec<Element>) {
        out.extend(self.elements.iter().map(|elt| elt.transform(trans)));
        for inst in self.instances.iter() {
            let trans = Transformation::cascade(*trans, inst.transformation);
            inst.cell.flatten_into(&trans, out);
        }
    }
}

impl BoundBox for Cell {
    fn bbox(&self) -> Option<Rect> {
        let bbox = self.elements.bbox();
        self.instances
            .iter()
            .fold(bbox, |acc, inst| union_opt(acc, inst.bbox()))
    }
}

/// A placement of a shared [`Cell`] under a [`Transformation`].
///
/// Port locations are derived from the child cell's ports on every access,
/// so they always reflect the instance's current transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    name: ArcStr,
    cell: Arc<Cell>,
    transformation: Transformation,
}

impl Instance {
    /// Creates an untransformed instance of `cell`.
    pub fn new(name: impl Into<ArcStr>, cell: Arc<Cell>) -> Self {
        Self {
            name: name.into(),
            cell,
            transformation: Transformation::identity(),
        }
    }

    /// Creates an instance of `cell` with the given transformation.
    pub fn with_transformation(
        name: impl Into<ArcStr>,
        cell: Arc<Cell>,
        transformation: Transformation,
    ) -> Self {
        Self {
            name: name.into(),
            cell,
            transformation,
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    #[inline]
    pub fn transformation(&self) -> Transformation {
        self.transformation
    }

    /// Applies `trans` after the instance's current transformation.
    pub fn transform_mut(&mut self, trans: Transformation) {
        self.transformation = Transformation::cascade(trans, self.transformation);
    }

    pub fn translate_mut(&mut self, dx: f64, dy: f64) {
        self.transform_mut(Transformation::translate(dx, dy));
    }

    /// Returns the named port in the parent's coordinate frame.
    pub fn port(&self, name: &str) -> Result<Port> {
        Ok(self.cell.port(name)?.transform(&self.transformation))
    }

    /// Returns all ports in the parent's coordinate frame.
    pub fn ports(&self) -> impl Iterator<Item = Port> + '_ {
        self.cell
            .ports()
            .map(move |port| port.transform(&self.transformation))
    }

    /// Moves this instance so its port `port` lands on `dest`, facing it.
    ///
    /// Any reflection already applied to the instance is kept;
    /// only the rotation and translation are recomputed.
    pub fn connect(&mut self, port: &str, dest: &Port, allowance: MismatchAllowance) -> Result<()> {
        let local = self.cell.port(port)?;
        local.check_connection(dest, allowance)?;

        let current = self.transformation.apply_rotation(local.orientation());
        let delta = dest.orientation().opposite() - current;
        let mat = delta.transformation_matrix() * self.transformation.mat;
        let b = dest.center() - mat * local.center();
        self.transformation = Transformation { mat, b };
        log::trace!(
            "connected {}.{} to {} with {:?}",
            self.name,
            port,
            dest.name(),
            self.transformation
        );
        Ok(())
    }
}

impl BoundBox for Instance {
    fn bbox(&self) -> Option<Rect> {
        self.cell.bbox().map(|r| r.transform(&self.transformation))
    }
}

/// Accumulates the contents of a [`Cell`] before freezing it.
#[derive(Debug, Clone)]
pub struct CellBuilder {
    name: ArcStr,
    elements: Vec<Element>,
    instances: Vec<Instance>,
    ports: IndexMap<ArcStr, Port>,
}

impl CellBuilder {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
            instances: Vec::new(),
            ports: IndexMap::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub fn draw(&mut self, layer: LayerSpec, shape: impl Into<Shape>) {
        self.elements.push(Element {
            layer,
            shape: shape.into(),
        });
    }

    pub fn draw_rect(&mut self, layer: LayerSpec, rect: Rect) {
        self.draw(layer, rect);
    }

    pub fn add_instance(&mut self, inst: Instance) {
        self.instances.push(inst);
    }

    #[inline]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Exposes `port` on the cell being built.
    pub fn add_port(&mut self, port: Port) -> Result<()> {
        if self.ports.contains_key(port.name()) {
            return Err(Error::DuplicatePort {
                cell: self.name.clone(),
                port: port.name().clone(),
            });
        }
        self.ports.insert(port.name().clone(), port);
        Ok(())
    }

    pub fn port(&self, name: &str) -> Result<&Port> {
        self.ports.get(name).ok_or_else(|| Error::MissingPort {
            cell: self.name.clone(),
            port: name.into(),
        })
    }

    /// Moves every shape, instance, and port drawn so far by `(dx, dy)`.
    pub fn translate_all(&mut self, dx: f64, dy: f64) {
        let trans = Transformation::translate(dx, dy);
        for elt in self.elements.iter_mut() {
            *elt = elt.transform(&trans);
        }
        for inst in self.instances.iter_mut() {
            inst.transform_mut(trans);
        }
        for port in self.ports.values_mut() {
            *port = port.transform(&trans);
        }
    }

    pub fn bbox(&self) -> Option<Rect> {
        let bbox = self.elements.bbox();
        self.instances
            .iter()
            .fold(bbox, |acc, inst| union_opt(acc, inst.bbox()))
    }

    pub fn finish(self) -> Arc<Cell> {
        Arc::new(Cell {
            name: self.name,
            elements: self.elements,
            instances: self.instances,
            ports: self.ports,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::geometry::{Point, Rotation};
    use crate::layout::port::PortKind;

    const WG: LayerSpec = LayerSpec(1, 0);

    fn straight(length: f64) -> Arc<Cell> {
        let mut b = CellBuilder::new("straight");
        b.draw_rect(WG, Rect::from_sides(0., -0.25, length, 0.25));
        b.add_port(Port::new(
            "o1",
            Point::zero(),
            Rotation::R180,
            0.5,
            WG,
            PortKind::Optical,
        ))
        .unwrap();
        b.add_port(Port::new(
            "o2",
            Point::new(length, 0.),
            Rotation::R0,
            0.5,
            WG,
            PortKind::Optical,
        ))
        .unwrap();
        b.finish()
    }

    #[test]
    fn connect_chains_straights() {
        let cell = straight(10.);
        let first = Instance::new("s1", cell.clone());
        let mut second = Instance::new("s2", cell);
        second
            .connect("o1", &first.port("o2").unwrap(), MismatchAllowance::NONE)
            .unwrap();
        let o2 = second.port("o2").unwrap();
        assert_abs_diff_eq!(o2.center(), Point::new(20., 0.));
        assert_eq!(o2.orientation(), Rotation::R0);
    }

    #[test]
    fn connect_rotates_to_face_destination() {
        let cell = straight(10.);
        let mut inst = Instance::new("s", cell);
        let dest = Port::new(
            "dest",
            Point::new(5., 5.),
            Rotation::R90,
            0.5,
            WG,
            PortKind::Optical,
        );
        inst.connect("o1", &dest, MismatchAllowance::NONE).unwrap();
        let o1 = inst.port("o1").unwrap();
        assert!(o1.check_aligned(&dest, 1e-9).is_ok());
        assert_abs_diff_eq!(inst.port("o2").unwrap().center(), Point::new(5., 15.));
    }

    #[test]
    fn connect_keeps_reflection() {
        let cell = straight(10.);
        let mut inst =
            Instance::with_transformation("s", cell, Transformation::mirror_x(0.));
        let dest = Port::new(
            "dest",
            Point::new(-3., 0.),
            Rotation::R180,
            0.5,
            WG,
            PortKind::Optical,
        );
        inst.connect("o1", &dest, MismatchAllowance::NONE).unwrap();
        assert!(inst.transformation().is_mirrored());
        assert_abs_diff_eq!(inst.port("o2").unwrap().center(), Point::new(-13., 0.));
    }

    #[test]
    fn connect_rejects_mismatched_ports() {
        let mut inst = Instance::new("s", straight(10.));
        let dest = Port::new(
            "e1",
            Point::zero(),
            Rotation::R0,
            4.,
            LayerSpec(2, 0),
            PortKind::Electrical,
        );
        let err = inst
            .connect("o1", &dest, MismatchAllowance::NONE)
            .unwrap_err();
        assert!(matches!(err, Error::Mismatch(_)));
        assert!(inst.connect("o1", &dest, MismatchAllowance::ALL).is_ok());
    }

    #[test]
    fn flatten_composes_root_to_leaf() {
        let leaf = straight(10.);
        let mut mid = CellBuilder::new("mid");
        mid.add_instance(Instance::with_transformation(
            "leaf",
            leaf,
            Transformation::rotate(Rotation::R90),
        ));
        let mid = mid.finish();
        let mut top = CellBuilder::new("top");
        top.add_instance(Instance::with_transformation(
            "mid",
            mid,
            Transformation::translate(100., 0.),
        ));
        let top = top.finish();
        let flat = top.flatten();
        assert_eq!(flat.len(), 1);
        assert_eq!(
            flat[0].shape,
            Shape::Rect(Rect::from_sides(99.75, 0., 100.25, 10.))
        );
        assert_eq!(top.bbox(), Some(Rect::from_sides(99.75, 0., 100.25, 10.)));
    }

    #[test]
    fn duplicate_ports_are_rejected() {
        let mut b = CellBuilder::new("dup");
        let port = Port::new("e1", Point::zero(), Rotation::R0, 1., WG, PortKind::Electrical);
        b.add_port(port.clone()).unwrap();
        assert!(matches!(b.add_port(port), Err(Error::DuplicatePort { .. })));
    }
}

use std::f64::consts::PI;
use std::sync::Arc;

use super::{BendAngle, CrossSection, PadArrayParams, PrimitiveFactory, RingPairParams};
use crate::geometry::{Point, Rect, Rotation, Shape};
use crate::layout::{Cell, CellBuilder, Error, LayerSpec, Port, PortKind, Result};

/// Draws primitives as rectangles and sampled centerline paths.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BasicPrimitives {
    /// Number of segments used to approximate a quarter circle.
    pub segments_per_quarter: usize,
}

impl Default for BasicPrimitives {
    fn default() -> Self {
        Self {
            segments_per_quarter: 16,
        }
    }
}

fn positive(what: &'static str, value: f64) -> Result<f64> {
    if value > 0. && value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Degenerate { what, value })
    }
}

fn non_negative(what: &'static str, value: f64) -> Result<f64> {
    if value >= 0. && value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Degenerate { what, value })
    }
}

impl BasicPrimitives {
    fn segments(&self, sweep_deg: f64) -> usize {
        let quarters = sweep_deg.abs() / 90.;
        ((quarters * self.segments_per_quarter as f64).ceil() as usize).max(1)
    }

    /// Samples an arc of `radius` about `center`, from `start_deg` sweeping `sweep_deg`.
    fn arc(&self, center: Point, radius: f64, start_deg: f64, sweep_deg: f64) -> Vec<Point> {
        let n = self.segments(sweep_deg);
        (0..=n)
            .map(|i| {
                let t = (start_deg + sweep_deg * i as f64 / n as f64).to_radians();
                Point::new(center.x + radius * t.cos(), center.y + radius * t.sin())
            })
            .collect()
    }

    /// A closed racetrack centerline whose bottom straight is centered at `bottom`.
    fn racetrack(&self, bottom: Point, radius: f64, length_x: f64, length_y: f64) -> Vec<Point> {
        let hx = length_x / 2.;
        let cy_lo = bottom.y + radius;
        let cy_hi = cy_lo + length_y;
        let mut pts = Vec::new();
        pts.extend(self.arc(Point::new(bottom.x + hx, cy_lo), radius, 270., 90.));
        pts.extend(self.arc(Point::new(bottom.x + hx, cy_hi), radius, 0., 90.));
        pts.extend(self.arc(Point::new(bottom.x - hx, cy_hi), radius, 90., 90.));
        pts.extend(self.arc(Point::new(bottom.x - hx, cy_lo), radius, 180., 90.));
        pts.push(pts[0]);
        pts
    }

    fn wire_port(name: String, center: Point, orientation: Rotation, xs: CrossSection) -> Port {
        Port::new(name, center, orientation, xs.width, xs.layer, xs.kind)
    }

    fn horizontal_bus(
        b: &mut CellBuilder,
        y: f64,
        half_length: f64,
        xs: CrossSection,
        names: [&str; 2],
    ) -> Result<()> {
        let hw = xs.width / 2.;
        b.draw_rect(
            xs.layer,
            Rect::from_sides(-half_length, y - hw, half_length, y + hw),
        );
        b.add_port(Port::new(
            names[0],
            Point::new(-half_length, y),
            Rotation::R180,
            xs.width,
            xs.layer,
            xs.kind,
        ))?;
        b.add_port(Port::new(
            names[1],
            Point::new(half_length, y),
            Rotation::R0,
            xs.width,
            xs.layer,
            xs.kind,
        ))
    }
}

impl PrimitiveFactory for BasicPrimitives {
    fn ring_pair(&self, params: &RingPairParams) -> Result<Arc<Cell>> {
        let RingPairParams {
            gaps,
            radii,
            length_x,
            lengths_y,
            xs,
        } = params;
        positive("waveguide width", xs.width)?;
        for &gap in gaps {
            positive("ring gap", gap)?;
        }
        for &radius in radii {
            positive("ring radius", radius)?;
        }
        non_negative("ring coupling length", *length_x)?;
        for &length in lengths_y {
            non_negative("ring vertical length", length)?;
        }

        let w = xs.width;
        let mut b = CellBuilder::new(format!(
            "ring_pair_r{}_{}_l{}",
            radii[0], radii[1], length_x
        ));

        Self::horizontal_bus(&mut b, 0., length_x / 2. + radii[0], *xs, ["o1", "o2"])?;

        let mut y = w + gaps[0];
        for k in 0..2 {
            let ring = self.racetrack(Point::new(0., y), radii[k], *length_x, lengths_y[k]);
            b.draw(xs.layer, Shape::path(ring, w));
            y += 2. * radii[k] + lengths_y[k] + w + gaps[k + 1];
        }

        let y_top = params.top_bus_y();
        Self::horizontal_bus(&mut b, y_top, length_x / 2. + radii[1], *xs, ["o3", "o4"])?;
        Ok(b.finish())
    }

    fn bend(&self, radius: f64, angle: BendAngle, xs: CrossSection) -> Result<Arc<Cell>> {
        positive("bend radius", radius)?;
        positive("wire width", xs.width)?;

        let sweep = angle.degrees();
        let (center, start) = if sweep > 0. {
            (Point::new(0., radius), 270.)
        } else {
            (Point::new(0., -radius), 90.)
        };
        let mut points = self.arc(center, radius, start, sweep);
        let end = match angle {
            BendAngle::Left => Point::new(radius, radius),
            BendAngle::Right => Point::new(radius, -radius),
            BendAngle::UTurnLeft => Point::new(0., 2. * radius),
            BendAngle::UTurnRight => Point::new(0., -2. * radius),
        };
        points[0] = Point::zero();
        if let Some(last) = points.last_mut() {
            *last = end;
        }

        let mut b = CellBuilder::new(format!("bend_r{radius}_a{sweep}_w{}", xs.width));
        b.draw(xs.layer, Shape::path(points, xs.width));
        b.add_port(Self::wire_port(
            xs.port_name(1),
            Point::zero(),
            Rotation::R180,
            xs,
        ))?;
        b.add_port(Self::wire_port(
            xs.port_name(2),
            end,
            angle.output_orientation(),
            xs,
        ))?;
        Ok(b.finish())
    }

    fn straight(&self, length: f64, xs: CrossSection) -> Result<Arc<Cell>> {
        positive("straight length", length)?;
        positive("wire width", xs.width)?;

        let hw = xs.width / 2.;
        let mut b = CellBuilder::new(format!("straight_l{length}_w{}", xs.width));
        b.draw_rect(xs.layer, Rect::from_sides(0., -hw, length, hw));
        b.add_port(Self::wire_port(
            xs.port_name(1),
            Point::zero(),
            Rotation::R180,
            xs,
        ))?;
        b.add_port(Self::wire_port(
            xs.port_name(2),
            Point::new(length, 0.),
            Rotation::R0,
            xs,
        ))?;
        Ok(b.finish())
    }

    fn rectangle(&self, size: [f64; 2], layer: LayerSpec, kind: PortKind) -> Result<Arc<Cell>> {
        let [sx, sy] = size;
        positive("rectangle width", sx)?;
        positive("rectangle height", sy)?;

        let mut b = CellBuilder::new(format!("rectangle_{sx}x{sy}"));
        b.draw_rect(layer, Rect::from_sides(0., 0., sx, sy));
        let sides = [
            (Point::new(0., sy / 2.), Rotation::R180, sy),
            (Point::new(sx / 2., sy), Rotation::R90, sx),
            (Point::new(sx, sy / 2.), Rotation::R0, sy),
            (Point::new(sx / 2., 0.), Rotation::R270, sx),
        ];
        for (i, (center, orientation, width)) in sides.into_iter().enumerate() {
            b.add_port(Port::new(
                format!("{}{}", kind.prefix(), i + 1),
                center,
                orientation,
                width,
                layer,
                kind,
            ))?;
        }
        Ok(b.finish())
    }

    fn pad_array(&self, params: &PadArrayParams) -> Result<Arc<Cell>> {
        let PadArrayParams {
            count,
            pitch,
            size,
            orientation,
            layer,
        } = *params;
        positive("pad size", size)?;
        positive("pad pitch", pitch)?;
        if count == 0 {
            return Err(Error::Degenerate {
                what: "pad count",
                value: 0.,
            });
        }

        let mut b = CellBuilder::new(format!("pad_array_{count}x{size}"));
        for i in 0..count {
            let center = Point::new(i as f64 * pitch, 0.);
            b.draw_rect(layer, Rect::from_center(center, size, size));
            b.add_port(Port::new(
                format!("e{}", i + 1),
                center + orientation.unit() * (size / 2.),
                orientation,
                size,
                layer,
                PortKind::Electrical,
            ))?;
        }
        Ok(b.finish())
    }

    fn s_bend(&self, size: [f64; 2], xs: CrossSection) -> Result<Arc<Cell>> {
        let [dx, dy] = size;
        positive("s-bend length", dx)?;
        positive("wire width", xs.width)?;

        let n = 2 * self.segments_per_quarter.max(1);
        let points = (0..=n)
            .map(|i| {
                let t = i as f64 / n as f64;
                Point::new(dx * t, dy * (1. - (PI * t).cos()) / 2.)
            })
            .collect::<Vec<_>>();
        let end = Point::new(dx, dy);

        let mut b = CellBuilder::new(format!("s_bend_{dx}x{dy}_w{}", xs.width));
        b.draw(xs.layer, Shape::path(points, xs.width));
        b.add_port(Self::wire_port(
            xs.port_name(1),
            Point::zero(),
            Rotation::R180,
            xs,
        ))?;
        b.add_port(Self::wire_port(xs.port_name(2), end, Rotation::R0, xs))?;
        Ok(b.finish())
    }

    fn grating_coupler(&self, footprint: [f64; 2], xs: CrossSection) -> Result<Arc<Cell>> {
        let [w, h] = footprint;
        positive("grating width", w)?;
        positive("grating height", h)?;

        let mut b = CellBuilder::new(format!("grating_{w}x{h}"));
        b.draw_rect(xs.layer, Rect::from_center(Point::zero(), w, h));
        b.add_port(Self::wire_port(
            xs.port_name(1),
            Point::new(0., -h / 2.),
            Rotation::R270,
            xs,
        ))?;
        Ok(b.finish())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::geometry::BoundBox;

    const WG: CrossSection = CrossSection::optical(0.5, LayerSpec(1, 0));
    const HEATER: CrossSection = CrossSection::electrical(4., LayerSpec(2, 0));

    #[test]
    fn straight_ports_face_outward() {
        let s = BasicPrimitives::default().straight(20., HEATER).unwrap();
        let e1 = s.port("e1").unwrap();
        let e2 = s.port("e2").unwrap();
        assert_eq!(e1.orientation(), Rotation::R180);
        assert_eq!(e2.orientation(), Rotation::R0);
        assert_abs_diff_eq!(e2.center(), Point::new(20., 0.));
        assert_eq!(s.bbox(), Some(Rect::from_sides(0., -2., 20., 2.)));
    }

    #[test]
    fn bends_end_exactly() {
        let f = BasicPrimitives::default();
        let cases = [
            (BendAngle::Left, Point::new(100., 100.), Rotation::R90),
            (BendAngle::Right, Point::new(100., -100.), Rotation::R270),
            (BendAngle::UTurnLeft, Point::new(0., 200.), Rotation::R180),
            (BendAngle::UTurnRight, Point::new(0., -200.), Rotation::R180),
        ];
        for (angle, end, orientation) in cases {
            let bend = f.bend(100., angle, WG).unwrap();
            let o2 = bend.port("o2").unwrap();
            assert_eq!(o2.center(), end);
            assert_eq!(o2.orientation(), orientation);
        }
    }

    #[test]
    fn rectangle_ports_are_side_midpoints() {
        let r = BasicPrimitives::default()
            .rectangle([10., 6.], LayerSpec(12, 0), PortKind::Electrical)
            .unwrap();
        let ports = r.ports().map(|p| (p.center(), p.orientation())).collect::<Vec<_>>();
        assert_eq!(
            ports,
            [
                (Point::new(0., 3.), Rotation::R180),
                (Point::new(5., 6.), Rotation::R90),
                (Point::new(10., 3.), Rotation::R0),
                (Point::new(5., 0.), Rotation::R270),
            ]
        );
    }

    #[test]
    fn ring_pair_buses_match_stack_height() {
        let params = RingPairParams {
            gaps: [2., 5., 2.],
            radii: [150., 100.],
            length_x: 20.,
            lengths_y: [40., 80.],
            xs: WG,
        };
        assert_abs_diff_eq!(params.top_bus_y(), 630.5);
        let ring = BasicPrimitives::default().ring_pair(&params).unwrap();
        assert_abs_diff_eq!(ring.port("o1").unwrap().center(), Point::new(-160., 0.));
        assert_abs_diff_eq!(ring.port("o2").unwrap().center(), Point::new(160., 0.));
        assert_abs_diff_eq!(ring.port("o3").unwrap().center(), Point::new(-110., 630.5));
        assert_abs_diff_eq!(ring.port("o4").unwrap().center(), Point::new(110., 630.5));

        // Rings sit strictly between the buses.
        let rings = &ring.elements()[1..3];
        let r0 = rings[0].bbox().unwrap();
        let r1 = rings[1].bbox().unwrap();
        assert_abs_diff_eq!(r0.bot(), 2.25);
        assert_abs_diff_eq!(r1.top(), 630.5 - 2.25);
        assert_abs_diff_eq!(r1.bot() - r0.top(), 5.);
    }

    #[test]
    fn pad_array_ports_face_down() {
        let pads = BasicPrimitives::default()
            .pad_array(&PadArrayParams {
                count: 3,
                pitch: 100.,
                size: 80.,
                orientation: Rotation::R270,
                layer: LayerSpec(49, 0),
            })
            .unwrap();
        let e3 = pads.port("e3").unwrap();
        assert_abs_diff_eq!(e3.center(), Point::new(200., -40.));
        assert_eq!(e3.orientation(), Rotation::R270);
        assert!(pads.port("e4").is_err());
    }

    #[test]
    fn s_bend_reaches_offset() {
        let s = BasicPrimitives::default().s_bend([50., -37.], WG).unwrap();
        assert_abs_diff_eq!(s.port("o2").unwrap().center(), Point::new(50., -37.));
        match &s.elements()[0].shape {
            Shape::Path { points, .. } => {
                assert_abs_diff_eq!(points.last().copied().unwrap(), Point::new(50., -37.));
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn degenerate_dimensions_are_rejected() {
        let f = BasicPrimitives::default();
        assert!(matches!(
            f.straight(0., WG),
            Err(Error::Degenerate { what: "straight length", .. })
        ));
        assert!(f.bend(-1., BendAngle::Left, WG).is_err());
        assert!(f.rectangle([0., 1.], LayerSpec(1, 0), PortKind::Optical).is_err());
    }
}

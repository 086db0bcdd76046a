use std::sync::Arc;

use approx::AbsDiffEq;
use itertools::Itertools;

use super::{BundleParams, BundleRouter, Result, RoutingError};
use crate::geometry::{Point, Shape, EPSILON};
use crate::layout::{Cell, CellBuilder, MismatchKind, Port, PortMismatch};

/// Routes each pair with at most two bends between its start and end straights.
///
/// Route `i` leaves its start port by `start_straight_length + i * separation`,
/// which keeps the first turns of neighboring routes apart. No path search is
/// performed; routes may cross unrelated geometry.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ManhattanRouter;

impl ManhattanRouter {
    pub fn new() -> Self {
        Self
    }

    fn check_width(port: &Port, params: &BundleParams) -> Result<()> {
        if params.allow_width_mismatch || port.width().abs_diff_eq(&params.width, EPSILON) {
            return Ok(());
        }
        Err(PortMismatch {
            port: port.name().clone(),
            other: arcstr::literal!("route"),
            kind: MismatchKind::Width {
                expected: params.width,
                found: port.width(),
            },
        }
        .into())
    }

    fn check_collisions(ports: &[&Port]) -> Result<()> {
        for (a, b) in ports.iter().tuple_combinations() {
            if a.center().abs_diff_eq(&b.center(), EPSILON) {
                return Err(RoutingError::Collision {
                    first: a.name().clone(),
                    second: b.name().clone(),
                    at: a.center(),
                });
            }
        }
        Ok(())
    }

    /// Orders `ports` along the axis the end ports are spread over.
    fn sorted<'a>(ports: &'a [Port], by_x: bool) -> Vec<&'a Port> {
        let key = |p: &Port| if by_x { p.center().x } else { p.center().y };
        ports
            .iter()
            .sorted_by(|a, b| key(*a).total_cmp(&key(*b)))
            .collect()
    }

    fn centerline(start: &Port, end: &Port, start_straight: f64, end_straight: f64) -> Vec<Point> {
        let a = start.center();
        let b = end.center();
        let a1 = a + start.orientation().unit() * start_straight;
        let b1 = b + end.orientation().unit() * end_straight;
        let corner = if end.orientation().is_horizontal() {
            Point::new(a1.x, b1.y)
        } else {
            Point::new(b1.x, a1.y)
        };

        let mut points: Vec<Point> = Vec::with_capacity(5);
        for p in [a, a1, corner, b1, b] {
            if points
                .last()
                .map_or(true, |last| !last.abs_diff_eq(&p, EPSILON))
            {
                points.push(p);
            }
        }
        points
    }
}

impl BundleRouter for ManhattanRouter {
    fn route_bundle(
        &self,
        name: &str,
        ports1: &[Port],
        ports2: &[Port],
        params: &BundleParams,
    ) -> Result<Vec<Arc<Cell>>> {
        if ports1.len() != ports2.len() {
            return Err(RoutingError::LengthMismatch {
                starts: ports1.len(),
                ends: ports2.len(),
            });
        }
        if !(params.width > 0.) {
            return Err(RoutingError::Degenerate {
                what: "width",
                value: params.width,
            });
        }

        let (starts, ends) = if params.sort_ports && !ports2.is_empty() {
            let by_x = !ports2[0].orientation().is_horizontal();
            (Self::sorted(ports1, by_x), Self::sorted(ports2, by_x))
        } else {
            (ports1.iter().collect(), ports2.iter().collect())
        };

        Self::check_collisions(&starts)?;
        Self::check_collisions(&ends)?;

        let mut routes = Vec::with_capacity(starts.len());
        for (i, (start, end)) in starts.into_iter().zip(ends).enumerate() {
            Self::check_width(start, params)?;
            Self::check_width(end, params)?;

            let start_straight = params.start_straight_length + i as f64 * params.separation;
            let points = Self::centerline(start, end, start_straight, params.end_straight_length);
            log::debug!(
                "routed {name}[{i}]: {} -> {} through {} points",
                start.name(),
                end.name(),
                points.len()
            );

            let mut b = CellBuilder::new(format!("{name}_{i}"));
            b.draw(params.layer, Shape::path(points, params.width));
            routes.push(b.finish());
        }
        Ok(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;
    use crate::layout::{LayerSpec, PortKind};

    const METAL: LayerSpec = LayerSpec(12, 0);

    fn port(name: &str, x: f64, y: f64, orientation: Rotation) -> Port {
        Port::new(
            name,
            Point::new(x, y),
            orientation,
            10.,
            METAL,
            PortKind::Electrical,
        )
    }

    fn params() -> BundleParams {
        BundleParams::builder()
            .separation(15.)
            .start_straight_length(50.)
            .end_straight_length(1.)
            .width(10.)
            .layer(METAL)
            .build()
            .unwrap()
    }

    fn points(cell: &Cell) -> Vec<Point> {
        match &cell.elements()[0].shape {
            Shape::Path { points, .. } => points.clone(),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn routes_to_downward_facing_pad() {
        let router = ManhattanRouter::new();
        let a = port("c0", 0., 0., Rotation::R180);
        let b = port("e1", -300., 1000., Rotation::R270);
        let routes = router.route_bundle("el", &[a], &[b], &params()).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(
            points(&routes[0]),
            [
                Point::new(0., 0.),
                Point::new(-50., 0.),
                Point::new(-300., 0.),
                Point::new(-300., 999.),
                Point::new(-300., 1000.),
            ]
        );
    }

    #[test]
    fn start_straights_are_staggered() {
        let router = ManhattanRouter::new();
        let starts = [
            port("c0", 0., 0., Rotation::R180),
            port("c1", 0., 20., Rotation::R180),
        ];
        let ends = [
            port("e1", -300., 1000., Rotation::R270),
            port("e2", -200., 1000., Rotation::R270),
        ];
        let routes = router
            .route_bundle("el", &starts, &ends, &params())
            .unwrap();
        assert_eq!(points(&routes[1])[1], Point::new(-65., 20.));
    }

    #[test]
    fn mismatched_lengths_fail() {
        let router = ManhattanRouter::new();
        let err = router
            .route_bundle("el", &[port("c0", 0., 0., Rotation::R0)], &[], &params())
            .unwrap_err();
        assert_eq!(err, RoutingError::LengthMismatch { starts: 1, ends: 0 });
    }

    #[test]
    fn coincident_ports_collide() {
        let router = ManhattanRouter::new();
        let starts = [
            port("c0", 0., 0., Rotation::R0),
            port("c1", 0., 0., Rotation::R0),
        ];
        let ends = [
            port("e1", 100., 100., Rotation::R270),
            port("e2", 200., 100., Rotation::R270),
        ];
        let err = router
            .route_bundle("el", &starts, &ends, &params())
            .unwrap_err();
        assert!(matches!(err, RoutingError::Collision { .. }));
    }

    #[test]
    fn width_mismatch_needs_allowance() {
        let router = ManhattanRouter::new();
        let a = Port::new(
            "o1",
            Point::zero(),
            Rotation::R180,
            0.5,
            METAL,
            PortKind::Optical,
        );
        let b = port("e1", -100., 100., Rotation::R0);
        let err = router.route_single("r", &a, &b, &params()).unwrap_err();
        assert!(matches!(err, RoutingError::Mismatch(_)));
        let params = BundleParams {
            allow_width_mismatch: true,
            ..params()
        };
        assert!(router.route_single("r", &a, &b, &params).is_ok());
    }

    #[test]
    fn sorting_pairs_ports_by_position() {
        let router = ManhattanRouter::new();
        let starts = [
            port("high", 0., 500., Rotation::R180),
            port("low", 0., 0., Rotation::R180),
        ];
        let ends = [
            port("g2", -500., 300., Rotation::R0),
            port("g1", -500., 200., Rotation::R0),
        ];
        let params = BundleParams {
            sort_ports: true,
            ..params()
        };
        let routes = router.route_bundle("opt", &starts, &ends, &params).unwrap();
        let first = points(&routes[0]);
        assert_eq!(first[0], Point::new(0., 0.));
        assert_eq!(first.last().copied(), Some(Point::new(-500., 200.)));
    }
}

//! Bundle routing between ordered port lists.

use std::sync::Arc;

use arcstr::ArcStr;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point;
use crate::layout::{Cell, LayerSpec, Port, PortMismatch};

pub mod manhattan;

pub use manhattan::ManhattanRouter;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("cannot pair {starts} start ports with {ends} end ports")]
    LengthMismatch { starts: usize, ends: usize },

    #[error("ports `{first}` and `{second}` collide at ({}, {})", .at.x, .at.y)]
    Collision {
        first: ArcStr,
        second: ArcStr,
        at: Point,
    },

    #[error(transparent)]
    Mismatch(#[from] PortMismatch),

    #[error("route {what} must be positive, got {value}")]
    Degenerate { what: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, RoutingError>;

/// Clearance and cross-section parameters for a routed bundle.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Debug))]
pub struct BundleParams {
    /// Center-to-center spacing between neighboring routes.
    pub separation: f64,
    /// Length of the straight leaving each start port.
    #[builder(default)]
    pub start_straight_length: f64,
    /// Length of the straight entering each end port.
    #[builder(default)]
    pub end_straight_length: f64,
    pub width: f64,
    pub layer: LayerSpec,
    #[builder(default)]
    pub allow_width_mismatch: bool,
    /// Pair ports by position instead of by list order.
    #[builder(default)]
    pub sort_ports: bool,
}

impl BundleParams {
    #[inline]
    pub fn builder() -> BundleParamsBuilder {
        BundleParamsBuilder::default()
    }
}

/// Connects `ports1[i]` to `ports2[i]` for every `i`.
///
/// Routers return one cell per route, drawn in the coordinate frame of the ports.
pub trait BundleRouter {
    fn route_bundle(
        &self,
        name: &str,
        ports1: &[Port],
        ports2: &[Port],
        params: &BundleParams,
    ) -> Result<Vec<Arc<Cell>>>;

    fn route_single(
        &self,
        name: &str,
        port1: &Port,
        port2: &Port,
        params: &BundleParams,
    ) -> Result<Arc<Cell>> {
        let routes = self.route_bundle(
            name,
            std::slice::from_ref(port1),
            std::slice::from_ref(port2),
            params,
        )?;
        routes
            .into_iter()
            .next()
            .ok_or(RoutingError::LengthMismatch { starts: 1, ends: 0 })
    }
}

//! Parametric layout generation for two-stage coupled-ring photonic ladders.
//!
//! A [`Ladder`](blocks::ladder::Ladder) is assembled by
//! [`LadderBuilder`](blocks::ladder::LadderBuilder) in a fixed sequence of phases:
//! ring pairs on a shared bus, four heaters over the rings, a phase line joining
//! the far buses, pad arrays, electrical and optical routing, and centering.
//! Shapes come from a [`PrimitiveFactory`](primitives::PrimitiveFactory) and
//! routes from a [`BundleRouter`](routing::BundleRouter).

pub mod blocks;
pub mod cli;
pub mod error;
pub mod export;
pub mod geometry;
pub mod layout;
pub mod paths;
pub mod placement;
pub mod plan;
pub mod primitives;
pub mod routing;

pub use error::{Error, ErrorContext, Phase, Result};

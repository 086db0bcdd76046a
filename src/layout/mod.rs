//! Cells, ports, and the contact ledger.

use arcstr::ArcStr;
use thiserror::Error;

pub mod cell;
pub mod layers;
pub mod ledger;
pub mod port;

pub use cell::{Cell, CellBuilder, Element, Instance};
pub use layers::LayerSpec;
pub use ledger::{LedgerError, PortLedger};
pub use port::{MismatchAllowance, MismatchKind, Port, PortKind, PortMismatch};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("cell `{cell}` has no port named `{port}`")]
    MissingPort { cell: ArcStr, port: ArcStr },

    #[error("cell `{cell}` already has a port named `{port}`")]
    DuplicatePort { cell: ArcStr, port: ArcStr },

    #[error(transparent)]
    Mismatch(#[from] PortMismatch),

    #[error("ports `{port}` and `{other}` are misaligned: {detail}")]
    Misaligned {
        port: ArcStr,
        other: ArcStr,
        detail: String,
    },

    #[error("{what} must be positive, got {value}")]
    Degenerate { what: &'static str, value: f64 },
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{self, LedgerError, PortMismatch};
use crate::placement::Slot;
use crate::routing::RoutingError;

/// A step of the ladder build, in execution order.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Phase {
    Configure,
    Rings,
    Heaters,
    PhaseLine,
    Pads,
    Routing,
    Centering,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Configure => "configuration",
            Phase::Rings => "ring placement",
            Phase::Heaters => "heater placement",
            Phase::PhaseLine => "phase line placement",
            Phase::Pads => "pad placement",
            Phase::Routing => "routing",
            Phase::Centering => "centering",
        };
        write!(f, "{name}")
    }
}

/// Where in the build an error occurred.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub phase: Phase,
    pub slot: Option<Slot>,
}

impl ErrorContext {
    pub fn phase(phase: Phase) -> Self {
        Self { phase, slot: None }
    }

    pub fn slot(phase: Phase, slot: Slot) -> Self {
        Self {
            phase,
            slot: Some(slot),
        }
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "during {}", self.phase)?;
        if let Some(slot) = self.slot {
            write!(f, " ({slot})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid geometry {context}: {detail}")]
    InvalidGeometry {
        context: ErrorContext,
        detail: String,
    },

    #[error("port contract violation {context}: {mismatch}")]
    PortContractViolation {
        context: ErrorContext,
        mismatch: PortMismatch,
    },

    #[error("routing failed {context}: {source}")]
    RoutingFailure {
        context: ErrorContext,
        #[source]
        source: RoutingError,
    },

    #[error("cannot start {requested}; next phase is {expected}")]
    PhaseOrder { requested: Phase, expected: Phase },

    #[error("layout error {context}: {source}")]
    Layout {
        context: ErrorContext,
        #[source]
        source: layout::Error,
    },

    #[error("contact ledger error {context}: {source}")]
    Ledger {
        context: ErrorContext,
        #[source]
        source: LedgerError,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_geometry(context: ErrorContext, detail: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            context,
            detail: detail.into(),
        }
    }

    /// The phase and slot the error was raised in, if any.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::InvalidGeometry { context, .. }
            | Error::PortContractViolation { context, .. }
            | Error::RoutingFailure { context, .. }
            | Error::Layout { context, .. }
            | Error::Ledger { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Attaches an [`ErrorContext`] to lower-level results.
pub(crate) trait WithContext<T> {
    fn within(self, context: ErrorContext) -> Result<T>;
}

impl<T> WithContext<T> for layout::Result<T> {
    fn within(self, context: ErrorContext) -> Result<T> {
        self.map_err(|err| match err {
            layout::Error::Mismatch(mismatch) => Error::PortContractViolation { context, mismatch },
            err @ (layout::Error::Degenerate { .. } | layout::Error::Misaligned { .. }) => {
                Error::invalid_geometry(context, err.to_string())
            }
            source => Error::Layout { context, source },
        })
    }
}

impl<T> WithContext<T> for std::result::Result<T, RoutingError> {
    fn within(self, context: ErrorContext) -> Result<T> {
        self.map_err(|err| match err {
            RoutingError::Mismatch(mismatch) => Error::PortContractViolation { context, mismatch },
            source => Error::RoutingFailure { context, source },
        })
    }
}

impl<T> WithContext<T> for std::result::Result<T, LedgerError> {
    fn within(self, context: ErrorContext) -> Result<T> {
        self.map_err(|source| Error::Ledger { context, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_names_phase_and_slot() {
        let context = ErrorContext::slot(Phase::Heaters, Slot::ALL[2]);
        assert_eq!(
            context.to_string(),
            "during heater placement (stage 1 ring 0)"
        );
        assert_eq!(
            ErrorContext::phase(Phase::Routing).to_string(),
            "during routing"
        );
    }

    #[test]
    fn layout_errors_are_classified() {
        let context = ErrorContext::phase(Phase::PhaseLine);
        let degenerate: layout::Result<()> = Err(layout::Error::Degenerate {
            what: "straight length",
            value: -4.,
        });
        let err = degenerate.within(context).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry { .. }));
        assert_eq!(err.context(), Some(&context));

        let missing: layout::Result<()> = Err(layout::Error::MissingPort {
            cell: "pads".into(),
            port: "e11".into(),
        });
        assert!(matches!(
            missing.within(context).unwrap_err(),
            Error::Layout { .. }
        ));
    }

    #[test]
    fn router_mismatch_is_a_port_contract_violation() {
        let context = ErrorContext::phase(Phase::Routing);
        let mismatch = PortMismatch {
            port: "e3".into(),
            other: "e1".into(),
            kind: layout::MismatchKind::Width {
                expected: 10.,
                found: 4.,
            },
        };
        let routed: std::result::Result<(), RoutingError> =
            Err(RoutingError::Mismatch(mismatch.clone()));
        match routed.within(context).unwrap_err() {
            Error::PortContractViolation {
                context: found,
                mismatch: reported,
            } => {
                assert_eq!(found, context);
                assert_eq!(reported, mismatch);
            }
            other => panic!("unexpected error {other}"),
        }

        let collided: std::result::Result<(), RoutingError> =
            Err(RoutingError::LengthMismatch { starts: 2, ends: 1 });
        assert!(matches!(
            collided.within(context).unwrap_err(),
            Error::RoutingFailure { .. }
        ));
    }
}

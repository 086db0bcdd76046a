//! Ordered bookkeeping of the contacts exposed while building a device.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::port::Port;
use crate::geometry::{Transform, Transformation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("cannot insert electrical contacts at index {index}; ledger holds {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("swapping the last two pairs needs at least 4 electrical contacts; ledger holds {len}")]
    TooFewContacts { len: usize },
}

/// Electrical and optical contacts in the order they will be routed.
///
/// Contacts are only ever appended, except for [`PortLedger::insert_electrical_at`]
/// and [`PortLedger::swap_last_pairs`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortLedger {
    electrical: Vec<Port>,
    optical: Vec<Port>,
}

impl PortLedger {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn electrical(&self) -> &[Port] {
        &self.electrical
    }

    #[inline]
    pub fn optical(&self) -> &[Port] {
        &self.optical
    }

    pub fn append_electrical(&mut self, port: Port) {
        self.electrical.push(port);
    }

    pub fn append_optical(&mut self, port: Port) {
        self.optical.push(port);
    }

    /// Splices `ports` into the electrical list so the first of them lands at `index`.
    pub fn insert_electrical_at(
        &mut self,
        index: usize,
        ports: impl IntoIterator<Item = Port>,
    ) -> Result<(), LedgerError> {
        let len = self.electrical.len();
        if index > len {
            return Err(LedgerError::IndexOutOfRange { index, len });
        }
        self.electrical.splice(index..index, ports);
        Ok(())
    }

    /// Exchanges the final two contiguous pairs of electrical contacts.
    ///
    /// `[.., a, b, c, d]` becomes `[.., c, d, a, b]`. Applying it twice is a no-op.
    pub fn swap_last_pairs(&mut self) -> Result<(), LedgerError> {
        let len = self.electrical.len();
        if len < 4 {
            return Err(LedgerError::TooFewContacts { len });
        }
        self.electrical[len - 4..].rotate_left(2);
        Ok(())
    }

    /// Moves every recorded contact by `trans`.
    pub fn transform_mut(&mut self, trans: &Transformation) {
        for port in self.electrical.iter_mut().chain(self.optical.iter_mut()) {
            *port = port.transform(trans);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rotation};
    use crate::layout::{LayerSpec, PortKind};

    fn contact(name: &str) -> Port {
        Port::new(
            name,
            Point::zero(),
            Rotation::R180,
            10.,
            LayerSpec(12, 0),
            PortKind::Electrical,
        )
    }

    fn names(ledger: &PortLedger) -> Vec<&str> {
        ledger.electrical().iter().map(|p| p.name().as_str()).collect()
    }

    fn filled(names: &[&str]) -> PortLedger {
        let mut ledger = PortLedger::new();
        for name in names {
            ledger.append_electrical(contact(name));
        }
        ledger
    }

    #[test]
    fn appends_preserve_order() {
        let ledger = filled(&["a", "b", "c"]);
        assert_eq!(names(&ledger), ["a", "b", "c"]);
        assert!(ledger.optical().is_empty());
    }

    #[test]
    fn swap_last_pairs_exchanges_pairs() {
        let mut ledger = filled(&["a0", "a1", "b0", "b1", "c0", "c1", "d0", "d1"]);
        ledger.swap_last_pairs().unwrap();
        assert_eq!(
            names(&ledger),
            ["a0", "a1", "b0", "b1", "d0", "d1", "c0", "c1"]
        );
    }

    #[test]
    fn swap_last_pairs_twice_restores_order() {
        let original = filled(&["a0", "a1", "b0", "b1", "c0", "c1", "d0", "d1"]);
        let mut ledger = original.clone();
        ledger.swap_last_pairs().unwrap();
        assert_ne!(ledger, original);
        ledger.swap_last_pairs().unwrap();
        assert_eq!(ledger, original);
    }

    #[test]
    fn swap_needs_two_pairs() {
        let mut ledger = filled(&["a", "b", "c"]);
        assert_eq!(
            ledger.swap_last_pairs(),
            Err(LedgerError::TooFewContacts { len: 3 })
        );
        assert_eq!(names(&ledger), ["a", "b", "c"]);
    }

    #[test]
    fn insert_splices_at_index() {
        let mut ledger = filled(&["a", "b", "c", "d", "e", "f"]);
        ledger
            .insert_electrical_at(4, [contact("x"), contact("y")])
            .unwrap();
        assert_eq!(names(&ledger), ["a", "b", "c", "d", "x", "y", "e", "f"]);
        ledger.insert_electrical_at(8, [contact("z")]).unwrap();
        assert_eq!(names(&ledger).last(), Some(&"z"));
    }

    #[test]
    fn insert_past_end_fails() {
        let mut ledger = filled(&["a"]);
        assert_eq!(
            ledger.insert_electrical_at(2, [contact("x")]),
            Err(LedgerError::IndexOutOfRange { index: 2, len: 1 })
        );
    }
}

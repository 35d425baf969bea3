//! Ordered collection of operations for one portfolio.
//!
//! Refs are allocated by a simple incrementing counter starting at 0 per
//! ledger instance; removing an entry never reclaims or renumbers refs.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::warn;

use super::error::FolioError;
use super::operation::{Operation, RawOperation};
use crate::ports::position_port::PositionStore;
use crate::ports::resolver_port::SecurityResolver;

#[derive(Debug, Default)]
pub struct OperationLedger {
    // Keyed by ref; ref order is insertion order.
    operations: BTreeMap<u64, Operation>,
    next_ref: u64,
}

impl OperationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct and insert an operation, returning its ref. With
    /// `apply_immediately` the position-store effect runs synchronously
    /// before returning. A failed parse consumes no ref.
    pub fn add(
        &mut self,
        raw: &RawOperation,
        default_vat: f64,
        apply_immediately: bool,
        resolver: &dyn SecurityResolver,
        store: &mut dyn PositionStore,
    ) -> Result<u64, FolioError> {
        let op_ref = self.next_ref;
        let mut op = Operation::new(raw, default_vat, op_ref, resolver)?;
        if apply_immediately {
            op.apply(store);
        }
        self.operations.insert(op_ref, op);
        self.next_ref += 1;
        Ok(op_ref)
    }

    /// Remove an operation. With `undo_first` the inverse effect runs
    /// before removal.
    ///
    /// Precondition: `undo_first` must only be used on operations that
    /// were actually applied; undoing a never-applied operation mutates
    /// the store as if the apply had happened.
    pub fn remove(
        &mut self,
        op_ref: u64,
        undo_first: bool,
        store: &mut dyn PositionStore,
    ) -> Result<Operation, FolioError> {
        let op = self
            .operations
            .remove(&op_ref)
            .ok_or(FolioError::NoSuchOperation(op_ref))?;
        if undo_first {
            op.undo(store);
        }
        Ok(op)
    }

    pub fn get(&self, op_ref: u64) -> Option<&Operation> {
        self.operations.get(&op_ref)
    }

    /// Mutable access for legacy-row corrections (`set_kind`/`set_date`).
    pub fn get_mut(&mut self, op_ref: u64) -> Option<&mut Operation> {
        self.operations.get_mut(&op_ref)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations in non-decreasing date order; equal dates keep their
    /// insertion (ref) order. The sort is stable, not by-ref.
    pub fn list(&self) -> Vec<&Operation> {
        let mut ops: Vec<&Operation> = self.operations.values().collect();
        ops.sort_by_key(|op| op.date());
        ops
    }

    /// Replay every position-applicable operation in date order. With a
    /// cutoff, only operations dated on or before it are applied.
    pub fn apply_all(&mut self, store: &mut dyn PositionStore, cutoff: Option<NaiveDate>) {
        let mut refs: Vec<(NaiveDate, u64)> = self
            .operations
            .values()
            .map(|op| (op.date(), op.op_ref()))
            .collect();
        refs.sort();
        for (date, op_ref) in refs {
            if let Some(cutoff) = cutoff {
                if date > cutoff {
                    continue;
                }
            }
            let op = self
                .operations
                .get_mut(&op_ref)
                .expect("ref collected above");
            if op.kind().applies_to_position() {
                op.apply(store);
            }
        }
    }

    /// Load persisted rows. A malformed row is skipped with a warning;
    /// loading continues for the remaining rows. Returns the number of
    /// operations loaded.
    pub fn load_rows(
        &mut self,
        rows: &[Vec<String>],
        default_vat: f64,
        resolver: &dyn SecurityResolver,
        store: &mut dyn PositionStore,
    ) -> usize {
        let mut loaded = 0;
        for row in rows {
            let Some(raw) = RawOperation::from_fields(row) else {
                warn!(fields = row.len(), "skipping short operation row");
                continue;
            };
            match self.add(&raw, default_vat, false, resolver, store) {
                Ok(_) => loaded += 1,
                Err(err) => warn!(%err, "skipping malformed operation row"),
            }
        }
        loaded
    }

    /// All operations as persisted rows, in date order.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.list().into_iter().map(Operation::to_row).collect()
    }
}

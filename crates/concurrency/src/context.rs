//! Execution context for one unit of work
//!
//! The context records which physical transaction is currently bound for a
//! request, task, or thread of control. It replaces hidden thread-local state:
//! callers pass it explicitly to every `begin`/`commit`/`rollback`.
//!
//! # Ownership
//!
//! A context is mutated only by the unit of work that owns it, so it needs no
//! internal locking. Suspended transactions are not stored here; the handle
//! that suspended one carries it and gives it back on completion.

use std::sync::Arc;
use txnest_core::TransactionId;

use crate::transaction::PhysicalTransaction;

/// Per-unit-of-work transaction state
#[derive(Debug)]
pub struct ExecutionContext<T> {
    /// Physical transaction currently bound, if any
    active: Option<Arc<PhysicalTransaction<T>>>,
    /// Handles issued and not yet completed
    logical_depth: usize,
    /// Physical transactions currently suspended by outstanding handles
    suspended_count: usize,
}

impl<T> ExecutionContext<T> {
    /// Create an empty context
    pub fn new() -> Self {
        ExecutionContext {
            active: None,
            logical_depth: 0,
            suspended_count: 0,
        }
    }

    /// Whether a physical transaction is bound
    pub fn has_transaction(&self) -> bool {
        self.active.is_some()
    }

    /// Currently bound physical transaction
    pub fn current(&self) -> Option<&Arc<PhysicalTransaction<T>>> {
        self.active.as_ref()
    }

    /// Id of the currently bound physical transaction
    pub fn current_transaction_id(&self) -> Option<TransactionId> {
        self.active.as_ref().map(|tx| tx.id())
    }

    /// Whether the bound transaction is marked rollback-only
    pub fn is_rollback_only(&self) -> bool {
        self.active
            .as_ref()
            .map_or(false, |tx| tx.is_rollback_only())
    }

    /// Number of outstanding handles
    pub fn logical_depth(&self) -> usize {
        self.logical_depth
    }

    /// Number of suspended physical transactions
    pub fn suspended_count(&self) -> usize {
        self.suspended_count
    }

    /// Whether the context holds no state at all
    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.logical_depth == 0 && self.suspended_count == 0
    }

    pub(crate) fn enter(&mut self) {
        self.logical_depth += 1;
    }

    pub(crate) fn leave(&mut self) {
        self.logical_depth = self.logical_depth.saturating_sub(1);
    }

    pub(crate) fn bind(&mut self, transaction: Arc<PhysicalTransaction<T>>) {
        self.active = Some(transaction);
    }

    /// Unbind the current transaction and hand it to the caller
    pub(crate) fn suspend(&mut self) -> Option<Arc<PhysicalTransaction<T>>> {
        let suspended = self.active.take();
        if suspended.is_some() {
            self.suspended_count += 1;
        }
        suspended
    }

    /// Rebind a previously suspended transaction, or clear the slot
    pub(crate) fn resume(&mut self, suspended: Option<Arc<PhysicalTransaction<T>>>) {
        if suspended.is_some() {
            self.suspended_count = self.suspended_count.saturating_sub(1);
        }
        self.active = suspended;
    }
}

impl<T> Default for ExecutionContext<T> {
    fn default() -> Self {
        Self::new()
    }
}

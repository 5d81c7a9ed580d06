//! Physical transactions and logical transaction handles
//!
//! A [`PhysicalTransaction`] is one real transaction on the resource. It is
//! shared (behind an `Arc`) between the execution context that binds it and
//! every handle participating in it, which is how a rollback-only mark set by
//! an inner participant becomes visible to the handle that owns the commit.
//!
//! A [`TransactionHandle`] is the result of one `begin` call. Completing it
//! through the coordinator consumes it, so a handle cannot be committed or
//! rolled back twice.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use txnest_core::{Propagation, TransactionDefinition, TransactionId};

/// Status of a physical transaction
///
/// State transitions:
/// - `Open` → `Committed` (resource commit succeeded)
/// - `Open` → `RolledBack` (resource rollback succeeded)
/// - `Open` → `Failed` (resource reported an error while completing)
///
/// Terminal states (no transitions allowed):
/// - `Committed`
/// - `RolledBack`
/// - `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalStatus {
    /// Transaction is open on the resource
    Open,
    /// Transaction committed
    Committed,
    /// Transaction rolled back
    RolledBack,
    /// Resource failed while completing; outcome is owned by the resource
    Failed,
}

impl PhysicalStatus {
    /// Whether no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PhysicalStatus::Open)
    }
}

/// One physical transaction on the resource
pub struct PhysicalTransaction<T> {
    id: TransactionId,
    token: T,
    name: Option<String>,
    read_only: bool,
    /// Global rollback-only flag; set by participants, never cleared
    rollback_only: AtomicBool,
    status: Mutex<PhysicalStatus>,
}

impl<T> PhysicalTransaction<T> {
    pub(crate) fn new(id: TransactionId, token: T, definition: &TransactionDefinition) -> Self {
        PhysicalTransaction {
            id,
            token,
            name: definition.name.clone(),
            read_only: definition.read_only,
            rollback_only: AtomicBool::new(false),
            status: Mutex::new(PhysicalStatus::Open),
        }
    }

    /// Transaction id
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Resource token
    pub fn token(&self) -> &T {
        &self.token
    }

    /// Name from the definition that opened it
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Read-only hint from the definition that opened it
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether any participant marked this transaction rollback-only
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.load(Ordering::SeqCst)
    }

    /// Current status
    pub fn status(&self) -> PhysicalStatus {
        *self.status.lock()
    }

    /// Whether the transaction is still open on the resource
    pub fn is_open(&self) -> bool {
        self.status() == PhysicalStatus::Open
    }

    pub(crate) fn set_rollback_only(&self) {
        self.rollback_only.store(true, Ordering::SeqCst);
    }

    /// Move to a terminal status
    ///
    /// Returns false (and leaves the status alone) if already terminal.
    pub(crate) fn finish(&self, outcome: PhysicalStatus) -> bool {
        let mut status = self.status.lock();
        if status.is_terminal() {
            return false;
        }
        *status = outcome;
        true
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PhysicalTransaction<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalTransaction")
            .field("id", &self.id)
            .field("token", &self.token)
            .field("name", &self.name)
            .field("read_only", &self.read_only)
            .field("rollback_only", &self.is_rollback_only())
            .field("status", &self.status())
            .finish()
    }
}

/// Result of one `begin` call
///
/// Three shapes exist:
/// - **new**: this call opened the physical transaction and owns its outcome
/// - **participating**: joined an existing transaction; completion only
///   affects bookkeeping
/// - **empty**: no transaction (`Supports`, `NotSupported`, `Never`)
///
/// Handles that suspended a transaction (`RequiresNew`, `NotSupported`) carry
/// it and restore it to the context when they complete.
#[must_use = "a transaction handle must be committed or rolled back"]
#[derive(Debug)]
pub struct TransactionHandle<T> {
    pub(crate) transaction: Option<Arc<PhysicalTransaction<T>>>,
    pub(crate) new_transaction: bool,
    pub(crate) propagation: Propagation,
    pub(crate) read_only: bool,
    pub(crate) local_rollback_only: bool,
    pub(crate) suspended: Option<Arc<PhysicalTransaction<T>>>,
    /// Whether completing this handle rebinds the context slot
    pub(crate) restores_context: bool,
}

impl<T> TransactionHandle<T> {
    pub(crate) fn new_physical(
        transaction: Arc<PhysicalTransaction<T>>,
        definition: &TransactionDefinition,
        suspended: Option<Arc<PhysicalTransaction<T>>>,
    ) -> Self {
        TransactionHandle {
            transaction: Some(transaction),
            new_transaction: true,
            propagation: definition.propagation,
            read_only: definition.read_only,
            local_rollback_only: false,
            suspended,
            restores_context: true,
        }
    }

    pub(crate) fn participating(
        transaction: Arc<PhysicalTransaction<T>>,
        definition: &TransactionDefinition,
    ) -> Self {
        TransactionHandle {
            transaction: Some(transaction),
            new_transaction: false,
            propagation: definition.propagation,
            read_only: definition.read_only,
            local_rollback_only: false,
            suspended: None,
            restores_context: false,
        }
    }

    pub(crate) fn empty(
        definition: &TransactionDefinition,
        suspended: Option<Arc<PhysicalTransaction<T>>>,
    ) -> Self {
        TransactionHandle {
            transaction: None,
            new_transaction: false,
            propagation: definition.propagation,
            read_only: definition.read_only,
            local_rollback_only: false,
            restores_context: definition.propagation.suspends_existing(),
            suspended,
        }
    }

    /// Id of the physical transaction this handle opened or joined
    pub fn id(&self) -> Option<TransactionId> {
        self.transaction.as_ref().map(|tx| tx.id())
    }

    /// Whether this call opened the physical transaction
    pub fn is_new_transaction(&self) -> bool {
        self.new_transaction
    }

    /// Whether this handle runs inside a physical transaction
    pub fn has_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Whether this handle joined a transaction opened by an outer handle
    pub fn is_participating(&self) -> bool {
        self.transaction.is_some() && !self.new_transaction
    }

    /// Policy requested at `begin`
    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    /// Read-only hint requested at `begin`
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Physical transaction this handle opened or joined
    pub fn transaction(&self) -> Option<&Arc<PhysicalTransaction<T>>> {
        self.transaction.as_ref()
    }

    /// Whether this handle suspended an outer transaction
    pub fn has_suspended(&self) -> bool {
        self.suspended.is_some()
    }

    /// Mark this handle rollback-only
    ///
    /// A later `commit` of this handle takes the rollback path instead.
    pub fn set_rollback_only(&mut self) {
        self.local_rollback_only = true;
    }

    /// Whether this handle itself was marked rollback-only
    pub fn is_local_rollback_only(&self) -> bool {
        self.local_rollback_only
    }

    /// Whether the shared physical transaction was marked rollback-only
    pub fn is_global_rollback_only(&self) -> bool {
        self.transaction
            .as_ref()
            .map_or(false, |tx| tx.is_rollback_only())
    }

    /// Whether a commit of this handle would take the rollback path
    pub fn is_rollback_only(&self) -> bool {
        self.is_local_rollback_only() || self.is_global_rollback_only()
    }
}

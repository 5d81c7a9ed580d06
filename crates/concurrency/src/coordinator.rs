//! Transaction coordinator for nested transaction requests
//!
//! Maps logically nested `begin` calls onto physical transactions of a single
//! resource and decides, at completion, whether the resource is touched or
//! only the bookkeeping changes.
//!
//! ## Begin
//!
//! ```text
//! bound transaction?  propagation            result
//! ------------------  ---------------------  ----------------------------------
//! no                  Required/RequiresNew   open physical, handle is new
//! no                  Supports/NotSupp/Never empty handle
//! no                  Mandatory              IllegalState
//! yes                 Required/Supports/Man  join, handle is participating
//! yes                 RequiresNew            suspend, open physical, new
//! yes                 NotSupported           suspend, empty handle
//! yes                 Never                  IllegalState
//! ```
//!
//! ## Commit
//!
//! 1. Rollback-only (local or shared) → rollback path, then `UnexpectedRollback`
//!    if the handle owns the physical transaction
//! 2. New handle → resource commit
//! 3. Participating handle → deferred to the owner, no resource call
//! 4. Completed handle restores whatever it suspended
//!
//! ## Rollback
//!
//! 1. New handle → resource rollback
//! 2. Participating handle → mark the shared transaction rollback-only
//! 3. Completed handle restores whatever it suspended
//!
//! The context is cleaned up even when the resource fails, so an execution
//! context never stays bound to a dead transaction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use txnest_core::{
    PhysicalResource, Propagation, ResourceOperation, TransactionDefinition, TransactionError,
    TransactionId, TxResult,
};

use crate::config::CoordinatorConfig;
use crate::context::ExecutionContext;
use crate::transaction::{PhysicalStatus, PhysicalTransaction, TransactionHandle};

/// Handle type produced by a coordinator over resource `R`
pub type HandleOf<R> = TransactionHandle<<R as PhysicalResource>::Token>;

/// Execution context type used with a coordinator over resource `R`
pub type ContextOf<R> = ExecutionContext<<R as PhysicalResource>::Token>;

/// Nested transaction coordinator
///
/// Wraps one physical resource. All methods take `&self`; share the
/// coordinator across threads with an `Arc` and give every unit of work its
/// own [`ExecutionContext`].
///
/// # Memory Ordering
///
/// The metric counters use Relaxed ordering: they are observational only and
/// synchronize nothing. Transaction ids use SeqCst.
pub struct TransactionCoordinator<R: PhysicalResource> {
    /// Physical resource
    resource: R,
    /// Behavior switches
    config: CoordinatorConfig,
    /// Next physical transaction id
    next_txn_id: AtomicU64,
    /// Physical transactions currently open
    active_count: AtomicU64,
    /// Physical transactions opened
    total_started: AtomicU64,
    /// Physical transactions committed
    total_committed: AtomicU64,
    /// Physical transactions rolled back (including failed completions)
    total_rolled_back: AtomicU64,
    /// Handles that joined an existing transaction
    total_participations: AtomicU64,
    /// Transactions suspended by RequiresNew / NotSupported
    total_suspensions: AtomicU64,
    /// Commits that ended in UnexpectedRollback
    total_unexpected_rollbacks: AtomicU64,
}

impl<R: PhysicalResource> TransactionCoordinator<R> {
    /// Create a coordinator with the default configuration
    pub fn new(resource: R) -> Self {
        Self::with_config(resource, CoordinatorConfig::default())
    }

    /// Create a coordinator with an explicit configuration
    pub fn with_config(resource: R, config: CoordinatorConfig) -> Self {
        TransactionCoordinator {
            resource,
            config,
            next_txn_id: AtomicU64::new(1),
            active_count: AtomicU64::new(0),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_rolled_back: AtomicU64::new(0),
            total_participations: AtomicU64::new(0),
            total_suspensions: AtomicU64::new(0),
            total_unexpected_rollbacks: AtomicU64::new(0),
        }
    }

    /// Configuration in effect
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Wrapped resource
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Fresh execution context for one unit of work
    pub fn new_context(&self) -> ContextOf<R> {
        ExecutionContext::new()
    }

    // === Begin ===

    /// Begin a logical transaction with the configured default propagation
    ///
    /// # Errors
    ///
    /// See [`begin`](Self::begin).
    pub fn begin_default(&self, ctx: &mut ContextOf<R>) -> TxResult<HandleOf<R>, R::Error> {
        let definition = TransactionDefinition::new(self.config.default_propagation);
        self.begin(ctx, &definition)
    }

    /// Begin a logical transaction
    ///
    /// # Errors
    /// - `IllegalState` for `Mandatory` without a bound transaction, `Never`
    ///   with one, or a failed read-only validation
    /// - `Resource` if the resource cannot open a physical transaction; any
    ///   suspended transaction is rebound first
    pub fn begin(
        &self,
        ctx: &mut ContextOf<R>,
        definition: &TransactionDefinition,
    ) -> TxResult<HandleOf<R>, R::Error> {
        let existing = ctx.current().cloned();
        let handle = match existing {
            Some(existing) => self.begin_with_existing(ctx, definition, existing)?,
            None => self.begin_without_existing(ctx, definition)?,
        };
        ctx.enter();
        Ok(handle)
    }

    fn begin_without_existing(
        &self,
        ctx: &mut ContextOf<R>,
        definition: &TransactionDefinition,
    ) -> TxResult<HandleOf<R>, R::Error> {
        match definition.propagation {
            Propagation::Mandatory => Err(TransactionError::illegal_state(
                "no existing transaction found for transaction marked with propagation 'mandatory'",
            )),
            Propagation::Required | Propagation::RequiresNew => {
                let transaction = self.open_physical(definition)?;
                ctx.bind(Arc::clone(&transaction));
                Ok(TransactionHandle::new_physical(transaction, definition, None))
            }
            Propagation::Supports | Propagation::NotSupported | Propagation::Never => {
                debug!(
                    target: "txnest::txn",
                    propagation = %definition.propagation,
                    "Running without transaction"
                );
                Ok(TransactionHandle::empty(definition, None))
            }
        }
    }

    fn begin_with_existing(
        &self,
        ctx: &mut ContextOf<R>,
        definition: &TransactionDefinition,
        existing: Arc<PhysicalTransaction<R::Token>>,
    ) -> TxResult<HandleOf<R>, R::Error> {
        match definition.propagation {
            Propagation::Never => Err(TransactionError::illegal_state(format!(
                "existing transaction {} found for transaction marked with propagation 'never'",
                existing.id()
            ))),
            Propagation::NotSupported => {
                let suspended = self.suspend(ctx);
                Ok(TransactionHandle::empty(definition, suspended))
            }
            Propagation::RequiresNew => {
                let suspended = self.suspend(ctx);
                match self.open_physical(definition) {
                    Ok(transaction) => {
                        ctx.bind(Arc::clone(&transaction));
                        Ok(TransactionHandle::new_physical(
                            transaction,
                            definition,
                            suspended,
                        ))
                    }
                    Err(e) => {
                        self.resume(ctx, suspended);
                        Err(e)
                    }
                }
            }
            Propagation::Required | Propagation::Supports | Propagation::Mandatory => {
                if self.config.validate_existing_transaction
                    && !definition.read_only
                    && existing.is_read_only()
                {
                    return Err(TransactionError::illegal_state(format!(
                        "participating transaction is not marked as read-only but existing transaction {} is",
                        existing.id()
                    )));
                }
                self.total_participations.fetch_add(1, Ordering::Relaxed);
                debug!(
                    target: "txnest::txn",
                    txn_id = %existing.id(),
                    propagation = %definition.propagation,
                    "Participating in existing transaction"
                );
                Ok(TransactionHandle::participating(existing, definition))
            }
        }
    }

    // === Commit ===

    /// Commit a logical transaction
    ///
    /// # Errors
    /// - `UnexpectedRollback` if the handle owns a transaction that was marked
    ///   rollback-only; the physical rollback has already happened
    /// - `Resource` if the resource fails to commit (or to roll back on the
    ///   rollback-only path); the context is cleaned up regardless
    pub fn commit(&self, ctx: &mut ContextOf<R>, handle: HandleOf<R>) -> TxResult<(), R::Error> {
        if handle.is_local_rollback_only() {
            debug!(
                target: "txnest::txn",
                txn_id = ?handle.id(),
                "Transactional code has requested rollback"
            );
            return self.process_rollback(ctx, handle, true);
        }
        if handle.is_global_rollback_only() {
            debug!(
                target: "txnest::txn",
                txn_id = ?handle.id(),
                "Global transaction is marked as rollback-only but transactional code requested commit"
            );
            return self.process_rollback(ctx, handle, true);
        }
        self.process_commit(ctx, handle)
    }

    fn process_commit(
        &self,
        ctx: &mut ContextOf<R>,
        mut handle: HandleOf<R>,
    ) -> TxResult<(), R::Error> {
        let outcome = match handle.transaction.clone() {
            Some(transaction) if handle.new_transaction => self.commit_physical(&transaction),
            Some(transaction) => {
                debug!(
                    target: "txnest::txn",
                    txn_id = %transaction.id(),
                    "Participating transaction commit deferred to outer transaction"
                );
                Ok(())
            }
            None => Ok(()),
        };
        self.complete(ctx, &mut handle);
        outcome
    }

    fn commit_physical(&self, transaction: &PhysicalTransaction<R::Token>) -> TxResult<(), R::Error> {
        match self.resource.commit(transaction.token()) {
            Ok(()) => {
                transaction.finish(PhysicalStatus::Committed);
                self.record_finish(&self.total_committed);
                info!(target: "txnest::txn", txn_id = %transaction.id(), "Committed physical transaction");
                Ok(())
            }
            Err(source) => {
                error!(
                    target: "txnest::txn",
                    txn_id = %transaction.id(),
                    error = %source,
                    "Physical commit failed"
                );
                if self.config.rollback_on_commit_failure {
                    self.rollback_after_commit_failure(transaction);
                } else {
                    transaction.finish(PhysicalStatus::Failed);
                }
                self.record_finish(&self.total_rolled_back);
                Err(TransactionError::resource(ResourceOperation::Commit, source))
            }
        }
    }

    /// Best effort: the commit error is what the caller sees
    fn rollback_after_commit_failure(&self, transaction: &PhysicalTransaction<R::Token>) {
        match self.resource.rollback(transaction.token()) {
            Ok(()) => {
                transaction.finish(PhysicalStatus::RolledBack);
                info!(
                    target: "txnest::txn",
                    txn_id = %transaction.id(),
                    "Rolled back physical transaction after commit failure"
                );
            }
            Err(e) => {
                transaction.finish(PhysicalStatus::Failed);
                error!(
                    target: "txnest::txn",
                    txn_id = %transaction.id(),
                    error = %e,
                    "Rollback after commit failure also failed"
                );
            }
        }
    }

    // === Rollback ===

    /// Roll back a logical transaction
    ///
    /// Participating handles never reach the resource; they mark the shared
    /// transaction rollback-only and return normally.
    ///
    /// # Errors
    /// - `Resource` if the resource fails to roll back a transaction this
    ///   handle owns; the context is cleaned up regardless
    pub fn rollback(&self, ctx: &mut ContextOf<R>, handle: HandleOf<R>) -> TxResult<(), R::Error> {
        self.process_rollback(ctx, handle, false)
    }

    fn process_rollback(
        &self,
        ctx: &mut ContextOf<R>,
        mut handle: HandleOf<R>,
        unexpected: bool,
    ) -> TxResult<(), R::Error> {
        let transaction = handle.transaction.clone();
        let outcome = match &transaction {
            Some(tx) if handle.new_transaction => self.rollback_physical(tx),
            Some(tx) => {
                if handle.local_rollback_only || self.config.global_rollback_on_participation_failure {
                    tx.set_rollback_only();
                    debug!(
                        target: "txnest::txn",
                        txn_id = %tx.id(),
                        "Participating transaction failed - marking existing transaction as rollback-only"
                    );
                } else {
                    debug!(
                        target: "txnest::txn",
                        txn_id = %tx.id(),
                        "Participating transaction failed - letting transaction originator decide on rollback"
                    );
                }
                Ok(())
            }
            None => {
                debug!(
                    target: "txnest::txn",
                    propagation = %handle.propagation,
                    "Should roll back transaction but cannot - no transaction available"
                );
                Ok(())
            }
        };

        let raise = unexpected
            && (handle.new_transaction
                || (handle.has_transaction() && self.config.fail_early_on_global_rollback_only));
        self.complete(ctx, &mut handle);
        outcome?;

        match transaction {
            Some(tx) if raise => Err(self.unexpected_rollback(tx.id())),
            _ => Ok(()),
        }
    }

    fn rollback_physical(&self, transaction: &PhysicalTransaction<R::Token>) -> TxResult<(), R::Error> {
        let result = self.resource.rollback(transaction.token());
        self.record_finish(&self.total_rolled_back);
        match result {
            Ok(()) => {
                transaction.finish(PhysicalStatus::RolledBack);
                info!(target: "txnest::txn", txn_id = %transaction.id(), "Rolled back physical transaction");
                Ok(())
            }
            Err(source) => {
                transaction.finish(PhysicalStatus::Failed);
                error!(
                    target: "txnest::txn",
                    txn_id = %transaction.id(),
                    error = %source,
                    "Physical rollback failed"
                );
                Err(TransactionError::resource(ResourceOperation::Rollback, source))
            }
        }
    }

    fn unexpected_rollback(&self, transaction: TransactionId) -> TransactionError<R::Error> {
        self.total_unexpected_rollbacks.fetch_add(1, Ordering::Relaxed);
        warn!(
            target: "txnest::txn",
            txn_id = %transaction,
            "Transaction rolled back because it has been marked as rollback-only"
        );
        TransactionError::UnexpectedRollback { transaction }
    }

    // === Template ===

    /// Run `work` inside a logical transaction
    ///
    /// Commits when `work` returns `Ok`, rolls back when it returns `Err`.
    /// The closure receives the context (for nested `begin` calls) and the
    /// handle (to call `set_rollback_only`).
    ///
    /// # Errors
    ///
    /// Returns the closure's error, a coordinator error converted into `E`,
    /// or, if the rollback after a closure error fails, the rollback error.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let total = coordinator.execute(&mut ctx, &TransactionDefinition::required(), |ctx, _tx| {
    ///     coordinator.execute(ctx, &TransactionDefinition::requires_new(), |_, _| write_audit())?;
    ///     place_order()
    /// })?;
    /// ```
    pub fn execute<T, E, F>(
        &self,
        ctx: &mut ContextOf<R>,
        definition: &TransactionDefinition,
        work: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&mut ContextOf<R>, &mut HandleOf<R>) -> Result<T, E>,
        E: From<TransactionError<R::Error>>,
    {
        let mut handle = self.begin(ctx, definition)?;
        match work(ctx, &mut handle) {
            Ok(value) => {
                self.commit(ctx, handle)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback(ctx, handle) {
                    error!(
                        target: "txnest::txn",
                        error = %rollback_err,
                        "Application error overridden by rollback error"
                    );
                    return Err(rollback_err.into());
                }
                Err(err)
            }
        }
    }

    // === Internals ===

    fn open_physical(
        &self,
        definition: &TransactionDefinition,
    ) -> TxResult<Arc<PhysicalTransaction<R::Token>>, R::Error> {
        let id = TransactionId::new(self.next_txn_id.fetch_add(1, Ordering::SeqCst));
        let token = self.resource.open(definition).map_err(|source| {
            error!(
                target: "txnest::txn",
                txn_id = %id,
                error = %source,
                "Failed to open physical transaction"
            );
            TransactionError::resource(ResourceOperation::Open, source)
        })?;

        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
        debug!(
            target: "txnest::txn",
            txn_id = %id,
            propagation = %definition.propagation,
            name = definition.name.as_deref().unwrap_or(""),
            read_only = definition.read_only,
            "Opened physical transaction"
        );

        Ok(Arc::new(PhysicalTransaction::new(id, token, definition)))
    }

    fn suspend(&self, ctx: &mut ContextOf<R>) -> Option<Arc<PhysicalTransaction<R::Token>>> {
        let suspended = ctx.suspend();
        if let Some(tx) = &suspended {
            self.total_suspensions.fetch_add(1, Ordering::Relaxed);
            debug!(target: "txnest::txn", txn_id = %tx.id(), "Suspended current transaction");
        }
        suspended
    }

    fn resume(
        &self,
        ctx: &mut ContextOf<R>,
        suspended: Option<Arc<PhysicalTransaction<R::Token>>>,
    ) {
        if let Some(tx) = &suspended {
            debug!(target: "txnest::txn", txn_id = %tx.id(), "Resuming suspended transaction");
        }
        ctx.resume(suspended);
    }

    /// Release the handle's hold on the context
    fn complete(&self, ctx: &mut ContextOf<R>, handle: &mut HandleOf<R>) {
        ctx.leave();
        if handle.restores_context {
            let suspended = handle.suspended.take();
            self.resume(ctx, suspended);
        }
    }

    fn record_finish(&self, counter: &AtomicU64) {
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
        counter.fetch_add(1, Ordering::Relaxed);
    }

    // === Metrics ===

    /// Get transaction metrics
    ///
    /// Returns current snapshot of transaction statistics.
    pub fn metrics(&self) -> TransactionMetrics {
        let started = self.total_started.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);

        TransactionMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: started,
            total_committed: committed,
            total_rolled_back: self.total_rolled_back.load(Ordering::Relaxed),
            total_participations: self.total_participations.load(Ordering::Relaxed),
            total_suspensions: self.total_suspensions.load(Ordering::Relaxed),
            total_unexpected_rollbacks: self.total_unexpected_rollbacks.load(Ordering::Relaxed),
            commit_rate: if started > 0 {
                committed as f64 / started as f64
            } else {
                0.0
            },
        }
    }

    /// Get current open physical transaction count
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Transaction metrics
///
/// Counts refer to physical transactions unless noted.
#[derive(Debug, Clone)]
pub struct TransactionMetrics {
    /// Physical transactions currently open
    pub active_count: u64,
    /// Physical transactions opened
    pub total_started: u64,
    /// Physical transactions committed
    pub total_committed: u64,
    /// Physical transactions rolled back or failed while completing
    pub total_rolled_back: u64,
    /// Logical handles that joined an existing transaction
    pub total_participations: u64,
    /// Transactions suspended by `RequiresNew` / `NotSupported`
    pub total_suspensions: u64,
    /// Commits that ended in `UnexpectedRollback`
    pub total_unexpected_rollbacks: u64,
    /// Commit success rate (committed / started)
    pub commit_rate: f64,
}

impl TransactionMetrics {
    /// Physical transactions that completed (committed + rolled back)
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_rolled_back
    }

    /// Rollback rate (rolled back / started)
    pub fn rollback_rate(&self) -> f64 {
        if self.total_started > 0 {
            self.total_rolled_back as f64 / self.total_started as f64
        } else {
            0.0
        }
    }
}

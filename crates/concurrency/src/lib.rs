//! Nested transaction coordination for txnest
//!
//! This crate maps logically nested transaction requests onto physical
//! transactions of one resource:
//! - TransactionCoordinator: begin / commit / rollback with propagation rules
//! - ExecutionContext: Per-unit-of-work binding of the active transaction
//! - TransactionHandle: Result of one `begin`, consumed on completion
//! - PhysicalTransaction: Shared record carrying the rollback-only mark
//! - CoordinatorConfig: Behavior switches, loadable from `txnest.toml`
//! - testing: Recording resource double with fault injection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod coordinator;
pub mod testing;
pub mod transaction;

pub use config::{CoordinatorConfig, CONFIG_FILE_NAME};
pub use context::ExecutionContext;
pub use coordinator::{ContextOf, HandleOf, TransactionCoordinator, TransactionMetrics};
pub use transaction::{PhysicalStatus, PhysicalTransaction, TransactionHandle};

//! txnest - nested transaction coordinator
//!
//! txnest maps logically nested transaction requests onto physical
//! transactions of a single resource. Every `begin` carries a propagation
//! policy that decides whether the call joins the transaction already bound
//! to the caller's [`ExecutionContext`], suspends it and opens a fresh one, or
//! runs without a transaction at all.
//!
//! # Quick Start
//!
//! ```
//! use txnest::testing::RecordingResource;
//! use txnest::{TransactionCoordinator, TransactionDefinition};
//!
//! let coordinator = TransactionCoordinator::new(RecordingResource::new());
//! let mut ctx = coordinator.new_context();
//!
//! let outer = coordinator.begin(&mut ctx, &TransactionDefinition::required()).unwrap();
//! let inner = coordinator.begin(&mut ctx, &TransactionDefinition::required()).unwrap();
//! assert_eq!(inner.id(), outer.id());
//!
//! coordinator.commit(&mut ctx, inner).unwrap();
//! coordinator.commit(&mut ctx, outer).unwrap();
//! assert_eq!(coordinator.resource().commits(), 1);
//! ```
//!
//! # Architecture
//!
//! - `txnest-core`: identifiers, propagation policies, errors and the
//!   [`PhysicalResource`] trait
//! - `txnest-concurrency`: the coordinator, execution contexts, handles and
//!   `txnest.toml` configuration
//!
//! This crate re-exports both and adds [`open`], which loads the coordinator
//! configuration from a directory.

use std::path::Path;
use tracing::info;

pub use txnest_concurrency::{
    testing, ContextOf, CoordinatorConfig, ExecutionContext, HandleOf, PhysicalStatus,
    PhysicalTransaction, TransactionCoordinator, TransactionHandle, TransactionMetrics,
    CONFIG_FILE_NAME,
};
pub use txnest_core::{
    ConfigError, PhysicalResource, Propagation, ResourceOperation, TransactionDefinition,
    TransactionError, TransactionId, TxResult,
};

/// Commonly used items
pub mod prelude {
    pub use crate::{
        ExecutionContext, PhysicalResource, Propagation, TransactionCoordinator,
        TransactionDefinition, TransactionError, TransactionHandle,
    };
}

/// Create a coordinator configured from `txnest.toml` in `dir`
///
/// The directory is created if needed, and a commented default config file
/// is written when none exists, so later edits survive restarts.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created, read or
/// parsed.
pub fn open<R: PhysicalResource>(
    resource: R,
    dir: impl AsRef<Path>,
) -> Result<TransactionCoordinator<R>, ConfigError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| ConfigError::Write {
        path: dir.display().to_string(),
        source: e,
    })?;

    let config_path = dir.join(CONFIG_FILE_NAME);
    CoordinatorConfig::write_default_if_missing(&config_path)?;
    let config = CoordinatorConfig::from_file(&config_path)?;

    info!(
        target: "txnest::txn",
        path = %config_path.display(),
        default_propagation = %config.default_propagation,
        "Loaded coordinator configuration"
    );
    Ok(TransactionCoordinator::with_config(resource, config))
}

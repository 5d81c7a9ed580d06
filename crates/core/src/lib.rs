//! Core types and traits for txnest
//!
//! This crate defines the foundational types used throughout the system:
//! - TransactionId: Identifier of a physical transaction
//! - Propagation: Join / suspend / open policy for nested requests
//! - TransactionDefinition: Propagation plus name and read-only hint
//! - PhysicalResource: The transactional resource the coordinator drives
//! - Error: Coordinator and configuration error types

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ConfigError, ResourceOperation, TransactionError, TxResult};
pub use traits::PhysicalResource;
pub use types::{Propagation, TransactionDefinition, TransactionId};

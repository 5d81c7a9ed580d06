//! Testing utilities for code that drives the coordinator
//!
//! - **Recording resource**: In-memory [`PhysicalResource`](txnest_core::PhysicalResource)
//!   that records every call and can inject failures per operation
//!
//! # Example
//!
//! ```
//! use txnest_concurrency::testing::RecordingResource;
//! use txnest_concurrency::TransactionCoordinator;
//! use txnest_core::TransactionDefinition;
//!
//! let coordinator = TransactionCoordinator::new(RecordingResource::new());
//! let mut ctx = coordinator.new_context();
//!
//! let tx = coordinator.begin(&mut ctx, &TransactionDefinition::required()).unwrap();
//! coordinator.commit(&mut ctx, tx).unwrap();
//!
//! assert_eq!(coordinator.resource().commits(), 1);
//! ```

mod recording;

pub use recording::{token_of, RecordingResource, ResourceEvent, ResourceFault};

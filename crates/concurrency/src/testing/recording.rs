//! In-memory physical resource that records calls
//!
//! Tokens are allocated from the resource's own counter, starting at 1. They
//! are unrelated to the coordinator's transaction ids; use [`token_of`] to
//! find the token behind a handle.

use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;
use txnest_core::{PhysicalResource, ResourceOperation, TransactionDefinition};

use crate::transaction::TransactionHandle;

/// Call observed by a [`RecordingResource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    /// Physical transaction opened
    Opened {
        /// Token handed out
        token: u64,
        /// Name from the definition
        name: Option<String>,
        /// Read-only hint from the definition
        read_only: bool,
    },
    /// Physical transaction committed
    Committed {
        /// Token committed
        token: u64,
    },
    /// Physical transaction rolled back
    RolledBack {
        /// Token rolled back
        token: u64,
    },
}

impl ResourceEvent {
    /// Token the event refers to
    pub fn token(&self) -> u64 {
        match self {
            ResourceEvent::Opened { token, .. }
            | ResourceEvent::Committed { token }
            | ResourceEvent::RolledBack { token } => *token,
        }
    }
}

/// Injected failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("injected {operation} failure")]
pub struct ResourceFault {
    /// Operation that was made to fail
    pub operation: ResourceOperation,
}

#[derive(Debug, Default)]
struct RecorderState {
    next_token: u64,
    events: Vec<ResourceEvent>,
    /// Remaining injected failures per operation
    faults: HashMap<ResourceOperation, usize>,
}

impl RecorderState {
    fn take_fault(&mut self, operation: ResourceOperation) -> Result<(), ResourceFault> {
        match self.faults.get_mut(&operation) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(ResourceFault { operation })
            }
            _ => Ok(()),
        }
    }
}

/// Physical resource double that records calls
///
/// Failed calls are not recorded as events.
#[derive(Debug, Default)]
pub struct RecordingResource {
    state: Mutex<RecorderState>,
}

impl RecordingResource {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `operation` fail
    pub fn fail_next(&self, operation: ResourceOperation) {
        self.fail_times(operation, 1);
    }

    /// Make the next `count` calls of `operation` fail
    pub fn fail_times(&self, operation: ResourceOperation, count: usize) {
        *self.state.lock().faults.entry(operation).or_insert(0) += count;
    }

    /// All recorded events in call order
    pub fn events(&self) -> Vec<ResourceEvent> {
        self.state.lock().events.clone()
    }

    /// Recorded events for one token
    pub fn events_for(&self, token: u64) -> Vec<ResourceEvent> {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| e.token() == token)
            .cloned()
            .collect()
    }

    /// Number of successful opens
    pub fn opens(&self) -> usize {
        self.count(|e| matches!(e, ResourceEvent::Opened { .. }))
    }

    /// Number of successful commits
    pub fn commits(&self) -> usize {
        self.count(|e| matches!(e, ResourceEvent::Committed { .. }))
    }

    /// Number of successful rollbacks
    pub fn rollbacks(&self) -> usize {
        self.count(|e| matches!(e, ResourceEvent::RolledBack { .. }))
    }

    /// Forget recorded events and pending faults; tokens keep counting
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.events.clear();
        state.faults.clear();
    }

    fn count(&self, predicate: impl Fn(&ResourceEvent) -> bool) -> usize {
        self.state.lock().events.iter().filter(|e| predicate(*e)).count()
    }
}

impl PhysicalResource for RecordingResource {
    type Token = u64;
    type Error = ResourceFault;

    fn open(&self, definition: &TransactionDefinition) -> Result<u64, ResourceFault> {
        let mut state = self.state.lock();
        state.take_fault(ResourceOperation::Open)?;
        state.next_token += 1;
        let token = state.next_token;
        state.events.push(ResourceEvent::Opened {
            token,
            name: definition.name.clone(),
            read_only: definition.read_only,
        });
        Ok(token)
    }

    fn commit(&self, token: &u64) -> Result<(), ResourceFault> {
        let mut state = self.state.lock();
        state.take_fault(ResourceOperation::Commit)?;
        state.events.push(ResourceEvent::Committed { token: *token });
        Ok(())
    }

    fn rollback(&self, token: &u64) -> Result<(), ResourceFault> {
        let mut state = self.state.lock();
        state.take_fault(ResourceOperation::Rollback)?;
        state.events.push(ResourceEvent::RolledBack { token: *token });
        Ok(())
    }
}

/// Token of the physical transaction behind a handle
pub fn token_of(handle: &TransactionHandle<u64>) -> Option<u64> {
    handle.transaction().map(|tx| *tx.token())
}

//! Transaction identity and definition types
//!
//! This module defines the values a caller hands to the coordinator when it
//! asks for a transaction:
//! - TransactionId: Identifier of one physical transaction
//! - Propagation: Policy for joining, suspending, or opening a transaction
//! - TransactionDefinition: Propagation plus descriptive attributes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a physical transaction
///
/// Allocated by the coordinator, monotonically increasing per coordinator.
/// Participating handles report the id of the transaction they joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Wrap a raw id
    pub const fn new(id: u64) -> Self {
        TransactionId(id)
    }

    /// Raw numeric value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// Propagation policy requested at `begin` time
///
/// Decides what happens when a transaction is requested while another one is
/// (or is not) already bound to the execution context.
///
/// | Policy | Transaction bound | No transaction bound |
/// |--------|-------------------|----------------------|
/// | `Required` | join | open new |
/// | `RequiresNew` | suspend, open new | open new |
/// | `Supports` | join | run without |
/// | `Mandatory` | join | error |
/// | `NotSupported` | suspend, run without | run without |
/// | `Never` | error | run without |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// Join the current transaction, or open one if none exists
    #[default]
    Required,
    /// Always open an independent physical transaction, suspending the current one
    RequiresNew,
    /// Join the current transaction, or run without one
    Supports,
    /// Join the current transaction; fail if none exists
    Mandatory,
    /// Run without a transaction, suspending the current one
    NotSupported,
    /// Run without a transaction; fail if one exists
    Never,
}

impl Propagation {
    /// All propagation policies
    pub const ALL: [Propagation; 6] = [
        Propagation::Required,
        Propagation::RequiresNew,
        Propagation::Supports,
        Propagation::Mandatory,
        Propagation::NotSupported,
        Propagation::Never,
    ];

    /// Stable lower-case name, matching the config file spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Propagation::Required => "required",
            Propagation::RequiresNew => "requires_new",
            Propagation::Supports => "supports",
            Propagation::Mandatory => "mandatory",
            Propagation::NotSupported => "not_supported",
            Propagation::Never => "never",
        }
    }

    /// Whether a `begin` with this policy opens a physical transaction when
    /// none is bound
    pub fn opens_when_absent(&self) -> bool {
        matches!(self, Propagation::Required | Propagation::RequiresNew)
    }

    /// Whether a `begin` with this policy suspends a bound transaction
    pub fn suspends_existing(&self) -> bool {
        matches!(self, Propagation::RequiresNew | Propagation::NotSupported)
    }
}

impl fmt::Display for Propagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of a requested transaction
///
/// The definition is forwarded to the physical resource when a new physical
/// transaction is opened, so resources can apply the name or read-only hint.
///
/// # Example
///
/// ```
/// use txnest_core::{Propagation, TransactionDefinition};
///
/// let def = TransactionDefinition::requires_new()
///     .with_name("audit-log")
///     .read_only();
/// assert_eq!(def.propagation, Propagation::RequiresNew);
/// assert_eq!(def.name.as_deref(), Some("audit-log"));
/// assert!(def.read_only);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionDefinition {
    /// Propagation policy
    pub propagation: Propagation,
    /// Optional name, for logging and for the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Read-only hint
    #[serde(default)]
    pub read_only: bool,
}

impl TransactionDefinition {
    /// Definition with the given propagation and no other attributes
    pub fn new(propagation: Propagation) -> Self {
        TransactionDefinition {
            propagation,
            name: None,
            read_only: false,
        }
    }

    /// `Required` definition
    pub fn required() -> Self {
        Self::new(Propagation::Required)
    }

    /// `RequiresNew` definition
    pub fn requires_new() -> Self {
        Self::new(Propagation::RequiresNew)
    }

    /// Set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the propagation
    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    /// Mark as read-only
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

impl From<Propagation> for TransactionDefinition {
    fn from(propagation: Propagation) -> Self {
        TransactionDefinition::new(propagation)
    }
}

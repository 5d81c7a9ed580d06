//! Coordinator configuration via `txnest.toml`
//!
//! Every field is optional in the file; missing fields take the defaults
//! below. Hosts typically keep the file next to their own configuration and
//! load it once at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use txnest_core::{ConfigError, Propagation};

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "txnest.toml";

/// Coordinator configuration loaded from `txnest.toml`.
///
/// # Example
///
/// ```toml
/// default_propagation = "required"
/// global_rollback_on_participation_failure = true
/// fail_early_on_global_rollback_only = false
/// rollback_on_commit_failure = false
/// validate_existing_transaction = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Propagation used by `begin_default`.
    #[serde(default)]
    pub default_propagation: Propagation,
    /// A participant's rollback marks the shared transaction rollback-only.
    ///
    /// When false, only participants explicitly marked with
    /// `set_rollback_only` poison the shared transaction.
    #[serde(default = "default_true")]
    pub global_rollback_on_participation_failure: bool,
    /// Committing a participant of a rollback-only transaction raises
    /// `UnexpectedRollback` immediately instead of leaving it to the owner.
    #[serde(default)]
    pub fail_early_on_global_rollback_only: bool,
    /// Attempt a physical rollback when the physical commit fails.
    #[serde(default)]
    pub rollback_on_commit_failure: bool,
    /// Reject a non-read-only participant joining a read-only transaction.
    #[serde(default)]
    pub validate_existing_transaction: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_propagation: Propagation::Required,
            global_rollback_on_participation_failure: true,
            fail_early_on_global_rollback_only: false,
            rollback_on_commit_failure: false,
            validate_existing_transaction: false,
        }
    }
}

impl CoordinatorConfig {
    /// Set the propagation used by `begin_default`.
    pub fn with_default_propagation(mut self, propagation: Propagation) -> Self {
        self.default_propagation = propagation;
        self
    }

    /// Set `global_rollback_on_participation_failure`.
    pub fn with_global_rollback_on_participation_failure(mut self, enabled: bool) -> Self {
        self.global_rollback_on_participation_failure = enabled;
        self
    }

    /// Set `fail_early_on_global_rollback_only`.
    pub fn with_fail_early_on_global_rollback_only(mut self, enabled: bool) -> Self {
        self.fail_early_on_global_rollback_only = enabled;
        self
    }

    /// Set `rollback_on_commit_failure`.
    pub fn with_rollback_on_commit_failure(mut self, enabled: bool) -> Self {
        self.rollback_on_commit_failure = enabled;
        self
    }

    /// Set `validate_existing_transaction`.
    pub fn with_validate_existing_transaction(mut self, enabled: bool) -> Self {
        self.validate_existing_transaction = enabled;
        self
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# txnest coordinator configuration
#
# Propagation used by begin_default:
#   "required" (default), "requires_new", "supports",
#   "mandatory", "not_supported", "never"
default_propagation = "required"

# Mark the shared transaction rollback-only when a participant rolls back.
global_rollback_on_participation_failure = true

# Raise UnexpectedRollback when a participant commits a transaction that is
# already rollback-only, instead of waiting for the outermost commit.
fail_early_on_global_rollback_only = false

# Try a physical rollback after a failed physical commit.
rollback_on_commit_failure = false

# Reject non-read-only participants joining a read-only transaction.
validate_existing_transaction = false
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| ConfigError::Write {
                path: path.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

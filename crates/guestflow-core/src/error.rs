//! Error types for the Guestflow runtime.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SyncTrigger;

/// A shared error type for the entire Guestflow workspace.
///
/// Variants follow three propagation classes:
/// - caller bugs the state machine forbids (`IllegalOperation`, `StepNotFound`),
///   raised synchronously to the immediate caller
/// - failures of the outside world (`Sync`, `Io`, `DataAccess`), reported
///   through callbacks by the orchestrator and only returned to the caller
///   where a durable guarantee depends on them
/// - definition and configuration problems detected while loading
///
/// Validation failures are never errors; see [`crate::validation::ValidationResult`].
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuestflowError {
    /// The runtime state machine forbids the requested operation.
    #[error("Illegal operation '{operation}': {reason}")]
    IllegalOperation { operation: String, reason: String },

    /// A mutating operation referenced a step id that is not in the loaded list.
    #[error("Step not found: '{step_id}'")]
    StepNotFound { step_id: String },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound { entity_type: String, id: String },

    /// A write to the session document store failed.
    #[error("Sync failed ({trigger}): {message}")]
    Sync {
        trigger: SyncTrigger,
        message: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Data access error (repository/storage layer)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An experience definition violates a structural rule.
    #[error("Invalid experience definition: {0}")]
    InvalidDefinition(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GuestflowError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an IllegalOperation error
    pub fn illegal(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::IllegalOperation {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a StepNotFound error
    pub fn step_not_found(step_id: impl Into<String>) -> Self {
        Self::StepNotFound {
            step_id: step_id.into(),
        }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.into(),
        }
    }

    /// Wraps a store failure with the trigger that caused the write.
    pub fn sync(trigger: SyncTrigger, source: &GuestflowError) -> Self {
        Self::Sync {
            trigger,
            message: source.to_string(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is an IllegalOperation error
    pub fn is_illegal_operation(&self) -> bool {
        matches!(self, Self::IllegalOperation { .. })
    }

    /// Check if this is a NotFound or StepNotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::StepNotFound { .. })
    }

    /// Check if this is a Sync error
    pub fn is_sync(&self) -> bool {
        matches!(self, Self::Sync { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for GuestflowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for GuestflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for GuestflowError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for GuestflowError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, GuestflowError>`.
pub type Result<T> = std::result::Result<T, GuestflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_carries_trigger_and_source_message() {
        let source = GuestflowError::data_access("connection reset");
        let err = GuestflowError::sync(SyncTrigger::Completion, &source);

        assert!(err.is_sync());
        assert_eq!(
            err.to_string(),
            "Sync failed (completion): Data access error: connection reset"
        );
    }

    #[test]
    fn test_not_found_predicates() {
        assert!(GuestflowError::step_not_found("s9").is_not_found());
        assert!(GuestflowError::not_found("Session", "abc").is_not_found());
        assert!(!GuestflowError::illegal("back", "at first step").is_not_found());
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: GuestflowError = io.into();
        match err {
            GuestflowError::Io { message } => assert!(message.contains("PermissionDenied")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

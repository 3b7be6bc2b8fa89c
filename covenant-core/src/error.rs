//! Error types for Covenant operations

use crate::EntityType;
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: String },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: String,
        reason: String,
    },

    #[error("Version conflict on {entity_type:?} {id}: expected {expected}, found {actual}")]
    VersionConflict {
        entity_type: EntityType,
        id: Uuid,
        expected: i64,
        actual: i64,
    },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Storage backend error: {reason}")]
    Backend { reason: String },
}

impl StorageError {
    /// Shorthand for a not-found error keyed by any displayable id.
    pub fn not_found(entity_type: EntityType, id: impl ToString) -> Self {
        StorageError::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }
}

/// Outbound notification errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notifier not configured: {reason}")]
    NotConfigured { reason: String },

    #[error("Invalid recipient: {recipient}")]
    InvalidRecipient { recipient: String },

    #[error("Email request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Email provider rejected message with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Covenant errors.
#[derive(Debug, Clone, Error)]
pub enum CovenantError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Notify error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CovenantError {
    /// The entity type when this error is a storage not-found.
    pub fn not_found_entity(&self) -> Option<EntityType> {
        match self {
            CovenantError::Storage(StorageError::NotFound { entity_type, .. }) => {
                Some(*entity_type)
            }
            _ => None,
        }
    }

    /// Whether this is an optimistic concurrency conflict worth retrying.
    pub fn is_version_conflict(&self) -> bool {
        matches!(
            self,
            CovenantError::Storage(StorageError::VersionConflict { .. })
        )
    }
}

/// Result type alias for Covenant operations.
pub type CovenantResult<T> = Result<T, CovenantError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::not_found(EntityType::Client, Uuid::nil());
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("Client"));
        assert!(msg.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_version_conflict_display() {
        let err = StorageError::VersionConflict {
            entity_type: EntityType::Client,
            id: Uuid::nil(),
            expected: 3,
            actual: 4,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("expected 3"));
        assert!(msg.contains("found 4"));
        assert!(CovenantError::from(err).is_version_conflict());
    }

    #[test]
    fn test_notify_error_display_rejected() {
        let err = NotifyError::Rejected {
            status: 422,
            message: "invalid from".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("422"));
        assert!(msg.contains("invalid from"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "app_base_url".to_string(),
            value: "bad".to_string(),
            reason: "must be url".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("app_base_url"));
        assert!(msg.contains("bad"));
        assert!(msg.contains("must be url"));
    }

    #[test]
    fn test_covenant_error_from_variants() {
        let storage = CovenantError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, CovenantError::Storage(_)));

        let notify = CovenantError::from(NotifyError::RequestFailed {
            reason: "timeout".to_string(),
        });
        assert!(matches!(notify, CovenantError::Notify(_)));

        let validation = CovenantError::from(ValidationError::RequiredFieldMissing {
            field: "title".to_string(),
        });
        assert!(matches!(validation, CovenantError::Validation(_)));

        let config = CovenantError::from(ConfigError::MissingRequired {
            field: "api_key".to_string(),
        });
        assert!(matches!(config, CovenantError::Config(_)));
    }

    #[test]
    fn test_not_found_entity() {
        let err = CovenantError::from(StorageError::not_found(EntityType::PaymentLink, "x"));
        assert_eq!(err.not_found_entity(), Some(EntityType::PaymentLink));
        assert_eq!(
            CovenantError::from(StorageError::LockPoisoned).not_found_entity(),
            None
        );
    }
}

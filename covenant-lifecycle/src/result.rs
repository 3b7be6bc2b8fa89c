//! Caller-facing operation results.

use covenant_core::{CovenantError, CovenantResult};
use serde::{Deserialize, Serialize};

/// Outcome of a lifecycle operation as seen by callers.
///
/// Serializes to `{success, data?, error?, notificationError?}`.
/// `notification_error` is only ever set alongside `success: true`: the
/// state change was persisted but the follow-up email was not delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            notification_error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            notification_error: None,
        }
    }

    /// Failure with no message.
    pub fn fail_silent() -> Self {
        Self {
            success: false,
            data: None,
            error: None,
            notification_error: None,
        }
    }

    pub fn with_notification_error(mut self, notification_error: Option<String>) -> Self {
        self.notification_error = notification_error;
        self
    }

    /// Message a caller should show: the error, else the notification error.
    pub fn message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.notification_error.as_deref())
    }
}

/// Data produced by an operation plus any email failure that followed it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Delivered<T> {
    pub data: T,
    pub notification_error: Option<String>,
}

impl<T> Delivered<T> {
    pub fn quiet(data: T) -> Self {
        Self {
            data,
            notification_error: None,
        }
    }

    pub fn new(data: T, notification_error: Option<String>) -> Self {
        Self {
            data,
            notification_error,
        }
    }
}

/// Caller-visible message for an internal error.
///
/// Missing entities and rejected input surface as-is; everything else is
/// logged and collapsed to `"Failed to <action>"`.
pub(crate) fn describe_error(err: &CovenantError, action: &str) -> String {
    if let Some(entity) = err.not_found_entity() {
        return format!("{} not found", entity.display_name());
    }
    match err {
        CovenantError::Validation(e) => e.to_string(),
        other => {
            tracing::error!(action, error = %other, "Lifecycle operation failed");
            format!("Failed to {}", action)
        }
    }
}

/// Map an internal outcome to the caller-facing result.
pub(crate) fn finish<T>(outcome: CovenantResult<Delivered<T>>, action: &str) -> ActionResult<T> {
    match outcome {
        Ok(delivered) => {
            ActionResult::ok(delivered.data).with_notification_error(delivered.notification_error)
        }
        Err(err) => ActionResult::fail(describe_error(&err, action)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{EntityType, NotifyError, StorageError, ValidationError};

    #[test]
    fn test_serializes_camel_case_without_empty_fields() {
        let ok: ActionResult<u32> = ActionResult::ok(7)
            .with_notification_error(Some("Failed to send receipt email".to_string()));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "data": 7,
                "notificationError": "Failed to send receipt email"
            })
        );

        let silent: ActionResult<u32> = ActionResult::fail_silent();
        assert_eq!(
            serde_json::to_value(&silent).unwrap(),
            serde_json::json!({ "success": false })
        );
    }

    #[test]
    fn test_describe_error_mapping() {
        let not_found: CovenantError =
            StorageError::not_found(EntityType::PaymentLink, "x").into();
        assert_eq!(describe_error(&not_found, "send SOW"), "Payment link not found");

        let invalid: CovenantError = ValidationError::RequiredFieldMissing {
            field: "signature".to_string(),
        }
        .into();
        assert!(describe_error(&invalid, "accept MSA").contains("signature"));

        let backend: CovenantError = StorageError::Backend {
            reason: "connection reset".to_string(),
        }
        .into();
        assert_eq!(describe_error(&backend, "send SOW"), "Failed to send SOW");

        let notify: CovenantError = NotifyError::RequestFailed {
            reason: "timeout".to_string(),
        }
        .into();
        assert_eq!(
            describe_error(&notify, "send receipt"),
            "Failed to send receipt"
        );
    }

    #[test]
    fn test_finish_carries_notification_error() {
        let result = finish(
            Ok(Delivered::new("done", Some("Failed to send MSA email".to_string()))),
            "send MSA link",
        );
        assert!(result.success);
        assert_eq!(result.message(), Some("Failed to send MSA email"));
    }
}

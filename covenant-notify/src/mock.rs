//! Recording notifier for tests.

use crate::{validate_recipient, Notifier, NotifyResult, OutboundEmail};
use async_trait::async_trait;
use covenant_core::NotifyError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Notifier that records every accepted message in memory.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    fail: Arc<AtomicBool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of messages accepted so far.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Messages accepted for one recipient.
    pub fn sent_to(&self, to: &str) -> Vec<OutboundEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.to == to)
            .collect()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, email: &OutboundEmail) -> NotifyResult<()> {
        validate_recipient(&email.to)?;
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::RequestFailed {
                reason: "send failure injected".to_string(),
            });
        }
        self.sent
            .lock()
            .map_err(|_| NotifyError::RequestFailed {
                reason: "mock outbox poisoned".to_string(),
            })?
            .push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_fails_on_demand() {
        let notifier = MockNotifier::new();
        notifier
            .send(&OutboundEmail::new("a@b.com", "One", "<p>1</p>"))
            .await
            .unwrap();
        assert_eq!(notifier.sent_count(), 1);
        assert_eq!(notifier.sent_to("a@b.com")[0].subject, "One");

        notifier.set_fail(true);
        assert!(notifier
            .send(&OutboundEmail::new("a@b.com", "Two", "<p>2</p>"))
            .await
            .is_err());
        assert_eq!(notifier.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_outbox() {
        let notifier = MockNotifier::new();
        let handle = notifier.clone();
        notifier
            .send(&OutboundEmail::new("a@b.com", "Hi", "<p>hi</p>"))
            .await
            .unwrap();
        assert_eq!(handle.sent_count(), 1);
    }
}

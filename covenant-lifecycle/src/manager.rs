//! Lifecycle manager handle and the helpers shared by its operations.

use std::sync::Arc;

use covenant_core::{
    Client, ClientId, ClientStatus, CovenantResult, EntityType, LinkId, PaymentLink,
    ProtocolMetadata, StorageError,
};
use covenant_notify::{Notifier, OutboundEmail};
use covenant_render::EmailBody;
use covenant_storage::{ClientUpdate, LifecycleStore};

use crate::config::LifecycleConfig;

/// Orchestrates payments, SOW delivery, MSA acceptance and protocol state
/// over a [`LifecycleStore`] and a [`Notifier`].
///
/// Operations are grouped by concern in `services/`. Each exported
/// operation returns an [`ActionResult`](crate::ActionResult) and never
/// panics or propagates errors to the caller.
#[derive(Clone)]
pub struct LifecycleManager {
    pub(crate) store: Arc<dyn LifecycleStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) config: LifecycleConfig,
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn LifecycleStore>,
        notifier: Arc<dyn Notifier>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Whether the backing store is reachable.
    pub async fn health_check(&self) -> bool {
        match self.store.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::error!(error = %e, "Store health check failed");
                false
            }
        }
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    pub(crate) async fn require_client(&self, client_id: ClientId) -> CovenantResult<Client> {
        self.store
            .client_get(client_id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::Client, client_id).into())
    }

    pub(crate) async fn require_link_with_client(
        &self,
        link_id: LinkId,
    ) -> CovenantResult<(PaymentLink, Client)> {
        self.store
            .link_get_with_client(link_id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::PaymentLink, link_id).into())
    }

    // ========================================================================
    // CLIENT WRITES
    // ========================================================================

    /// Compare-and-swap a client update built from the latest snapshot.
    ///
    /// `build` is called with the current client and returns the update to
    /// apply. On a version conflict the client is re-read and `build` runs
    /// again, up to `metadata_retry_limit` extra attempts. An empty update
    /// writes nothing and returns the snapshot unchanged.
    pub(crate) async fn update_client_with<F>(
        &self,
        mut client: Client,
        mut build: F,
    ) -> CovenantResult<Client>
    where
        F: FnMut(&Client) -> CovenantResult<ClientUpdate> + Send,
    {
        let mut attempt = 0u32;
        loop {
            let update = build(&client)?;
            if update.is_empty() {
                return Ok(client);
            }
            match self
                .store
                .client_update(client.client_id, update, client.version)
                .await
            {
                Ok(updated) => return Ok(updated),
                Err(e) if e.is_version_conflict() && attempt < self.config.metadata_retry_limit => {
                    attempt += 1;
                    tracing::debug!(
                        client_id = %client.client_id,
                        attempt,
                        "Client version conflict, re-reading"
                    );
                    client = self.require_client(client.client_id).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Edit the client's protocol metadata (and optionally its status)
    /// under the compare-and-swap loop. Returns the updated client and the
    /// protocol view that was written.
    pub(crate) async fn update_protocol<E>(
        &self,
        client: Client,
        status: Option<ClientStatus>,
        edit: E,
    ) -> CovenantResult<(Client, ProtocolMetadata)>
    where
        E: Fn(&mut ProtocolMetadata) + Send + Sync,
    {
        let updated = self
            .update_client_with(client, |current| protocol_update(current, status, &edit))
            .await?;
        let protocol = read_protocol(&updated);
        Ok((updated, protocol))
    }

    // ========================================================================
    // NOTIFICATIONS
    // ========================================================================

    /// Send an email after state has been persisted.
    ///
    /// Returns the caller-visible notification error when delivery fails.
    pub(crate) async fn notify(&self, to: &str, body: EmailBody, kind: &str) -> Option<String> {
        let email = OutboundEmail::new(to, body.subject, body.html);
        match self.notifier.send(&email).await {
            Ok(()) => {
                tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
                None
            }
            Err(e) => {
                tracing::warn!(to = %email.to, kind, error = %e, "Email delivery failed");
                Some(format!("Failed to send {} email", kind))
            }
        }
    }
}

/// Build a client update that rewrites `metadata.protocol` through `edit`
/// and moves the status when it differs from the stored one.
pub(crate) fn protocol_update<E>(
    client: &Client,
    status: Option<ClientStatus>,
    edit: E,
) -> CovenantResult<ClientUpdate>
where
    E: FnOnce(&mut ProtocolMetadata),
{
    let mut protocol = read_protocol(client);
    edit(&mut protocol);
    Ok(ClientUpdate {
        status: status_change(client, status),
        metadata: Some(protocol.merge_into(&client.metadata)?),
    })
}

/// The client's protocol view. A malformed `protocol` object reads as the
/// empty default and is replaced on the next write.
pub(crate) fn read_protocol(client: &Client) -> ProtocolMetadata {
    ProtocolMetadata::from_metadata(&client.metadata).unwrap_or_else(|e| {
        tracing::warn!(
            client_id = %client.client_id,
            error = %e,
            "Malformed protocol metadata, reading as empty"
        );
        ProtocolMetadata::default()
    })
}

/// `Some(target)` only when it differs from the stored status.
pub(crate) fn status_change(client: &Client, target: Option<ClientStatus>) -> Option<ClientStatus> {
    target.filter(|status| *status != client.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::ProtocolState;
    use covenant_notify::MockNotifier;
    use covenant_storage::MockStorage;
    use serde_json::json;

    fn manager(storage: Arc<MockStorage>) -> LifecycleManager {
        LifecycleManager::new(
            storage,
            Arc::new(MockNotifier::new()),
            LifecycleConfig::default(),
        )
    }

    #[test]
    fn test_status_change_only_when_different() {
        let client = Client::new_lead("a@b.com", "Ada");
        assert_eq!(status_change(&client, Some(ClientStatus::Lead)), None);
        assert_eq!(
            status_change(&client, Some(ClientStatus::ClosedWon)),
            Some(ClientStatus::ClosedWon)
        );
        assert_eq!(status_change(&client, None), None);
    }

    #[test]
    fn test_protocol_update_keeps_sibling_keys() {
        let mut client = Client::new_lead("a@b.com", "Ada");
        client.metadata = json!({ "crm": { "owner": "sam" } });
        let update = protocol_update(&client, None, |p| {
            p.advance_to(ProtocolState::ApprovedTier1)
        })
        .unwrap();
        let metadata = update.metadata.unwrap();
        assert_eq!(metadata["crm"]["owner"], "sam");
        assert_eq!(metadata["protocol"]["state"], "APPROVED_TIER_1");
        assert_eq!(metadata["protocol"]["approved_tiers"], json!(["TIER_1"]));
    }

    #[test]
    fn test_protocol_update_replaces_malformed_metadata() {
        let mut client = Client::new_lead("a@b.com", "Ada");
        client.metadata = json!({ "protocol": "garbage", "crm": { "owner": "sam" } });
        assert_eq!(read_protocol(&client), ProtocolMetadata::default());

        let update = protocol_update(&client, None, |p| {
            p.advance_to(ProtocolState::ApprovedTier1)
        })
        .unwrap();
        let metadata = update.metadata.unwrap();
        assert_eq!(metadata["crm"]["owner"], "sam");
        assert_eq!(metadata["protocol"]["state"], "APPROVED_TIER_1");
        assert_eq!(metadata["protocol"]["approved_tiers"], json!(["TIER_1"]));
    }

    #[tokio::test]
    async fn test_update_client_with_skips_empty_update() {
        let storage = Arc::new(MockStorage::new());
        let client = Client::new_lead("a@b.com", "Ada");
        storage.client_insert(&client).await.unwrap();
        let writes = storage.write_count();

        let mgr = manager(storage.clone());
        let same = mgr
            .update_client_with(client.clone(), |_| Ok(ClientUpdate::default()))
            .await
            .unwrap();
        assert_eq!(same.version, client.version);
        assert_eq!(storage.write_count(), writes);
    }

    #[tokio::test]
    async fn test_update_client_with_retries_on_stale_snapshot() {
        let storage = Arc::new(MockStorage::new());
        let client = Client::new_lead("a@b.com", "Ada");
        storage.client_insert(&client).await.unwrap();

        // Another writer bumps the version after our snapshot was taken.
        storage
            .client_update(
                client.client_id,
                ClientUpdate {
                    status: Some(ClientStatus::Negotiating),
                    metadata: None,
                },
                client.version,
            )
            .await
            .unwrap();

        let mgr = manager(storage.clone());
        let mut calls = 0;
        let updated = mgr
            .update_client_with(client, |current| {
                calls += 1;
                Ok(ClientUpdate {
                    status: status_change(current, Some(ClientStatus::ClosedWon)),
                    metadata: None,
                })
            })
            .await
            .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(updated.status, ClientStatus::ClosedWon);
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn test_update_client_with_gives_up_after_limit() {
        let storage = Arc::new(MockStorage::new());
        let client = Client::new_lead("a@b.com", "Ada");
        storage.client_insert(&client).await.unwrap();

        let mgr = LifecycleManager::new(
            storage.clone(),
            Arc::new(MockNotifier::new()),
            LifecycleConfig {
                metadata_retry_limit: 0,
                ..LifecycleConfig::default()
            },
        );
        let mut stale = client.clone();
        stale.version = 41;
        let err = mgr
            .update_client_with(stale, |_| {
                Ok(ClientUpdate {
                    status: Some(ClientStatus::ClosedWon),
                    metadata: None,
                })
            })
            .await
            .unwrap_err();
        assert!(err.is_version_conflict());
    }

    #[tokio::test]
    async fn test_notify_reports_failure_without_error() {
        let notifier = MockNotifier::new();
        notifier.set_fail(true);
        let mgr = LifecycleManager::new(
            Arc::new(MockStorage::new()),
            Arc::new(notifier),
            LifecycleConfig::default(),
        );
        let body = EmailBody {
            subject: "s".to_string(),
            html: "<p>b</p>".to_string(),
        };
        assert_eq!(
            mgr.notify("a@b.com", body, "receipt").await.as_deref(),
            Some("Failed to send receipt email")
        );
    }
}

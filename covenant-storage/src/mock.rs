//! In-memory mock storage for testing.

use crate::{ClientUpdate, LifecycleStore, PaymentLinkUpdate, TransactionUpdate};
use async_trait::async_trait;
use covenant_core::{
    Client, ClientId, CovenantError, CovenantResult, EntityIdType, EntityType, LinkId,
    PaymentLink, SowTemplate, StorageError, Transaction, TransactionId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory mock storage for testing.
///
/// Honors the compare-and-swap contract on clients, counts successful
/// writes, and can be switched into a failing mode to exercise
/// persistence-failure paths.
#[derive(Debug, Default)]
pub struct MockStorage {
    clients: Arc<RwLock<HashMap<ClientId, Client>>>,
    links: Arc<RwLock<HashMap<LinkId, PaymentLink>>>,
    transactions: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
    templates: Arc<RwLock<HashMap<String, SowTemplate>>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

fn read<T>(lock: &RwLock<T>) -> CovenantResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| CovenantError::Storage(StorageError::LockPoisoned))
}

fn write<T>(lock: &RwLock<T>) -> CovenantResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| CovenantError::Storage(StorageError::LockPoisoned))
}

impl MockStorage {
    /// Create a new mock storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a SOW template. Templates are admin-managed, so this lives
    /// outside the gateway trait.
    pub fn insert_template(&self, template: SowTemplate) {
        if let Ok(mut templates) = self.templates.write() {
            templates.insert(template.template_id.clone(), template);
        }
    }

    /// Make every subsequent write fail with a backend error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes (inserts, updates, deletes).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Get count of stored clients.
    pub fn client_count(&self) -> usize {
        self.clients.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Get count of stored payment links.
    pub fn link_count(&self) -> usize {
        self.links.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Get count of stored transactions.
    pub fn transaction_count(&self) -> usize {
        self.transactions.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Snapshot of every stored transaction.
    pub fn all_transactions(&self) -> Vec<Transaction> {
        self.transactions
            .read()
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check_writable(&self) -> CovenantResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CovenantError::Storage(StorageError::Backend {
                reason: "write failure injected".to_string(),
            }));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LifecycleStore for MockStorage {
    // === Client Operations ===

    async fn client_insert(&self, c: &Client) -> CovenantResult<()> {
        self.check_writable()?;
        let mut clients = write(&self.clients)?;
        if clients.contains_key(&c.client_id) {
            return Err(CovenantError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Client,
                reason: "already exists".to_string(),
            }));
        }
        clients.insert(c.client_id, c.clone());
        self.record_write();
        Ok(())
    }

    async fn client_get(&self, id: ClientId) -> CovenantResult<Option<Client>> {
        let clients = read(&self.clients)?;
        Ok(clients.get(&id).cloned())
    }

    async fn client_find_by_email(&self, email: &str) -> CovenantResult<Option<Client>> {
        let clients = read(&self.clients)?;
        Ok(clients.values().find(|c| c.email == email).cloned())
    }

    async fn client_update(
        &self,
        id: ClientId,
        update: ClientUpdate,
        expected_version: i64,
    ) -> CovenantResult<Client> {
        self.check_writable()?;
        let mut clients = write(&self.clients)?;
        let client = clients
            .get_mut(&id)
            .ok_or_else(|| CovenantError::Storage(StorageError::not_found(EntityType::Client, id)))?;

        if client.version != expected_version {
            return Err(CovenantError::Storage(StorageError::VersionConflict {
                entity_type: EntityType::Client,
                id: id.as_uuid(),
                expected: expected_version,
                actual: client.version,
            }));
        }

        if let Some(status) = update.status {
            client.status = status;
        }
        if let Some(metadata) = update.metadata {
            client.metadata = metadata;
        }
        client.version += 1;
        client.updated_at = chrono::Utc::now();

        self.record_write();
        Ok(client.clone())
    }

    // === Payment Link Operations ===

    async fn link_insert(&self, l: &PaymentLink) -> CovenantResult<()> {
        self.check_writable()?;
        let mut links = write(&self.links)?;
        if links.contains_key(&l.link_id) {
            return Err(CovenantError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::PaymentLink,
                reason: "already exists".to_string(),
            }));
        }
        links.insert(l.link_id, l.clone());
        self.record_write();
        Ok(())
    }

    async fn link_get(&self, id: LinkId) -> CovenantResult<Option<PaymentLink>> {
        let links = read(&self.links)?;
        Ok(links.get(&id).cloned())
    }

    async fn link_get_with_client(
        &self,
        id: LinkId,
    ) -> CovenantResult<Option<(PaymentLink, Client)>> {
        let link = match read(&self.links)?.get(&id).cloned() {
            Some(link) => link,
            None => return Ok(None),
        };
        let client = read(&self.clients)?.get(&link.client_id).cloned();
        Ok(client.map(|c| (link, c)))
    }

    async fn link_update(
        &self,
        id: LinkId,
        update: PaymentLinkUpdate,
    ) -> CovenantResult<PaymentLink> {
        self.check_writable()?;
        let mut links = write(&self.links)?;
        let link = links.get_mut(&id).ok_or_else(|| {
            CovenantError::Storage(StorageError::not_found(EntityType::PaymentLink, id))
        })?;

        if let Some(is_active) = update.is_active {
            link.is_active = is_active;
        }

        self.record_write();
        Ok(link.clone())
    }

    async fn link_delete(&self, id: LinkId) -> CovenantResult<()> {
        self.check_writable()?;
        let mut links = write(&self.links)?;
        links.remove(&id).ok_or_else(|| {
            CovenantError::Storage(StorageError::not_found(EntityType::PaymentLink, id))
        })?;
        self.record_write();
        Ok(())
    }

    // === Transaction Operations ===

    async fn transaction_insert(&self, t: &Transaction) -> CovenantResult<()> {
        self.check_writable()?;
        let mut transactions = write(&self.transactions)?;
        if transactions.contains_key(&t.transaction_id) {
            return Err(CovenantError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Transaction,
                reason: "already exists".to_string(),
            }));
        }
        transactions.insert(t.transaction_id, t.clone());
        self.record_write();
        Ok(())
    }

    async fn transaction_update(
        &self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> CovenantResult<Transaction> {
        self.check_writable()?;
        let mut transactions = write(&self.transactions)?;
        let transaction = transactions.get_mut(&id).ok_or_else(|| {
            CovenantError::Storage(StorageError::not_found(EntityType::Transaction, id))
        })?;

        if let Some(status) = update.status {
            transaction.status = status;
        }
        if let Some(processed_at) = update.processed_at {
            transaction.processed_at = Some(processed_at);
        }

        self.record_write();
        Ok(transaction.clone())
    }

    async fn transaction_list_by_link(&self, link_id: LinkId) -> CovenantResult<Vec<Transaction>> {
        let transactions = read(&self.transactions)?;
        let mut result: Vec<Transaction> = transactions
            .values()
            .filter(|t| t.link_id == Some(link_id))
            .cloned()
            .collect();
        result.sort_by_key(|t| (t.created_at, t.transaction_id));
        Ok(result)
    }

    // === Template Operations ===

    async fn template_get(&self, id: &str) -> CovenantResult<Option<SowTemplate>> {
        let templates = read(&self.templates)?;
        Ok(templates.get(id).cloned())
    }

    // === Health ===

    async fn health_check(&self) -> CovenantResult<bool> {
        Ok(!self.fail_writes.load(Ordering::SeqCst))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_core::{ClientStatus, PaymentMethod, TransactionStatus};

    fn make_test_link(client_id: ClientId) -> PaymentLink {
        PaymentLink {
            link_id: LinkId::now_v7(),
            client_id,
            title: "Consulting Retainer".to_string(),
            amount: "1200".to_string(),
            currency: "USD".to_string(),
            description: None,
            methods: PaymentMethod::ALL.into_iter().collect(),
            destination_wallet: None,
            is_active: true,
            tier: None,
            created_by: "test".to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    fn make_test_transaction(link: &PaymentLink) -> Transaction {
        Transaction {
            transaction_id: TransactionId::now_v7(),
            link_id: Some(link.link_id),
            client_id: link.client_id,
            amount: link.amount.clone(),
            currency: link.currency.clone(),
            method: PaymentMethod::Wire,
            status: TransactionStatus::Pending,
            processed_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    // ========================================================================
    // Client Tests
    // ========================================================================

    #[tokio::test]
    async fn test_client_insert_get_and_find_by_email() {
        let storage = MockStorage::new();
        let client = Client::new_lead("a@b.com", "Ada");
        storage.client_insert(&client).await.unwrap();

        let by_id = storage.client_get(client.client_id).await.unwrap();
        assert_eq!(by_id.map(|c| c.client_id), Some(client.client_id));

        let by_email = storage.client_find_by_email("a@b.com").await.unwrap();
        assert!(by_email.is_some());
        assert!(storage.client_find_by_email("x@y.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_client_update_bumps_version() {
        let storage = MockStorage::new();
        let client = Client::new_lead("a@b.com", "Ada");
        storage.client_insert(&client).await.unwrap();

        let updated = storage
            .client_update(
                client.client_id,
                ClientUpdate {
                    status: Some(ClientStatus::Negotiating),
                    ..Default::default()
                },
                0,
            )
            .await
            .unwrap();

        assert_eq!(updated.status, ClientStatus::Negotiating);
        assert_eq!(updated.version, 1);
    }

    #[tokio::test]
    async fn test_client_update_rejects_stale_version() {
        let storage = MockStorage::new();
        let client = Client::new_lead("a@b.com", "Ada");
        storage.client_insert(&client).await.unwrap();
        storage
            .client_update(client.client_id, ClientUpdate::default(), 0)
            .await
            .unwrap();

        let err = storage
            .client_update(
                client.client_id,
                ClientUpdate {
                    status: Some(ClientStatus::ClosedLost),
                    ..Default::default()
                },
                0,
            )
            .await
            .unwrap_err();

        assert!(err.is_version_conflict());
        let stored = storage.client_get(client.client_id).await.unwrap().unwrap();
        assert_eq!(stored.status, ClientStatus::Lead);
    }

    #[tokio::test]
    async fn test_client_update_not_found() {
        let storage = MockStorage::new();
        let err = storage
            .client_update(ClientId::now_v7(), ClientUpdate::default(), 0)
            .await
            .unwrap_err();
        assert_eq!(err.not_found_entity(), Some(EntityType::Client));
    }

    // ========================================================================
    // Link Tests
    // ========================================================================

    #[tokio::test]
    async fn test_link_get_with_client_requires_both_rows() {
        let storage = MockStorage::new();
        let client = Client::new_lead("a@b.com", "Ada");
        let link = make_test_link(client.client_id);
        storage.link_insert(&link).await.unwrap();

        assert!(storage.link_get_with_client(link.link_id).await.unwrap().is_none());

        storage.client_insert(&client).await.unwrap();
        let (l, c) = storage
            .link_get_with_client(link.link_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(l.link_id, link.link_id);
        assert_eq!(c.client_id, client.client_id);
    }

    #[tokio::test]
    async fn test_link_update_and_delete() {
        let storage = MockStorage::new();
        let link = make_test_link(ClientId::now_v7());
        storage.link_insert(&link).await.unwrap();

        let updated = storage
            .link_update(link.link_id, PaymentLinkUpdate { is_active: Some(false) })
            .await
            .unwrap();
        assert!(!updated.is_active);

        storage.link_delete(link.link_id).await.unwrap();
        assert!(storage.link_get(link.link_id).await.unwrap().is_none());
        assert!(storage.link_delete(link.link_id).await.is_err());
    }

    // ========================================================================
    // Transaction Tests
    // ========================================================================

    #[tokio::test]
    async fn test_transaction_update_and_list_by_link() {
        let storage = MockStorage::new();
        let link = make_test_link(ClientId::now_v7());
        let t1 = make_test_transaction(&link);
        let t2 = make_test_transaction(&link);
        let other = make_test_transaction(&make_test_link(ClientId::now_v7()));
        storage.transaction_insert(&t1).await.unwrap();
        storage.transaction_insert(&t2).await.unwrap();
        storage.transaction_insert(&other).await.unwrap();

        let now = chrono::Utc::now();
        let updated = storage
            .transaction_update(
                t1.transaction_id,
                TransactionUpdate {
                    status: Some(TransactionStatus::Completed),
                    processed_at: Some(now),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TransactionStatus::Completed);
        assert_eq!(updated.processed_at, Some(now));

        let listed = storage.transaction_list_by_link(link.link_id).await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    // ========================================================================
    // Failure Injection Tests
    // ========================================================================

    #[tokio::test]
    async fn test_fail_writes_blocks_inserts_and_counts_nothing() {
        let storage = MockStorage::new();
        storage.set_fail_writes(true);

        let client = Client::new_lead("a@b.com", "Ada");
        assert!(storage.client_insert(&client).await.is_err());
        assert_eq!(storage.write_count(), 0);
        assert!(!storage.health_check().await.unwrap());

        storage.set_fail_writes(false);
        storage.client_insert(&client).await.unwrap();
        assert_eq!(storage.write_count(), 1);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime")
            .block_on(f)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Getting a non-existent entity returns Ok(None).
        #[test]
        fn prop_storage_not_found_returns_none(_dummy in any::<u8>()) {
            let storage = MockStorage::new();
            block_on(async {
                prop_assert!(storage.client_get(ClientId::now_v7()).await.unwrap().is_none());
                prop_assert!(storage.link_get(LinkId::now_v7()).await.unwrap().is_none());
                prop_assert!(storage.template_get("missing").await.unwrap().is_none());
                Ok(())
            })?;
        }

        /// Only the writer holding the current version succeeds; the version
        /// ends at exactly the number of successful updates.
        #[test]
        fn prop_cas_version_counts_successes(versions in prop::collection::vec(0i64..6, 1..12)) {
            let storage = MockStorage::new();
            let client = Client::new_lead("cas@example.com", "Cas");
            block_on(async {
                storage.client_insert(&client).await.unwrap();
                let mut successes = 0i64;
                for expected in versions {
                    let result = storage
                        .client_update(client.client_id, ClientUpdate::default(), expected)
                        .await;
                    if expected == successes {
                        prop_assert!(result.is_ok());
                        successes += 1;
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
                let stored = storage.client_get(client.client_id).await.unwrap().unwrap();
                prop_assert_eq!(stored.version, successes);
                Ok(())
            })?;
        }

        /// Duplicate insert returns error.
        #[test]
        fn prop_duplicate_insert_returns_error(_dummy in any::<u8>()) {
            let storage = MockStorage::new();
            let client = Client::new_lead("dup@example.com", "Dup");
            block_on(async {
                storage.client_insert(&client).await.unwrap();
                prop_assert!(storage.client_insert(&client).await.is_err());
                Ok(())
            })?;
        }
    }
}

//! Covenant Test Utilities
//!
//! Centralized test infrastructure for the Covenant workspace:
//! - A harness wiring in-memory storage and notifier into a lifecycle manager
//! - A store wrapper that injects a competing client write
//! - Proptest generators for entity and enum types
//! - Test fixtures for common scenarios
//! - Custom assertions for lifecycle results

use std::sync::{Arc, Mutex};

// Re-export the in-memory backends from their source crates
pub use covenant_notify::MockNotifier;
pub use covenant_storage::MockStorage;

// Re-export core types for convenience
pub use covenant_core::{
    Client, ClientId, ClientStatus, CovenantError, CovenantResult, EntityIdType, EntityType,
    LinkId, MsaStatus, PaymentLink, PaymentMethod, ProtocolMetadata, ProtocolState,
    SowTemplate, StorageError, Tier, Timestamp, Transaction, TransactionId, TransactionStatus,
};
pub use covenant_lifecycle::{ActionResult, LifecycleConfig, LifecycleManager};

use async_trait::async_trait;
use covenant_storage::{ClientUpdate, LifecycleStore, PaymentLinkUpdate, TransactionUpdate};

// ============================================================================
// TEST HARNESS
// ============================================================================

/// A lifecycle manager over in-memory storage and a recording notifier,
/// with handles to both for inspection.
pub struct TestHarness {
    pub storage: Arc<MockStorage>,
    pub notifier: MockNotifier,
    pub manager: LifecycleManager,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(fixtures::test_config())
    }

    pub fn with_config(config: LifecycleConfig) -> Self {
        let storage = Arc::new(MockStorage::new());
        let notifier = MockNotifier::new();
        let manager =
            LifecycleManager::new(storage.clone(), Arc::new(notifier.clone()), config);
        Self {
            storage,
            notifier,
            manager,
        }
    }

    /// Harness whose manager writes through a [`RacingStore`].
    pub fn racing() -> (Self, Arc<RacingStore>) {
        Self::racing_with_config(fixtures::test_config())
    }

    pub fn racing_with_config(config: LifecycleConfig) -> (Self, Arc<RacingStore>) {
        let storage = Arc::new(MockStorage::new());
        let racing = Arc::new(RacingStore::new(storage.clone()));
        let notifier = MockNotifier::new();
        let manager = LifecycleManager::new(racing.clone(), Arc::new(notifier.clone()), config);
        (
            Self {
                storage,
                notifier,
                manager,
            },
            racing,
        )
    }

    /// Insert a lead client.
    pub async fn seed_client(&self, name: &str, email: &str) -> Client {
        let client = Client::new_lead(email, name);
        self.storage
            .client_insert(&client)
            .await
            .expect("seed client");
        client
    }

    /// Insert a payment link.
    pub async fn seed_link(&self, link: &PaymentLink) {
        self.storage.link_insert(link).await.expect("seed link");
    }

    /// Current stored client. Panics when missing.
    pub async fn client(&self, client_id: ClientId) -> Client {
        self.storage
            .client_get(client_id)
            .await
            .expect("client read")
            .expect("client exists")
    }

    /// Current stored protocol view. Panics when missing or malformed.
    pub async fn protocol(&self, client_id: ClientId) -> ProtocolMetadata {
        let client = self.client(client_id).await;
        ProtocolMetadata::from_metadata(&client.metadata).expect("protocol parses")
    }

    /// Number of completed transactions stored for a link.
    pub fn completed_transactions(&self, link_id: LinkId) -> usize {
        self.storage
            .all_transactions()
            .iter()
            .filter(|t| t.link_id == Some(link_id) && t.status == TransactionStatus::Completed)
            .count()
    }
}

// ============================================================================
// RACING STORE
// ============================================================================

type RivalWrite = Box<dyn FnOnce(&Client) -> ClientUpdate + Send>;

/// Store wrapper that lands one competing client write just before the next
/// `client_update`, so the caller's snapshot is stale when it writes.
pub struct RacingStore {
    inner: Arc<MockStorage>,
    rival: Mutex<Option<RivalWrite>>,
}

impl RacingStore {
    pub fn new(inner: Arc<MockStorage>) -> Self {
        Self {
            inner,
            rival: Mutex::new(None),
        }
    }

    /// Arm a competing write. `rival` receives the client as stored at the
    /// moment of the race and returns the update the other writer applies.
    pub fn race_next_client_update<F>(&self, rival: F)
    where
        F: FnOnce(&Client) -> ClientUpdate + Send + 'static,
    {
        if let Ok(mut slot) = self.rival.lock() {
            *slot = Some(Box::new(rival));
        }
    }

    fn take_rival(&self) -> Option<RivalWrite> {
        self.rival.lock().ok().and_then(|mut slot| slot.take())
    }
}

#[async_trait]
impl LifecycleStore for RacingStore {
    async fn client_insert(&self, c: &Client) -> CovenantResult<()> {
        self.inner.client_insert(c).await
    }

    async fn client_get(&self, id: ClientId) -> CovenantResult<Option<Client>> {
        self.inner.client_get(id).await
    }

    async fn client_find_by_email(&self, email: &str) -> CovenantResult<Option<Client>> {
        self.inner.client_find_by_email(email).await
    }

    async fn client_update(
        &self,
        id: ClientId,
        update: ClientUpdate,
        expected_version: i64,
    ) -> CovenantResult<Client> {
        if let Some(rival) = self.take_rival() {
            if let Some(current) = self.inner.client_get(id).await? {
                let competing = rival(&current);
                self.inner
                    .client_update(id, competing, current.version)
                    .await?;
            }
        }
        self.inner.client_update(id, update, expected_version).await
    }

    async fn link_insert(&self, l: &PaymentLink) -> CovenantResult<()> {
        self.inner.link_insert(l).await
    }

    async fn link_get(&self, id: LinkId) -> CovenantResult<Option<PaymentLink>> {
        self.inner.link_get(id).await
    }

    async fn link_get_with_client(
        &self,
        id: LinkId,
    ) -> CovenantResult<Option<(PaymentLink, Client)>> {
        self.inner.link_get_with_client(id).await
    }

    async fn link_update(
        &self,
        id: LinkId,
        update: PaymentLinkUpdate,
    ) -> CovenantResult<PaymentLink> {
        self.inner.link_update(id, update).await
    }

    async fn link_delete(&self, id: LinkId) -> CovenantResult<()> {
        self.inner.link_delete(id).await
    }

    async fn transaction_insert(&self, t: &Transaction) -> CovenantResult<()> {
        self.inner.transaction_insert(t).await
    }

    async fn transaction_update(
        &self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> CovenantResult<Transaction> {
        self.inner.transaction_update(id, update).await
    }

    async fn transaction_list_by_link(&self, link_id: LinkId) -> CovenantResult<Vec<Transaction>> {
        self.inner.transaction_list_by_link(link_id).await
    }

    async fn template_get(&self, id: &str) -> CovenantResult<Option<SowTemplate>> {
        self.inner.template_get(id).await
    }

    async fn health_check(&self) -> CovenantResult<bool> {
        self.inner.health_check().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Covenant types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    // === Identity Type Generators ===

    /// Generate a random UUID (for generic ID generation).
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_client_id() -> impl Strategy<Value = ClientId> {
        arb_uuid().prop_map(ClientId::new)
    }

    pub fn arb_link_id() -> impl Strategy<Value = LinkId> {
        arb_uuid().prop_map(LinkId::new)
    }

    // === Enum Generators ===

    pub fn arb_tier() -> impl Strategy<Value = Tier> {
        prop_oneof![Just(Tier::Tier1), Just(Tier::Tier2), Just(Tier::Tier3)]
    }

    pub fn arb_client_status() -> impl Strategy<Value = ClientStatus> {
        prop_oneof![
            Just(ClientStatus::Lead),
            Just(ClientStatus::Negotiating),
            Just(ClientStatus::ClosedWon),
            Just(ClientStatus::ClosedLost),
        ]
    }

    pub fn arb_payment_method() -> impl Strategy<Value = PaymentMethod> {
        prop_oneof![
            Just(PaymentMethod::Stripe),
            Just(PaymentMethod::Crypto),
            Just(PaymentMethod::Wire),
        ]
    }

    /// Known protocol states plus the occasional unrecognized one.
    pub fn arb_protocol_state() -> impl Strategy<Value = ProtocolState> {
        prop_oneof![
            8 => prop_oneof![
                Just(ProtocolState::ActiveTier1),
                Just(ProtocolState::ActiveTier2),
                Just(ProtocolState::ActiveTier3),
                Just(ProtocolState::ApprovedTier1),
                Just(ProtocolState::ApprovedTier2),
                Just(ProtocolState::InProgressTier1),
                Just(ProtocolState::InProgressTier2),
                Just(ProtocolState::InProgressTier3),
                Just(ProtocolState::Deployed),
            ],
            1 => "[A-Z_]{3,12}".prop_map(ProtocolState::from),
        ]
    }

    // === Value Generators ===

    /// Positive decimal amount strings such as "7", "250", "49.90".
    pub fn arb_amount() -> impl Strategy<Value = String> {
        (1u32..100_000, proptest::option::of(0u32..100)).prop_map(|(whole, cents)| match cents {
            Some(c) => format!("{}.{:02}", whole, c),
            None => whole.to_string(),
        })
    }

    pub fn arb_email() -> impl Strategy<Value = String> {
        ("[a-z]{1,10}", "[a-z]{2,10}").prop_map(|(local, domain)| format!("{}@{}.com", local, domain))
    }

    pub fn arb_client() -> impl Strategy<Value = Client> {
        (arb_email(), "[A-Z][a-z]{1,12}", arb_client_status()).prop_map(|(email, name, status)| {
            let mut client = Client::new_lead(email, name);
            client.status = status;
            client
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;
    use chrono::Utc;

    /// Lifecycle configuration with recognizable test values.
    pub fn test_config() -> LifecycleConfig {
        LifecycleConfig {
            app_base_url: "https://app.test".to_string(),
            brand_name: "Covenant Test".to_string(),
            general_public_email: "public@covenant.test".to_string(),
            general_public_name: "General Public".to_string(),
            created_by: "protocol-admin".to_string(),
            default_currency: "USD".to_string(),
            metadata_retry_limit: 3,
        }
    }

    /// A lead client that has never been contacted.
    pub fn lead_client() -> Client {
        Client::new_lead("ada@lovelace.dev", "Ada Lovelace")
    }

    /// A link tagged with a SOW tier, priced from the tier table.
    pub fn tier_link(client_id: ClientId, tier: Tier) -> PaymentLink {
        PaymentLink {
            link_id: LinkId::now_v7(),
            client_id,
            title: tier.default_title().to_string(),
            amount: tier.default_amount().to_string(),
            currency: "USD".to_string(),
            description: Some(format!("Payment for {} Execution", tier.label())),
            methods: PaymentMethod::ALL.into_iter().collect(),
            destination_wallet: None,
            is_active: true,
            tier: Some(tier),
            created_by: "protocol-admin".to_string(),
            created_at: Utc::now(),
        }
    }

    /// An untagged link; classification falls back to the title.
    pub fn titled_link(client_id: ClientId, title: &str, amount: &str) -> PaymentLink {
        PaymentLink {
            link_id: LinkId::now_v7(),
            client_id,
            title: title.to_string(),
            amount: amount.to_string(),
            currency: "USD".to_string(),
            description: None,
            methods: [PaymentMethod::Wire].into_iter().collect(),
            destination_wallet: None,
            is_active: true,
            tier: None,
            created_by: "admin".to_string(),
            created_at: Utc::now(),
        }
    }

    /// A stored SOW template.
    pub fn template(template_id: &str, content: &str) -> SowTemplate {
        SowTemplate {
            template_id: template_id.to_string(),
            name: format!("Template {}", template_id),
            tier: None,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for lifecycle results and stored state.

    use super::*;

    /// Assert that an operation succeeded and return its data.
    #[track_caller]
    pub fn assert_success<T: std::fmt::Debug + Clone>(result: &ActionResult<T>) -> T {
        assert!(result.success, "Expected success, got: {:?}", result);
        assert!(result.error.is_none(), "Success carried an error: {:?}", result);
        result
            .data
            .clone()
            .unwrap_or_else(|| panic!("Success without data: {:?}", result))
    }

    /// Assert that an operation failed with exactly `message`.
    #[track_caller]
    pub fn assert_failure<T: std::fmt::Debug>(result: &ActionResult<T>, message: &str) {
        assert!(!result.success, "Expected failure, got: {:?}", result);
        assert_eq!(result.error.as_deref(), Some(message), "Wrong error message");
        assert!(result.data.is_none(), "Failure carried data: {:?}", result);
    }

    /// Assert that an operation failed with `"<Entity> not found"`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &ActionResult<T>, entity_type: EntityType) {
        assert_failure(result, &format!("{} not found", entity_type.display_name()));
    }

    /// Assert the `SOW-<TIER>-<6 uppercase hex>` id shape.
    #[track_caller]
    pub fn assert_sow_id_shape(sow_id: &str, tier: Tier) {
        let prefix = format!("SOW-{}-", tier.as_db_str());
        let suffix = sow_id
            .strip_prefix(&prefix)
            .unwrap_or_else(|| panic!("{} does not start with {}", sow_id, prefix));
        assert_eq!(suffix.len(), 6, "Suffix of {} is not 6 chars", sow_id);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()),
            "Suffix of {} is not uppercase hex",
            sow_id
        );
    }

    /// Assert the exact set of approved tiers.
    #[track_caller]
    pub fn assert_approved(protocol: &ProtocolMetadata, expected: &[Tier]) {
        let actual: Vec<Tier> = protocol.approved_tiers.iter().copied().collect();
        let mut expected = expected.to_vec();
        expected.sort();
        assert_eq!(actual, expected, "Approved tiers differ");
    }
}

// ============================================================================
// TESTS
// ============================================================================

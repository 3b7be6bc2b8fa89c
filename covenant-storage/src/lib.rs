//! Covenant Storage - Persistence Gateway Trait and Mock Implementation
//!
//! Defines the storage abstraction the lifecycle manager depends on.
//! The gateway enforces no business invariants; it offers single-row
//! inserts/gets/updates, one joined read (link with its owning client) and a
//! compare-and-swap client update keyed on `Client.version`.

mod mock;

pub use mock::MockStorage;

use async_trait::async_trait;
use covenant_core::{
    Client, ClientId, ClientStatus, CovenantResult, LinkId, PaymentLink, SowTemplate, Timestamp,
    Transaction, TransactionId, TransactionStatus,
};

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for clients.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    /// New sales status
    pub status: Option<ClientStatus>,
    /// Replacement metadata document (already merged by the caller)
    pub metadata: Option<serde_json::Value>,
}

impl ClientUpdate {
    /// True when applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.metadata.is_none()
    }
}

/// Update payload for payment links.
#[derive(Debug, Clone, Default)]
pub struct PaymentLinkUpdate {
    /// Whether the link accepts payments
    pub is_active: Option<bool>,
}

/// Update payload for transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    /// New status
    pub status: Option<TransactionStatus>,
    /// When an admin processed the transaction
    pub processed_at: Option<Timestamp>,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Persistence gateway for the client engagement lifecycle.
///
/// Implementations must make `client_update` atomic with respect to the
/// version check: the row is written only when its stored `version` equals
/// `expected_version`, and the stored version is incremented on success.
/// A mismatch returns `StorageError::VersionConflict`.
#[async_trait]
pub trait LifecycleStore: Send + Sync {
    // ========================================================================
    // CLIENT OPERATIONS
    // ========================================================================

    /// Insert a new client.
    async fn client_insert(&self, c: &Client) -> CovenantResult<()>;

    /// Get a client by ID.
    async fn client_get(&self, id: ClientId) -> CovenantResult<Option<Client>>;

    /// Find a client by exact email.
    async fn client_find_by_email(&self, email: &str) -> CovenantResult<Option<Client>>;

    /// Compare-and-swap update of a client. Returns the stored row.
    async fn client_update(
        &self,
        id: ClientId,
        update: ClientUpdate,
        expected_version: i64,
    ) -> CovenantResult<Client>;

    // ========================================================================
    // PAYMENT LINK OPERATIONS
    // ========================================================================

    /// Insert a new payment link.
    async fn link_insert(&self, l: &PaymentLink) -> CovenantResult<()>;

    /// Get a payment link by ID.
    async fn link_get(&self, id: LinkId) -> CovenantResult<Option<PaymentLink>>;

    /// Get a payment link together with its owning client.
    ///
    /// Returns `None` when either side of the join is missing.
    async fn link_get_with_client(
        &self,
        id: LinkId,
    ) -> CovenantResult<Option<(PaymentLink, Client)>>;

    /// Update a payment link. Returns the stored row.
    async fn link_update(&self, id: LinkId, update: PaymentLinkUpdate)
        -> CovenantResult<PaymentLink>;

    /// Delete a payment link.
    async fn link_delete(&self, id: LinkId) -> CovenantResult<()>;

    // ========================================================================
    // TRANSACTION OPERATIONS
    // ========================================================================

    /// Insert a new transaction.
    async fn transaction_insert(&self, t: &Transaction) -> CovenantResult<()>;

    /// Update a transaction. Returns the stored row.
    async fn transaction_update(
        &self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> CovenantResult<Transaction>;

    /// List transactions recorded against a link, oldest first.
    async fn transaction_list_by_link(&self, link_id: LinkId) -> CovenantResult<Vec<Transaction>>;

    // ========================================================================
    // TEMPLATE OPERATIONS
    // ========================================================================

    /// Get a SOW template by key.
    async fn template_get(&self, id: &str) -> CovenantResult<Option<SowTemplate>>;

    // ========================================================================
    // HEALTH & DIAGNOSTICS
    // ========================================================================

    /// Check if the storage backend is healthy.
    async fn health_check(&self) -> CovenantResult<bool>;
}

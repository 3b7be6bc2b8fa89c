//! Core entity structures

use crate::{
    ClientId, ClientStatus, EntityIdType, LinkId, PaymentMethod, TemplateId, Tier, Timestamp,
    TransactionId, TransactionStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Client - a prospective or active customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub client_id: ClientId,
    pub email: String,
    pub name: String,
    pub company: Option<String>,
    pub status: ClientStatus,
    /// Open JSON document; `metadata.protocol` is owned by the lifecycle
    /// manager and read through [`crate::ProtocolMetadata`].
    pub metadata: serde_json::Value,
    /// Optimistic concurrency token, bumped by every successful update.
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Client {
    /// Build a new lead with empty metadata.
    pub fn new_lead(email: impl Into<String>, name: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            client_id: ClientId::now_v7(),
            email: email.into(),
            name: name.into(),
            company: None,
            status: ClientStatus::Lead,
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// PaymentLink - a payable invoice owned by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub link_id: LinkId,
    pub client_id: ClientId,
    pub title: String,
    /// Decimal amount kept as a string to avoid float rounding.
    pub amount: String,
    pub currency: String,
    pub description: Option<String>,
    pub methods: BTreeSet<PaymentMethod>,
    pub destination_wallet: Option<String>,
    pub is_active: bool,
    /// Tier this link bills for; `None` for direct links.
    pub tier: Option<Tier>,
    pub created_by: String,
    pub created_at: Timestamp,
}

/// Transaction - a payment attempt or result against a payment link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub link_id: Option<LinkId>,
    pub client_id: ClientId,
    pub amount: String,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub processed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// SowTemplate - admin-defined SOW document with placeholder tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SowTemplate {
    pub template_id: TemplateId,
    pub name: String,
    pub tier: Option<Tier>,
    pub content: String,
    pub created_at: Timestamp,
}

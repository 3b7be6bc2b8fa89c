//! Link Service
//!
//! Direct (non-SOW) payment links owned by the General Public client, and
//! link administration.

use chrono::Utc;
use covenant_core::{
    Client, CovenantResult, EntityIdType, LinkId, PaymentLink, PaymentMethod, ValidationError,
};
use covenant_storage::PaymentLinkUpdate;
use serde::{Deserialize, Serialize};

use crate::manager::LifecycleManager;
use crate::result::{finish, ActionResult, Delivered};
use crate::services::validate_amount;

/// Input for [`LifecycleManager::create_payment_link`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentLinkRequest {
    pub title: String,
    /// Positive decimal amount, e.g. "49.90".
    pub amount: String,
    /// Defaults to the configured currency.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Empty means every method.
    #[serde(default)]
    pub methods: Vec<PaymentMethod>,
    #[serde(default)]
    pub destination_wallet: Option<String>,
}

impl LifecycleManager {
    /// Create an ad-hoc payment link owned by the General Public client.
    ///
    /// The sentinel client is created on first use. Direct links carry no
    /// tier tag and never touch protocol metadata.
    pub async fn create_payment_link(
        &self,
        request: CreatePaymentLinkRequest,
    ) -> ActionResult<PaymentLink> {
        finish(
            self.create_direct_link(request).await,
            "create payment link",
        )
    }

    /// Enable or disable a payment link.
    pub async fn set_payment_link_active(
        &self,
        link_id: LinkId,
        is_active: bool,
    ) -> ActionResult<PaymentLink> {
        let outcome = self
            .store
            .link_update(
                link_id,
                PaymentLinkUpdate {
                    is_active: Some(is_active),
                },
            )
            .await
            .map(Delivered::quiet);
        if outcome.is_ok() {
            tracing::info!(link_id = %link_id, is_active, "Payment link toggled");
        }
        finish(outcome, "update payment link")
    }

    /// Delete a payment link.
    pub async fn delete_payment_link(&self, link_id: LinkId) -> ActionResult<()> {
        let outcome = self.store.link_delete(link_id).await.map(Delivered::quiet);
        if outcome.is_ok() {
            tracing::info!(link_id = %link_id, "Payment link deleted");
        }
        finish(outcome, "delete payment link")
    }

    async fn create_direct_link(
        &self,
        request: CreatePaymentLinkRequest,
    ) -> CovenantResult<Delivered<PaymentLink>> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "title".to_string(),
            }
            .into());
        }
        let amount = validate_amount(&request.amount)?;

        let owner = self.general_public_client().await?;
        let methods = if request.methods.is_empty() {
            PaymentMethod::ALL.into_iter().collect()
        } else {
            request.methods.into_iter().collect()
        };
        let link = PaymentLink {
            link_id: LinkId::now_v7(),
            client_id: owner.client_id,
            title: title.to_string(),
            amount,
            currency: request
                .currency
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| self.config.default_currency.clone()),
            description: request.description,
            methods,
            destination_wallet: request.destination_wallet,
            is_active: true,
            tier: None,
            created_by: self.config.created_by.clone(),
            created_at: Utc::now(),
        };
        self.store.link_insert(&link).await?;
        tracing::info!(link_id = %link.link_id, title = %link.title, "Direct payment link created");
        Ok(Delivered::quiet(link))
    }

    /// The shared client that owns direct links, created on first use.
    async fn general_public_client(&self) -> CovenantResult<Client> {
        let email = &self.config.general_public_email;
        if let Some(client) = self.store.client_find_by_email(email).await? {
            return Ok(client);
        }
        let client = Client::new_lead(email.as_str(), self.config.general_public_name.as_str());
        self.store.client_insert(&client).await?;
        tracing::info!(client_id = %client.client_id, "General Public client created");
        Ok(client)
    }
}

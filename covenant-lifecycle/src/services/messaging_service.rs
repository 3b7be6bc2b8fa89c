//! Messaging Service
//!
//! SOW delivery, MSA review and acceptance, and payment receipts. State is
//! always persisted before the email goes out; a failed email is reported
//! next to a successful result rather than failing the operation.

use chrono::Utc;
use covenant_core::{
    sow_id_for, Client, ClientId, ClientStatus, CovenantResult, EntityIdType, LinkId,
    PaymentLink, PaymentMethod, ProtocolMetadata, SowHistoryEntry, Tier, ValidationError,
    DEFAULT_TEMPLATE_ID, SOW_STATUS_SENT,
};
use covenant_render::{
    format_date, msa_email, receipt_email, resolve_sow_html, sow_email, ReceiptDetails,
    SowVariables,
};
use serde::{Deserialize, Serialize};

use crate::manager::LifecycleManager;
use crate::result::{describe_error, finish, ActionResult, Delivered};
use crate::services::validate_amount;

/// Currency of every SOW payment link.
const SOW_CURRENCY: &str = "USD";

/// A SOW that was recorded and (possibly) emailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SowSent {
    pub link_id: LinkId,
    pub sow_id: String,
    pub pay_url: String,
    /// True when the built-in document was used instead of a stored template.
    pub used_fallback: bool,
}

/// An MSA review request that was recorded and (possibly) emailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsaSent {
    pub review_url: String,
}

impl LifecycleManager {
    // ========================================================================
    // SOW
    // ========================================================================

    /// Issue the SOW for `tier`: create its payment link, record the send in
    /// the client's protocol history, then email the document with a
    /// pay-and-accept link. The link is removed again if the history entry
    /// cannot be written.
    ///
    /// `template_id` names a stored template; `None`, `"default"`, a missing
    /// template or one that renders empty all use the built-in document.
    /// `override_amount` replaces the tier's list price.
    pub async fn send_protocol_sow(
        &self,
        client_id: ClientId,
        tier: Tier,
        template_id: Option<&str>,
        override_amount: Option<&str>,
    ) -> ActionResult<SowSent> {
        finish(
            self.deliver_sow(client_id, tier, template_id, override_amount)
                .await,
            "send SOW",
        )
    }

    async fn deliver_sow(
        &self,
        client_id: ClientId,
        tier: Tier,
        template_id: Option<&str>,
        override_amount: Option<&str>,
    ) -> CovenantResult<Delivered<SowSent>> {
        let client = self.require_client(client_id).await?;
        let amount = match override_amount {
            Some(raw) => validate_amount(raw)?,
            None => tier.default_amount().to_string(),
        };

        let now = Utc::now();
        let link = PaymentLink {
            link_id: LinkId::random(),
            client_id,
            title: tier.default_title().to_string(),
            amount: amount.clone(),
            currency: SOW_CURRENCY.to_string(),
            description: Some(format!("Payment for {} Execution", tier.label())),
            methods: PaymentMethod::ALL.into_iter().collect(),
            destination_wallet: None,
            is_active: true,
            tier: Some(tier),
            created_by: self.config.created_by.clone(),
            created_at: now,
        };
        self.store.link_insert(&link).await?;

        let sow_id = sow_id_for(tier, link.link_id);
        let template_id = template_id
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_TEMPLATE_ID);
        let template = if template_id == DEFAULT_TEMPLATE_ID {
            None
        } else {
            self.store.template_get(template_id).await?
        };
        let document = resolve_sow_html(
            template.as_ref(),
            tier,
            &SowVariables {
                sow_id: sow_id.clone(),
                date: format_date(now),
                client_name: client.name.clone(),
                project_name: link.title.clone(),
                amount,
            },
        );
        if document.used_fallback && template_id != DEFAULT_TEMPLATE_ID {
            tracing::warn!(template_id, "SOW template missing or empty, using built-in");
        }

        let entry = SowHistoryEntry {
            tier,
            sow_id: sow_id.clone(),
            sent_at: now,
            link_id: link.link_id,
            status: SOW_STATUS_SENT.to_string(),
            template_id: template_id.to_string(),
        };
        let recorded = self
            .update_protocol(client, Some(ClientStatus::Negotiating), |p| {
                p.record_sow_sent(entry.clone())
            })
            .await;
        let (client, _) = match recorded {
            Ok(recorded) => recorded,
            Err(e) => {
                self.discard_link(link.link_id).await;
                return Err(e);
            }
        };
        tracing::info!(
            client_id = %client_id,
            link_id = %link.link_id,
            sow_id = %sow_id,
            "SOW recorded"
        );

        let pay_url = self.config.pay_url(link.link_id);
        let body = sow_email(
            &client.name,
            tier,
            &document.html,
            &pay_url,
            &self.config.brand_name,
        );
        let notification_error = self.notify(&client.email, body, "SOW").await;

        Ok(Delivered::new(
            SowSent {
                link_id: link.link_id,
                sow_id,
                pay_url,
                used_fallback: document.used_fallback,
            },
            notification_error,
        ))
    }

    /// Remove a SOW link whose history entry could not be recorded.
    async fn discard_link(&self, link_id: LinkId) {
        if let Err(e) = self.store.link_delete(link_id).await {
            tracing::error!(link_id = %link_id, error = %e, "Failed to remove unrecorded SOW link");
        }
    }

    // ========================================================================
    // MSA
    // ========================================================================

    /// Record that the MSA went out and email the review link.
    pub async fn send_msa_link(&self, client_id: ClientId) -> ActionResult<MsaSent> {
        finish(self.deliver_msa(client_id).await, "send MSA link")
    }

    /// Record the client's acceptance of the MSA.
    ///
    /// The signature is stored as given; it is not verified.
    pub async fn accept_msa(
        &self,
        client_id: ClientId,
        signature: &str,
    ) -> ActionResult<ProtocolMetadata> {
        finish(
            self.record_msa_acceptance(client_id, signature).await,
            "accept MSA",
        )
    }

    async fn deliver_msa(&self, client_id: ClientId) -> CovenantResult<Delivered<MsaSent>> {
        let client = self.require_client(client_id).await?;
        let now = Utc::now();
        let (client, _) = self
            .update_protocol(client, None, |p| p.mark_msa_sent(now))
            .await?;
        tracing::info!(client_id = %client_id, "MSA sent");

        let review_url = self.config.msa_url(client_id);
        let body = msa_email(&client.name, &review_url, &self.config.brand_name);
        let notification_error = self.notify(&client.email, body, "MSA").await;
        Ok(Delivered::new(MsaSent { review_url }, notification_error))
    }

    async fn record_msa_acceptance(
        &self,
        client_id: ClientId,
        signature: &str,
    ) -> CovenantResult<Delivered<ProtocolMetadata>> {
        if signature.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "signature".to_string(),
            }
            .into());
        }
        let client = self.require_client(client_id).await?;
        let now = Utc::now();
        let (_, protocol) = self
            .update_protocol(client, None, |p| p.mark_msa_accepted(signature, now))
            .await?;
        tracing::info!(client_id = %client_id, "MSA accepted");
        Ok(Delivered::quiet(protocol))
    }

    // ========================================================================
    // RECEIPTS
    // ========================================================================

    /// Re-send the payment receipt for a link.
    ///
    /// Unlike the other operations the email is the whole point here, so a
    /// delivery failure fails the call.
    pub async fn manual_send_receipt(&self, link_id: LinkId) -> ActionResult<()> {
        let (link, client) = match self.require_link_with_client(link_id).await {
            Ok(found) => found,
            Err(e) => return ActionResult::fail(describe_error(&e, "send receipt")),
        };
        match self.send_receipt(&link, &client).await {
            None => ActionResult::ok(()),
            Some(_) => ActionResult::fail("Failed to send receipt"),
        }
    }

    /// Email a receipt for `link` to `client`. Returns the notification
    /// error, if any.
    pub(crate) async fn send_receipt(&self, link: &PaymentLink, client: &Client) -> Option<String> {
        let body = receipt_email(&ReceiptDetails {
            client_name: client.name.clone(),
            product: link.title.clone(),
            amount: link.amount.clone(),
            currency: link.currency.clone(),
            date: format_date(Utc::now()),
            brand: self.config.brand_name.clone(),
        });
        self.notify(&client.email, body, "receipt").await
    }
}

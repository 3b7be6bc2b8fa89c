//! Payment Service
//!
//! Records payment events as transactions and applies what a successful
//! payment means for the paying client.

use chrono::Utc;
use covenant_core::{
    ClientId, ClientStatus, CovenantResult, EntityIdType, EntityType, ExternalPaymentStatus,
    LinkId, PaymentLink, PaymentMethod, ProtocolState, StorageError, Tier, Transaction,
    TransactionId, TransactionStatus, ValidationError,
};
use covenant_storage::{ClientUpdate, TransactionUpdate};
use serde::{Deserialize, Serialize};

use crate::manager::{status_change, LifecycleManager};
use crate::result::{finish, ActionResult, Delivered};

/// What a successful payment did to the paying client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProcessed {
    pub client_id: ClientId,
    /// SOW tier the payment was for; `None` for a direct payment.
    pub tier: Option<Tier>,
    pub client_status: ClientStatus,
    /// Protocol state after the payment, when the payment moved it.
    pub protocol_state: Option<ProtocolState>,
    pub receipt_sent: bool,
}

/// A recorded transaction and, when it completed a payment, the follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecorded {
    pub transaction: Transaction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentProcessed>,
}

/// Which SOW tier a payment link settles, if any.
///
/// The explicit tier tag wins. Untagged links fall back to matching the
/// title against "SOW Tier 1", "SOW Tier 2", "SOW Tier 3" in that order.
pub fn classify_payment(link: &PaymentLink) -> Option<Tier> {
    link.tier.or_else(|| {
        Tier::ALL
            .into_iter()
            .find(|tier| link.title.contains(tier.title_marker()))
    })
}

/// Status and protocol target for a payment of the given kind.
fn payment_outcome(tier: Option<Tier>) -> (Option<ClientStatus>, Option<ProtocolState>) {
    match tier {
        Some(Tier::Tier1) => (
            Some(ClientStatus::ClosedWon),
            Some(Tier::Tier1.in_progress_state()),
        ),
        Some(tier) => (None, Some(tier.in_progress_state())),
        None => (Some(ClientStatus::ClosedWon), None),
    }
}

impl LifecycleManager {
    // ========================================================================
    // TRANSACTION RECORDER
    // ========================================================================

    /// Record a payment event reported by a payment provider.
    ///
    /// Inserts a new transaction for the link (never edits an existing one).
    /// A `paid` event also runs [`process_payment_success`](Self::process_payment_success).
    pub async fn update_payment_status(
        &self,
        link_id: LinkId,
        status: ExternalPaymentStatus,
        method: Option<PaymentMethod>,
    ) -> ActionResult<PaymentRecorded> {
        finish(
            self.record_payment(link_id, status, method).await,
            "update payment status",
        )
    }

    /// Settle a pending transaction as completed or rejected.
    pub async fn update_transaction_status(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
    ) -> ActionResult<PaymentRecorded> {
        finish(
            self.settle_transaction(transaction_id, status).await,
            "update transaction status",
        )
    }

    /// A link's transactions, oldest first.
    pub async fn list_transactions(&self, link_id: LinkId) -> ActionResult<Vec<Transaction>> {
        finish(self.link_transactions(link_id).await, "list transactions")
    }

    // ========================================================================
    // PAYMENT SUCCESS HANDLER
    // ========================================================================

    /// Apply a successful payment on a link to its client and send a receipt.
    ///
    /// - Tier 1 SOW: client closes as won, protocol moves to `IN_PROGRESS_TIER_1`.
    /// - Tier 2/3 SOW: protocol moves to the tier's in-progress state.
    /// - Anything else: client closes as won, protocol untouched.
    ///
    /// The receipt goes out on every call, so repeated calls send repeated
    /// receipts.
    pub async fn process_payment_success(&self, link_id: LinkId) -> ActionResult<PaymentProcessed> {
        finish(
            self.apply_payment_success(link_id).await,
            "process payment success",
        )
    }

    async fn record_payment(
        &self,
        link_id: LinkId,
        status: ExternalPaymentStatus,
        method: Option<PaymentMethod>,
    ) -> CovenantResult<Delivered<PaymentRecorded>> {
        let (link, client) = self.require_link_with_client(link_id).await?;

        let now = Utc::now();
        let transaction_status = status.to_transaction_status();
        let transaction = Transaction {
            transaction_id: TransactionId::now_v7(),
            link_id: Some(link.link_id),
            client_id: client.client_id,
            amount: link.amount.clone(),
            currency: link.currency.clone(),
            method: method.unwrap_or_default(),
            status: transaction_status,
            processed_at: (transaction_status == TransactionStatus::Completed).then_some(now),
            created_at: now,
        };
        self.store.transaction_insert(&transaction).await?;
        tracing::info!(
            transaction_id = %transaction.transaction_id,
            link_id = %link_id,
            status = %status,
            "Payment recorded"
        );

        let follow_up = if status == ExternalPaymentStatus::Paid {
            self.cascade_payment_success(link_id).await?
        } else {
            Delivered::quiet(None)
        };

        Ok(Delivered::new(
            PaymentRecorded {
                transaction,
                payment: follow_up.data,
            },
            follow_up.notification_error,
        ))
    }

    async fn link_transactions(
        &self,
        link_id: LinkId,
    ) -> CovenantResult<Delivered<Vec<Transaction>>> {
        if self.store.link_get(link_id).await?.is_none() {
            return Err(StorageError::not_found(EntityType::PaymentLink, link_id).into());
        }
        Ok(Delivered::quiet(
            self.store.transaction_list_by_link(link_id).await?,
        ))
    }

    async fn settle_transaction(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
    ) -> CovenantResult<Delivered<PaymentRecorded>> {
        if status == TransactionStatus::Pending {
            return Err(ValidationError::InvalidValue {
                field: "status".to_string(),
                reason: "must be completed or rejected".to_string(),
            }
            .into());
        }

        let transaction = self
            .store
            .transaction_update(
                transaction_id,
                TransactionUpdate {
                    status: Some(status),
                    processed_at: Some(Utc::now()),
                },
            )
            .await?;
        tracing::info!(transaction_id = %transaction_id, status = %status, "Transaction settled");

        let follow_up = match (status, transaction.link_id) {
            (TransactionStatus::Completed, Some(link_id)) => {
                self.cascade_payment_success(link_id).await?
            }
            _ => Delivered::quiet(None),
        };

        Ok(Delivered::new(
            PaymentRecorded {
                transaction,
                payment: follow_up.data,
            },
            follow_up.notification_error,
        ))
    }

    /// Payment success as a follow-up step: a link or client that has gone
    /// missing is logged and skipped instead of failing the caller.
    async fn cascade_payment_success(
        &self,
        link_id: LinkId,
    ) -> CovenantResult<Delivered<Option<PaymentProcessed>>> {
        match self.apply_payment_success(link_id).await {
            Ok(delivered) => Ok(Delivered::new(
                Some(delivered.data),
                delivered.notification_error,
            )),
            Err(e) if e.not_found_entity().is_some() => {
                tracing::warn!(link_id = %link_id, error = %e, "Payment success skipped");
                Ok(Delivered::quiet(None))
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn apply_payment_success(
        &self,
        link_id: LinkId,
    ) -> CovenantResult<Delivered<PaymentProcessed>> {
        let (link, client) = self.require_link_with_client(link_id).await?;
        let tier = classify_payment(&link);
        let (status, protocol_state) = payment_outcome(tier);

        let client = match protocol_state.clone() {
            Some(target) => {
                self.update_protocol(client, status, move |p| p.advance_to(target.clone()))
                    .await?
                    .0
            }
            None => {
                self.update_client_with(client, |current| {
                    Ok(ClientUpdate {
                        status: status_change(current, status),
                        metadata: None,
                    })
                })
                .await?
            }
        };
        tracing::info!(
            client_id = %client.client_id,
            link_id = %link_id,
            tier = ?tier,
            client_status = %client.status,
            "Payment success applied"
        );

        let notification_error = self.send_receipt(&link, &client).await;
        Ok(Delivered::new(
            PaymentProcessed {
                client_id: client.client_id,
                tier,
                client_status: client.status,
                protocol_state,
                receipt_sent: notification_error.is_none(),
            },
            notification_error,
        ))
    }
}

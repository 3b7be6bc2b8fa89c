//! Protocol Service
//!
//! Reads and moves a client's informal protocol state.

use covenant_core::{ClientId, CovenantResult, ProtocolMetadata, ProtocolState};

use crate::manager::{read_protocol, LifecycleManager};
use crate::result::{describe_error, finish, ActionResult, Delivered};

impl LifecycleManager {
    /// Move a client's protocol to `target`.
    ///
    /// `APPROVED_TIER_1`, `APPROVED_TIER_2` and `DEPLOYED` also add tier 1,
    /// 2 and 3 to the approved tiers; approvals are never removed. The state
    /// itself is overwritten unconditionally. A missing client fails without
    /// a message.
    pub async fn advance_protocol_state(
        &self,
        client_id: ClientId,
        target: ProtocolState,
    ) -> ActionResult<ProtocolMetadata> {
        match self.advance(client_id, target).await {
            Ok(protocol) => ActionResult::ok(protocol),
            Err(e) if e.not_found_entity().is_some() => {
                tracing::debug!(client_id = %client_id, "Protocol advance for unknown client");
                ActionResult::fail_silent()
            }
            Err(e) => ActionResult::fail(describe_error(&e, "advance protocol state")),
        }
    }

    /// The client's protocol metadata as stored; malformed metadata reads
    /// as empty.
    pub async fn get_protocol(&self, client_id: ClientId) -> ActionResult<ProtocolMetadata> {
        let outcome = self
            .require_client(client_id)
            .await
            .map(|client| Delivered::quiet(read_protocol(&client)));
        finish(outcome, "load protocol")
    }

    async fn advance(
        &self,
        client_id: ClientId,
        target: ProtocolState,
    ) -> CovenantResult<ProtocolMetadata> {
        let client = self.require_client(client_id).await?;
        let (_, protocol) = self
            .update_protocol(client, None, |p| p.advance_to(target.clone()))
            .await?;
        tracing::info!(
            client_id = %client_id,
            state = %target,
            approved_tiers = ?protocol.approved_tiers,
            "Protocol state advanced"
        );
        Ok(protocol)
    }
}

//! Typed view over `Client.metadata.protocol`
//!
//! The client row stores an open JSON document. Everything the lifecycle
//! manager tracks about engagement progress lives under the `protocol` key;
//! this module reads it into [`ProtocolMetadata`] and writes the merged
//! structure back without touching sibling keys.
//!
//! Invariants maintained by the mutators here:
//! - `approved_tiers` only grows (set union)
//! - `sow_history` only appends
//! - `state` is last-write-wins

use crate::{
    CovenantResult, LinkId, MsaStatus, ProtocolState, TemplateId, Tier, Timestamp,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Key of the protocol object inside `Client.metadata`.
pub const PROTOCOL_KEY: &str = "protocol";

/// Version stamped on MSA acceptance.
pub const MSA_VERSION: &str = "1.0";

/// Status recorded on a SOW history entry when the document is emailed.
pub const SOW_STATUS_SENT: &str = "sent";

/// One SOW send, appended to `sow_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SowHistoryEntry {
    pub tier: Tier,
    pub sow_id: String,
    pub sent_at: Timestamp,
    pub link_id: LinkId,
    pub status: String,
    pub template_id: TemplateId,
}

/// Engagement progress tracked outside the relational schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProtocolMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ProtocolState>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub approved_tiers: BTreeSet<Tier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sow_history: Vec<SowHistoryEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msa_status: Option<MsaStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msa_sent_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msa_accepted_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msa_signature: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msa_version: Option<String>,

    /// Keys written by other tools, carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ProtocolMetadata {
    /// Read the protocol object out of a client's metadata document.
    ///
    /// A missing or `null` protocol key reads as the empty default. A present
    /// but malformed object is an error; the lifecycle manager logs it and
    /// falls back to the default.
    pub fn from_metadata(metadata: &serde_json::Value) -> CovenantResult<Self> {
        match metadata.get(PROTOCOL_KEY) {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                ValidationError::InvalidValue {
                    field: "metadata.protocol".to_string(),
                    reason: e.to_string(),
                }
                .into()
            }),
        }
    }

    /// Produce a copy of `metadata` with the protocol key replaced by `self`.
    ///
    /// Sibling keys are preserved. A non-object document is replaced by an
    /// object holding only the protocol key.
    pub fn merge_into(&self, metadata: &serde_json::Value) -> CovenantResult<serde_json::Value> {
        let protocol = serde_json::to_value(self).map_err(|e| ValidationError::InvalidValue {
            field: "metadata.protocol".to_string(),
            reason: e.to_string(),
        })?;

        let mut map = match metadata {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        map.insert(PROTOCOL_KEY.to_string(), protocol);
        Ok(serde_json::Value::Object(map))
    }

    /// Move to `target`, unioning any tier the target state approves.
    pub fn advance_to(&mut self, target: ProtocolState) {
        if let Some(tier) = target.approved_tier() {
            self.approved_tiers.insert(tier);
        }
        self.state = Some(target);
    }

    /// Append a SOW send and mark the tier active.
    pub fn record_sow_sent(&mut self, entry: SowHistoryEntry) {
        self.state = Some(entry.tier.active_state());
        self.sow_history.push(entry);
    }

    /// Record that the MSA review link went out.
    pub fn mark_msa_sent(&mut self, at: Timestamp) {
        self.msa_status = Some(MsaStatus::Sent);
        self.msa_sent_at = Some(at);
    }

    /// Record MSA acceptance with the caller-supplied signature.
    pub fn mark_msa_accepted(&mut self, signature: impl Into<String>, at: Timestamp) {
        self.msa_status = Some(MsaStatus::Accepted);
        self.msa_accepted_at = Some(at);
        self.msa_signature = Some(signature.into());
        self.msa_version = Some(MSA_VERSION.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityIdType, LinkId};
    use serde_json::json;

    fn entry(tier: Tier) -> SowHistoryEntry {
        let link_id = LinkId::now_v7();
        SowHistoryEntry {
            tier,
            sow_id: crate::sow_id_for(tier, link_id),
            sent_at: chrono::Utc::now(),
            link_id,
            status: SOW_STATUS_SENT.to_string(),
            template_id: crate::DEFAULT_TEMPLATE_ID.to_string(),
        }
    }

    #[test]
    fn test_missing_protocol_reads_default() {
        let protocol = ProtocolMetadata::from_metadata(&json!({})).unwrap();
        assert_eq!(protocol, ProtocolMetadata::default());

        let protocol = ProtocolMetadata::from_metadata(&json!({ "protocol": null })).unwrap();
        assert_eq!(protocol, ProtocolMetadata::default());
    }

    #[test]
    fn test_malformed_protocol_is_rejected() {
        let result = ProtocolMetadata::from_metadata(&json!({ "protocol": "oops" }));
        assert!(result.is_err());

        let result =
            ProtocolMetadata::from_metadata(&json!({ "protocol": { "approved_tiers": ["TIER_9"] } }));
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_preserves_sibling_and_unknown_keys() {
        let metadata = json!({
            "source": "referral",
            "protocol": { "state": "ACTIVE_TIER_1", "notes": "vip" }
        });
        let mut protocol = ProtocolMetadata::from_metadata(&metadata).unwrap();
        protocol.advance_to(ProtocolState::ApprovedTier1);

        let merged = protocol.merge_into(&metadata).unwrap();
        assert_eq!(merged["source"], json!("referral"));
        assert_eq!(merged["protocol"]["notes"], json!("vip"));
        assert_eq!(merged["protocol"]["state"], json!("APPROVED_TIER_1"));
        assert_eq!(merged["protocol"]["approved_tiers"], json!(["TIER_1"]));
    }

    #[test]
    fn test_advance_unions_tiers_once() {
        let mut protocol = ProtocolMetadata::default();
        protocol.advance_to(ProtocolState::ApprovedTier1);
        protocol.advance_to(ProtocolState::ApprovedTier1);
        protocol.advance_to(ProtocolState::InProgressTier2);

        assert_eq!(protocol.approved_tiers.len(), 1);
        assert!(protocol.approved_tiers.contains(&Tier::Tier1));
        assert_eq!(protocol.state, Some(ProtocolState::InProgressTier2));

        protocol.advance_to(ProtocolState::Deployed);
        assert!(protocol.approved_tiers.contains(&Tier::Tier3));
    }

    #[test]
    fn test_record_sow_sent_appends_and_activates() {
        let mut protocol = ProtocolMetadata::default();
        protocol.record_sow_sent(entry(Tier::Tier1));
        protocol.record_sow_sent(entry(Tier::Tier2));

        assert_eq!(protocol.sow_history.len(), 2);
        assert_eq!(protocol.sow_history[0].tier, Tier::Tier1);
        assert_eq!(protocol.state, Some(ProtocolState::ActiveTier2));
    }

    #[test]
    fn test_msa_fields_do_not_touch_tier_fields() {
        let mut protocol = ProtocolMetadata::default();
        protocol.advance_to(ProtocolState::ApprovedTier2);
        protocol.mark_msa_sent(chrono::Utc::now());
        protocol.mark_msa_accepted("0xsig", chrono::Utc::now());

        assert_eq!(protocol.msa_status, Some(MsaStatus::Accepted));
        assert_eq!(protocol.msa_signature.as_deref(), Some("0xsig"));
        assert_eq!(protocol.msa_version.as_deref(), Some(MSA_VERSION));
        assert!(protocol.msa_sent_at.is_some());
        assert_eq!(protocol.state, Some(ProtocolState::ApprovedTier2));
        assert!(protocol.approved_tiers.contains(&Tier::Tier2));
    }

    #[test]
    fn test_sow_history_serializes_with_snake_case_keys() {
        let mut protocol = ProtocolMetadata::default();
        protocol.record_sow_sent(entry(Tier::Tier3));
        let value = serde_json::to_value(&protocol).unwrap();
        let first = &value["sow_history"][0];
        assert_eq!(first["tier"], json!("TIER_3"));
        assert_eq!(first["status"], json!("sent"));
        assert_eq!(first["template_id"], json!("default"));
        assert!(first["sow_id"].as_str().unwrap().starts_with("SOW-TIER_3-"));
    }
}

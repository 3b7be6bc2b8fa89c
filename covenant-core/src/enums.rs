//! Enum types for Covenant entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CORE ENUMS
// ============================================================================

/// Entity type discriminator used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Client,
    PaymentLink,
    Transaction,
    SowTemplate,
}

impl EntityType {
    /// Human-readable name used in caller-facing error strings.
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityType::Client => "Client",
            EntityType::PaymentLink => "Payment link",
            EntityType::Transaction => "Transaction",
            EntityType::SowTemplate => "SOW template",
        }
    }
}

/// Error when parsing an invalid enum string from storage or a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

/// Implements `as_db_str`, `from_db_str`, `Display` and `FromStr` for a
/// closed string enum.
macro_rules! db_str_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Convert to database string representation.
            pub fn as_db_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Parse from database string representation.
            pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(EnumParseError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_db_str())
            }
        }

        impl FromStr for $name {
            type Err = EnumParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_db_str(s)
            }
        }
    };
}

/// Sales status of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    #[default]
    Lead,
    Negotiating,
    ClosedWon,
    ClosedLost,
}

db_str_enum!(ClientStatus, "client status", {
    Lead => "lead",
    Negotiating => "negotiating",
    ClosedWon => "closed_won",
    ClosedLost => "closed_lost",
});

/// One of the three predefined scopes of engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "TIER_1")]
    Tier1,
    #[serde(rename = "TIER_2")]
    Tier2,
    #[serde(rename = "TIER_3")]
    Tier3,
}

db_str_enum!(Tier, "tier", {
    Tier1 => "TIER_1",
    Tier2 => "TIER_2",
    Tier3 => "TIER_3",
});

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Tier1, Tier::Tier2, Tier::Tier3];

    /// Short label used in document copy ("Tier 1").
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Tier1 => "Tier 1",
            Tier::Tier2 => "Tier 2",
            Tier::Tier3 => "Tier 3",
        }
    }

    /// Substring that identifies a payment link for this tier by title.
    pub fn title_marker(&self) -> &'static str {
        match self {
            Tier::Tier1 => "SOW Tier 1",
            Tier::Tier2 => "SOW Tier 2",
            Tier::Tier3 => "SOW Tier 3",
        }
    }

    /// Default payment link title for this tier's SOW.
    pub fn default_title(&self) -> &'static str {
        match self {
            Tier::Tier1 => "SOW Tier 1 - Viability & Utility",
            Tier::Tier2 => "SOW Tier 2 - Build & Integration",
            Tier::Tier3 => "SOW Tier 3 - Scale & Deployment",
        }
    }

    /// Default amount (decimal string, USD) for this tier's SOW.
    pub fn default_amount(&self) -> &'static str {
        match self {
            Tier::Tier1 => "500",
            Tier::Tier2 => "2500",
            Tier::Tier3 => "7500",
        }
    }

    /// Protocol state once the SOW for this tier has been sent.
    pub fn active_state(&self) -> ProtocolState {
        match self {
            Tier::Tier1 => ProtocolState::ActiveTier1,
            Tier::Tier2 => ProtocolState::ActiveTier2,
            Tier::Tier3 => ProtocolState::ActiveTier3,
        }
    }

    /// Protocol state once the SOW for this tier has been paid.
    pub fn in_progress_state(&self) -> ProtocolState {
        match self {
            Tier::Tier1 => ProtocolState::InProgressTier1,
            Tier::Tier2 => ProtocolState::InProgressTier2,
            Tier::Tier3 => ProtocolState::InProgressTier3,
        }
    }
}

/// Informal workflow stage stored in `metadata.protocol.state`.
///
/// Values outside the known set are kept verbatim in [`ProtocolState::Other`]
/// so documents written by other tools survive a read-modify-write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProtocolState {
    ActiveTier1,
    ActiveTier2,
    ActiveTier3,
    ApprovedTier1,
    ApprovedTier2,
    InProgressTier1,
    InProgressTier2,
    InProgressTier3,
    Deployed,
    Other(String),
}

impl ProtocolState {
    /// Convert to the stored string representation.
    pub fn as_str(&self) -> &str {
        match self {
            ProtocolState::ActiveTier1 => "ACTIVE_TIER_1",
            ProtocolState::ActiveTier2 => "ACTIVE_TIER_2",
            ProtocolState::ActiveTier3 => "ACTIVE_TIER_3",
            ProtocolState::ApprovedTier1 => "APPROVED_TIER_1",
            ProtocolState::ApprovedTier2 => "APPROVED_TIER_2",
            ProtocolState::InProgressTier1 => "IN_PROGRESS_TIER_1",
            ProtocolState::InProgressTier2 => "IN_PROGRESS_TIER_2",
            ProtocolState::InProgressTier3 => "IN_PROGRESS_TIER_3",
            ProtocolState::Deployed => "DEPLOYED",
            ProtocolState::Other(s) => s.as_str(),
        }
    }

    /// Tier that becomes approved when a client reaches this state.
    pub fn approved_tier(&self) -> Option<Tier> {
        match self {
            ProtocolState::ApprovedTier1 => Some(Tier::Tier1),
            ProtocolState::ApprovedTier2 => Some(Tier::Tier2),
            ProtocolState::Deployed => Some(Tier::Tier3),
            _ => None,
        }
    }
}

impl From<String> for ProtocolState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ACTIVE_TIER_1" => ProtocolState::ActiveTier1,
            "ACTIVE_TIER_2" => ProtocolState::ActiveTier2,
            "ACTIVE_TIER_3" => ProtocolState::ActiveTier3,
            "APPROVED_TIER_1" => ProtocolState::ApprovedTier1,
            "APPROVED_TIER_2" => ProtocolState::ApprovedTier2,
            "IN_PROGRESS_TIER_1" => ProtocolState::InProgressTier1,
            "IN_PROGRESS_TIER_2" => ProtocolState::InProgressTier2,
            "IN_PROGRESS_TIER_3" => ProtocolState::InProgressTier3,
            "DEPLOYED" => ProtocolState::Deployed,
            _ => ProtocolState::Other(s),
        }
    }
}

impl From<ProtocolState> for String {
    fn from(state: ProtocolState) -> Self {
        match state {
            ProtocolState::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ProtocolState::from(s.to_string()))
    }
}

/// Master Service Agreement progress stored in `metadata.protocol.msa_status`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MsaStatus {
    Sent,
    Accepted,
    Other(String),
}

impl MsaStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MsaStatus::Sent => "sent",
            MsaStatus::Accepted => "accepted",
            MsaStatus::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for MsaStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "sent" => MsaStatus::Sent,
            "accepted" => MsaStatus::Accepted,
            _ => MsaStatus::Other(s),
        }
    }
}

impl From<MsaStatus> for String {
    fn from(status: MsaStatus) -> Self {
        match status {
            MsaStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// Payment rail accepted by a payment link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Stripe,
    Crypto,
    #[default]
    Wire,
}

db_str_enum!(PaymentMethod, "payment method", {
    Stripe => "stripe",
    Crypto => "crypto",
    Wire => "wire",
});

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] =
        [PaymentMethod::Stripe, PaymentMethod::Crypto, PaymentMethod::Wire];
}

/// Status of a recorded transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Rejected,
}

db_str_enum!(TransactionStatus, "transaction status", {
    Pending => "pending",
    Completed => "completed",
    Rejected => "rejected",
});

/// Payment status as reported by an external caller (admin UI or webhook).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalPaymentStatus {
    Pending,
    Paid,
    Cancelled,
}

db_str_enum!(ExternalPaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Cancelled => "cancelled",
});

impl ExternalPaymentStatus {
    /// Map the reported status onto the transaction status that gets recorded.
    ///
    /// Only `paid` completes a transaction; everything else is recorded as
    /// pending for an admin to resolve.
    pub fn to_transaction_status(&self) -> TransactionStatus {
        match self {
            ExternalPaymentStatus::Paid => TransactionStatus::Completed,
            ExternalPaymentStatus::Pending | ExternalPaymentStatus::Cancelled => {
                TransactionStatus::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_status_serializes_snake_case() {
        let json = serde_json::to_string(&ClientStatus::ClosedWon).unwrap();
        assert_eq!(json, "\"closed_won\"");
        assert_eq!(ClientStatus::from_db_str("negotiating"), Ok(ClientStatus::Negotiating));
        assert!(ClientStatus::from_db_str("won").is_err());
    }

    #[test]
    fn test_tier_serializes_with_underscore() {
        let json = serde_json::to_string(&Tier::Tier2).unwrap();
        assert_eq!(json, "\"TIER_2\"");
        let parsed: Tier = serde_json::from_str("\"TIER_3\"").unwrap();
        assert_eq!(parsed, Tier::Tier3);
    }

    #[test]
    fn test_protocol_state_keeps_unknown_values() {
        let parsed: ProtocolState = serde_json::from_str("\"ON_HOLD\"").unwrap();
        assert_eq!(parsed, ProtocolState::Other("ON_HOLD".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"ON_HOLD\"");

        let known: ProtocolState = serde_json::from_str("\"IN_PROGRESS_TIER_2\"").unwrap();
        assert_eq!(known, ProtocolState::InProgressTier2);
    }

    #[test]
    fn test_approved_tier_mapping() {
        assert_eq!(ProtocolState::ApprovedTier1.approved_tier(), Some(Tier::Tier1));
        assert_eq!(ProtocolState::ApprovedTier2.approved_tier(), Some(Tier::Tier2));
        assert_eq!(ProtocolState::Deployed.approved_tier(), Some(Tier::Tier3));
        assert_eq!(ProtocolState::ActiveTier3.approved_tier(), None);
        assert_eq!(ProtocolState::InProgressTier1.approved_tier(), None);
    }

    #[test]
    fn test_external_status_mapping() {
        assert_eq!(
            ExternalPaymentStatus::Paid.to_transaction_status(),
            TransactionStatus::Completed
        );
        assert_eq!(
            ExternalPaymentStatus::Cancelled.to_transaction_status(),
            TransactionStatus::Pending
        );
        assert_eq!(
            ExternalPaymentStatus::Pending.to_transaction_status(),
            TransactionStatus::Pending
        );
    }

    #[test]
    fn test_tier_defaults() {
        assert_eq!(Tier::Tier1.default_amount(), "500");
        assert!(Tier::Tier1.default_title().contains("Tier 1"));
        for tier in Tier::ALL {
            assert!(tier.default_title().contains(tier.title_marker()));
        }
    }
}

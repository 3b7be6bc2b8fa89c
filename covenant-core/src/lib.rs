//! Covenant Core - Entity Types
//!
//! Data structures shared by every Covenant crate: clients, payment links,
//! transactions, SOW templates, the typed protocol metadata view and the
//! error hierarchy. Collaborator traits live in their own crates; this crate
//! holds no I/O.

mod entities;
mod enums;
mod error;
mod identity;
mod protocol;

pub use entities::{Client, PaymentLink, SowTemplate, Transaction};
pub use enums::{
    ClientStatus, EntityType, EnumParseError, ExternalPaymentStatus, MsaStatus, PaymentMethod,
    ProtocolState, Tier, TransactionStatus,
};
pub use error::{
    ConfigError, CovenantError, CovenantResult, NotifyError, StorageError, ValidationError,
};
pub use identity::{
    sow_id_for, ClientId, EntityIdType, LinkId, TemplateId, Timestamp,
    TransactionId, DEFAULT_TEMPLATE_ID,
};
pub use protocol::{
    ProtocolMetadata, SowHistoryEntry, MSA_VERSION, PROTOCOL_KEY, SOW_STATUS_SENT,
};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

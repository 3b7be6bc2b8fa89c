//! Covenant Lifecycle - Client Engagement Lifecycle Manager
//!
//! Moves a client from lead to paying engagement:
//!
//! - records payment events and settles transactions
//! - applies successful payments to client status and protocol state
//! - issues tiered SOWs with a payment link and emails them
//! - sends the MSA for review and records acceptance
//! - creates direct payment links for the General Public client
//!
//! All operations live on [`LifecycleManager`] and return an
//! [`ActionResult`]. State is persisted before any email is sent; a failed
//! email shows up as `notification_error` on an otherwise successful result.
//! Concurrent writers to a client's metadata are serialized by a
//! compare-and-swap on the client's version with bounded retries.

pub mod config;
mod manager;
mod result;
mod services;
pub mod telemetry;

pub use config::LifecycleConfig;
pub use manager::LifecycleManager;
pub use result::ActionResult;
pub use services::{
    classify_payment, CreateClientRequest, CreatePaymentLinkRequest, MsaSent, PaymentProcessed,
    PaymentRecorded, SowSent,
};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};

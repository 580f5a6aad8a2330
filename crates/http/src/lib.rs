//! Logistics platform HTTP transport
//!
//! This crate owns everything that touches the wire: the per-origin
//! [`client::ApiClient`], the replayable [`client::Call`] description, the
//! tri-state [`client::Outcome`] returned by a single dispatch, structured
//! error types, and the JSON payloads exchanged with the auth, SMS, user
//! and waybill services.

pub mod client;
pub mod types;

pub use client::error::{ApiError, ClientError, ErrorInfo};
pub use client::sms::{SmsClient, SmsRoutes};
pub use client::{ApiClient, ApiClientBuilder, Call, Outcome};
pub use types::TokenPair;

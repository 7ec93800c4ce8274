//! Minimal client for the payments REST API.
//!
//! Requests are form-encoded, responses are returned as raw JSON values so
//! operation handlers can pick the fields they report.

pub mod client;
pub mod credential;
pub mod error;
pub mod fake;

use async_trait::async_trait;
use serde_json::Value;

pub use client::{PaymentsSettings, StripeClient, StripeConnector};
pub use credential::mask_secret;
pub use error::PaymentsError;
pub use fake::{Method, RecordedCall, RecordingPaymentsApi};

/// Parameters are ordered pairs. Nested fields use bracket keys such as
/// `items[0][price]`.
#[async_trait]
pub trait PaymentsApi: Send + Sync {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, PaymentsError>;
    async fn post(&self, path: &str, form: &[(String, String)]) -> Result<Value, PaymentsError>;
    async fn delete(&self, path: &str) -> Result<Value, PaymentsError>;
}

/// Builds an API client bound to one secret key.
pub trait PaymentsConnector: Send + Sync {
    fn connect(&self, secret_key: &secrecy::SecretString) -> std::sync::Arc<dyn PaymentsApi>;
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use paydesk_core::config::PaymentsConfig;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{PaymentsApi, PaymentsConnector, PaymentsError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentsSettings {
    pub base_url: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl From<&PaymentsConfig> for PaymentsSettings {
    fn from(config: &PaymentsConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_version: config.api_version.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// REST client for one secret key. Cheap to construct; the connection pool
/// lives in the shared [`reqwest::Client`].
pub struct StripeClient {
    http: Client,
    settings: PaymentsSettings,
    secret_key: SecretString,
}

impl StripeClient {
    pub fn new(http: Client, settings: PaymentsSettings, secret_key: SecretString) -> Self {
        Self { http, settings, secret_key }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Value, PaymentsError> {
        let response = request
            .bearer_auth(self.secret_key.expose_secret())
            .header("Stripe-Version", &self.settings.api_version)
            .send()
            .await
            .map_err(|error| {
                warn!(
                    event_name = "payments.client.transport_error",
                    method,
                    path,
                    error = %error,
                    "payments api request failed"
                );
                PaymentsError::Transport(error.to_string())
            })?;

        let status = response.status();
        let body =
            response.text().await.map_err(|error| PaymentsError::Transport(error.to_string()))?;

        if !status.is_success() {
            let error = PaymentsError::from_response_body(status.as_u16(), &body);
            warn!(
                event_name = "payments.client.api_error",
                method,
                path,
                status = status.as_u16(),
                error = %error,
                "payments api returned an error"
            );
            return Err(error);
        }

        debug!(
            event_name = "payments.client.response",
            method,
            path,
            status = status.as_u16(),
            "payments api call completed"
        );
        serde_json::from_str(&body).map_err(|error| PaymentsError::Decode(error.to_string()))
    }
}

#[async_trait]
impl PaymentsApi for StripeClient {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, PaymentsError> {
        let request = self.http.get(self.url(path)).query(query);
        self.send("GET", path, request).await
    }

    async fn post(&self, path: &str, form: &[(String, String)]) -> Result<Value, PaymentsError> {
        let request = self.http.post(self.url(path)).form(form);
        self.send("POST", path, request).await
    }

    async fn delete(&self, path: &str) -> Result<Value, PaymentsError> {
        let request = self.http.delete(self.url(path));
        self.send("DELETE", path, request).await
    }
}

/// Hands out [`StripeClient`]s that share one HTTP connection pool.
#[derive(Clone)]
pub struct StripeConnector {
    http: Client,
    settings: PaymentsSettings,
}

impl StripeConnector {
    pub fn new(settings: PaymentsSettings) -> Result<Self, PaymentsError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| PaymentsError::Transport(error.to_string()))?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &PaymentsSettings {
        &self.settings
    }
}

impl PaymentsConnector for StripeConnector {
    fn connect(&self, secret_key: &SecretString) -> Arc<dyn PaymentsApi> {
        Arc::new(StripeClient::new(self.http.clone(), self.settings.clone(), secret_key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::extract::{Form, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde_json::{json, Value};

    use super::{PaymentsSettings, StripeConnector};
    use crate::{PaymentsConnector, PaymentsError};

    async fn create_customer(
        headers: HeaderMap,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        let authorized = headers.get("authorization").and_then(|value| value.to_str().ok())
            == Some("Bearer sk_test_key");
        let versioned = headers.get("stripe-version").and_then(|value| value.to_str().ok())
            == Some("2026-01-28.clover");
        if !authorized || !versioned {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": {"message": "bad auth"}})));
        }

        (
            StatusCode::OK,
            Json(json!({
                "id": "cus_123",
                "email": form.get("email"),
                "metadata": {"source": form.get("metadata[source]")},
            })),
        )
    }

    async fn list_customers(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
        Json(json!({"object": "list", "data": [], "limit": query.get("limit")}))
    }

    async fn missing_coupon() -> (StatusCode, Json<Value>) {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {
                "type": "invalid_request_error",
                "code": "resource_missing",
                "message": "No such coupon: 'SUMMER'"
            }})),
        )
    }

    async fn connector() -> StripeConnector {
        let app = Router::new()
            .route("/v1/customers", post(create_customer).get(list_customers))
            .route("/v1/coupons/SUMMER", get(missing_coupon).delete(missing_coupon));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        StripeConnector::new(PaymentsSettings {
            base_url: format!("http://{address}/"),
            api_version: "2026-01-28.clover".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("connector")
    }

    #[tokio::test]
    async fn post_sends_form_with_bearer_and_version_headers() {
        let api = connector().await.connect(&SecretString::from("sk_test_key".to_string()));

        let customer = api
            .post(
                "/v1/customers",
                &[
                    ("email".to_string(), "taro@example.com".to_string()),
                    ("metadata[source]".to_string(), "chat".to_string()),
                ],
            )
            .await
            .expect("create customer");

        assert_eq!(customer["id"], "cus_123");
        assert_eq!(customer["email"], "taro@example.com");
        assert_eq!(customer["metadata"]["source"], "chat");
    }

    #[tokio::test]
    async fn get_sends_query_parameters() {
        let api = connector().await.connect(&SecretString::from("sk_test_key".to_string()));

        let list = api
            .get("v1/customers", &[("limit".to_string(), "3".to_string())])
            .await
            .expect("list customers");

        assert_eq!(list["limit"], "3");
    }

    #[tokio::test]
    async fn api_errors_surface_the_api_message() {
        let api = connector().await.connect(&SecretString::from("sk_test_key".to_string()));

        let error = api.delete("v1/coupons/SUMMER").await.expect_err("missing coupon");

        assert_eq!(error.to_string(), "No such coupon: 'SUMMER'");
        assert!(matches!(error, PaymentsError::Api { status: 404, .. }));
    }
}

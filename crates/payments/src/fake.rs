use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::{PaymentsApi, PaymentsError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl RecordedCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }
}

type Responses = HashMap<(Method, String), VecDeque<Result<Value, PaymentsError>>>;

/// Scripted [`PaymentsApi`] that records every call. Unscripted requests
/// fail with a 404 API error, like an unknown resource would.
#[derive(Default)]
pub struct RecordingPaymentsApi {
    responses: Mutex<Responses>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingPaymentsApi {
    pub fn respond(&self, method: Method, path: &str, response: Result<Value, PaymentsError>) {
        let mut responses = match self.responses.lock() {
            Ok(responses) => responses,
            Err(poisoned) => poisoned.into_inner(),
        };
        responses.entry((method, path.to_string())).or_default().push_back(response);
    }

    pub fn with_response(self, method: Method, path: &str, response: Value) -> Self {
        self.respond(method, path, Ok(response));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Value, PaymentsError> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(RecordedCall {
                method,
                path: path.to_string(),
                params: params.to_vec(),
            }),
            Err(poisoned) => poisoned.into_inner().push(RecordedCall {
                method,
                path: path.to_string(),
                params: params.to_vec(),
            }),
        }

        let mut responses = match self.responses.lock() {
            Ok(responses) => responses,
            Err(poisoned) => poisoned.into_inner(),
        };
        responses.get_mut(&(method, path.to_string())).and_then(VecDeque::pop_front).unwrap_or_else(
            || {
                Err(PaymentsError::Api {
                    status: 404,
                    kind: "invalid_request_error".to_string(),
                    code: Some("resource_missing".to_string()),
                    message: format!("Unrecognized request URL ({path})"),
                })
            },
        )
    }
}

#[async_trait]
impl PaymentsApi for RecordingPaymentsApi {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value, PaymentsError> {
        self.record(Method::Get, path, query)
    }

    async fn post(&self, path: &str, form: &[(String, String)]) -> Result<Value, PaymentsError> {
        self.record(Method::Post, path, form)
    }

    async fn delete(&self, path: &str) -> Result<Value, PaymentsError> {
        self.record(Method::Delete, path, &[])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Method, RecordingPaymentsApi};
    use crate::PaymentsApi;

    #[tokio::test]
    async fn scripted_responses_are_consumed_in_order() {
        let api = RecordingPaymentsApi::default()
            .with_response(Method::Get, "v1/coupons", json!({"data": [1]}))
            .with_response(Method::Get, "v1/coupons", json!({"data": [2]}));

        assert_eq!(api.get("v1/coupons", &[]).await.expect("first")["data"][0], 1);
        assert_eq!(api.get("v1/coupons", &[]).await.expect("second")["data"][0], 2);
        assert!(api.get("v1/coupons", &[]).await.is_err());
        assert_eq!(api.calls().len(), 3);
    }
}

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PaymentsError {
    /// Error object returned by the API. Displays as the API's own message.
    #[error("{message}")]
    Api { status: u16, kind: String, code: Option<String>, message: String },
    #[error("payments api request failed: {0}")]
    Transport(String),
    #[error("payments api returned an undecodable response: {0}")]
    Decode(String),
}

impl PaymentsError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Decodes the `{"error": {...}}` envelope, falling back to the raw status.
    pub fn from_response_body(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
        let error = parsed.as_ref().and_then(|value| value.get("error"));

        let text = |key: &str| {
            error.and_then(|error| error.get(key)).and_then(|value| value.as_str()).map(str::to_owned)
        };

        Self::Api {
            status,
            kind: text("type").unwrap_or_else(|| "api_error".to_string()),
            code: text("code"),
            message: text("message")
                .unwrap_or_else(|| format!("payments api returned HTTP status {status}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PaymentsError;

    #[test]
    fn api_error_envelope_is_decoded() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"resource_missing","message":"No such customer: 'cus_missing'"}}"#;

        let error = PaymentsError::from_response_body(404, body);

        assert_eq!(error.to_string(), "No such customer: 'cus_missing'");
        assert_eq!(error.status(), Some(404));
        assert!(matches!(
            error,
            PaymentsError::Api { ref code, ref kind, .. }
                if code.as_deref() == Some("resource_missing") && kind == "invalid_request_error"
        ));
    }

    #[test]
    fn non_json_body_falls_back_to_status() {
        let error = PaymentsError::from_response_body(502, "<html>bad gateway</html>");

        assert_eq!(error.to_string(), "payments api returned HTTP status 502");
    }
}

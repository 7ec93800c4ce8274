//! Validation and coercion of model-supplied arguments.
//!
//! Arguments come straight from the model and are untrusted: fields may be
//! missing, null, or carry the wrong JSON type. Numbers sent as strings and
//! integral floats are accepted, anything else is a descriptive error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::ToolError;

pub(crate) const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

fn present<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match args.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

fn invalid(key: &str, expected: &'static str) -> ToolError {
    ToolError::InvalidArgument { name: key.to_string(), expected }
}

pub(crate) fn optional_str(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ToolError> {
    match present(args, key) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.trim().to_string())),
        Some(_) => Err(invalid(key, "a string")),
    }
}

pub(crate) fn required_str(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    optional_str(args, key)?.ok_or_else(|| ToolError::MissingArgument(key.to_string()))
}

/// A required identifier that is interpolated into a request path.
pub(crate) fn path_id(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    let id = required_str(args, key)?;
    let path_safe =
        id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if !path_safe {
        return Err(invalid(key, "an identifier of letters, digits, `_` or `-`"));
    }
    Ok(id)
}

pub(crate) fn optional_i64(args: &Map<String, Value>, key: &str) -> Result<Option<i64>, ToolError> {
    let Some(value) = present(args, key) else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.fract() == 0.0)
                .filter(|float| (i64::MIN as f64..i64::MAX as f64).contains(float))
                .map(|float| float as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| invalid(key, "an integer"))
}

pub(crate) fn required_i64(args: &Map<String, Value>, key: &str) -> Result<i64, ToolError> {
    optional_i64(args, key)?.ok_or_else(|| ToolError::MissingArgument(key.to_string()))
}

pub(crate) fn optional_f64(args: &Map<String, Value>, key: &str) -> Result<Option<f64>, ToolError> {
    let Some(value) = present(args, key) else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| invalid(key, "a number"))
}

pub(crate) fn optional_bool(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<bool>, ToolError> {
    match present(args, key) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(invalid(key, "a boolean")),
        },
        Some(_) => Err(invalid(key, "a boolean")),
    }
}

/// Page size: 10 when absent or zero, otherwise clamped to 1..=100.
pub(crate) fn limit(args: &Map<String, Value>) -> Result<i64, ToolError> {
    Ok(match optional_i64(args, "limit")? {
        None | Some(0) => DEFAULT_LIMIT,
        Some(requested) => requested.clamp(1, MAX_LIMIT),
    })
}

/// Parses a point in time into Unix seconds. Accepts RFC 3339, a naive
/// `YYYY-MM-DDTHH:MM:SS` (read as UTC), a bare date, or decimal seconds.
pub(crate) fn unix_seconds(args: &Map<String, Value>, key: &str) -> Result<i64, ToolError> {
    let value = present(args, key).ok_or_else(|| ToolError::MissingArgument(key.to_string()))?;
    let expected = "an ISO 8601 time or a Unix timestamp";

    let text = match value {
        Value::Number(number) => {
            return number.as_i64().ok_or_else(|| invalid(key, expected));
        }
        Value::String(text) => text.trim(),
        _ => return Err(invalid(key, expected)),
    };

    if !text.is_empty() && text.bytes().all(|byte| byte.is_ascii_digit()) {
        return text.parse::<i64>().map_err(|_| invalid(key, expected));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.timestamp());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(parsed.and_utc().timestamp());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp());
        }
    }

    Err(invalid(key, expected))
}

/// Renders Unix seconds as ISO 8601 UTC with milliseconds.
pub(crate) fn iso_from_unix(seconds: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|moment| moment.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// ISO rendering of a timestamp field, or null when absent or zero.
pub(crate) fn iso_field(object: &Value, key: &str) -> Value {
    object
        .get(key)
        .and_then(Value::as_i64)
        .filter(|seconds| *seconds != 0)
        .and_then(iso_from_unix)
        .map_or(Value::Null, Value::String)
}

pub(crate) fn field(object: &Value, key: &str) -> Value {
    object.get(key).cloned().unwrap_or(Value::Null)
}

pub(crate) fn id_of(object: &Value) -> &str {
    object.get("id").and_then(Value::as_str).unwrap_or_default()
}

/// Elements of a list response's `data` array.
pub(crate) fn list_data(response: &Value) -> &[Value] {
    response.get("data").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default()
}

/// Ordered form parameters for a payments request.
#[derive(Debug, Default)]
pub(crate) struct Form {
    pairs: Vec<(String, String)>,
}

impl Form {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    pub(crate) fn set_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    pub(crate) fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{
        iso_field, limit, optional_bool, optional_i64, path_id, required_str, unix_seconds,
    };
    use crate::error::ToolError;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn missing_and_blank_strings_are_missing() {
        let error = required_str(&args(json!({"email": "  "})), "email").expect_err("blank");

        assert!(matches!(error, ToolError::MissingArgument(ref key) if key == "email"));
    }

    #[test]
    fn path_ids_reject_separators() {
        assert_eq!(path_id(&args(json!({"id": "cus_123"})), "id").expect("plain"), "cus_123");
        assert!(path_id(&args(json!({"id": "cus_1/../../v1/charges"})), "id").is_err());
    }

    #[test]
    fn wrong_types_are_reported() {
        let error = required_str(&args(json!({"email": 42})), "email").expect_err("number");

        assert_eq!(error.to_string(), "argument `email` must be a string");
    }

    #[test]
    fn integers_accept_integral_floats_and_numeric_strings() {
        let values = args(json!({"a": 1000.0, "b": "250", "c": 1.5}));

        assert_eq!(optional_i64(&values, "a").expect("a"), Some(1000));
        assert_eq!(optional_i64(&values, "b").expect("b"), Some(250));
        assert!(optional_i64(&values, "c").is_err());
    }

    #[test]
    fn integral_floats_outside_i64_are_rejected() {
        let values = args(json!({"huge": 1e30, "tiny": -1e30}));

        for key in ["huge", "tiny"] {
            let error = optional_i64(&values, key).expect_err(key);
            assert_eq!(error.to_string(), format!("argument `{key}` must be an integer"));
        }
    }

    #[test]
    fn booleans_accept_string_forms() {
        assert_eq!(optional_bool(&args(json!({"x": "false"})), "x").expect("x"), Some(false));
        assert_eq!(optional_bool(&args(json!({})), "x").expect("x"), None);
    }

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(limit(&args(json!({}))).expect("default"), 10);
        assert_eq!(limit(&args(json!({"limit": 0}))).expect("zero"), 10);
        assert_eq!(limit(&args(json!({"limit": 500}))).expect("high"), 100);
        assert_eq!(limit(&args(json!({"limit": -3}))).expect("low"), 1);
    }

    #[test]
    fn frozen_time_accepts_the_supported_formats() {
        let expected = 1_705_276_800;
        for input in [
            json!("2024-01-15T00:00:00Z"),
            json!("2024-01-15T09:00:00+09:00"),
            json!("2024-01-15T00:00:00"),
            json!("2024-01-15"),
            json!("1705276800"),
            json!(1_705_276_800),
        ] {
            let parsed = unix_seconds(&args(json!({"frozenTime": input.clone()})), "frozenTime")
                .expect("parse");
            assert_eq!(parsed, expected, "{input}");
        }

        assert!(unix_seconds(&args(json!({"frozenTime": "next tuesday"})), "frozenTime").is_err());
    }

    #[test]
    fn timestamps_render_with_milliseconds() {
        let object = json!({"created": 1_705_276_800, "trial_end": null});

        assert_eq!(iso_field(&object, "created"), json!("2024-01-15T00:00:00.000Z"));
        assert_eq!(iso_field(&object, "trial_end"), Value::Null);
    }
}

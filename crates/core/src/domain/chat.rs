use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Simulation,
    Actual,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulation => "simulation",
            Self::Actual => "actual",
        }
    }
}

impl std::fmt::Display for ChatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChatMode {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulation" => Ok(Self::Simulation),
            "actual" => Ok(Self::Actual),
            other => Err(DomainError::InvalidMode(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for ChatRole {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(DomainError::InvalidRole(other.to_string())),
        }
    }
}

/// One persisted turn of a conversation, as handed back to the loop on the
/// next request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: ChatRole,
    pub content: String,
}

impl HistoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Normalized result of a single tool invocation.
///
/// Always a JSON object. Failures carry an `error` field; anything else is a
/// success payload. Non-object success values are wrapped as `{ "value": .. }`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolOutcome(Map<String, Value>);

impl ToolOutcome {
    pub fn success(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Self(map)
            }
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("error".to_string(), Value::String(message.into()));
        Self(map)
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::error(format!("Unknown function: {name}"))
    }

    pub fn is_success(&self) -> bool {
        !self.0.contains_key("error")
    }

    pub fn error_message(&self) -> Option<&str> {
        self.0.get("error").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub name: String,
    pub arguments: Map<String, Value>,
    pub outcome: ToolOutcome,
}

impl ToolInvocationResult {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>, outcome: ToolOutcome) -> Self {
        Self { name: name.into(), arguments, outcome }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn resource_type(&self) -> ResourceType {
        ResourceType::classify(&self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Customer,
    Product,
    Price,
    Subscription,
    Coupon,
    Invoice,
    TestClock,
    PaymentMethod,
    Unknown,
}

impl ResourceType {
    /// Derives the audited resource kind from an operation name. Checked in a
    /// fixed order, so `previewSubscription` counts as a subscription.
    pub fn classify(operation: &str) -> Self {
        const RULES: &[(&str, ResourceType)] = &[
            ("Customer", ResourceType::Customer),
            ("Product", ResourceType::Product),
            ("Price", ResourceType::Price),
            ("Subscription", ResourceType::Subscription),
            ("Coupon", ResourceType::Coupon),
            ("Invoice", ResourceType::Invoice),
            ("TestClock", ResourceType::TestClock),
            ("PaymentMethod", ResourceType::PaymentMethod),
        ];

        RULES
            .iter()
            .find(|(needle, _)| operation.contains(needle))
            .map(|(_, kind)| *kind)
            .unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Product => "product",
            Self::Price => "price",
            Self::Subscription => "subscription",
            Self::Coupon => "coupon",
            Self::Invoice => "invoice",
            Self::TestClock => "test_clock",
            Self::PaymentMethod => "payment_method",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_stored(value: &str) -> Self {
        match value {
            "customer" => Self::Customer,
            "product" => Self::Product,
            "price" => Self::Price,
            "subscription" => Self::Subscription,
            "coupon" => Self::Coupon,
            "invoice" => Self::Invoice,
            "test_clock" => Self::TestClock,
            "payment_method" => Self::PaymentMethod,
            _ => Self::Unknown,
        }
    }
}

use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use paydesk_core::domain::chat::ToolOutcome;
use paydesk_payments::PaymentsApi;

use crate::catalog::ToolDefinition;
use crate::error::ToolError;

/// Per-request inputs shared by every handler in one loop execution.
#[derive(Clone)]
pub struct ToolContext {
    pub api: Arc<dyn PaymentsApi>,
    pub dashboard_base_url: String,
    pub default_currency: String,
}

impl ToolContext {
    pub fn new(
        api: Arc<dyn PaymentsApi>,
        dashboard_base_url: impl Into<String>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            api,
            dashboard_base_url: dashboard_base_url.into(),
            default_currency: default_currency.into(),
        }
    }

    /// Dashboard link for a resource, e.g. `customers/cus_123`.
    pub fn dashboard_url(&self, section: &str, id: &str) -> String {
        format!("{}/{section}/{id}", self.dashboard_base_url.trim_end_matches('/'))
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, ctx: &ToolContext, args: &Map<String, Value>)
        -> Result<Value, ToolError>;
}

#[derive(Clone, Debug, Default, Error, PartialEq, Eq)]
#[error("catalog entries without handlers: {missing:?}; handlers without catalog entries: {extra:?}")]
pub struct CatalogMismatch {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Checks that every catalog entry has exactly one handler and vice versa.
    pub fn ensure_matches(&self, catalog: &[ToolDefinition]) -> Result<(), CatalogMismatch> {
        let declared: BTreeSet<&str> = catalog.iter().map(|definition| definition.name).collect();
        let registered: BTreeSet<&str> = self.tools.keys().map(String::as_str).collect();

        let missing: Vec<String> =
            declared.difference(&registered).map(|name| name.to_string()).collect();
        let extra: Vec<String> =
            registered.difference(&declared).map(|name| name.to_string()).collect();

        if missing.is_empty() && extra.is_empty() {
            Ok(())
        } else {
            Err(CatalogMismatch { missing, extra })
        }
    }

    /// Runs one requested operation. Every failure, including an unknown name
    /// or a panicking handler, becomes an `{error}` outcome.
    pub async fn invoke(
        &self,
        ctx: &ToolContext,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> ToolOutcome {
        let Some(tool) = self.tools.get(name) else {
            warn!(event_name = "agent.tools.unknown_function", tool_name = name, "model requested an unknown function");
            return ToolOutcome::unknown_function(name);
        };

        match AssertUnwindSafe(tool.execute(ctx, arguments)).catch_unwind().await {
            Ok(Ok(value)) => {
                debug!(event_name = "agent.tools.succeeded", tool_name = name, "tool call succeeded");
                ToolOutcome::success(value)
            }
            Ok(Err(error)) => {
                warn!(
                    event_name = "agent.tools.failed",
                    tool_name = name,
                    error = %error,
                    "tool call failed"
                );
                ToolOutcome::error(error.to_string())
            }
            Err(_) => {
                warn!(event_name = "agent.tools.panicked", tool_name = name, "tool handler panicked");
                ToolOutcome::error(format!("{name} failed unexpectedly"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Map, Value};

    use paydesk_payments::RecordingPaymentsApi;

    use super::{Tool, ToolContext, ToolRegistry};
    use crate::catalog::{ParamType, ParameterSpec, ToolDefinition};
    use crate::error::ToolError;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn execute(
            &self,
            _ctx: &ToolContext,
            args: &Map<String, Value>,
        ) -> Result<Value, ToolError> {
            Ok(Value::Object(args.clone()))
        }
    }

    struct Count;

    #[async_trait]
    impl Tool for Count {
        fn name(&self) -> &'static str {
            "count"
        }

        async fn execute(
            &self,
            _ctx: &ToolContext,
            _args: &Map<String, Value>,
        ) -> Result<Value, ToolError> {
            Ok(json!(3))
        }
    }

    struct Broken;

    #[async_trait]
    impl Tool for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn execute(
            &self,
            _ctx: &ToolContext,
            _args: &Map<String, Value>,
        ) -> Result<Value, ToolError> {
            Err(ToolError::MissingArgument("email".to_string()))
        }
    }

    struct Panics;

    #[async_trait]
    impl Tool for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }

        async fn execute(
            &self,
            _ctx: &ToolContext,
            _args: &Map<String, Value>,
        ) -> Result<Value, ToolError> {
            panic!("handler bug")
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new(Arc::new(RecordingPaymentsApi::default()), "https://dash.test/", "jpy")
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        registry.register(Echo);
        registry.register(Count);
        registry.register(Broken);
        registry.register(Panics);
        registry
    }

    #[tokio::test]
    async fn unknown_function_becomes_error_outcome() {
        let outcome = registry().invoke(&ctx(), "launchRocket", &Map::new()).await;

        assert_eq!(outcome.to_value(), json!({"error": "Unknown function: launchRocket"}));
    }

    #[tokio::test]
    async fn non_object_results_are_wrapped() {
        let outcome = registry().invoke(&ctx(), "count", &Map::new()).await;

        assert_eq!(outcome.to_value(), json!({"value": 3}));
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn handler_errors_and_panics_are_isolated() {
        let registry = registry();

        let failed = registry.invoke(&ctx(), "broken", &Map::new()).await;
        let panicked = registry.invoke(&ctx(), "panics", &Map::new()).await;
        let echoed = registry
            .invoke(&ctx(), "echo", json!({"a": 1}).as_object().expect("object"))
            .await;

        assert_eq!(failed.error_message(), Some("missing required argument `email`"));
        assert_eq!(panicked.error_message(), Some("panics failed unexpectedly"));
        assert_eq!(echoed.to_value(), json!({"a": 1}));
    }

    #[test]
    fn ensure_matches_reports_both_directions() {
        static CATALOG: &[ToolDefinition] = &[
            ToolDefinition { name: "echo", description: "", parameters: &[] },
            ToolDefinition {
                name: "missingOne",
                description: "",
                parameters: &[ParameterSpec {
                    name: "id",
                    param_type: ParamType::String,
                    description: "",
                    required: true,
                }],
            },
        ];

        let mismatch = registry().ensure_matches(CATALOG).expect_err("mismatch");

        assert_eq!(mismatch.missing, vec!["missingOne".to_string()]);
        assert_eq!(mismatch.extra, vec!["broken", "count", "panics"]);
    }

    #[test]
    fn dashboard_urls_join_cleanly() {
        assert_eq!(ctx().dashboard_url("customers", "cus_1"), "https://dash.test/customers/cus_1");
    }
}

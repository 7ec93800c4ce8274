use std::sync::Arc;

use paydesk_agent::{
    build_client, payments_registry, AgentError, AgentRuntime, AgentSettings, ChatRequest,
    Termination, ToolContext, CATALOG,
};
use paydesk_core::config::{AppConfig, LoadOptions, LogFormat};
use paydesk_core::domain::chat::ChatMode;
use paydesk_payments::{PaymentsConnector, StripeConnector};
use serde_json::json;
use tracing::{debug, info, Level};

use crate::commands::{current_thread_runtime, CommandResult};

/// One loop execution with no stored history. Nothing is persisted.
pub fn run(message: &str, mode: ChatMode) -> CommandResult {
    if message.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_input", "message must not be empty", 2);
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config);

    let Some(secret_key) = config.payments.secret_key.clone() else {
        return CommandResult::failure(
            "ask",
            "missing_credential",
            "payments.secret_key is not set (PAYDESK_PAYMENTS_SECRET_KEY)",
            2,
        );
    };

    let registry = payments_registry();
    if let Err(mismatch) = registry.ensure_matches(CATALOG) {
        return CommandResult::failure("ask", "catalog_parity", mismatch.to_string(), 6);
    }
    let llm = match build_client(&config.llm) {
        Ok(llm) => llm,
        Err(error) => {
            return CommandResult::failure("ask", "llm_setup", error.to_string(), 7);
        }
    };
    let connector = match StripeConnector::new((&config.payments).into()) {
        Ok(connector) => connector,
        Err(error) => {
            return CommandResult::failure("ask", "payments_setup", error.to_string(), 7);
        }
    };

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let agent = AgentRuntime::new(
        llm,
        Arc::new(registry),
        AgentSettings { parallel_tool_calls: config.agent.parallel_tool_calls },
    );
    let tools = ToolContext::new(
        connector.connect(&secret_key),
        config.payments.dashboard_base_url.clone(),
        config.agent.default_currency.clone(),
    );

    info!(
        event_name = "cli.ask.started",
        correlation_id = "cli",
        mode = mode.as_str(),
        llm_provider = config.llm.provider.as_str(),
        "running one-shot conversation turn"
    );

    let request = ChatRequest { history: Vec::new(), message: message.to_string(), mode, tools };
    match runtime.block_on(agent.run(request)) {
        Ok(outcome) => {
            let termination = match outcome.termination {
                Termination::Answered => "answered",
                Termination::IterationLimit => "iteration_limit",
            };
            CommandResult::success_with_data(
                "ask",
                outcome.content.clone(),
                Some(json!({
                    "mode": mode,
                    "content": outcome.content,
                    "toolResults": outcome.tool_results,
                    "rounds": outcome.rounds,
                    "termination": termination,
                })),
            )
        }
        Err(AgentError::InvalidRequest(message)) => {
            CommandResult::failure("ask", "invalid_input", message, 2)
        }
        Err(AgentError::Provider(error)) => {
            CommandResult::failure("ask", error.category().as_str(), error.to_string(), 8)
        }
    }
}

/// Logs go to stderr so stdout stays a single JSON document.
fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(error) = installed {
        debug!(
            event_name = "cli.ask.logging_not_installed",
            correlation_id = "cli",
            error = %error,
            "keeping the existing tracing subscriber"
        );
    }
}

#[cfg(test)]
mod tests {
    use paydesk_core::config::AppConfig;

    use super::init_logging;

    #[test]
    fn logging_can_be_initialized_more_than_once() {
        let config = AppConfig::default();

        init_logging(&config);
        init_logging(&config);
    }
}

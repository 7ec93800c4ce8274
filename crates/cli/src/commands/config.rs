use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use paydesk_core::config::{AppConfig, LoadOptions};
use paydesk_payments::mask_secret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    let payments_secret_key = config
        .payments
        .secret_key
        .as_ref()
        .map(mask_secret)
        .unwrap_or_else(|| "<unset>".to_string());

    // (key path, rendered value, env overrides in priority order)
    let fields: [(&str, String, &[&str]); 18] = [
        ("database.url", config.database.url.clone(), &["PAYDESK_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["PAYDESK_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["PAYDESK_DATABASE_TIMEOUT_SECS"],
        ),
        ("llm.provider", config.llm.provider.as_str().to_string(), &["PAYDESK_LLM_PROVIDER"]),
        ("llm.model", config.llm.model.clone(), &["PAYDESK_LLM_MODEL", "GEMINI_MODEL"]),
        (
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["PAYDESK_LLM_BASE_URL"],
        ),
        ("llm.api_key", llm_api_key.to_string(), &["PAYDESK_LLM_API_KEY", "GEMINI_API_KEY"]),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["PAYDESK_LLM_TIMEOUT_SECS"]),
        ("payments.secret_key", payments_secret_key, &["PAYDESK_PAYMENTS_SECRET_KEY"]),
        ("payments.base_url", config.payments.base_url.clone(), &["PAYDESK_PAYMENTS_BASE_URL"]),
        (
            "payments.dashboard_base_url",
            config.payments.dashboard_base_url.clone(),
            &["PAYDESK_PAYMENTS_DASHBOARD_BASE_URL"],
        ),
        (
            "payments.api_version",
            config.payments.api_version.clone(),
            &["PAYDESK_PAYMENTS_API_VERSION"],
        ),
        (
            "agent.parallel_tool_calls",
            config.agent.parallel_tool_calls.to_string(),
            &["PAYDESK_AGENT_PARALLEL_TOOL_CALLS"],
        ),
        (
            "agent.default_currency",
            config.agent.default_currency.clone(),
            &["PAYDESK_AGENT_DEFAULT_CURRENCY"],
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["PAYDESK_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["PAYDESK_SERVER_PORT"]),
        (
            "logging.level",
            config.logging.level.clone(),
            &["PAYDESK_LOGGING_LEVEL", "PAYDESK_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["PAYDESK_LOGGING_FORMAT", "PAYDESK_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in fields {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("paydesk.toml"), PathBuf::from("config/paydesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn nested_key_paths_are_resolved_in_toml_documents() {
        let doc: toml::Value =
            "[payments]\nsecret_key = \"${STRIPE_KEY}\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "payments.secret_key"));
        assert!(!contains_path(&doc, "payments.base_url"));
        assert!(!contains_path(&doc, "llm.model"));
    }
}

use std::env;
use std::sync::{Mutex, OnceLock};

use paydesk_cli::commands::{ask, catalog, config, doctor, migrate};
use paydesk_core::domain::chat::ChatMode;
use serde_json::Value;

const VALID_ENV: &[(&str, &str)] = &[
    ("PAYDESK_DATABASE_URL", "sqlite::memory:"),
    ("PAYDESK_LLM_API_KEY", "test-llm-key"),
    ("PAYDESK_PAYMENTS_SECRET_KEY", "sk_test_51abcdefghijklmnWXYZ"),
];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(VALID_ENV, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_without_llm_key() {
    with_env(&[("PAYDESK_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("llm.api_key"));
    });
}

#[test]
fn catalog_prints_every_declaration() {
    let result = catalog::run();
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    let tools = payload["data"].as_array().expect("declarations");
    assert_eq!(tools.len(), 25);
    assert!(tools.iter().any(|tool| tool["name"] == "advanceTestClock"));
    assert_eq!(tools[0]["parameters"]["type"], "object");
}

#[test]
fn doctor_json_passes_with_valid_env() {
    with_env(VALID_ENV, || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "pass");
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(
            names,
            ["catalog_parity", "config_validation", "payments_key", "database_connectivity"]
        );
    });
}

#[test]
fn doctor_flags_missing_payments_key() {
    with_env(&VALID_ENV[..2], || {
        let payload = parse_payload(&doctor::run(true));

        assert_eq!(payload["overall_status"], "fail");
        let payments = payload["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .find(|check| check["name"] == "payments_key")
            .cloned()
            .expect("payments check");
        assert_eq!(payments["status"], "fail");
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("PAYDESK_DATABASE_URL", "postgres://nope")], || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation"));
        assert!(output.contains("- [skip] database_connectivity"));
    });
}

#[test]
fn config_redacts_credentials_and_reports_sources() {
    with_env(VALID_ENV, || {
        let output = config::run();

        assert!(output.contains("- llm.api_key = <redacted> (source: env (PAYDESK_LLM_API_KEY))"));
        assert!(output.contains("payments.secret_key = sk_test_****WXYZ"));
        assert!(!output.contains("test-llm-key"));
        assert!(!output.contains("sk_test_51abcdefghijklmnWXYZ"));
        assert!(output.contains("- server.port = 3000 (source: default)"));
    });
}

#[test]
fn ask_requires_a_payments_key() {
    with_env(&VALID_ENV[..2], || {
        let result = ask::run("List my customers", ChatMode::Simulation);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "missing_credential");
    });
}

#[test]
fn ask_rejects_blank_messages_before_loading_config() {
    with_env(&[], || {
        let result = ask::run("   ", ChatMode::Actual);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PAYDESK_DATABASE_URL",
        "PAYDESK_DATABASE_MAX_CONNECTIONS",
        "PAYDESK_DATABASE_TIMEOUT_SECS",
        "PAYDESK_LLM_PROVIDER",
        "PAYDESK_LLM_API_KEY",
        "PAYDESK_LLM_BASE_URL",
        "PAYDESK_LLM_MODEL",
        "PAYDESK_LLM_TIMEOUT_SECS",
        "GEMINI_API_KEY",
        "GEMINI_MODEL",
        "PAYDESK_PAYMENTS_SECRET_KEY",
        "PAYDESK_PAYMENTS_BASE_URL",
        "PAYDESK_PAYMENTS_DASHBOARD_BASE_URL",
        "PAYDESK_PAYMENTS_API_VERSION",
        "PAYDESK_PAYMENTS_TIMEOUT_SECS",
        "PAYDESK_AGENT_PARALLEL_TOOL_CALLS",
        "PAYDESK_AGENT_DEFAULT_CURRENCY",
        "PAYDESK_SERVER_BIND_ADDRESS",
        "PAYDESK_SERVER_PORT",
        "PAYDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "PAYDESK_LOGGING_LEVEL",
        "PAYDESK_LOGGING_FORMAT",
        "PAYDESK_LOG_LEVEL",
        "PAYDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

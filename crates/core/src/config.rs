use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub payments: PaymentsConfig,
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PaymentsConfig {
    pub secret_key: Option<SecretString>,
    pub base_url: String,
    pub dashboard_base_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub parallel_tool_calls: bool,
    pub default_currency: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    OpenAi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub payments_secret_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://paydesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Gemini,
                api_key: None,
                base_url: None,
                model: "gemini-2.5-flash".to_string(),
                timeout_secs: 60,
            },
            payments: PaymentsConfig {
                secret_key: None,
                base_url: "https://api.stripe.com".to_string(),
                dashboard_base_url: "https://dashboard.stripe.com/test".to_string(),
                api_version: "2026-01-28.clover".to_string(),
                timeout_secs: 30,
            },
            agent: AgentConfig { parallel_tool_calls: false, default_currency: "jpy".to_string() },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|openai)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("paydesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(payments) = patch.payments {
            if let Some(secret_key_value) = payments.secret_key {
                self.payments.secret_key = Some(secret_value(secret_key_value));
            }
            if let Some(base_url) = payments.base_url {
                self.payments.base_url = base_url;
            }
            if let Some(dashboard_base_url) = payments.dashboard_base_url {
                self.payments.dashboard_base_url = dashboard_base_url;
            }
            if let Some(api_version) = payments.api_version {
                self.payments.api_version = api_version;
            }
            if let Some(timeout_secs) = payments.timeout_secs {
                self.payments.timeout_secs = timeout_secs;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(parallel_tool_calls) = agent.parallel_tool_calls {
                self.agent.parallel_tool_calls = parallel_tool_calls;
            }
            if let Some(default_currency) = agent.default_currency {
                self.agent.default_currency = default_currency;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PAYDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("PAYDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("PAYDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("PAYDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("PAYDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PAYDESK_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let llm_api_key = read_env("PAYDESK_LLM_API_KEY").or_else(|| read_env("GEMINI_API_KEY"));
        if let Some(value) = llm_api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PAYDESK_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        let llm_model = read_env("PAYDESK_LLM_MODEL").or_else(|| read_env("GEMINI_MODEL"));
        if let Some(value) = llm_model {
            self.llm.model = value;
        }
        if let Some(value) = read_env("PAYDESK_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("PAYDESK_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PAYDESK_PAYMENTS_SECRET_KEY") {
            self.payments.secret_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("PAYDESK_PAYMENTS_BASE_URL") {
            self.payments.base_url = value;
        }
        if let Some(value) = read_env("PAYDESK_PAYMENTS_DASHBOARD_BASE_URL") {
            self.payments.dashboard_base_url = value;
        }
        if let Some(value) = read_env("PAYDESK_PAYMENTS_API_VERSION") {
            self.payments.api_version = value;
        }
        if let Some(value) = read_env("PAYDESK_PAYMENTS_TIMEOUT_SECS") {
            self.payments.timeout_secs = parse_u64("PAYDESK_PAYMENTS_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PAYDESK_AGENT_PARALLEL_TOOL_CALLS") {
            self.agent.parallel_tool_calls =
                parse_bool("PAYDESK_AGENT_PARALLEL_TOOL_CALLS", &value)?;
        }
        if let Some(value) = read_env("PAYDESK_AGENT_DEFAULT_CURRENCY") {
            self.agent.default_currency = value;
        }

        if let Some(value) = read_env("PAYDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PAYDESK_SERVER_PORT") {
            self.server.port = parse_u16("PAYDESK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("PAYDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("PAYDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("PAYDESK_LOGGING_LEVEL").or_else(|| read_env("PAYDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PAYDESK_LOGGING_FORMAT").or_else(|| read_env("PAYDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(payments_secret_key) = overrides.payments_secret_key {
            self.payments.secret_key = Some(secret_value(payments_secret_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_payments(&self.payments)?;
        validate_agent(&self.agent)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("paydesk.toml"), PathBuf::from("config/paydesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    let missing_key =
        llm.api_key.as_ref().map(|value| value.expose_secret().trim().is_empty()).unwrap_or(true);
    if missing_key {
        let hint = match llm.provider {
            LlmProvider::Gemini => {
                " Set PAYDESK_LLM_API_KEY or GEMINI_API_KEY (keys: https://aistudio.google.com/apikey)"
            }
            LlmProvider::OpenAi => " Set PAYDESK_LLM_API_KEY",
        };
        return Err(ConfigError::Validation(format!(
            "llm.api_key is required for the {} provider.{hint}",
            llm.provider.as_str()
        )));
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_payments(payments: &PaymentsConfig) -> Result<(), ConfigError> {
    for (key, url) in [
        ("payments.base_url", &payments.base_url),
        ("payments.dashboard_base_url", &payments.dashboard_base_url),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    if payments.timeout_secs == 0 || payments.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "payments.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if let Some(secret_key) = &payments.secret_key {
        let secret_key = secret_key.expose_secret();
        if secret_key.starts_with("sk_live_") || secret_key.starts_with("rk_live_") {
            return Err(ConfigError::Validation(
                "payments.secret_key must be a test-mode key; live keys are refused".to_string(),
            ));
        }
        if !secret_key.starts_with("sk_test_") && !secret_key.starts_with("rk_test_") {
            let hint = if secret_key.starts_with("pk_") {
                " (hint: you may have used the publishable key instead of the secret key)"
            } else {
                ""
            };
            return Err(ConfigError::Validation(format!(
                "payments.secret_key must start with `sk_test_` or `rk_test_`{hint}"
            )));
        }
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    let currency = agent.default_currency.trim();
    let iso_code = currency.len() == 3 && currency.chars().all(|ch| ch.is_ascii_alphabetic());
    if !iso_code {
        return Err(ConfigError::Validation(
            "agent.default_currency must be a three-letter ISO currency code".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    payments: Option<PaymentsPatch>,
    agent: Option<AgentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentsPatch {
    secret_key: Option<String>,
    base_url: Option<String>,
    dashboard_base_url: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    parallel_tool_calls: Option<bool>,
    default_currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

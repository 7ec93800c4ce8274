use paydesk_agent::{payments_registry, CATALOG};
use paydesk_core::config::{AppConfig, LoadOptions};
use paydesk_db::{connect_with_settings, migrations};
use paydesk_payments::mask_secret;
use serde::Serialize;

use crate::commands::current_thread_runtime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = vec![check_catalog_parity()];

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: format!(
                    "configuration loaded and validated (llm: {} / {})",
                    config.llm.provider.as_str(),
                    config.llm.model
                ),
            });
            checks.push(check_payments_key(&config));
            checks.push(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["payments_key", "database_connectivity"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_catalog_parity() -> DoctorCheck {
    match payments_registry().ensure_matches(CATALOG) {
        Ok(()) => DoctorCheck {
            name: "catalog_parity",
            status: CheckStatus::Pass,
            details: format!("{} declared tools, each with one handler", CATALOG.len()),
        },
        Err(mismatch) => DoctorCheck {
            name: "catalog_parity",
            status: CheckStatus::Fail,
            details: mismatch.to_string(),
        },
    }
}

fn check_payments_key(config: &AppConfig) -> DoctorCheck {
    match &config.payments.secret_key {
        Some(secret_key) => DoctorCheck {
            name: "payments_key",
            status: CheckStatus::Pass,
            details: format!("test-mode key configured ({})", mask_secret(secret_key)),
        },
        None => DoctorCheck {
            name: "payments_key",
            status: CheckStatus::Fail,
            details: "payments.secret_key is not set; chat requests will be rejected".to_string(),
        },
    }
}

fn check_database(config: &AppConfig) -> DoctorCheck {
    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        let pending = migrations::pending_count(&pool)
            .await
            .map_err(|error| format!("failed to inspect migrations: {error}"))?;
        pool.close().await;
        Ok::<usize, String>(pending)
    });

    match result {
        Ok(pending) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!(
                "connected using `{}` ({pending} pending migration(s))",
                config.database.url
            ),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

use crate::commands::{block_on, exit, CommandResult};
use switchboard_core::config::{AppConfig, CorrelationBackend, LoadOptions};
use switchboard_core::kv::ExpiringKvStore;
use switchboard_db::{connect_with_settings, migrations, ping, SqlKvStore};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
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

pub fn run(json_output: bool) -> CommandResult {
    run_with(LoadOptions::default(), json_output)
}

pub fn run_with(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code =
        if report.overall_status == CheckStatus::Fail { exit::NOT_READY } else { exit::OK };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_request_verification(&config));
            checks.push(check_correlation_backend(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["request_verification", "correlation_backend"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_request_verification(config: &AppConfig) -> DoctorCheck {
    match config.verification_token() {
        Some(_) => DoctorCheck {
            name: "request_verification",
            status: CheckStatus::Pass,
            details: "inbound requests are checked against slack.verification_token".to_string(),
        },
        None => DoctorCheck {
            name: "request_verification",
            status: CheckStatus::Warn,
            details: "slack.verification_token is unset; inbound requests are not verified"
                .to_string(),
        },
    }
}

fn check_correlation_backend(config: &AppConfig) -> DoctorCheck {
    if config.correlation.backend == CorrelationBackend::Memory {
        return DoctorCheck {
            name: "correlation_backend",
            status: CheckStatus::Pass,
            details: "in-process memory store; records do not survive restarts".to_string(),
        };
    }

    let result = block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        if let Err(error) = ping(&pool).await {
            pool.close().await;
            return Err(format!("database did not answer a trivial query: {error}"));
        }

        let pending = pending_migrations(&pool).await;
        let store = SqlKvStore::new(pool.clone());
        let probe = store.get("switchboard.doctor.probe").await;
        pool.close().await;

        match (pending, probe) {
            (Err(error), _) => Err(format!("failed to read migration state: {error}")),
            (Ok(pending), _) if pending > 0 => {
                Err(format!("{pending} pending migration(s); run `switchboard migrate`"))
            }
            (Ok(_), Err(error)) => Err(format!("correlation store is not readable: {error}")),
            (Ok(_), Ok(_)) => Ok(()),
        }
    });

    match result {
        Ok(Ok(())) => DoctorCheck {
            name: "correlation_backend",
            status: CheckStatus::Pass,
            details: format!("sqlite store reachable and migrated at `{}`", config.database.url),
        },
        Ok(Err(details)) | Err(details) => {
            DoctorCheck { name: "correlation_backend", status: CheckStatus::Fail, details }
        }
    }
}

async fn pending_migrations(pool: &switchboard_db::DbPool) -> Result<usize, sqlx::Error> {
    let applied: Vec<i64> = sqlx::query_scalar(
        "SELECT version FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_all(pool)
    .await
    .or_else(|error| match error {
        // a database nobody has migrated yet has no bookkeeping table
        sqlx::Error::Database(ref db) if db.message().contains("no such table") => {
            Ok(Vec::new())
        }
        other => Err(other),
    })?;

    Ok(migrations::MIGRATOR
        .iter()
        .filter(|migration| !applied.contains(&migration.version))
        .count())
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
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

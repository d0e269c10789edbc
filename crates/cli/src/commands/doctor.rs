use std::sync::Arc;

use chrono::NaiveDate;
use returns_agent::{AgentRuntime, ToolCall, ToolCallStatus};
use returns_core::config::{AppConfig, LoadOptions};
use returns_core::{Clock, DeterministicReturnsRuntime, FixedClock, ReturnsRuntime};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

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
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_decision_engine(&config));
            checks.push(check_tool_dispatch(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["decision_engine", "tool_dispatch"] {
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

fn probe_clock() -> Option<Arc<dyn Clock>> {
    let today = NaiveDate::from_ymd_opt(2025, 1, 31)?;
    Some(Arc::new(FixedClock::on_date(today)))
}

/// Runs a known request through the configured engine and checks the fixed
/// arithmetic that does not depend on configuration.
fn check_decision_engine(config: &AppConfig) -> DoctorCheck {
    let fail = |details: String| DoctorCheck {
        name: "decision_engine",
        status: CheckStatus::Fail,
        details,
    };

    let Some(clock) = probe_clock() else {
        return fail("could not build probe date".to_string());
    };
    let runtime = DeterministicReturnsRuntime::with_clock(clock, config.window_table());

    let verdict = runtime.check_eligibility("2025-01-31", "electronics");
    if !verdict.eligible {
        return fail(format!("same-day purchase was rejected: {}", verdict.reason));
    }

    let refund = runtime.calculate_refund(Decimal::new(100, 0), "used", "changed_mind");
    if refund.refund_amount != Decimal::new(80, 0)
        || refund.refund_amount + refund.deduction != refund.original_price
    {
        return fail(format!(
            "unexpected refund breakdown: refund {} deduction {}",
            refund.refund_amount, refund.deduction
        ));
    }

    DoctorCheck {
        name: "decision_engine",
        status: CheckStatus::Pass,
        details: format!(
            "eligibility and refund probes passed ({} days for electronics)",
            verdict.window_days.unwrap_or(config.returns.default_window_days)
        ),
    }
}

fn check_tool_dispatch(config: &AppConfig) -> DoctorCheck {
    let Some(clock) = probe_clock() else {
        return DoctorCheck {
            name: "tool_dispatch",
            status: CheckStatus::Fail,
            details: "could not build probe date".to_string(),
        };
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "tool_dispatch",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let agent = AgentRuntime::from_config(config, clock);
    let outcome = runtime.block_on(agent.handle_tool_call(ToolCall {
        name: "check_return_eligibility".to_string(),
        input: json!({ "purchase_date": "2025-01-31", "category": "books" }),
        correlation_id: Some("doctor".to_string()),
    }));

    match outcome.status {
        ToolCallStatus::Ok => DoctorCheck {
            name: "tool_dispatch",
            status: CheckStatus::Pass,
            details: format!("{} tools registered", agent.tools().len()),
        },
        ToolCallStatus::Error => DoctorCheck {
            name: "tool_dispatch",
            status: CheckStatus::Fail,
            details: outcome
                .error
                .map(|failure| failure.message)
                .unwrap_or_else(|| "tool call failed without details".to_string()),
        },
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

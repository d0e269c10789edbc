use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use returns_cli::commands::format_policy::PolicySource;
use returns_cli::commands::watch::WatchArgs;
use returns_cli::commands::{config, doctor, eligibility, format_policy, refund, tool, watch};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn eligibility_reports_verdict_for_pinned_date() {
    with_env(&[], || {
        let result = eligibility::run("2025-01-15", "Electronics", Some("2025-01-31"));
        assert_eq!(result.exit_code, 0, "expected eligibility verdict");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "eligibility");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "Within 30-day return window");
        assert_eq!(payload["data"]["eligible"], true);
        assert_eq!(payload["data"]["days_remaining"], 14);
    });
}

#[test]
fn eligibility_follows_configured_default_window() {
    with_env(&[("RETURNS_DEFAULT_WINDOW_DAYS", "10")], || {
        let result = eligibility::run("2025-01-15", "books", Some("2025-01-31"));

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["eligible"], false);
        assert_eq!(payload["data"]["reason_code"], "EXCEEDED_WINDOW");
        assert_eq!(payload["message"], "Exceeded 10-day return window");
    });
}

#[test]
fn eligibility_rejects_malformed_today_override() {
    with_env(&[], || {
        let result = eligibility::run("2025-01-15", "books", Some("31/01/2025"));
        assert_eq!(result.exit_code, 5, "expected invalid argument code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_argument");
    });
}

#[test]
fn eligibility_returns_config_failure_for_bad_env() {
    with_env(&[("RETURNS_DEFAULT_WINDOW_DAYS", "0")], || {
        let result = eligibility::run("2025-01-15", "books", None);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn refund_applies_condition_deduction() {
    let result = refund::run("500", "damaged", "changed_mind");
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "refund");
    assert_eq!(payload["message"], "50% deduction for damaged condition");
    assert_eq!(payload["data"]["refund_amount"].as_f64(), Some(250.0));
    assert_eq!(payload["data"]["deduction"].as_f64(), Some(250.0));
}

#[test]
fn refund_negative_price_yields_zero_breakdown() {
    let result = refund::run("-5", "new", "defective");
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["message"], "Invalid price");
    assert_eq!(payload["data"]["refund_amount"].as_f64(), Some(0.0));
}

#[test]
fn refund_rejects_non_numeric_price() {
    let result = refund::run("twenty", "new", "defective");
    assert_eq!(result.exit_code, 5);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "invalid_argument");
}

#[test]
fn format_policy_reads_file_and_echoes_question() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("policy.txt");
    fs::write(&path, "RETURN WINDOW:\n- 30 days from delivery\n").expect("write policy");

    let result =
        format_policy::run(PolicySource::File(&path), Some("Can I return my phone?"), false);
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    let formatted = payload["data"]["formatted"].as_str().expect("formatted text");
    assert!(formatted.starts_with("📋 Return Policy Information\n"));
    assert!(formatted.contains("Regarding: Can I return my phone?"));
    assert!(formatted.contains("\nRETURN WINDOW:\n  - 30 days from delivery\n"));
}

#[test]
fn format_policy_raw_output_is_plain_text() {
    let result = format_policy::run(PolicySource::Text("Keep your receipt."), None, true);

    assert_eq!(result.exit_code, 0);
    assert!(!result.output.contains("Regarding:"));
    assert!(result.output.contains("Keep your receipt.\n"));
    assert!(serde_json::from_str::<Value>(&result.output).is_err());
}

#[test]
fn format_policy_reports_missing_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("absent.txt");

    let result = format_policy::run(PolicySource::File(&path), None, false);
    assert_eq!(result.exit_code, 5);
}

#[test]
fn tool_dispatch_returns_outcome_envelope() {
    with_env(&[], || {
        let result = tool::run(
            "calculate_refund_amount",
            Some(r#"{"original_price": 100, "condition": "used", "return_reason": "changed_mind"}"#),
            Some("cli-1"),
        );
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["correlation_id"], "cli-1");
        assert_eq!(payload["data"]["status"], "ok");
        assert_eq!(payload["data"]["output"]["refund_amount"].as_f64(), Some(80.0));
    });
}

#[test]
fn tool_dispatch_maps_unknown_tool_to_bad_request() {
    with_env(&[], || {
        let result = tool::run("cancel_order", None, None);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "bad_request");
        assert_eq!(payload["data"]["status"], "error");
    });
}

#[test]
fn tool_dispatch_rejects_malformed_json_input() {
    with_env(&[], || {
        let result = tool::run("current_time", Some("{timezone"), None);
        assert_eq!(result.exit_code, 5);
    });
}

#[test]
fn tools_lists_registered_tools() {
    with_env(&[], || {
        let result = tool::list();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let names: Vec<&str> = payload["data"]
            .as_array()
            .expect("tool list")
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "calculate_refund_amount",
                "check_return_eligibility",
                "current_time",
                "format_policy_response",
                "lookup_order"
            ]
        );
    });
}

#[test]
fn tool_dispatch_looks_up_sample_orders() {
    with_env(&[], || {
        let found = tool::run("lookup_order", Some(r#"{"order_id": "ord-001"}"#), None);
        assert_eq!(found.exit_code, 0);
        let payload = parse_payload(&found.output);
        assert_eq!(payload["data"]["output"]["order_id"], "ORD-001");
        assert_eq!(payload["data"]["output"]["return_eligibility"]["days_remaining"], 15);

        let missing = tool::run("lookup_order", Some(r#"{"order_id": "ORD-404"}"#), None);
        assert_eq!(missing.exit_code, 1);
        let payload = parse_payload(&missing.output);
        assert_eq!(payload["error_class"], "not_found");
    });
}

#[test]
fn watch_exits_zero_when_ready() {
    with_env(&[], || {
        let (_dir, args) = status_file(r#"{"status":"READY"}"#, 5);

        let result = watch::run(args);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["final_status"], "READY");
        assert_eq!(payload["data"]["elapsed_checks"], 1);
    });
}

#[test]
fn watch_stops_on_failed_status() {
    with_env(&[], || {
        let (_dir, args) = status_file(r#"{"status":"UPDATE_FAILED"}"#, 5);

        let result = watch::run(args);
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "resource_failed");
        assert_eq!(payload["data"]["final_status"], "FAILED");
        assert_eq!(payload["data"]["last_observed_status"], "UPDATE_FAILED");
        assert_eq!(payload["data"]["elapsed_checks"], 1);
    });
}

#[test]
fn watch_times_out_after_attempt_budget() {
    with_env(&[], || {
        let (_dir, args) = status_file(r#"{"status":"CREATING"}"#, 3);

        let result = watch::run(args);
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "timeout");
        assert_eq!(payload["data"]["final_status"], "TIMEOUT");
        assert_eq!(payload["data"]["last_observed_status"], "CREATING");
        assert_eq!(payload["data"]["elapsed_checks"], 3);
    });
}

#[test]
fn watch_uses_configured_ready_statuses() {
    with_env(&[("RETURNS_POLLER_READY_STATUSES", "ACTIVE")], || {
        let (_dir, args) = status_file(r#"{"status":"ACTIVE"}"#, 2);

        let result = watch::run(args);
        assert_eq!(result.exit_code, 0);
    });
}

#[test]
fn watch_rejects_relative_pointer() {
    with_env(&[], || {
        let (_dir, mut args) = status_file(r#"{"status":"READY"}"#, 1);
        args.pointer = "status".to_string();

        let result = watch::run(args);
        assert_eq!(result.exit_code, 5);
    });
}

#[test]
fn config_reports_env_sources() {
    with_env(&[("RETURNS_POLLER_MAX_ATTEMPTS", "12"), ("RETURNS_LOG_LEVEL", "warn")], || {
        let output = config::run();

        assert!(output.starts_with("effective config"));
        assert!(output
            .contains("- poller.max_attempts = 12 (source: env (RETURNS_POLLER_MAX_ATTEMPTS))"));
        assert!(output.contains("- logging.level = warn (source: env (RETURNS_LOG_LEVEL))"));
        assert!(output.contains("- poller.interval_secs = 10 (source: default)"));
        assert!(output.contains(
            "- returns.category_windows.electronics = 30 (source: standard table)"
        ));
    });
}

#[test]
fn doctor_json_passes_with_defaults() {
    with_env(&[], || {
        let output = doctor::run(true);

        let payload = parse_payload(&output);
        assert_eq!(payload["overall_status"], "pass");
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(names, vec!["config_validation", "decision_engine", "tool_dispatch"]);
    });
}

#[test]
fn doctor_skips_probes_when_config_is_invalid() {
    with_env(&[("RETURNS_POLLER_FAILED_STATUSES", "READY")], || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation:"));
        assert!(output.contains("- [skip] decision_engine:"));
    });
}

fn status_file(contents: &str, max_attempts: u32) -> (TempDir, WatchArgs) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("status.json");
    fs::write(&path, contents).expect("write status file");

    let args = WatchArgs {
        status_file: path,
        pointer: "/status".to_string(),
        interval_secs: Some(0),
        max_attempts: Some(max_attempts),
    };
    (dir, args)
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "RETURNS_DEFAULT_WINDOW_DAYS",
        "RETURNS_POLLER_INTERVAL_SECS",
        "RETURNS_POLLER_MAX_ATTEMPTS",
        "RETURNS_POLLER_READY_STATUSES",
        "RETURNS_POLLER_FAILED_STATUSES",
        "RETURNS_LOGGING_LEVEL",
        "RETURNS_LOGGING_FORMAT",
        "RETURNS_LOG_LEVEL",
        "RETURNS_LOG_FORMAT",
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

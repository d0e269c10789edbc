use std::env;
use std::fs;
use std::path::Path;

use returns_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = Sources { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "returns.default_window_days",
        &config.returns.default_window_days.to_string(),
        sources.field("returns.default_window_days", &["RETURNS_DEFAULT_WINDOW_DAYS"]),
    ));
    for (category, days) in config.window_table().categories() {
        let configured = config
            .returns
            .category_windows
            .keys()
            .find(|configured| configured.trim().eq_ignore_ascii_case(category));
        let source = match configured {
            Some(configured) => {
                sources.field(&format!("returns.category_windows.{configured}"), &[])
            }
            None => "standard table".to_string(),
        };
        lines.push(render_line(
            &format!("returns.category_windows.{category}"),
            &days.to_string(),
            source,
        ));
    }

    lines.push(render_line(
        "poller.interval_secs",
        &config.poller.interval_secs.to_string(),
        sources.field("poller.interval_secs", &["RETURNS_POLLER_INTERVAL_SECS"]),
    ));
    lines.push(render_line(
        "poller.max_attempts",
        &config.poller.max_attempts.to_string(),
        sources.field("poller.max_attempts", &["RETURNS_POLLER_MAX_ATTEMPTS"]),
    ));
    lines.push(render_line(
        "poller.ready_statuses",
        &config.poller.ready_statuses.join(","),
        sources.field("poller.ready_statuses", &["RETURNS_POLLER_READY_STATUSES"]),
    ));
    lines.push(render_line(
        "poller.failed_statuses",
        &config.poller.failed_statuses.join(","),
        sources.field("poller.failed_statuses", &["RETURNS_POLLER_FAILED_STATUSES"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        sources.field("logging.level", &["RETURNS_LOGGING_LEVEL", "RETURNS_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        sources.field("logging.format", &["RETURNS_LOGGING_FORMAT", "RETURNS_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

struct Sources<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl Sources<'_> {
    fn field(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env_is_set(key)) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn env_is_set(key: &str) -> bool {
    env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
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

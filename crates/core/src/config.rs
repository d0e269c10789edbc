use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::poller::PollPolicy;
use crate::returns::eligibility::{ReturnWindowTable, DEFAULT_RETURN_WINDOW_DAYS};

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["returns.toml", "config/returns.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub returns: ReturnsConfig,
    pub poller: PollerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ReturnsConfig {
    pub default_window_days: u32,
    /// Per-category windows layered over the standard table.
    pub category_windows: BTreeMap<String, u32>,
}

#[derive(Clone, Debug)]
pub struct PollerConfig {
    pub interval_secs: u64,
    pub max_attempts: u32,
    pub ready_statuses: Vec<String>,
    pub failed_statuses: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub log_level: Option<String>,
    pub default_window_days: Option<u32>,
    pub poll_interval_secs: Option<u64>,
    pub poll_max_attempts: Option<u32>,
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
        let poll = PollPolicy::default();
        Self {
            returns: ReturnsConfig {
                default_window_days: DEFAULT_RETURN_WINDOW_DAYS,
                category_windows: BTreeMap::new(),
            },
            poller: PollerConfig {
                interval_secs: poll.interval.as_secs(),
                max_attempts: poll.max_attempts,
                ready_statuses: poll.ready_statuses.into_iter().collect(),
                failed_statuses: poll.failed_statuses.into_iter().collect(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Standard category table with configured windows layered on top.
    pub fn window_table(&self) -> ReturnWindowTable {
        let base = ReturnWindowTable::default();
        let standard: Vec<(String, u32)> = base
            .categories()
            .map(|(category, days)| {
                let days = if days == base.default_days() {
                    self.returns.default_window_days
                } else {
                    days
                };
                (category.to_string(), days)
            })
            .collect();

        self.returns.category_windows.iter().fold(
            ReturnWindowTable::new(self.returns.default_window_days, standard),
            |table, (category, days)| table.with_window(category, *days),
        )
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poller.interval_secs),
            max_attempts: self.poller.max_attempts,
            ready_statuses: self.poller.ready_statuses.iter().cloned().collect(),
            failed_statuses: self.poller.failed_statuses.iter().cloned().collect(),
            ..PollPolicy::default()
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(returns) = patch.returns {
            if let Some(default_window_days) = returns.default_window_days {
                self.returns.default_window_days = default_window_days;
            }
            if let Some(category_windows) = returns.category_windows {
                self.returns.category_windows.extend(category_windows);
            }
        }

        if let Some(poller) = patch.poller {
            if let Some(interval_secs) = poller.interval_secs {
                self.poller.interval_secs = interval_secs;
            }
            if let Some(max_attempts) = poller.max_attempts {
                self.poller.max_attempts = max_attempts;
            }
            if let Some(ready_statuses) = poller.ready_statuses {
                self.poller.ready_statuses = ready_statuses;
            }
            if let Some(failed_statuses) = poller.failed_statuses {
                self.poller.failed_statuses = failed_statuses;
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
        if let Some(value) = read_env("RETURNS_DEFAULT_WINDOW_DAYS") {
            self.returns.default_window_days = parse_u32("RETURNS_DEFAULT_WINDOW_DAYS", &value)?;
        }

        if let Some(value) = read_env("RETURNS_POLLER_INTERVAL_SECS") {
            self.poller.interval_secs = parse_u64("RETURNS_POLLER_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("RETURNS_POLLER_MAX_ATTEMPTS") {
            self.poller.max_attempts = parse_u32("RETURNS_POLLER_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("RETURNS_POLLER_READY_STATUSES") {
            self.poller.ready_statuses = parse_list(&value);
        }
        if let Some(value) = read_env("RETURNS_POLLER_FAILED_STATUSES") {
            self.poller.failed_statuses = parse_list(&value);
        }

        let log_level =
            read_env("RETURNS_LOGGING_LEVEL").or_else(|| read_env("RETURNS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RETURNS_LOGGING_FORMAT").or_else(|| read_env("RETURNS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(default_window_days) = overrides.default_window_days {
            self.returns.default_window_days = default_window_days;
        }
        if let Some(interval_secs) = overrides.poll_interval_secs {
            self.poller.interval_secs = interval_secs;
        }
        if let Some(max_attempts) = overrides.poll_max_attempts {
            self.poller.max_attempts = max_attempts;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_returns(&self.returns)?;
        validate_poller(&self.poller)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
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

fn validate_window(key: &str, days: u32) -> Result<(), ConfigError> {
    if days == 0 || days > 365 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=365")));
    }
    Ok(())
}

fn validate_returns(returns: &ReturnsConfig) -> Result<(), ConfigError> {
    validate_window("returns.default_window_days", returns.default_window_days)?;
    for (category, days) in &returns.category_windows {
        if category.trim().is_empty() {
            return Err(ConfigError::Validation(
                "returns.category_windows keys must not be blank".to_string(),
            ));
        }
        validate_window(&format!("returns.category_windows.{category}"), *days)?;
    }
    Ok(())
}

fn validate_poller(poller: &PollerConfig) -> Result<(), ConfigError> {
    if poller.interval_secs > 3_600 {
        return Err(ConfigError::Validation(
            "poller.interval_secs must be at most 3600".to_string(),
        ));
    }

    if poller.max_attempts == 0 {
        return Err(ConfigError::Validation(
            "poller.max_attempts must be greater than zero".to_string(),
        ));
    }

    if poller.ready_statuses.iter().all(|status| status.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "poller.ready_statuses must name at least one status".to_string(),
        ));
    }
    if poller.failed_statuses.iter().all(|status| status.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "poller.failed_statuses must name at least one status".to_string(),
        ));
    }

    if let Some(overlap) =
        poller.ready_statuses.iter().find(|status| poller.failed_statuses.contains(status))
    {
        return Err(ConfigError::Validation(format!(
            "status `{overlap}` cannot be both ready and failed"
        )));
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

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
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

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    returns: Option<ReturnsPatch>,
    poller: Option<PollerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ReturnsPatch {
    default_window_days: Option<u32>,
    category_windows: Option<BTreeMap<String, u32>>,
}

#[derive(Debug, Default, Deserialize)]
struct PollerPatch {
    interval_secs: Option<u64>,
    max_attempts: Option<u32>,
    ready_statuses: Option<Vec<String>>,
    failed_statuses: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use returns_core::{PollPolicy, PollResult, PollState, StatusError, StatusPoller, StatusSource};
use serde_json::Value;
use tokio::sync::watch;
use tracing::info;

use super::{load_config, CommandResult, EXIT_INVALID_ARGUMENT};

const COMMAND: &str = "watch";

pub const DEFAULT_STATUS_POINTER: &str = "/status";

pub const EXIT_FAILED: u8 = 1;
pub const EXIT_TIMEOUT: u8 = 3;
pub const EXIT_CANCELLED: u8 = 4;

#[derive(Clone, Debug)]
pub struct WatchArgs {
    pub status_file: PathBuf,
    pub pointer: String,
    pub interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

/// Reads the status from a JSON document that some other process keeps
/// rewriting. The file is re-read on every attempt.
pub struct FileStatusSource {
    path: PathBuf,
    pointer: String,
}

impl FileStatusSource {
    pub fn new(path: impl Into<PathBuf>, pointer: impl Into<String>) -> Self {
        Self { path: path.into(), pointer: pointer.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StatusSource for FileStatusSource {
    async fn status(&self) -> Result<String, StatusError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|error| {
            StatusError::Unavailable(format!("{}: {error}", self.path.display()))
        })?;
        let document: Value = serde_json::from_str(&raw).map_err(|error| {
            StatusError::Malformed(format!("{}: {error}", self.path.display()))
        })?;

        match document.pointer(&self.pointer) {
            Some(Value::String(status)) => Ok(status.trim().to_string()),
            Some(other) => Err(StatusError::Malformed(format!(
                "`{}` is not a string: {other}",
                self.pointer
            ))),
            None => Err(StatusError::Malformed(format!(
                "`{}` not present in {}",
                self.pointer,
                self.path.display()
            ))),
        }
    }
}

pub fn run(args: WatchArgs) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    if !args.pointer.is_empty() && !args.pointer.starts_with('/') {
        return CommandResult::failure(
            COMMAND,
            "invalid_argument",
            format!("--pointer must be a JSON pointer starting with `/`, got `{}`", args.pointer),
            EXIT_INVALID_ARGUMENT,
        );
    }
    if args.max_attempts == Some(0) {
        return CommandResult::failure(
            COMMAND,
            "invalid_argument",
            "--max-attempts must be greater than zero",
            EXIT_INVALID_ARGUMENT,
        );
    }

    let mut policy = config.poll_policy();
    if let Some(interval_secs) = args.interval_secs {
        policy.interval = Duration::from_secs(interval_secs);
    }
    if let Some(max_attempts) = args.max_attempts {
        policy.max_attempts = max_attempts;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_FAILED,
            );
        }
    };

    let source = FileStatusSource::new(args.status_file, args.pointer);
    let result = runtime.block_on(watch_until_interrupted(source, policy));
    render(result)
}

/// Polls until a terminal state, stopping early on Ctrl+C.
pub async fn watch_until_interrupted(source: FileStatusSource, policy: PollPolicy) -> PollResult {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(event_name = "cli.watch.interrupted", "interrupt received; stopping watch");
            let _ = cancel_tx.send(true);
        }
    });

    info!(
        event_name = "cli.watch.started",
        status_file = %source.path().display(),
        interval_secs = policy.interval.as_secs(),
        max_attempts = policy.max_attempts,
        "watching status file"
    );
    let result = StatusPoller::new(source, policy).run_until_cancelled(cancel_rx).await;
    interrupt.abort();
    result
}

fn render(result: PollResult) -> CommandResult {
    let data = serde_json::to_value(&result).ok();
    let checks = result.elapsed_checks;
    let status = result.last_observed_status.as_str();

    match result.final_status {
        PollState::Ready => CommandResult::success_with_data(
            COMMAND,
            format!("resource reached {status} after {checks} checks"),
            data,
        ),
        PollState::Failed => CommandResult::failure_with_data(
            COMMAND,
            "resource_failed",
            format!("resource reported {status} after {checks} checks"),
            EXIT_FAILED,
            data,
        ),
        PollState::Cancelled => CommandResult::failure_with_data(
            COMMAND,
            "cancelled",
            format!("watch cancelled after {checks} checks (last status {status})"),
            EXIT_CANCELLED,
            data,
        ),
        PollState::Timeout | PollState::Polling => CommandResult::failure_with_data(
            COMMAND,
            "timeout",
            format!("gave up after {checks} checks (last status {status})"),
            EXIT_TIMEOUT,
            data,
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use returns_core::{StatusError, StatusSource};
    use tempfile::TempDir;

    use super::FileStatusSource;

    #[tokio::test]
    async fn reads_status_at_pointer() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("stack.json");
        fs::write(&path, r#"{"stack":{"status":" UPDATING "}}"#).expect("write status");

        let status = FileStatusSource::new(&path, "/stack/status").status().await;
        assert_eq!(status, Ok("UPDATING".to_string()));
    }

    #[tokio::test]
    async fn missing_file_is_unavailable_and_bad_json_is_malformed() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("status.json");

        let missing = FileStatusSource::new(&path, "/status").status().await;
        assert!(matches!(missing, Err(StatusError::Unavailable(_))));

        fs::write(&path, "{not json").expect("write status");
        let malformed = FileStatusSource::new(&path, "/status").status().await;
        assert!(matches!(malformed, Err(StatusError::Malformed(_))));

        fs::write(&path, r#"{"status": 3}"#).expect("write status");
        let wrong_type = FileStatusSource::new(&path, "/status").status().await;
        assert!(matches!(wrong_type, Err(StatusError::Malformed(_))));
    }
}

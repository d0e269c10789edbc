use serde::{Deserialize, Serialize};

/// Reported before the first successful status read.
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollState {
    Polling,
    Ready,
    Failed,
    Timeout,
    Cancelled,
}

impl PollState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polling => "POLLING",
            Self::Ready => "READY",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// How a raw status string reported by the watched system is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    Ready,
    Failed,
    InProgress,
    Unrecognized,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResult {
    pub final_status: PollState,
    pub last_observed_status: String,
    pub elapsed_checks: u32,
}

use std::sync::Arc;

use chrono::NaiveDate;
use returns_core::returns::eligibility::PURCHASE_DATE_FORMAT;
use returns_core::{Clock, DeterministicReturnsRuntime, FixedClock, ReturnsRuntime, SystemClock};

use super::{load_config, CommandResult, EXIT_INVALID_ARGUMENT};

const COMMAND: &str = "eligibility";

/// `today` pins the evaluation date; the system clock is used otherwise.
pub fn run(purchase_date: &str, category: &str, today: Option<&str>) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let clock: Arc<dyn Clock> = match today {
        Some(raw) => match NaiveDate::parse_from_str(raw.trim(), PURCHASE_DATE_FORMAT) {
            Ok(date) => Arc::new(FixedClock::on_date(date)),
            Err(error) => {
                return CommandResult::failure(
                    COMMAND,
                    "invalid_argument",
                    format!("--today must be YYYY-MM-DD: {error}"),
                    EXIT_INVALID_ARGUMENT,
                );
            }
        },
        None => Arc::new(SystemClock),
    };

    let runtime = DeterministicReturnsRuntime::with_clock(clock, config.window_table());
    let verdict = runtime.check_eligibility(purchase_date, category);

    CommandResult::success_with_data(
        COMMAND,
        verdict.reason.clone(),
        serde_json::to_value(&verdict).ok(),
    )
}

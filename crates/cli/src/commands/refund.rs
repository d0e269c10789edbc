use std::str::FromStr;

use returns_core::{RefundCalculator, TableRefundCalculator};
use rust_decimal::Decimal;

use super::{CommandResult, EXIT_INVALID_ARGUMENT};

const COMMAND: &str = "refund";

pub fn run(price: &str, condition: &str, reason: &str) -> CommandResult {
    let original_price = match Decimal::from_str(price.trim()) {
        Ok(price) => price,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_argument",
                format!("--price must be a decimal amount: {error}"),
                EXIT_INVALID_ARGUMENT,
            );
        }
    };

    let breakdown = TableRefundCalculator::default().calculate(original_price, condition, reason);

    CommandResult::success_with_data(
        COMMAND,
        breakdown.explanation.clone(),
        serde_json::to_value(&breakdown).ok(),
    )
}

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Decimal places kept on every monetary output.
pub const MONEY_SCALE: u32 = 2;

/// Half-up rounding: 0.005 becomes 0.01.
pub const MONEY_ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

const SELLER_FAULT_REASONS: &[&str] = &["defective", "wrong_item", "not_as_described"];

/// Deduction rates in percent.
const CONDITION_DEDUCTIONS: &[(&str, i64)] = &[("new", 0), ("opened", 0), ("used", 20), ("damaged", 50)];
const DEFAULT_DEDUCTION_PCT: i64 = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundBreakdown {
    #[serde(with = "rust_decimal::serde::float")]
    pub refund_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub deduction: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub original_price: Decimal,
    #[serde(rename = "reason")]
    pub explanation: String,
}

impl RefundBreakdown {
    fn zero(original_price: Decimal, explanation: impl Into<String>) -> Self {
        Self {
            refund_amount: Decimal::ZERO,
            deduction: Decimal::ZERO,
            original_price,
            explanation: explanation.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeductionTable {
    default_pct: Decimal,
    by_condition: BTreeMap<String, Decimal>,
    seller_fault_reasons: BTreeSet<String>,
}

impl Default for DeductionTable {
    fn default() -> Self {
        Self {
            default_pct: Decimal::from(DEFAULT_DEDUCTION_PCT),
            by_condition: CONDITION_DEDUCTIONS
                .iter()
                .map(|(condition, pct)| ((*condition).to_string(), Decimal::from(*pct)))
                .collect(),
            seller_fault_reasons: SELLER_FAULT_REASONS.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

impl DeductionTable {
    pub fn deduction_pct(&self, condition: &str) -> Decimal {
        self.by_condition.get(&normalize(condition)).copied().unwrap_or(self.default_pct)
    }

    pub fn is_seller_fault(&self, return_reason: &str) -> bool {
        self.seller_fault_reasons.contains(&normalize(return_reason))
    }
}

pub trait RefundCalculator: Send + Sync {
    fn calculate(&self, original_price: Decimal, condition: &str, return_reason: &str)
        -> RefundBreakdown;
}

#[derive(Clone, Debug, Default)]
pub struct TableRefundCalculator {
    table: DeductionTable,
}

impl TableRefundCalculator {
    pub fn new(table: DeductionTable) -> Self {
        Self { table }
    }
}

impl RefundCalculator for TableRefundCalculator {
    fn calculate(
        &self,
        original_price: Decimal,
        condition: &str,
        return_reason: &str,
    ) -> RefundBreakdown {
        let breakdown = calculate_refund(&self.table, original_price, condition, return_reason);
        debug!(
            event_name = "engine.refund.calculated",
            condition,
            return_reason,
            refund_amount = %breakdown.refund_amount,
            deduction = %breakdown.deduction,
            "refund calculated"
        );
        breakdown
    }
}

pub fn calculate_refund(
    table: &DeductionTable,
    original_price: Decimal,
    condition: &str,
    return_reason: &str,
) -> RefundBreakdown {
    if original_price < Decimal::ZERO {
        return RefundBreakdown::zero(original_price, "Invalid price");
    }

    if table.is_seller_fault(return_reason) {
        return RefundBreakdown {
            refund_amount: round_money(original_price),
            deduction: Decimal::ZERO,
            original_price,
            explanation: "Full refund - seller error".to_string(),
        };
    }

    let pct = table.deduction_pct(condition);
    match apply_deduction(original_price, pct) {
        Some((refund_amount, deduction)) => RefundBreakdown {
            refund_amount,
            deduction,
            original_price,
            explanation: format!("{}% deduction for {condition} condition", pct.trunc()),
        },
        None => {
            warn!(
                event_name = "engine.refund.overflow",
                original_price = %original_price,
                condition,
                "refund arithmetic overflowed"
            );
            RefundBreakdown::zero(
                original_price,
                "Error calculating refund: amount exceeds supported precision",
            )
        }
    }
}

/// Rates in the table never exceed 100%, so for a non-negative price these
/// checks do not fail and the caller's `None` arm is unreachable with the
/// shipped table.
fn apply_deduction(original_price: Decimal, pct: Decimal) -> Option<(Decimal, Decimal)> {
    let rate = pct.checked_div(Decimal::ONE_HUNDRED)?;
    let deduction = round_money(original_price.checked_mul(rate)?);
    let refund_amount = round_money(original_price.checked_sub(deduction)?);
    Some((refund_amount, deduction))
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, MONEY_ROUNDING)
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

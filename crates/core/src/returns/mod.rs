pub mod eligibility;
pub mod orders;
pub mod policy_text;
pub mod refund;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

use self::{
    eligibility::{
        EligibilityEvaluator, EligibilityVerdict, ReturnWindowTable, WindowEligibilityEvaluator,
    },
    refund::{RefundBreakdown, RefundCalculator, TableRefundCalculator},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub purchase_date: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub original_price: Decimal,
    pub condition: String,
    pub return_reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnAssessment {
    pub eligibility: EligibilityVerdict,
    /// Absent when the item cannot be returned at all.
    pub refund: Option<RefundBreakdown>,
}

pub trait ReturnsRuntime: Send + Sync {
    fn check_eligibility(&self, purchase_date: &str, category: &str) -> EligibilityVerdict;
    fn calculate_refund(
        &self,
        original_price: Decimal,
        condition: &str,
        return_reason: &str,
    ) -> RefundBreakdown;

    fn assess(&self, request: &ReturnRequest) -> ReturnAssessment {
        let eligibility = self.check_eligibility(&request.purchase_date, &request.category);
        let refund = eligibility.eligible.then(|| {
            self.calculate_refund(request.original_price, &request.condition, &request.return_reason)
        });
        ReturnAssessment { eligibility, refund }
    }
}

pub struct DeterministicReturnsRuntime<E, R> {
    eligibility: E,
    refunds: R,
}

impl<E, R> DeterministicReturnsRuntime<E, R> {
    pub fn new(eligibility: E, refunds: R) -> Self {
        Self { eligibility, refunds }
    }
}

impl<C> DeterministicReturnsRuntime<WindowEligibilityEvaluator<C>, TableRefundCalculator>
where
    C: Clock,
{
    pub fn with_clock(clock: C, windows: ReturnWindowTable) -> Self {
        Self::new(WindowEligibilityEvaluator::new(clock, windows), TableRefundCalculator::default())
    }
}

impl<E, R> ReturnsRuntime for DeterministicReturnsRuntime<E, R>
where
    E: EligibilityEvaluator,
    R: RefundCalculator,
{
    fn check_eligibility(&self, purchase_date: &str, category: &str) -> EligibilityVerdict {
        self.eligibility.evaluate(purchase_date, category)
    }

    fn calculate_refund(
        &self,
        original_price: Decimal,
        condition: &str,
        return_reason: &str,
    ) -> RefundBreakdown {
        self.refunds.calculate(original_price, condition, return_reason)
    }
}

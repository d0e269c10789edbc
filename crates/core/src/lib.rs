pub mod clock;
pub mod config;
pub mod errors;
pub mod poller;
pub mod returns;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use poller::{
    PollPolicy, PollResult, PollState, StatusClass, StatusError, StatusPoller, StatusSource,
};
pub use returns::eligibility::{
    EligibilityEvaluator, EligibilityReason, EligibilityVerdict, ReturnWindowTable,
    WindowEligibilityEvaluator,
};
pub use returns::orders::{Order, OrderCatalog, SampleOrderCatalog};
pub use returns::policy_text::format_policy_response;
pub use returns::refund::{DeductionTable, RefundBreakdown, RefundCalculator, TableRefundCalculator};
pub use returns::{
    DeterministicReturnsRuntime, ReturnAssessment, ReturnRequest, ReturnsRuntime,
};

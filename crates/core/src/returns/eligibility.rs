use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;

pub const PURCHASE_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_RETURN_WINDOW_DAYS: u32 = 30;

const STANDARD_WINDOWS: &[(&str, u32)] = &[
    ("electronics", 30),
    ("clothing", 30),
    ("books", 30),
    ("grocery", 30),
    ("jewelry", 30),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityReason {
    WithinWindow,
    ExceededWindow,
    FutureDate,
    InvalidDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    pub reason_code: EligibilityReason,
    pub reason: String,
    pub days_remaining: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_days: Option<u32>,
}

impl EligibilityVerdict {
    fn rejected(reason_code: EligibilityReason, reason: impl Into<String>) -> Self {
        Self { eligible: false, reason_code, reason: reason.into(), days_remaining: 0, window_days: None }
    }
}

/// Return window per product category, keyed by lower-cased name.
///
/// Every shipped category currently resolves to the same window. The table is
/// kept so a category can diverge from the default without touching callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReturnWindowTable {
    default_days: u32,
    windows: BTreeMap<String, u32>,
}

impl Default for ReturnWindowTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_RETURN_WINDOW_DAYS,
            STANDARD_WINDOWS.iter().map(|(category, days)| ((*category).to_string(), *days)),
        )
    }
}

impl ReturnWindowTable {
    pub fn new<I, K>(default_days: u32, windows: I) -> Self
    where
        I: IntoIterator<Item = (K, u32)>,
        K: AsRef<str>,
    {
        let windows =
            windows.into_iter().map(|(category, days)| (normalize(category.as_ref()), days)).collect();
        Self { default_days, windows }
    }

    pub fn with_window(mut self, category: &str, days: u32) -> Self {
        self.windows.insert(normalize(category), days);
        self
    }

    pub fn default_days(&self) -> u32 {
        self.default_days
    }

    pub fn window_for(&self, category: &str) -> u32 {
        self.windows.get(&normalize(category)).copied().unwrap_or(self.default_days)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, u32)> {
        self.windows.iter().map(|(category, days)| (category.as_str(), *days))
    }
}

pub trait EligibilityEvaluator: Send + Sync {
    fn evaluate(&self, purchase_date: &str, category: &str) -> EligibilityVerdict;
}

pub struct WindowEligibilityEvaluator<C> {
    clock: C,
    windows: ReturnWindowTable,
}

impl<C> WindowEligibilityEvaluator<C> {
    pub fn new(clock: C, windows: ReturnWindowTable) -> Self {
        Self { clock, windows }
    }

    pub fn windows(&self) -> &ReturnWindowTable {
        &self.windows
    }
}

impl<C> EligibilityEvaluator for WindowEligibilityEvaluator<C>
where
    C: Clock,
{
    fn evaluate(&self, purchase_date: &str, category: &str) -> EligibilityVerdict {
        let verdict = evaluate_eligibility(self.clock.today(), purchase_date, category, &self.windows);
        debug!(
            event_name = "engine.eligibility.evaluated",
            category,
            eligible = verdict.eligible,
            reason_code = ?verdict.reason_code,
            days_remaining = verdict.days_remaining,
            "return eligibility evaluated"
        );
        verdict
    }
}

pub fn evaluate_eligibility(
    today: NaiveDate,
    purchase_date: &str,
    category: &str,
    windows: &ReturnWindowTable,
) -> EligibilityVerdict {
    let Some(purchased_on) = parse_purchase_date(purchase_date) else {
        return EligibilityVerdict::rejected(
            EligibilityReason::InvalidDate,
            "Invalid date format. Use YYYY-MM-DD",
        );
    };

    let days_since = (today - purchased_on).num_days();
    if days_since < 0 {
        return EligibilityVerdict::rejected(
            EligibilityReason::FutureDate,
            "Purchase date is in the future",
        );
    }

    let window = windows.window_for(category);
    if days_since <= i64::from(window) {
        // days_since is within 0..=window here, so the narrowing cannot truncate.
        let days_remaining = window - days_since as u32;
        EligibilityVerdict {
            eligible: true,
            reason_code: EligibilityReason::WithinWindow,
            reason: format!("Within {window}-day return window"),
            days_remaining,
            window_days: Some(window),
        }
    } else {
        EligibilityVerdict {
            eligible: false,
            reason_code: EligibilityReason::ExceededWindow,
            reason: format!("Exceeded {window}-day return window"),
            days_remaining: 0,
            window_days: Some(window),
        }
    }
}

/// Strict `YYYY-MM-DD`; surrounding whitespace is rejected rather than skipped,
/// since chrono tolerates leading spaces before numeric fields.
fn parse_purchase_date(raw: &str) -> Option<NaiveDate> {
    if raw.trim() != raw {
        return None;
    }
    NaiveDate::parse_from_str(raw, PURCHASE_DATE_FORMAT).ok()
}

fn normalize(category: &str) -> String {
    category.trim().to_lowercase()
}

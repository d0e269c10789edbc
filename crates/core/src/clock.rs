use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of "now" for every date-relative decision.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date used for day arithmetic.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock. `today` follows the host's local calendar, matching what a
/// customer means by "I bought it N days ago".
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// Pins the clock to midnight UTC of `date`.
    pub fn on_date(date: NaiveDate) -> Self {
        Self { instant: date.and_time(chrono::NaiveTime::MIN).and_utc() }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

impl<C> Clock for std::sync::Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{Clock, FixedClock};

    #[test]
    fn fixed_clock_reports_pinned_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date");
        let clock = FixedClock::on_date(date);

        assert_eq!(clock.today(), date);
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn shared_clock_delegates_to_inner() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).expect("valid date");
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::on_date(date));

        assert_eq!(clock.today(), date);
    }
}

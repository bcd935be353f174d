use chrono::{DateTime, Local, NaiveDate, Utc};

/// Represents an entity responsible for providing dates across the application. This allows
/// tests to pin time instead of depending on the wall clock.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Local calendar date used for current-day operations. Kept on the trait so a pinned
    /// clock stays consistent between `time` and `today`.
    fn today(&self) -> NaiveDate;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

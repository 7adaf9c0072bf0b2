//! Reference clock, the "today" every classification is measured against.
//!
//! RULE: No transformer reads wall-clock time directly.
//! Maturity buckets, loan age and forecast buckets all take the date
//! from the engine's Clock so a run is reproducible.

use chrono::{DateTime, NaiveDate, Utc};

pub trait Clock: Send {
    /// Reference date for day and month arithmetic.
    fn today(&self) -> NaiveDate;

    /// Timestamp stamped on audit log entries.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. Used by the runner binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a single date. Timestamps are midnight UTC of that date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    pub date: NaiveDate,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.date
    }

    fn now(&self) -> DateTime<Utc> {
        self.date.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

//! Billing period boundaries
//!
//! A billing period is one calendar month in UTC. `start` is the first
//! instant of the month and `end` the first instant of the next month
//! (exclusive).

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One calendar-month window in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BillingPeriod {
    /// The period containing `now`
    ///
    /// Returns `None` only when the next month is outside chrono's
    /// representable range.
    pub fn containing(now: DateTime<Utc>) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?;
        let next = first.checked_add_months(Months::new(1))?;

        Some(Self {
            start: first.and_hms_opt(0, 0, 0)?.and_utc(),
            end: next.and_hms_opt(0, 0, 0)?.and_utc(),
        })
    }

    /// Period key used in storage, e.g. `2026-10`
    pub fn key(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }

    /// Whether `instant` falls inside `[start, end)`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

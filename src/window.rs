//! Day windows and the boundary instants that split a day into periods.

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use std::ops::RangeInclusive;

/// Length of one ridership period (six hours).
pub const PERIOD_SECS: i64 = 6 * 60 * 60;

/// Extra time read on each side of a day so that readings taken shortly
/// before midnight still count as candidates for the boundary.
pub const GRACE_PERIOD_SECS: i64 = 2 * 60 * 60;

/// One calendar day in a given time zone, anchored at local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub tz: Tz,
    /// Unix timestamp of local midnight.
    pub start: i64,
}

impl DayWindow {
    /// Builds the window for `date`, starting at local midnight in `tz`.
    ///
    /// If midnight is ambiguous (clocks fall back at midnight) the earlier
    /// instant is used.
    pub fn for_date(date: NaiveDate, tz: Tz) -> Result<Self> {
        let midnight = date.and_time(NaiveTime::MIN);
        let start = tz
            .from_local_datetime(&midnight)
            .earliest()
            .ok_or_else(|| Error::InvalidDate(format!("{date} has no local midnight in {tz}")))?
            .timestamp();

        Ok(Self { date, tz, start })
    }

    /// End of the day: always exactly 24 hours after the start, even on
    /// daylight-saving transition days.
    pub fn end(&self) -> i64 {
        self.start + 4 * PERIOD_SECS
    }

    /// The five boundary instants: midnight, 6 AM, noon, 6 PM, next midnight.
    pub fn boundaries(&self) -> [i64; 5] {
        std::array::from_fn(|i| self.start + i as i64 * PERIOD_SECS)
    }

    /// Timestamp range to read raw samples from, grace period included.
    pub fn query_range(&self) -> RangeInclusive<i64> {
        (self.start - GRACE_PERIOD_SECS)..=(self.end() + GRACE_PERIOD_SECS)
    }

    /// Local calendar years touched by [`DayWindow::query_range`], ascending.
    ///
    /// Readings are stored per year, so a window around New Year spans two.
    pub fn years(&self) -> Vec<i32> {
        let range = self.query_range();
        let first = local_year(*range.start(), self.tz).unwrap_or(self.date.year());
        let last = local_year(*range.end(), self.tz).unwrap_or(self.date.year());
        (first..=last).collect()
    }
}

fn local_year(unix: i64, tz: Tz) -> Option<i32> {
    DateTime::from_timestamp(unix, 0).map(|utc| utc.with_timezone(&tz).year())
}

/// Every date from `start` to `end`, both inclusive.
pub fn days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

//! Data types shared by the ingestion, aggregation and correction stages.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type StationId = i64;
pub type TurnstileId = String;

/// Storage value meaning "no readings for this station on this date".
pub const NO_DATA_SENTINEL: i64 = -1;

/// Date format used for `daily_count.date`. Downstream queries match on
/// prefixes such as `2019%` or `2019/06%`, so this must not change.
pub const DATE_KEY_FORMAT: &str = "%Y/%m/%d";

/// Formats a date as a `YYYY/MM/DD` storage key.
pub fn format_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parses a `YYYY/MM/DD` storage key.
pub fn parse_date_key(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).map_err(|_| Error::InvalidDate(key.to_string()))
}

/// A single cumulative counter reading from one physical turnstile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    pub station_id: StationId,
    pub turnstile_id: TurnstileId,
    pub unix_timestamp: i64,
    pub entries: i64,
    pub exits: i64,
}

/// The two cumulative counters of a turnstile at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterReading {
    pub entries: i64,
    pub exits: i64,
}

/// One of the four six-hour ridership periods of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Midnight to 6 AM
    Graveyard,
    /// 6 AM to noon
    Morning,
    /// Noon to 6 PM
    Afternoon,
    /// 6 PM to midnight
    Night,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Graveyard,
        Period::Morning,
        Period::Afternoon,
        Period::Night,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Period::Graveyard => "graveyard",
            Period::Morning => "morning",
            Period::Afternoon => "afternoon",
            Period::Night => "night",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Measured per-period totals for one station-day, indexed by [`Period::index`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PeriodTotals {
    pub entries: [i64; 4],
    pub exits: [i64; 4],
}

/// Result of aggregating one station over one day.
///
/// `NoData` is only lowered to the `-1` sentinel when the row is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyCount {
    Measured(PeriodTotals),
    NoData,
}

impl DailyCount {
    pub fn to_counters(&self) -> Counters {
        match self {
            DailyCount::NoData => Counters::NO_DATA,
            DailyCount::Measured(t) => Counters {
                graveyard_entries: t.entries[0],
                morning_entries: t.entries[1],
                afternoon_entries: t.entries[2],
                night_entries: t.entries[3],
                graveyard_exits: t.exits[0],
                morning_exits: t.exits[1],
                afternoon_exits: t.exits[2],
                night_exits: t.exits[3],
            },
        }
    }
}

/// The eight stored counters of a daily count row, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub graveyard_entries: i64,
    pub morning_entries: i64,
    pub afternoon_entries: i64,
    pub night_entries: i64,
    pub graveyard_exits: i64,
    pub morning_exits: i64,
    pub afternoon_exits: i64,
    pub night_exits: i64,
}

impl Counters {
    pub const NO_DATA: Counters = Counters {
        graveyard_entries: NO_DATA_SENTINEL,
        morning_entries: NO_DATA_SENTINEL,
        afternoon_entries: NO_DATA_SENTINEL,
        night_entries: NO_DATA_SENTINEL,
        graveyard_exits: NO_DATA_SENTINEL,
        morning_exits: NO_DATA_SENTINEL,
        afternoon_exits: NO_DATA_SENTINEL,
        night_exits: NO_DATA_SENTINEL,
    };

    pub fn entries(&self) -> [i64; 4] {
        [
            self.graveyard_entries,
            self.morning_entries,
            self.afternoon_entries,
            self.night_entries,
        ]
    }

    pub fn exits(&self) -> [i64; 4] {
        [
            self.graveyard_exits,
            self.morning_exits,
            self.afternoon_exits,
            self.night_exits,
        ]
    }

    pub fn values(&self) -> [i64; 8] {
        let [a, b, c, d] = self.entries();
        let [e, f, g, h] = self.exits();
        [a, b, c, d, e, f, g, h]
    }

    pub fn is_no_data(&self) -> bool {
        *self == Counters::NO_DATA
    }
}

/// One stored row of the daily count table, keyed by `(station_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCountRow {
    pub station_id: StationId,
    pub date: NaiveDate,
    pub counters: Counters,
}

impl DailyCountRow {
    pub fn new(station_id: StationId, date: NaiveDate, count: &DailyCount) -> Self {
        Self {
            station_id,
            date,
            counters: count.to_counters(),
        }
    }

    pub fn date_key(&self) -> String {
        format_date_key(self.date)
    }
}

/// Station metadata as loaded from the station list CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    /// Transit system, e.g. `NYCT` or `PATH`.
    #[serde(rename = "type")]
    pub system: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_key_format() {
        let date = NaiveDate::from_ymd_opt(2019, 6, 3).unwrap();
        assert_eq!(format_date_key(date), "2019/06/03");
        assert_eq!(parse_date_key("2019/06/03").unwrap(), date);
    }

    #[test]
    fn test_parse_date_key_rejects_other_formats() {
        assert!(parse_date_key("2019-06-03").is_err());
        assert!(parse_date_key("06/03/2019").is_err());
    }

    #[test]
    fn test_periods_follow_column_order() {
        let names: Vec<_> = Period::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["graveyard", "morning", "afternoon", "night"]);
        assert!(Period::ALL.iter().enumerate().all(|(i, p)| p.index() == i));
    }

    #[test]
    fn test_no_data_lowers_to_sentinel() {
        let counters = DailyCount::NoData.to_counters();
        assert!(counters.values().iter().all(|v| *v == NO_DATA_SENTINEL));
        assert!(counters.is_no_data());
    }

    #[test]
    fn test_measured_column_order() {
        let totals = PeriodTotals {
            entries: [1, 2, 3, 4],
            exits: [5, 6, 7, 8],
        };
        let counters = DailyCount::Measured(totals).to_counters();
        assert_eq!(counters.values(), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(counters.morning_entries, 2);
        assert_eq!(counters.night_exits, 8);
    }
}

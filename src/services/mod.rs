//! Storage abstractions used by the aggregation and correction passes.
//!
//! [`ReadingStore`] serves raw turnstile readings, [`StationRegistry`]
//! lists the stations to aggregate and [`DailyCountStore`] persists one row
//! of counters per station and date. The SQLite implementations live in
//! `infra::sqlite`; `infra::memory` provides an in-process double.

use crate::error::Result;
use crate::model::{DailyCountRow, RawSample, StationId};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Read access to raw cumulative turnstile readings, stored per year.
#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    /// Returns the readings of `year` whose timestamp lies in `range`,
    /// optionally restricted to one station.
    ///
    /// Rows come back ordered by timestamp, then by insertion order.
    async fn fetch_samples(
        &self,
        year: i32,
        range: RangeInclusive<i64>,
        station: Option<StationId>,
    ) -> Result<Vec<RawSample>>;
}

/// Source of the station ids that get a daily count row.
#[async_trait::async_trait]
pub trait StationRegistry: Send + Sync {
    async fn list_station_ids(&self) -> Result<BTreeSet<StationId>>;
}

/// Persistence for aggregated daily counts, keyed by `(station_id, date)`.
#[async_trait::async_trait]
pub trait DailyCountStore: Send + Sync {
    /// Inserts a new row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DuplicateKey`] if the key already exists.
    async fn insert_daily_count(&self, row: &DailyCountRow) -> Result<()>;

    /// Replaces the row with the same key, creating it if missing.
    async fn update_daily_count(&self, row: &DailyCountRow) -> Result<()>;

    /// Returns every stored row, ordered by station then date.
    async fn scan_daily_counts(&self) -> Result<Vec<DailyCountRow>>;

    /// Stations that already have a row for `date`.
    async fn stations_with_counts(&self, date: NaiveDate) -> Result<BTreeSet<StationId>>;
}

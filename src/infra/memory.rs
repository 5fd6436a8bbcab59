//! In-process store used by tests and dry runs.

use crate::error::{Error, Result};
use crate::model::{DailyCountRow, RawSample, Station, StationId};
use crate::services::{DailyCountStore, ReadingStore, StationRegistry};
use chrono::{DateTime, Datelike, NaiveDate};
use chrono_tz::Tz;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use std::sync::Mutex;

/// Keeps readings, stations and daily counts in memory.
///
/// Readings are filed under the local year of their timestamp in `tz`,
/// the same way ingestion files them into per-year tables.
pub struct MemoryStore {
    tz: Tz,
    readings: Mutex<BTreeMap<i32, Vec<RawSample>>>,
    stations: Mutex<BTreeMap<StationId, Station>>,
    counts: Mutex<BTreeMap<(StationId, NaiveDate), DailyCountRow>>,
}

impl MemoryStore {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            readings: Mutex::new(BTreeMap::new()),
            stations: Mutex::new(BTreeMap::new()),
            counts: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn add_station(&self, station: Station) {
        self.stations.lock().unwrap().insert(station.id, station);
    }

    pub fn add_samples<I>(&self, samples: I)
    where
        I: IntoIterator<Item = RawSample>,
    {
        let mut readings = self.readings.lock().unwrap();
        for sample in samples {
            let year = DateTime::from_timestamp(sample.unix_timestamp, 0)
                .map(|utc| utc.with_timezone(&self.tz).year())
                .unwrap_or_default();
            readings.entry(year).or_default().push(sample);
        }
    }

    /// Writes a row directly, bypassing the duplicate check.
    pub fn put_row(&self, row: DailyCountRow) {
        self.counts
            .lock()
            .unwrap()
            .insert((row.station_id, row.date), row);
    }

    pub fn row(&self, station_id: StationId, date: NaiveDate) -> Option<DailyCountRow> {
        self.counts.lock().unwrap().get(&(station_id, date)).cloned()
    }
}

#[async_trait::async_trait]
impl ReadingStore for MemoryStore {
    async fn fetch_samples(
        &self,
        year: i32,
        range: RangeInclusive<i64>,
        station: Option<StationId>,
    ) -> Result<Vec<RawSample>> {
        let readings = self.readings.lock().unwrap();
        let mut samples: Vec<RawSample> = readings
            .get(&year)
            .map(|all| {
                all.iter()
                    .filter(|s| range.contains(&s.unix_timestamp))
                    .filter(|s| station.is_none_or(|id| s.station_id == id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // stable: equal timestamps keep insertion order
        samples.sort_by_key(|s| s.unix_timestamp);
        Ok(samples)
    }
}

#[async_trait::async_trait]
impl StationRegistry for MemoryStore {
    async fn list_station_ids(&self) -> Result<BTreeSet<StationId>> {
        Ok(self.stations.lock().unwrap().keys().copied().collect())
    }
}

#[async_trait::async_trait]
impl DailyCountStore for MemoryStore {
    async fn insert_daily_count(&self, row: &DailyCountRow) -> Result<()> {
        let mut counts = self.counts.lock().unwrap();
        let key = (row.station_id, row.date);
        if counts.contains_key(&key) {
            return Err(Error::DuplicateKey {
                station_id: row.station_id,
                date: row.date,
            });
        }
        counts.insert(key, row.clone());
        Ok(())
    }

    async fn update_daily_count(&self, row: &DailyCountRow) -> Result<()> {
        self.put_row(row.clone());
        Ok(())
    }

    async fn scan_daily_counts(&self) -> Result<Vec<DailyCountRow>> {
        Ok(self.counts.lock().unwrap().values().cloned().collect())
    }

    async fn stations_with_counts(&self, date: NaiveDate) -> Result<BTreeSet<StationId>> {
        Ok(self
            .counts
            .lock()
            .unwrap()
            .keys()
            .filter(|(_, d)| *d == date)
            .map(|(id, _)| *id)
            .collect())
    }
}

use crate::counts::CountKey;
use crate::counts::aggregate::PLAUSIBLE_DELTA_LIMIT;
use crate::counts::runner::compute_station_day;
use crate::error::Result;
use crate::model::{Counters, DailyCountRow, NO_DATA_SENTINEL};
use crate::services::{DailyCountStore, ReadingStore};
use chrono_tz::Tz;
use tracing::{info, warn};

/// Outcome of one scan-and-correct pass.
#[derive(Debug, Default)]
pub struct CorrectionReport {
    /// Keys whose stored counters were out of range.
    pub flagged: Vec<CountKey>,
    /// Number of flagged rows that were recomputed and overwritten.
    pub corrected: usize,
    /// Keys that were rewritten but whose recomputed value is still out of
    /// range. These need attention at the reading level.
    pub unresolved: Vec<CountKey>,
}

/// A stored counter is anomalous if it is `>= 50000` or below the `-1`
/// sentinel. The sentinel itself is valid.
pub fn is_anomalous(counters: &Counters) -> bool {
    counters
        .values()
        .iter()
        .any(|v| *v >= PLAUSIBLE_DELTA_LIMIT || *v < NO_DATA_SENTINEL)
}

/// Returns the keys of every row with an anomalous counter, in input order.
pub fn scan(rows: &[DailyCountRow]) -> Vec<CountKey> {
    rows.iter()
        .filter(|row| is_anomalous(&row.counters))
        .map(|row| (row.station_id, row.date))
        .collect()
}

/// Scans the daily count store and recomputes every anomalous row from the
/// raw readings of that station and day, overwriting it in place.
///
/// A row that is still out of range after recomputation is written anyway
/// and listed in [`CorrectionReport::unresolved`]; the pass does not retry.
/// Running the pass again over unchanged readings yields the same rows.
#[tracing::instrument(skip(readings, counts))]
pub async fn correct_anomalies<R, C>(readings: &R, counts: &C, tz: Tz) -> Result<CorrectionReport>
where
    R: ReadingStore + ?Sized,
    C: DailyCountStore + ?Sized,
{
    let rows = counts.scan_daily_counts().await?;
    let flagged = scan(&rows);
    info!(scanned = rows.len(), flagged = flagged.len(), "Scanned daily counts");

    let mut report = CorrectionReport {
        flagged,
        ..Default::default()
    };

    for (station_id, date) in report.flagged.clone() {
        let row = compute_station_day(readings, station_id, date, tz).await?;
        counts.update_daily_count(&row).await?;
        report.corrected += 1;

        let c = &row.counters;
        if is_anomalous(c) {
            warn!(
                station_id,
                date = %row.date_key(),
                counters = ?c,
                "Recomputed daily count is still out of range"
            );
            report.unresolved.push((station_id, date));
        } else {
            info!(
                station_id,
                date = %row.date_key(),
                counters = ?c,
                "Fixed daily count"
            );
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryStore;
    use crate::model::{RawSample, StationId};
    use crate::window::DayWindow;
    use chrono::NaiveDate;
    use chrono_tz::America::New_York;

    const H6: i64 = 21600;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 6, 3).unwrap()
    }

    fn uniform(station_id: StationId, value: i64) -> DailyCountRow {
        DailyCountRow {
            station_id,
            date: date(),
            counters: Counters {
                graveyard_entries: value,
                morning_entries: value,
                afternoon_entries: value,
                night_entries: value,
                graveyard_exits: value,
                morning_exits: value,
                afternoon_exits: value,
                night_exits: value,
            },
        }
    }

    fn one_bad(station_id: StationId, bad: i64) -> DailyCountRow {
        let mut row = uniform(station_id, 10);
        row.counters.afternoon_exits = bad;
        row
    }

    fn store_with_readings(station_id: StationId, entries: [i64; 5]) -> MemoryStore {
        let store = MemoryStore::new(New_York);
        let t0 = DayWindow::for_date(date(), New_York).unwrap().start;
        store.add_samples((0..5).map(|i| RawSample {
            station_id,
            turnstile_id: "01-00-00".into(),
            unix_timestamp: t0 + i as i64 * H6,
            entries: entries[i],
            exits: 0,
        }));
        store
    }

    #[test]
    fn test_scanner_flags_only_out_of_range_rows() {
        let rows = vec![
            uniform(1, -1),
            uniform(2, 0),
            uniform(3, 49_999),
            uniform(4, 50_000),
            uniform(5, -5),
            one_bad(6, 50_000),
            one_bad(7, -5),
            one_bad(8, -1),
        ];

        let flagged: Vec<StationId> = scan(&rows).into_iter().map(|(id, _)| id).collect();

        assert_eq!(flagged, vec![4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_corrects_flagged_row_in_place() {
        let store = store_with_readings(1, [100, 130, 200, 260, 300]);
        store.put_row(one_bad(1, 75_000));
        store.put_row(uniform(2, 42));

        let report = correct_anomalies(&store, &store, New_York).await.unwrap();

        assert_eq!(report.flagged, vec![(1, date())]);
        assert_eq!(report.corrected, 1);
        assert!(report.unresolved.is_empty());

        let fixed = store.row(1, date()).unwrap();
        assert_eq!(fixed.counters.entries(), [30, 70, 60, 40]);
        assert_eq!(fixed.counters.exits(), [0; 4]);
        // untouched
        assert_eq!(store.row(2, date()).unwrap(), uniform(2, 42));
    }

    #[tokio::test]
    async fn test_correction_is_idempotent() {
        let store = store_with_readings(1, [100, 130, 200, 260, 300]);
        store.put_row(one_bad(1, -20));

        correct_anomalies(&store, &store, New_York).await.unwrap();
        let first = store.row(1, date()).unwrap();

        let second_pass = correct_anomalies(&store, &store, New_York).await.unwrap();

        assert!(second_pass.flagged.is_empty());
        assert_eq!(second_pass.corrected, 0);
        assert_eq!(store.row(1, date()).unwrap(), first);
    }

    #[tokio::test]
    async fn test_flagged_row_without_readings_becomes_no_data() {
        let store = MemoryStore::new(New_York);
        store.put_row(one_bad(9, 90_000));

        let report = correct_anomalies(&store, &store, New_York).await.unwrap();

        assert_eq!(report.corrected, 1);
        assert!(store.row(9, date()).unwrap().counters.is_no_data());
    }

    #[tokio::test]
    async fn test_residual_anomaly_is_persisted_and_reported() {
        // Two turnstiles each with a plausible 30000 delta sum past the limit.
        let store = store_with_readings(1, [0, 30_000, 30_000, 30_000, 30_000]);
        let t0 = DayWindow::for_date(date(), New_York).unwrap().start;
        store.add_samples((0..5).map(|i| RawSample {
            station_id: 1,
            turnstile_id: "01-00-01".into(),
            unix_timestamp: t0 + i * H6,
            entries: if i == 0 { 0 } else { 30_000 },
            exits: 0,
        }));
        store.put_row(uniform(1, 99_999));

        let report = correct_anomalies(&store, &store, New_York).await.unwrap();

        assert_eq!(report.unresolved, vec![(1, date())]);
        let row = store.row(1, date()).unwrap();
        assert_eq!(row.counters.graveyard_entries, 60_000);

        let again = correct_anomalies(&store, &store, New_York).await.unwrap();
        assert_eq!(again.unresolved, vec![(1, date())]);
        assert_eq!(store.row(1, date()).unwrap(), row);
    }
}

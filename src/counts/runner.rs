use crate::counts::CountKey;
use crate::counts::aggregate::{aggregate_day, aggregate_station};
use crate::counts::grouping::TurnstileIndex;
use crate::error::{Error, Result};
use crate::model::{DailyCountRow, StationId};
use crate::services::{DailyCountStore, ReadingStore, StationRegistry};
use crate::window::{DayWindow, days};
use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, error, info};

/// How often (in rows written) progress is logged.
const PROGRESS_EVERY: usize = 250;

/// Outcome of an aggregation run over a date range.
#[derive(Debug, Default)]
pub struct AggregationReport {
    pub days: usize,
    pub rows_written: usize,
    /// Keys skipped because a row already existed and `resume` was set.
    pub rows_skipped: usize,
    /// Keys whose insert was rejected because a row already existed.
    pub conflicts: Vec<CountKey>,
}

/// Reads every sample of `window` (grace period included) and groups it.
///
/// Readings are stored per year, so every year the window touches is read.
pub async fn load_window<R>(
    readings: &R,
    window: &DayWindow,
    station: Option<StationId>,
) -> Result<TurnstileIndex>
where
    R: ReadingStore + ?Sized,
{
    let range = window.query_range();
    let mut samples = Vec::new();

    for year in window.years() {
        samples.extend(readings.fetch_samples(year, range.clone(), station).await?);
    }

    debug!(date = %window.date, samples = samples.len(), "Loaded window");
    Ok(TurnstileIndex::build(samples, &range))
}

/// Recomputes the daily count of a single station and day from raw readings.
pub async fn compute_station_day<R>(
    readings: &R,
    station_id: StationId,
    date: NaiveDate,
    tz: Tz,
) -> Result<DailyCountRow>
where
    R: ReadingStore + ?Sized,
{
    let window = DayWindow::for_date(date, tz)?;
    let index = load_window(readings, &window, Some(station_id)).await?;
    let count = aggregate_station(index.station(station_id), &window);
    Ok(DailyCountRow::new(station_id, date, &count))
}

/// Aggregates every registered station for each day from `start` to `end`
/// inclusive and inserts one row per station and day.
///
/// Days are processed one at a time; the grouped readings of a day are
/// dropped before the next one is loaded. With `resume`, keys that already
/// have a row are skipped. Without it they are reported as conflicts and
/// the rest of the run carries on.
#[tracing::instrument(skip(readings, registry, counts))]
pub async fn aggregate_range<R, G, C>(
    readings: &R,
    registry: &G,
    counts: &C,
    tz: Tz,
    start: NaiveDate,
    end: NaiveDate,
    resume: bool,
) -> Result<AggregationReport>
where
    R: ReadingStore + ?Sized,
    G: StationRegistry + ?Sized,
    C: DailyCountStore + ?Sized,
{
    let stations = registry.list_station_ids().await?;
    info!(stations = stations.len(), resume, "Starting aggregation");

    let mut report = AggregationReport::default();

    for date in days(start, end) {
        let window = DayWindow::for_date(date, tz)?;
        info!(date = %date, "Processing day");

        let existing = if resume {
            counts.stations_with_counts(date).await?
        } else {
            Default::default()
        };

        let index = load_window(readings, &window, None).await?;
        debug!(
            date = %date,
            stations = index.station_count(),
            turnstiles = index.turnstile_count(),
            "Grouped readings"
        );

        let pending: Vec<&StationId> = stations.iter().filter(|id| !existing.contains(id)).collect();
        report.rows_skipped += stations.len() - pending.len();

        for row in aggregate_day(&index, pending, &window) {
            match counts.insert_daily_count(&row).await {
                Ok(()) => {
                    report.rows_written += 1;
                    if report.rows_written % PROGRESS_EVERY == 0 {
                        info!(
                            rows_written = report.rows_written,
                            station_id = row.station_id,
                            counters = ?row.counters,
                            "Daily counts inserted"
                        );
                    }
                }
                Err(Error::DuplicateKey { station_id, date }) => {
                    error!(station_id, date = %row.date_key(), "Daily count already exists, row not written");
                    report.conflicts.push((station_id, date));
                }
                Err(e) => return Err(e),
            }
        }

        report.days += 1;
    }

    info!(
        days = report.days,
        rows_written = report.rows_written,
        rows_skipped = report.rows_skipped,
        conflicts = report.conflicts.len(),
        "Aggregation finished"
    );
    Ok(report)
}

use crate::error::{Error, Result};
use crate::infra::sqlite::SqliteStore;
use crate::ingest::stations::{StationResolver, station_key};
use crate::model::RawSample;
use chrono::{Datelike, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FILE_PREFIX: &str = "turnstile_";
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Identifies one physical turnstile. SCP values repeat across booths,
/// so the control area and unit are part of the key.
pub fn turnstile_key(control_area: &str, unit: &str, scp: &str) -> String {
    format!("{control_area}-{unit}-{scp}")
}

/// One row of an MTA weekly turnstile file. Only the columns we use.
#[derive(Debug, Deserialize)]
struct TurnstileRecord {
    #[serde(rename = "C/A")]
    control_area: String,
    #[serde(rename = "UNIT")]
    unit: String,
    #[serde(rename = "SCP")]
    scp: String,
    #[serde(rename = "STATION")]
    station: String,
    #[serde(rename = "LINENAME")]
    line_name: String,
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "TIME")]
    time: String,
    #[serde(rename = "ENTRIES")]
    entries: i64,
    #[serde(rename = "EXITS")]
    exits: i64,
}

/// Which weekly files to read: dates strictly between `after` and `before`,
/// both in the `YYMMDD` form used in file names.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFilter {
    pub after: Option<u32>,
    pub before: Option<u32>,
}

impl FileFilter {
    fn accepts(&self, stamp: u32) -> bool {
        self.after.is_none_or(|a| stamp > a) && self.before.is_none_or(|b| stamp < b)
    }
}

/// Counts from one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub files: usize,
    pub rows: usize,
    pub skipped_rows: usize,
    /// Station keys that neither the station list nor the lookup resolve.
    pub unknown_stations: BTreeSet<String>,
}

/// Extracts the `YYMMDD` stamp from `turnstile_YYMMDD.txt` or `.txt.gz`.
pub fn file_stamp(name: &str) -> Option<u32> {
    let rest = name.strip_prefix(FILE_PREFIX)?;
    let digits = rest
        .strip_suffix(".txt")
        .or_else(|| rest.strip_suffix(".txt.gz"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Lists matching turnstile files in `dir`, newest first.
pub fn list_files(dir: &Path, filter: FileFilter) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(stamp) = path.file_name().and_then(|n| n.to_str()).and_then(file_stamp) else {
            continue;
        };
        if filter.accepts(stamp) {
            files.push((stamp, path));
        }
    }

    files.sort_by(|a, b| b.cmp(a));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn open(path: &Path) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(MultiGzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    // MTA headers carry trailing padding ("EXITS      ").
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Converts a local `MM/DD/YYYY HH:MM:SS` reading time to its local year
/// and unix timestamp. Ambiguous times resolve to the earlier instant.
pub fn local_timestamp(date: &str, time: &str, tz: Tz) -> Result<(i32, i64)> {
    let text = format!("{date} {time}");
    let naive = NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT)
        .map_err(|_| Error::InvalidTimestamp(text.clone()))?;
    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .ok_or(Error::InvalidTimestamp(text))?;
    Ok((naive.year(), local.timestamp()))
}

/// Parses one turnstile file into raw samples grouped by local year.
pub fn parse_readings<R: Read>(
    reader: R,
    tz: Tz,
    resolver: &StationResolver,
    report: &mut IngestReport,
) -> Result<BTreeMap<i32, Vec<RawSample>>> {
    let mut by_year: BTreeMap<i32, Vec<RawSample>> = BTreeMap::new();

    for result in csv_reader(reader).deserialize() {
        let record: TurnstileRecord = result?;

        let key = station_key(&record.station, &record.line_name);
        let Some(station_id) = resolver.resolve(&key) else {
            report.skipped_rows += 1;
            report.unknown_stations.insert(key);
            continue;
        };

        let (year, unix_timestamp) = match local_timestamp(&record.date, &record.time, tz) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, station = %key, "Skipping reading");
                report.skipped_rows += 1;
                continue;
            }
        };

        by_year.entry(year).or_default().push(RawSample {
            station_id,
            turnstile_id: turnstile_key(&record.control_area, &record.unit, &record.scp),
            unix_timestamp,
            entries: record.entries,
            exits: record.exits,
        });
        report.rows += 1;
    }

    Ok(by_year)
}

/// Loads every matching turnstile file in `dir` into the per-year reading tables.
#[tracing::instrument(skip(store, resolver))]
pub async fn ingest_readings(
    store: &SqliteStore,
    resolver: &StationResolver,
    dir: &Path,
    filter: FileFilter,
    tz: Tz,
) -> Result<IngestReport> {
    let files = list_files(dir, filter)?;
    info!(files = files.len(), "Reading turnstile files");

    let mut report = IngestReport::default();

    for path in files {
        info!(file = %path.display(), "Reading file");
        let by_year = parse_readings(open(&path)?, tz, resolver, &mut report)?;

        for (year, samples) in &by_year {
            store.append_samples(*year, samples).await?;
            debug!(year, rows = samples.len(), "Inserted readings");
        }

        report.files += 1;
        info!(rows = report.rows, "Readings inserted so far");
    }

    if !report.unknown_stations.is_empty() {
        warn!(
            skipped_rows = report.skipped_rows,
            unknown = ?report.unknown_stations,
            "Some station names could not be resolved"
        );
    }

    Ok(report)
}

/// Lists station keys in the matching files that cannot be resolved,
/// without writing anything.
pub fn check_stations(
    dir: &Path,
    filter: FileFilter,
    resolver: &StationResolver,
) -> Result<BTreeSet<String>> {
    let mut unknown = BTreeSet::new();

    #[derive(Deserialize)]
    struct NameColumns {
        #[serde(rename = "STATION")]
        station: String,
        #[serde(rename = "LINENAME")]
        line_name: String,
    }

    for path in list_files(dir, filter)? {
        info!(file = %path.display(), "Checking file");
        for result in csv_reader(open(&path)?).deserialize() {
            let row: NameColumns = result?;
            let key = station_key(&row.station, &row.line_name);
            if resolver.resolve(&key).is_none() {
                unknown.insert(key);
            }
        }
    }

    Ok(unknown)
}

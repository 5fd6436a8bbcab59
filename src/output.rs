//! Output formatting for summary exports.
//!
//! Supports pretty JSON logging and CSV files.

use crate::error::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Logs records as pretty-printed JSON.
pub fn print_json<T: Serialize>(records: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    info!("{}", json);
    Ok(())
}

/// Writes `records` to a new CSV file at `path` with a header row,
/// replacing any existing file.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = records.len(), "Writing CSV");

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sqlite::PeriodSumRow;
    use std::fs;

    fn row(date: &str) -> PeriodSumRow {
        PeriodSumRow {
            date: date.to_string(),
            graveyard: 1,
            morning: 2,
            afternoon: 3,
            night: 4,
        }
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&vec![row("2019/06/03")]).unwrap();
    }

    #[test]
    fn test_write_records_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");

        write_records(&path, &[row("2019/06/03"), row("2019/06/04")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "date,graveyard,morning,afternoon,night");
        assert_eq!(lines[1], "2019/06/03,1,2,3,4");
    }

    #[test]
    fn test_write_records_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");

        write_records(&path, &[row("2019/06/03"), row("2019/06/04")]).unwrap();
        write_records(&path, &[row("2019/06/05")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("2019/06/05"));
    }
}

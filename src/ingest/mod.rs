//! Loading station metadata and raw MTA turnstile files into SQLite.

pub mod readings;
pub mod stations;

pub use readings::{FileFilter, IngestReport, check_stations, ingest_readings};
pub use stations::{StationResolver, ingest_stations};

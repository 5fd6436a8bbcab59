//! Runtime settings shared by every subcommand.

use crate::error::{Error, Result};
use chrono_tz::Tz;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "mta.db";
pub const DEFAULT_TIME_ZONE: &str = "America/New_York";

/// Where the data lives and which zone local midnight is computed in.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub tz: Tz,
}

impl Settings {
    pub fn new(db_path: impl Into<PathBuf>, tz_name: &str) -> Result<Self> {
        Ok(Self {
            db_path: db_path.into(),
            tz: parse_time_zone(tz_name)?,
        })
    }
}

/// Parses an IANA zone name such as `America/New_York`.
pub fn parse_time_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| Error::UnknownTimeZone(name.to_string()))
}

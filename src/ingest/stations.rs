use crate::error::Result;
use crate::infra::sqlite::SqliteStore;
use crate::model::{Station, StationId};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Reads station metadata rows (`id,name,lon,lat,type`).
pub fn read_stations<R: Read>(reader: R) -> Result<Vec<Station>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut stations = Vec::new();
    for result in rdr.deserialize() {
        let station: Station = result?;
        stations.push(station);
    }
    Ok(stations)
}

/// Loads the station CSV at `path` into the station table.
pub async fn ingest_stations(store: &SqliteStore, path: &Path) -> Result<usize> {
    let stations = read_stations(std::fs::File::open(path)?)?;

    for station in &stations {
        store.upsert_station(station).await?;
    }

    info!(path = %path.display(), stations = stations.len(), "Stations loaded");
    Ok(stations.len())
}

#[derive(Debug, Deserialize)]
struct LookupRow {
    key: String,
    id: StationId,
}

/// Reads `key,id` aliases for station names that differ between the raw
/// turnstile files and the station list.
pub fn read_lookup<R: Read>(reader: R) -> Result<HashMap<String, StationId>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut aliases = HashMap::new();
    for result in rdr.deserialize() {
        let row: LookupRow = result?;
        aliases.insert(row.key, row.id);
    }
    Ok(aliases)
}

/// Resolves `STATION-LINENAME` keys from raw files to station ids.
#[derive(Debug, Default)]
pub struct StationResolver {
    by_name: HashMap<String, StationId>,
}

impl StationResolver {
    /// Builds a resolver from the stored station names, with `lookup`
    /// aliases taking precedence.
    pub async fn load(store: &SqliteStore, lookup: Option<&Path>) -> Result<Self> {
        let mut by_name = store.station_ids_by_name().await?;

        if let Some(path) = lookup {
            let aliases = read_lookup(std::fs::File::open(path)?)?;
            info!(path = %path.display(), aliases = aliases.len(), "Station lookup loaded");
            by_name.extend(aliases);
        }

        Ok(Self { by_name })
    }

    pub fn from_names(by_name: HashMap<String, StationId>) -> Self {
        Self { by_name }
    }

    pub fn resolve(&self, key: &str) -> Option<StationId> {
        self.by_name.get(key).copied()
    }
}

/// The key raw files are matched on: `STATION-LINENAME`.
pub fn station_key(station: &str, line: &str) -> String {
    format!("{station}-{line}")
}

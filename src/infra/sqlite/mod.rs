//! SQLite-backed stores.
//!
//! One database holds the station list (`station_data`), the raw readings
//! (one `data_YYYY` table per year) and the aggregated `daily_count` table.

mod counts;
mod readings;
mod schema;
mod stations;

pub use counts::PeriodSumRow;

use crate::error::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path` and ensures the schema.
    pub async fn open(path: &Path) -> Result<Self> {
        let newly_created = !path.exists();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        // Single writer: one connection keeps inserts strictly ordered.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        if newly_created {
            info!(path = %path.display(), "Initialized new database");
        } else {
            info!(path = %path.display(), "Opened existing database");
        }

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Opens a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Every connection to :memory: is its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

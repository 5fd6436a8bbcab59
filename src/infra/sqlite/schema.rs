use super::SqliteStore;
use crate::error::Result;

/// Name of the per-year raw reading table.
pub(super) fn reading_table(year: i32) -> String {
    format!("data_{year}")
}

impl SqliteStore {
    /// Creates the station and daily count tables if needed. Idempotent.
    pub(super) async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS station_data (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                lon REAL NOT NULL,
                lat REAL NOT NULL,
                type TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_count (
                station_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                graveyard_entries INTEGER DEFAULT -1,
                morning_entries INTEGER DEFAULT -1,
                afternoon_entries INTEGER DEFAULT -1,
                night_entries INTEGER DEFAULT -1,
                graveyard_exits INTEGER DEFAULT -1,
                morning_exits INTEGER DEFAULT -1,
                afternoon_exits INTEGER DEFAULT -1,
                night_exits INTEGER DEFAULT -1,
                PRIMARY KEY (station_id, date)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Creates `data_{year}` and its timestamp index if needed.
    pub(super) async fn ensure_reading_table(&self, year: i32) -> Result<()> {
        let table = reading_table(year);

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                station_id INTEGER NOT NULL,
                turnstile_id TEXT NOT NULL,
                unix_timestamp INTEGER NOT NULL,
                entries INTEGER NOT NULL,
                exits INTEGER NOT NULL,
                FOREIGN KEY(station_id) REFERENCES station_data(id)
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_unix_timestamp ON {table} (unix_timestamp)"
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub(super) async fn table_exists(&self, table: &str) -> Result<bool> {
        let found: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}

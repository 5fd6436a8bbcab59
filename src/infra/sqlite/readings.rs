use super::SqliteStore;
use super::schema::reading_table;
use crate::error::Result;
use crate::model::{RawSample, StationId};
use crate::services::ReadingStore;
use sqlx::Row;
use std::ops::RangeInclusive;
use tracing::debug;

impl SqliteStore {
    /// Appends readings to `data_{year}` in one transaction, creating the table if needed.
    pub async fn append_samples(&self, year: i32, samples: &[RawSample]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }

        self.ensure_reading_table(year).await?;
        let sql = format!(
            "INSERT INTO {} (station_id, turnstile_id, unix_timestamp, entries, exits) VALUES (?, ?, ?, ?, ?)",
            reading_table(year)
        );

        let mut tx = self.pool.begin().await?;
        for sample in samples {
            sqlx::query(&sql)
                .bind(sample.station_id)
                .bind(&sample.turnstile_id)
                .bind(sample.unix_timestamp)
                .bind(sample.entries)
                .bind(sample.exits)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(year, rows = samples.len(), "Appended readings");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReadingStore for SqliteStore {
    #[tracing::instrument(skip(self), fields(rows))]
    async fn fetch_samples(
        &self,
        year: i32,
        range: RangeInclusive<i64>,
        station: Option<StationId>,
    ) -> Result<Vec<RawSample>> {
        let table = reading_table(year);
        if !self.table_exists(&table).await? {
            debug!(table, "No readings table for year");
            return Ok(Vec::new());
        }

        let station_clause = if station.is_some() {
            " AND station_id = ?"
        } else {
            ""
        };
        let sql = format!(
            "SELECT station_id, turnstile_id, unix_timestamp, entries, exits FROM {table} \
             WHERE unix_timestamp >= ? AND unix_timestamp <= ?{station_clause} \
             ORDER BY unix_timestamp, rowid"
        );

        let mut query = sqlx::query(&sql).bind(*range.start()).bind(*range.end());
        if let Some(id) = station {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let samples = rows
            .into_iter()
            .map(|row| {
                Ok(RawSample {
                    station_id: row.try_get("station_id")?,
                    turnstile_id: row.try_get("turnstile_id")?,
                    unix_timestamp: row.try_get("unix_timestamp")?,
                    entries: row.try_get("entries")?,
                    exits: row.try_get("exits")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::Span::current().record("rows", samples.len());
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(station: StationId, turnstile: &str, ts: i64, entries: i64) -> RawSample {
        RawSample {
            station_id: station,
            turnstile_id: turnstile.to_string(),
            unix_timestamp: ts,
            entries,
            exits: 0,
        }
    }

    #[tokio::test]
    async fn test_fetch_missing_year_is_empty() {
        let store = SqliteStore::in_memory().await.unwrap();
        let rows = store.fetch_samples(2016, 0..=i64::MAX, None).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_filters_range_and_station() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .append_samples(
                2019,
                &[
                    sample(1, "a", 300, 3),
                    sample(1, "a", 100, 1),
                    sample(2, "b", 200, 2),
                    sample(1, "a", 900, 9),
                ],
            )
            .await
            .unwrap();

        let all = store.fetch_samples(2019, 100..=300, None).await.unwrap();
        assert_eq!(
            all.iter().map(|s| s.unix_timestamp).collect::<Vec<_>>(),
            vec![100, 200, 300]
        );

        let one = store.fetch_samples(2019, 100..=300, Some(1)).await.unwrap();
        assert_eq!(one.len(), 2);
        assert!(one.iter().all(|s| s.station_id == 1));
    }

    #[tokio::test]
    async fn test_fetch_keeps_insertion_order_for_equal_timestamps() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .append_samples(2019, &[sample(1, "a", 100, 1), sample(1, "a", 100, 2)])
            .await
            .unwrap();

        let rows = store.fetch_samples(2019, 0..=1000, None).await.unwrap();
        assert_eq!(rows[0].entries, 1);
        assert_eq!(rows[1].entries, 2);
    }
}

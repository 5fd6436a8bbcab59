use super::SqliteStore;
use crate::error::{Error, Result};
use crate::model::{Counters, DailyCountRow, NO_DATA_SENTINEL, StationId, format_date_key, parse_date_key};
use crate::services::DailyCountStore;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::collections::BTreeSet;

const COUNT_COLUMNS: &str = "station_id, date, \
    graveyard_entries, morning_entries, afternoon_entries, night_entries, \
    graveyard_exits, morning_exits, afternoon_exits, night_exits";

/// Per-date totals of one direction (entries or exits) summed over stations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSumRow {
    pub date: String,
    pub graveyard: i64,
    pub morning: i64,
    pub afternoon: i64,
    pub night: i64,
}

fn row_to_daily_count(row: &SqliteRow) -> Result<DailyCountRow> {
    let date: String = row.try_get("date")?;
    Ok(DailyCountRow {
        station_id: row.try_get("station_id")?,
        date: parse_date_key(&date)?,
        counters: Counters {
            graveyard_entries: row.try_get("graveyard_entries")?,
            morning_entries: row.try_get("morning_entries")?,
            afternoon_entries: row.try_get("afternoon_entries")?,
            night_entries: row.try_get("night_entries")?,
            graveyard_exits: row.try_get("graveyard_exits")?,
            morning_exits: row.try_get("morning_exits")?,
            afternoon_exits: row.try_get("afternoon_exits")?,
            night_exits: row.try_get("night_exits")?,
        },
    })
}

impl SqliteStore {
    /// Sums each period of `exits` (or entries) per date for dates whose key
    /// starts with `prefix`, optionally limited to stations of one system.
    ///
    /// Rows holding the no-data sentinel are left out of the sums.
    pub async fn period_sums(
        &self,
        prefix: &str,
        system: Option<&str>,
        exits: bool,
    ) -> Result<Vec<PeriodSumRow>> {
        let direction = if exits { "exits" } else { "entries" };
        let system_clause = if system.is_some() {
            " AND station_id IN (SELECT id FROM station_data WHERE type = ?)"
        } else {
            ""
        };
        let sql = format!(
            "SELECT date, \
             SUM(graveyard_{direction}) AS graveyard, SUM(morning_{direction}) AS morning, \
             SUM(afternoon_{direction}) AS afternoon, SUM(night_{direction}) AS night \
             FROM daily_count WHERE date LIKE ? AND graveyard_{direction} != ?{system_clause} \
             GROUP BY date ORDER BY date"
        );

        let mut query = sqlx::query(&sql)
            .bind(format!("{prefix}%"))
            .bind(NO_DATA_SENTINEL);
        if let Some(system) = system {
            query = query.bind(system);
        }

        query
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| {
                Ok(PeriodSumRow {
                    date: row.try_get("date")?,
                    graveyard: row.try_get("graveyard")?,
                    morning: row.try_get("morning")?,
                    afternoon: row.try_get("afternoon")?,
                    night: row.try_get("night")?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl DailyCountStore for SqliteStore {
    async fn insert_daily_count(&self, row: &DailyCountRow) -> Result<()> {
        let c = &row.counters;
        let result = sqlx::query(&format!(
            "INSERT INTO daily_count ({COUNT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(row.station_id)
        .bind(row.date_key())
        .bind(c.graveyard_entries)
        .bind(c.morning_entries)
        .bind(c.afternoon_entries)
        .bind(c.night_entries)
        .bind(c.graveyard_exits)
        .bind(c.morning_exits)
        .bind(c.afternoon_exits)
        .bind(c.night_exits)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(Error::DuplicateKey {
                station_id: row.station_id,
                date: row.date,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_daily_count(&self, row: &DailyCountRow) -> Result<()> {
        let c = &row.counters;
        sqlx::query(&format!(
            r#"
            INSERT INTO daily_count ({COUNT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(station_id, date) DO UPDATE SET
                graveyard_entries = excluded.graveyard_entries,
                morning_entries = excluded.morning_entries,
                afternoon_entries = excluded.afternoon_entries,
                night_entries = excluded.night_entries,
                graveyard_exits = excluded.graveyard_exits,
                morning_exits = excluded.morning_exits,
                afternoon_exits = excluded.afternoon_exits,
                night_exits = excluded.night_exits
            "#
        ))
        .bind(row.station_id)
        .bind(row.date_key())
        .bind(c.graveyard_entries)
        .bind(c.morning_entries)
        .bind(c.afternoon_entries)
        .bind(c.night_entries)
        .bind(c.graveyard_exits)
        .bind(c.morning_exits)
        .bind(c.afternoon_exits)
        .bind(c.night_exits)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn scan_daily_counts(&self) -> Result<Vec<DailyCountRow>> {
        sqlx::query(&format!(
            "SELECT {COUNT_COLUMNS} FROM daily_count ORDER BY station_id, date"
        ))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(row_to_daily_count)
        .collect()
    }

    async fn stations_with_counts(&self, date: NaiveDate) -> Result<BTreeSet<StationId>> {
        let rows: Vec<(StationId,)> = sqlx::query_as("SELECT station_id FROM daily_count WHERE date = ?")
            .bind(format_date_key(date))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Station;

    fn row(station_id: StationId, day: u32, value: i64) -> DailyCountRow {
        DailyCountRow {
            station_id,
            date: NaiveDate::from_ymd_opt(2019, 6, day).unwrap(),
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

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.insert_daily_count(&row(1, 3, 10)).await.unwrap();

        let err = store.insert_daily_count(&row(1, 3, 20)).await.unwrap_err();
        match err {
            Error::DuplicateKey { station_id, date } => {
                assert_eq!(station_id, 1);
                assert_eq!(format_date_key(date), "2019/06/03");
            }
            other => panic!("unexpected error: {other}"),
        }

        let rows = store.scan_daily_counts().await.unwrap();
        assert_eq!(rows, vec![row(1, 3, 10)]);
    }

    #[tokio::test]
    async fn test_update_overwrites_and_upserts() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.insert_daily_count(&row(1, 3, 70_000)).await.unwrap();

        store.update_daily_count(&row(1, 3, 12)).await.unwrap();
        store.update_daily_count(&row(2, 3, 5)).await.unwrap();

        let rows = store.scan_daily_counts().await.unwrap();
        assert_eq!(rows, vec![row(1, 3, 12), row(2, 3, 5)]);
    }

    #[tokio::test]
    async fn test_date_is_stored_as_slash_key() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.insert_daily_count(&row(4, 9, 1)).await.unwrap();

        let (date,): (String,) = sqlx::query_as("SELECT date FROM daily_count")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(date, "2019/06/09");

        let present = store
            .stations_with_counts(NaiveDate::from_ymd_opt(2019, 6, 9).unwrap())
            .await
            .unwrap();
        assert!(present.contains(&4));
    }

    #[tokio::test]
    async fn test_period_sums_skip_no_data_and_filter_system() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .upsert_station(&Station {
                id: 1,
                name: "A-1".into(),
                lon: 0.0,
                lat: 0.0,
                system: "NYCT".into(),
            })
            .await
            .unwrap();
        store
            .upsert_station(&Station {
                id: 2,
                name: "B-2".into(),
                lon: 0.0,
                lat: 0.0,
                system: "PATH".into(),
            })
            .await
            .unwrap();

        store.insert_daily_count(&row(1, 3, 10)).await.unwrap();
        store.insert_daily_count(&row(2, 3, 5)).await.unwrap();
        store.insert_daily_count(&row(1, 4, NO_DATA_SENTINEL)).await.unwrap();

        let all = store.period_sums("2019/06", None, false).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].date, "2019/06/03");
        assert_eq!(all[0].graveyard, 15);

        let nyct = store.period_sums("2019", Some("NYCT"), true).await.unwrap();
        assert_eq!(nyct.len(), 1);
        assert_eq!(nyct[0].night, 10);

        assert!(store.period_sums("2018", None, false).await.unwrap().is_empty());
    }
}

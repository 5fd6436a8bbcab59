use super::SqliteStore;
use crate::error::Result;
use crate::model::{Station, StationId};
use crate::services::StationRegistry;
use std::collections::{BTreeSet, HashMap};

impl SqliteStore {
    /// Inserts a station, replacing any existing row with the same id.
    pub async fn upsert_station(&self, station: &Station) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO station_data (id, name, lon, lat, type) VALUES (?, ?, ?, ?, ?)")
            .bind(station.id)
            .bind(&station.name)
            .bind(station.lon)
            .bind(station.lat)
            .bind(&station.system)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Maps each station name (`STATION-LINENAME`) to its id.
    pub async fn station_ids_by_name(&self) -> Result<HashMap<String, StationId>> {
        let rows: Vec<(String, StationId)> = sqlx::query_as("SELECT name, id FROM station_data")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait::async_trait]
impl StationRegistry for SqliteStore {
    async fn list_station_ids(&self) -> Result<BTreeSet<StationId>> {
        let rows: Vec<(StationId,)> = sqlx::query_as("SELECT id FROM station_data ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: StationId, name: &str) -> Station {
        Station {
            id,
            name: name.to_string(),
            lon: -73.99,
            lat: 40.75,
            system: "NYCT".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_list() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.upsert_station(&station(7, "34 ST-PENN STA-ACE")).await.unwrap();
        store.upsert_station(&station(3, "59 ST-NQR456W")).await.unwrap();
        store.upsert_station(&station(7, "34 ST-PENN STA-123")).await.unwrap();

        let ids = store.list_station_ids().await.unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![3, 7]);

        let names = store.station_ids_by_name().await.unwrap();
        assert_eq!(names.get("34 ST-PENN STA-123"), Some(&7));
        assert!(!names.contains_key("34 ST-PENN STA-ACE"));
    }
}

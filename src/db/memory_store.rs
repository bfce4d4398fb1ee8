use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::{ClimateStore, DataPoint, DbError, MonthlyMean, Station, StationLocation};

#[derive(Default)]
struct MemoryState {
    stations: BTreeMap<String, Station>,
    datapoints: BTreeMap<(String, i32, u32), DataPoint>,
}

/// In-process [`ClimateStore`] for tests and local runs without Postgres.
/// Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryClimateStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryClimateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClimateStore for MemoryClimateStore {
    async fn upsert_station(&self, station: &Station) -> Result<bool, DbError> {
        let mut state = self.state.write().await;
        if state.stations.contains_key(&station.station_id) {
            return Ok(false);
        }
        state
            .stations
            .insert(station.station_id.clone(), station.clone());
        Ok(true)
    }

    async fn upsert_stations(&self, stations: &[Station]) -> Result<usize, DbError> {
        let mut inserted = 0;
        for station in stations {
            if self.upsert_station(station).await? {
                inserted += 1;
            }
        }
        debug!("Inserted {} of {} stations", inserted, stations.len());
        Ok(inserted)
    }

    async fn upsert_datapoint(&self, datapoint: &DataPoint) -> Result<bool, DbError> {
        let key = (
            datapoint.station_id.clone(),
            datapoint.year,
            datapoint.month,
        );
        let mut state = self.state.write().await;
        if state.datapoints.contains_key(&key) {
            return Ok(false);
        }
        state.datapoints.insert(key, datapoint.clone());
        Ok(true)
    }

    async fn upsert_datapoints(&self, datapoints: &[DataPoint]) -> Result<usize, DbError> {
        let mut inserted = 0;
        for datapoint in datapoints {
            if self.upsert_datapoint(datapoint).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn find_station(&self, station_id: &str) -> Result<Option<Station>, DbError> {
        Ok(self.state.read().await.stations.get(station_id).cloned())
    }

    async fn list_station_ids(&self) -> Result<Vec<String>, DbError> {
        Ok(self.state.read().await.stations.keys().cloned().collect())
    }

    async fn count_stations(&self) -> Result<i64, DbError> {
        Ok(self.state.read().await.stations.len() as i64)
    }

    async fn count_datapoints(&self) -> Result<i64, DbError> {
        Ok(self.state.read().await.datapoints.len() as i64)
    }

    async fn query_stations_covering(
        &self,
        first_year: i32,
        last_year: i32,
    ) -> Result<Vec<StationLocation>, DbError> {
        Ok(self
            .state
            .read()
            .await
            .stations
            .values()
            .filter(|station| station.covers(first_year, last_year))
            .map(Station::location)
            .collect())
    }

    async fn query_monthly_means(
        &self,
        station_id: &str,
        first_year: i32,
        last_year: i32,
        months: &[u32],
    ) -> Result<Vec<MonthlyMean>, DbError> {
        // Keys are unique per (station, year, month), so each mean covers one row
        Ok(self
            .state
            .read()
            .await
            .datapoints
            .values()
            .filter(|dp| {
                dp.station_id == station_id
                    && (first_year..=last_year).contains(&dp.year)
                    && months.contains(&dp.month)
            })
            .map(|dp| MonthlyMean {
                year: dp.year,
                month: dp.month,
                mean_tmin: dp.tmin,
                mean_tmax: dp.tmax,
            })
            .collect())
    }
}

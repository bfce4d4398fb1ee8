use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::db::{
    ClimateStore, DataPoint, DatapointRepository, DbError, MonthlyMean, Station,
    StationLocation, StationRepository,
};

/// Postgres-backed [`ClimateStore`]
#[derive(Clone)]
pub struct PgClimateStore {
    pool: PgPool,
    stations: StationRepository,
    datapoints: DatapointRepository,
}

impl PgClimateStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            stations: StationRepository::new(pool.clone()),
            datapoints: DatapointRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect, then apply pending migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DbError> {
        info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Running migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl ClimateStore for PgClimateStore {
    async fn upsert_station(&self, station: &Station) -> Result<bool, DbError> {
        self.stations.insert(station).await
    }

    async fn upsert_stations(&self, stations: &[Station]) -> Result<usize, DbError> {
        self.stations.insert_many(stations).await
    }

    async fn upsert_datapoint(&self, datapoint: &DataPoint) -> Result<bool, DbError> {
        self.datapoints.insert(datapoint).await
    }

    async fn upsert_datapoints(&self, datapoints: &[DataPoint]) -> Result<usize, DbError> {
        self.datapoints.insert_many(datapoints).await
    }

    async fn find_station(&self, station_id: &str) -> Result<Option<Station>, DbError> {
        self.stations.find_by_id(station_id).await
    }

    async fn list_station_ids(&self) -> Result<Vec<String>, DbError> {
        self.stations.list_ids().await
    }

    async fn count_stations(&self) -> Result<i64, DbError> {
        self.stations.count().await
    }

    async fn count_datapoints(&self) -> Result<i64, DbError> {
        self.datapoints.count().await
    }

    async fn query_stations_covering(
        &self,
        first_year: i32,
        last_year: i32,
    ) -> Result<Vec<StationLocation>, DbError> {
        self.stations.find_covering(first_year, last_year).await
    }

    async fn query_monthly_means(
        &self,
        station_id: &str,
        first_year: i32,
        last_year: i32,
        months: &[u32],
    ) -> Result<Vec<MonthlyMean>, DbError> {
        self.datapoints
            .monthly_means(station_id, first_year, last_year, months)
            .await
    }
}

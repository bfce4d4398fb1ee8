use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, info, instrument};

use crate::db::{DbError, Station, StationLocation};

#[derive(Clone)]
pub struct StationRepository {
    pool: PgPool,
}

impl StationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, station), fields(station_id = %station.station_id))]
    pub async fn insert(&self, station: &Station) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;
        let inserted = self.insert_tx(&mut tx, station).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Insert multiple stations in a transaction
    #[instrument(skip(self, stations), fields(count = stations.len()))]
    pub async fn insert_many(&self, stations: &[Station]) -> Result<usize, DbError> {
        debug!(
            "Beginning transaction to insert {} stations",
            stations.len()
        );
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        let mut duplicates = 0;

        for station in stations {
            if self.insert_tx(&mut tx, station).await? {
                inserted += 1;
            } else {
                duplicates += 1;
            }
        }

        tx.commit().await?;
        info!(
            "Inserted {} new stations, {} duplicates skipped",
            inserted, duplicates
        );
        Ok(inserted)
    }

    /// Insert a station using a transaction. Existing rows are never modified.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        station: &Station,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO stations (
                station_id, name, latitude, longitude,
                first_measure_tmax, last_measure_tmax,
                first_measure_tmin, last_measure_tmin
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (station_id) DO NOTHING
            "#,
        )
        .bind(&station.station_id)
        .bind(&station.name)
        .bind(station.latitude)
        .bind(station.longitude)
        .bind(station.first_measure_tmax)
        .bind(station.last_measure_tmax)
        .bind(station.first_measure_tmin)
        .bind(station.last_measure_tmin)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            error!(
                station_id = %station.station_id,
                error = %e,
                "Failed to insert station"
            );
            e
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(station_id = %station_id))]
    pub async fn find_by_id(&self, station_id: &str) -> Result<Option<Station>, DbError> {
        debug!("Querying station by station_id");

        let station = sqlx::query_as::<_, Station>(
            r#"
            SELECT station_id, name, latitude, longitude,
                   first_measure_tmax, last_measure_tmax,
                   first_measure_tmin, last_measure_tmin
            FROM stations
            WHERE station_id = $1
            "#,
        )
        .bind(station_id)
        .fetch_optional(&self.pool)
        .await?;

        if station.is_some() {
            debug!("Found station");
        } else {
            debug!("Station not found");
        }

        Ok(station)
    }

    #[instrument(skip(self))]
    pub async fn list_ids(&self) -> Result<Vec<String>, DbError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT station_id FROM stations ORDER BY station_id",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} station ids", ids.len());
        Ok(ids)
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stations")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Stations with TMAX and TMIN records spanning the whole window
    #[instrument(skip(self))]
    pub async fn find_covering(
        &self,
        first_year: i32,
        last_year: i32,
    ) -> Result<Vec<StationLocation>, DbError> {
        debug!(
            "Querying stations covering {} to {}",
            first_year, last_year
        );

        let stations = sqlx::query_as::<_, StationLocation>(
            r#"
            SELECT station_id, name, latitude, longitude
            FROM stations
            WHERE first_measure_tmin <= $1
              AND last_measure_tmin >= $2
              AND first_measure_tmax <= $1
              AND last_measure_tmax >= $2
            ORDER BY station_id
            "#,
        )
        .bind(first_year)
        .bind(last_year)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} covering stations", stations.len());
        Ok(stations)
    }
}

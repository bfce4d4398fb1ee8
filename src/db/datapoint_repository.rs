use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, instrument};

use crate::db::{DataPoint, DbError, MonthlyMean};

#[derive(Clone)]
pub struct DatapointRepository {
    pool: PgPool,
}

impl DatapointRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, datapoint), fields(station_id = %datapoint.station_id))]
    pub async fn insert(&self, datapoint: &DataPoint) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;
        let inserted = self.insert_tx(&mut tx, datapoint).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Insert multiple datapoints in a transaction
    #[instrument(skip(self, datapoints), fields(count = datapoints.len()))]
    pub async fn insert_many(&self, datapoints: &[DataPoint]) -> Result<usize, DbError> {
        if datapoints.is_empty() {
            return Ok(0);
        }
        debug!(
            "Beginning transaction to insert {} datapoints",
            datapoints.len()
        );
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        let mut duplicates = 0;

        for datapoint in datapoints {
            if self.insert_tx(&mut tx, datapoint).await? {
                inserted += 1;
            } else {
                duplicates += 1;
            }
        }

        tx.commit().await?;
        info!(
            "Inserted {} new datapoints, {} duplicates skipped",
            inserted, duplicates
        );
        Ok(inserted)
    }

    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        datapoint: &DataPoint,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO datapoints (station_id, year, month, tmax, tmin)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (station_id, year, month) DO NOTHING
            "#,
        )
        .bind(&datapoint.station_id)
        .bind(datapoint.year)
        .bind(datapoint.month as i32)
        .bind(datapoint.tmax)
        .bind(datapoint.tmin)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM datapoints")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Monthly means for a station, restricted to `months`.
    /// Day weighting happens in the aggregation layer.
    #[instrument(skip(self, months))]
    pub async fn monthly_means(
        &self,
        station_id: &str,
        first_year: i32,
        last_year: i32,
        months: &[u32],
    ) -> Result<Vec<MonthlyMean>, DbError> {
        let months: Vec<i32> = months.iter().map(|m| *m as i32).collect();
        debug!(
            "Querying monthly means from {} to {} for months {:?}",
            first_year, last_year, months
        );

        let rows = sqlx::query_as::<_, (i32, i32, f64, f64)>(
            r#"
            SELECT year, month, AVG(tmin) AS mean_tmin, AVG(tmax) AS mean_tmax
            FROM datapoints
            WHERE station_id = $1
              AND year BETWEEN $2 AND $3
              AND month = ANY($4)
            GROUP BY year, month
            ORDER BY year, month
            "#,
        )
        .bind(station_id)
        .bind(first_year)
        .bind(last_year)
        .bind(&months)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} monthly means", rows.len());
        Ok(rows
            .into_iter()
            .map(|(year, month, mean_tmin, mean_tmax)| MonthlyMean {
                year,
                month: month as u32,
                mean_tmin,
                mean_tmax,
            })
            .collect())
    }
}

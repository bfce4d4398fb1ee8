use std::future::Future;

use crate::db::{DataPoint, DbError, MonthlyMean, Station, StationLocation};

/// Read/write contract of the station and datapoint store.
///
/// Rows are write-once: inserting a station or datapoint that already exists
/// leaves the stored row untouched and reports `false` / does not count it.
pub trait ClimateStore: Send + Sync {
    /// Insert a station, returns whether a new row was written
    fn upsert_station(&self, station: &Station)
        -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Insert stations in one batch, returns the number of new rows
    fn upsert_stations(
        &self,
        stations: &[Station],
    ) -> impl Future<Output = Result<usize, DbError>> + Send;

    fn upsert_datapoint(
        &self,
        datapoint: &DataPoint,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    fn upsert_datapoints(
        &self,
        datapoints: &[DataPoint],
    ) -> impl Future<Output = Result<usize, DbError>> + Send;

    fn find_station(
        &self,
        station_id: &str,
    ) -> impl Future<Output = Result<Option<Station>, DbError>> + Send;

    /// All station ids, ascending
    fn list_station_ids(&self) -> impl Future<Output = Result<Vec<String>, DbError>> + Send;

    fn count_stations(&self) -> impl Future<Output = Result<i64, DbError>> + Send;

    fn count_datapoints(&self) -> impl Future<Output = Result<i64, DbError>> + Send;

    /// Stations whose TMAX and TMIN coverage both contain `first_year..=last_year`
    fn query_stations_covering(
        &self,
        first_year: i32,
        last_year: i32,
    ) -> impl Future<Output = Result<Vec<StationLocation>, DbError>> + Send;

    /// Mean Tmin/Tmax per (year, month) for the given months, ordered by year then month
    fn query_monthly_means(
        &self,
        station_id: &str,
        first_year: i32,
        last_year: i32,
        months: &[u32],
    ) -> impl Future<Output = Result<Vec<MonthlyMean>, DbError>> + Send;
}

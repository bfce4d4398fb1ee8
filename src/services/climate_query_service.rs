use serde::Serialize;
use tracing::{debug, instrument};

use crate::aggregation::{weighted_series, AggregateSeries, Period};
use crate::db::{ClimateStore, DbError, StationLocation};
use crate::geo::{
    find_stations_within_radius, validate_coordinates, validate_radius, CoordinateError,
};

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Station not found: {0}")]
    StationNotFound(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<CoordinateError> for QueryError {
    fn from(e: CoordinateError) -> Self {
        QueryError::InvalidArgument(e.to_string())
    }
}

/// A station returned by a radius search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyStation {
    #[serde(flatten)]
    pub station: StationLocation,
    pub distance_km: f64,
}

/// The ten aggregate series of one station over a year window
#[derive(Debug, Clone, Serialize)]
pub struct TemperatureHistory {
    pub station_id: String,
    pub first_year: i32,
    pub last_year: i32,
    pub series: Vec<AggregateSeries>,
}

fn validate_year_window(first_year: i32, last_year: i32) -> Result<(), QueryError> {
    if first_year > last_year {
        return Err(QueryError::InvalidArgument(format!(
            "first_year ({first_year}) must not be after last_year ({last_year})"
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ClimateQueryService<S> {
    store: S,
}

impl<S: ClimateStore> ClimateQueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stations with TMAX/TMIN coverage of the whole window within `radius_km`,
    /// nearest first. `max_results <= 0` means unlimited.
    #[instrument(skip(self))]
    pub async fn get_stations_in_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        first_year: i32,
        last_year: i32,
        max_results: i64,
    ) -> Result<Vec<NearbyStation>, QueryError> {
        validate_coordinates(latitude, longitude)?;
        validate_radius(radius_km)?;
        validate_year_window(first_year, last_year)?;

        let candidates = self
            .store
            .query_stations_covering(first_year, last_year)
            .await?;
        debug!("{} stations cover {}-{}", candidates.len(), first_year, last_year);

        let within =
            find_stations_within_radius(candidates, latitude, longitude, radius_km, max_results)?;
        let nearby = within
            .into_iter()
            .map(|(station, distance_km)| NearbyStation {
                station,
                distance_km,
            })
            .collect::<Vec<_>>();

        debug!("{} stations within {} km", nearby.len(), radius_km);
        Ok(nearby)
    }

    /// Annual and seasonal day-weighted Tmin/Tmax series for one station
    #[instrument(skip(self))]
    pub async fn get_datapoints_for_station(
        &self,
        station_id: &str,
        first_year: i32,
        last_year: i32,
    ) -> Result<TemperatureHistory, QueryError> {
        validate_year_window(first_year, last_year)?;

        if self.store.find_station(station_id).await?.is_none() {
            return Err(QueryError::StationNotFound(station_id.to_string()));
        }

        let mut series = Vec::with_capacity(Period::ALL.len() * 2);
        for period in Period::ALL {
            let (from, to) = period.source_years(first_year, last_year);
            let rows = self
                .store
                .query_monthly_means(station_id, from, to, period.months())
                .await?;
            let (tmin, tmax) = weighted_series(period, &rows, first_year, last_year);
            series.push(tmin);
            series.push(tmax);
        }

        Ok(TemperatureHistory {
            station_id: station_id.to_string(),
            first_year,
            last_year,
            series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DataPoint, MemoryClimateStore, Station};

    fn station(id: &str, name: &str, latitude: f64, longitude: f64, years: (i32, i32)) -> Station {
        Station {
            station_id: id.to_string(),
            name: name.to_string(),
            latitude,
            longitude,
            first_measure_tmax: years.0,
            last_measure_tmax: years.1,
            first_measure_tmin: years.0,
            last_measure_tmin: years.1,
        }
    }

    async fn seeded_store() -> MemoryClimateStore {
        let store = MemoryClimateStore::new();
        store
            .upsert_stations(&[
                station("GM000010147", "HAMBURG FUHLSBUETTEL", 53.6331, 9.9881, (1891, 2024)),
                station("GME00111445", "BERLIN-DAHLEM", 52.4639, 13.3017, (1876, 2024)),
                station("GM000004204", "SCHWERIN", 53.6425, 11.3872, (1990, 2024)),
                station("GME00102380", "BREMEN", 53.0461, 8.7981, (1890, 1950)),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_radius_search_filters_coverage_and_distance() {
        let service = ClimateQueryService::new(seeded_store().await);
        let result = service
            .get_stations_in_radius(53.55, 10.0, 200.0, 1950, 2000, 0)
            .await
            .unwrap();

        // Schwerin starts too late, Bremen ends too early, Berlin is ~255 km away
        let ids: Vec<_> = result.iter().map(|s| s.station.station_id.as_str()).collect();
        assert_eq!(ids, vec!["GM000010147"]);
        assert!(result[0].distance_km < 10.0);
    }

    #[tokio::test]
    async fn test_radius_search_orders_and_truncates() {
        let service = ClimateQueryService::new(seeded_store().await);
        let all = service
            .get_stations_in_radius(53.55, 10.0, 500.0, 2000, 2010, 0)
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.station.station_id.as_str()).collect();
        assert_eq!(ids, vec!["GM000010147", "GM000004204", "GME00111445"]);

        let top = service
            .get_stations_in_radius(53.55, 10.0, 500.0, 2000, 2010, 2)
            .await
            .unwrap();
        assert_eq!(top.len(), 2);
    }

    #[tokio::test]
    async fn test_radius_search_rejects_bad_arguments() {
        let service = ClimateQueryService::new(seeded_store().await);
        for (lat, lon, radius, y0, y1) in [
            (95.0, 0.0, 10.0, 2000, 2001),
            (0.0, 190.0, 10.0, 2000, 2001),
            (0.0, 0.0, -5.0, 2000, 2001),
            (0.0, 0.0, 10.0, 2002, 2001),
        ] {
            let result = service
                .get_stations_in_radius(lat, lon, radius, y0, y1, 0)
                .await;
            assert!(matches!(result, Err(QueryError::InvalidArgument(_))));
        }
    }

    #[tokio::test]
    async fn test_history_unknown_station() {
        let service = ClimateQueryService::new(seeded_store().await);
        let result = service.get_datapoints_for_station("XX000000000", 2000, 2001).await;
        assert!(matches!(result, Err(QueryError::StationNotFound(_))));
    }

    #[tokio::test]
    async fn test_history_accepts_minimum_first_year() {
        let store = seeded_store().await;
        store
            .upsert_datapoints(&[DataPoint {
                station_id: "GM000010147".to_string(),
                year: 2000,
                month: 1,
                tmax: 3.0,
                tmin: -1.0,
            }])
            .await
            .unwrap();

        let service = ClimateQueryService::new(store);
        let history = service
            .get_datapoints_for_station("GM000010147", i32::MIN, 2000)
            .await
            .unwrap();

        assert_eq!(history.series[9].label, "winter_tmax");
        assert_eq!(history.series[9].values, vec![(2000, 3.0)]);
    }

    #[tokio::test]
    async fn test_history_without_data_is_empty() {
        let service = ClimateQueryService::new(seeded_store().await);
        let history = service
            .get_datapoints_for_station("GM000010147", 2000, 2001)
            .await
            .unwrap();
        assert_eq!(history.series.len(), 10);
        assert!(history.series.iter().all(|s| s.values.is_empty()));
    }

    #[tokio::test]
    async fn test_history_winter_includes_previous_december() {
        let store = seeded_store().await;
        let dp = |year, month, tmin, tmax| DataPoint {
            station_id: "GM000010147".to_string(),
            year,
            month,
            tmax,
            tmin,
        };
        store
            .upsert_datapoints(&[
                dp(2019, 12, -4.0, 0.0),
                dp(2020, 1, -2.0, 10.0),
                dp(2020, 7, 14.0, 24.0),
                dp(2020, 12, -6.0, 2.0),
            ])
            .await
            .unwrap();

        let service = ClimateQueryService::new(store);
        let history = service
            .get_datapoints_for_station("GM000010147", 2020, 2020)
            .await
            .unwrap();

        let winter_tmax = &history.series[9];
        assert_eq!(winter_tmax.label, "winter_tmax");
        assert_eq!(winter_tmax.values, vec![(2020, 5.0)]);
        let winter_tmin = &history.series[8];
        assert_eq!(winter_tmin.values, vec![(2020, -3.0)]);
        assert_eq!(history.series[5].values, vec![(2020, 24.0)]);
    }
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::db::ClimateStore;
use crate::services::{ClimateQueryService, NearbyStation, QueryError, TemperatureHistory};

#[derive(Clone)]
pub struct AppState<S> {
    pub query_service: ClimateQueryService<S>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RadiusParams {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub first_year: i32,
    pub last_year: i32,
    /// 0 or negative for no limit
    #[serde(default)]
    pub max_results: i64,
}

#[derive(Debug, Deserialize)]
pub struct YearWindowParams {
    pub first_year: i32,
    pub last_year: i32,
}

pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: ClimateStore + Clone + 'static,
{
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/stations", get(get_stations_in_radius::<S>))
        .route(
            "/stations/{station_id}/temperatures",
            get(get_station_temperatures::<S>),
        )
        .with_state(state);

    Router::new().nest("/api/v1", api_routes)
}

fn status_for(e: &QueryError) -> StatusCode {
    match e {
        QueryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        QueryError::StationNotFound(_) => StatusCode::NOT_FOUND,
        QueryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[instrument]
async fn health() -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[instrument(skip(state))]
async fn get_stations_in_radius<S>(
    State(state): State<AppState<S>>,
    Query(params): Query<RadiusParams>,
) -> Result<Json<Vec<NearbyStation>>, StatusCode>
where
    S: ClimateStore + Clone + 'static,
{
    let stations = state
        .query_service
        .get_stations_in_radius(
            params.latitude,
            params.longitude,
            params.radius_km,
            params.first_year,
            params.last_year,
            params.max_results,
        )
        .await
        .map_err(|e| {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Failed to search stations: {}", e);
            } else {
                warn!("Rejected station search: {}", e);
            }
            status
        })?;

    info!(
        "Found {} stations within {} km of ({}, {})",
        stations.len(),
        params.radius_km,
        params.latitude,
        params.longitude
    );
    Ok(Json(stations))
}

#[instrument(skip(state), fields(station_id = %station_id))]
async fn get_station_temperatures<S>(
    State(state): State<AppState<S>>,
    Path(station_id): Path<String>,
    Query(params): Query<YearWindowParams>,
) -> Result<Json<TemperatureHistory>, StatusCode>
where
    S: ClimateStore + Clone + 'static,
{
    debug!(
        "Fetching temperatures for station {} from {} to {}",
        station_id, params.first_year, params.last_year
    );
    let history = state
        .query_service
        .get_datapoints_for_station(&station_id, params.first_year, params.last_year)
        .await
        .map_err(|e| {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("Failed to fetch temperatures for station {}: {}", station_id, e);
            } else {
                warn!("Rejected temperature query for station {}: {}", station_id, e);
            }
            status
        })?;

    info!(
        "Retrieved {} yearly values for station {}",
        history.series.iter().map(|s| s.values.len()).sum::<usize>(),
        station_id
    );
    Ok(Json(history))
}

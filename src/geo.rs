/// Great-circle distance and radius filtering over station candidates
///
/// Distances use the haversine formula on a sphere with the mean Earth radius
/// of 6371 km.
use std::cmp::Ordering;
use thiserror::Error;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude must be within [-90, 90], got {0}")]
    InvalidLatitude(f64),

    #[error("Longitude must be within [-180, 180], got {0}")]
    InvalidLongitude(f64),

    #[error("Radius must be a non-negative number of kilometers, got {0}")]
    InvalidRadius(f64),
}

/// Anything with a position in decimal degrees
pub trait HasCoordinates {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), CoordinateError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(CoordinateError::InvalidLatitude(latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(CoordinateError::InvalidLongitude(longitude));
    }
    Ok(())
}

pub fn validate_radius(radius_km: f64) -> Result<(), CoordinateError> {
    if radius_km.is_nan() || radius_km < 0.0 {
        return Err(CoordinateError::InvalidRadius(radius_km));
    }
    Ok(())
}

/// Haversine distance in kilometers between two points in decimal degrees
///
/// ```
/// use ghcn_climate_service::geo::haversine;
///
/// let pole_to_pole = haversine(90.0, 0.0, -90.0, 0.0);
/// assert!((pole_to_pole - 20015.1).abs() < 0.1);
/// ```
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = lon2.to_radians() - lon1.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Stations within `radius_km` of the given point, nearest first.
///
/// `max_results <= 0` returns every match; otherwise the list is truncated to
/// `max_results`. Equal distances keep the candidates' input order. The
/// candidates are expected to be pre-filtered on temporal coverage.
pub fn find_stations_within_radius<T: HasCoordinates>(
    candidates: Vec<T>,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
    max_results: i64,
) -> Result<Vec<(T, f64)>, CoordinateError> {
    validate_coordinates(latitude, longitude)?;
    validate_radius(radius_km)?;

    let mut within: Vec<(T, f64)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = haversine(
                latitude,
                longitude,
                candidate.latitude(),
                candidate.longitude(),
            );
            (distance <= radius_km).then_some((candidate, distance))
        })
        .collect();

    within.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    if max_results > 0 {
        within.truncate(max_results as usize);
    }
    Ok(within)
}

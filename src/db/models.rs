use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::geo::HasCoordinates;

// Database entity models

/// One weather station with its TMAX/TMIN coverage years (0 when never observed)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Station {
    pub station_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub first_measure_tmax: i32,
    pub last_measure_tmax: i32,
    pub first_measure_tmin: i32,
    pub last_measure_tmin: i32,
}

impl Station {
    /// True when both TMAX and TMIN were recorded for every year of the window
    pub fn covers(&self, first_year: i32, last_year: i32) -> bool {
        self.first_measure_tmax <= first_year
            && self.last_measure_tmax >= last_year
            && self.first_measure_tmin <= first_year
            && self.last_measure_tmin >= last_year
    }

    pub fn location(&self) -> StationLocation {
        StationLocation {
            station_id: self.station_id.clone(),
            name: self.name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Monthly mean of daily maxima and minima, in °C
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub station_id: String,
    pub year: i32,
    pub month: u32,
    pub tmax: f64,
    pub tmin: f64,
}

/// Identity and position of a station, as returned by coverage queries
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct StationLocation {
    pub station_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl HasCoordinates for StationLocation {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Per (year, month) mean over all stored datapoints of a station
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyMean {
    pub year: i32,
    pub month: u32,
    pub mean_tmin: f64,
    pub mean_tmax: f64,
}

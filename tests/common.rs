#![allow(dead_code)]

use ghcn_climate_service::db::{DataPoint, MemoryClimateStore, Station};
use std::path::PathBuf;

pub const HAMBURG: &str = "GM000010147";
pub const BERLIN: &str = "GME00111445";
pub const SCHWERIN: &str = "GM000004204";
pub const BREMEN: &str = "GME00102380";

/// Directory with the fixed-width sample files
pub fn sample_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("sample-data-files")
}

pub fn sample_file(name: &str) -> String {
    std::fs::read_to_string(sample_dir().join(name))
        .unwrap_or_else(|e| panic!("Failed to read sample file {name}: {e}"))
}

pub fn station(id: &str, name: &str, latitude: f64, longitude: f64, years: (i32, i32)) -> Station {
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

pub fn datapoint(id: &str, year: i32, month: u32, tmin: f64, tmax: f64) -> DataPoint {
    DataPoint {
        station_id: id.to_string(),
        year,
        month,
        tmax,
        tmin,
    }
}

/// Memory store with two stations and a winter plus a summer of Hamburg data
pub async fn seeded_memory_store() -> MemoryClimateStore {
    use ghcn_climate_service::db::ClimateStore;

    let store = MemoryClimateStore::new();
    store
        .upsert_stations(&[
            station(HAMBURG, "HAMBURG FUHLSBUETTEL", 53.6331, 9.9881, (1891, 2024)),
            station(BERLIN, "BERLIN-DAHLEM", 52.4639, 13.3017, (1876, 2024)),
        ])
        .await
        .expect("Failed to seed stations");
    store
        .upsert_datapoints(&[
            datapoint(HAMBURG, 2019, 12, 1.0, 5.0),
            datapoint(HAMBURG, 2020, 1, 2.0, 6.0),
            datapoint(HAMBURG, 2020, 2, 3.0, 7.0),
            datapoint(HAMBURG, 2020, 7, 14.0, 24.0),
        ])
        .await
        .expect("Failed to seed datapoints");
    store
}

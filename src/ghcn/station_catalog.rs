/// Station catalog builder
///
/// Merges `ghcnd-inventory.txt` (one line per station and element) with the
/// station names from `ghcnd-stations.txt` into one [`Station`] per station.
///
/// Grouping is run-length over contiguous lines with the same station id, not a
/// general group-by: the inventory file is sorted by station, and an id that
/// reappears after another station starts a new run.
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::db::Station;
use crate::ghcn::record_parser::{
    parse_inventory_line, parse_station_name_line, Element, InventoryRecord, RecordParseError,
    UNKNOWN_STATION_NAME,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub stations_built: usize,
    /// Runs discarded because they never carried a TMAX line
    pub stations_without_tmax: usize,
    /// Stations that fell back to [`UNKNOWN_STATION_NAME`]
    pub stations_without_name: usize,
}

#[derive(Debug, Clone)]
pub struct StationCatalog {
    pub stations: Vec<Station>,
    pub stats: CatalogStats,
}

/// A station enters the catalog only once a TMAX first/last-year pair was seen.
///
/// Stations that only report TMIN are dropped on purpose: the radius query
/// requires TMAX coverage, so they could never be returned.
pub fn has_tmax_coverage(station: &Station) -> bool {
    station.last_measure_tmax != 0
}

/// Parse `ghcnd-stations.txt` into an id → name map, skipping malformed lines
pub fn parse_station_names(text: &str) -> HashMap<String, String> {
    let mut names = HashMap::new();
    let mut skipped = 0;

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_station_name_line(line) {
            Ok((station_id, name)) => {
                names.insert(station_id, name);
            }
            Err(e) => {
                warn!("Skipping station name line {}: {}", line_no + 1, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} unparseable station name lines", skipped);
    }
    debug!("Parsed {} station names", names.len());
    names
}

/// Incremental builder fed with inventory lines in file order
pub struct StationCatalogBuilder<'a> {
    names: &'a HashMap<String, String>,
    current: Option<Station>,
    stations: Vec<Station>,
    stats: CatalogStats,
}

impl<'a> StationCatalogBuilder<'a> {
    pub fn new(names: &'a HashMap<String, String>) -> Self {
        Self {
            names,
            current: None,
            stations: Vec::new(),
            stats: CatalogStats::default(),
        }
    }

    /// Parse and apply one inventory line. A malformed line is counted and
    /// reported but leaves the current run untouched.
    pub fn push_line(&mut self, line: &str) -> Result<(), RecordParseError> {
        self.stats.lines_read += 1;
        match parse_inventory_line(line) {
            Ok(record) => {
                self.push_record(record);
                Ok(())
            }
            Err(e) => {
                self.stats.lines_skipped += 1;
                Err(e)
            }
        }
    }

    pub fn push_record(&mut self, record: InventoryRecord) {
        let same_run = self
            .current
            .as_ref()
            .is_some_and(|station| station.station_id == record.station_id);

        if !same_run {
            self.finalize_current();
            self.current = Some(self.start_station(&record));
        }

        if let Some(station) = self.current.as_mut() {
            match record.element {
                Element::Tmax => {
                    station.first_measure_tmax = record.first_year;
                    station.last_measure_tmax = record.last_year;
                }
                Element::Tmin => {
                    station.first_measure_tmin = record.first_year;
                    station.last_measure_tmin = record.last_year;
                }
                Element::Other(_) => {}
            }
        }
    }

    pub fn finish(mut self) -> StationCatalog {
        self.finalize_current();
        self.stats.stations_built = self.stations.len();
        StationCatalog {
            stations: self.stations,
            stats: self.stats,
        }
    }

    fn start_station(&mut self, record: &InventoryRecord) -> Station {
        let name = match self.names.get(&record.station_id) {
            Some(name) => name.clone(),
            None => {
                debug!("No name found for station {}", record.station_id);
                self.stats.stations_without_name += 1;
                UNKNOWN_STATION_NAME.to_string()
            }
        };

        Station {
            station_id: record.station_id.clone(),
            name,
            latitude: record.latitude,
            longitude: record.longitude,
            first_measure_tmax: 0,
            last_measure_tmax: 0,
            first_measure_tmin: 0,
            last_measure_tmin: 0,
        }
    }

    fn finalize_current(&mut self) {
        if let Some(station) = self.current.take() {
            if has_tmax_coverage(&station) {
                self.stations.push(station);
            } else {
                debug!("Dropping station {} without TMAX records", station.station_id);
                self.stats.stations_without_tmax += 1;
            }
        }
    }
}

/// Build the station catalog from the full inventory text
pub fn build_catalog(inventory_text: &str, names: &HashMap<String, String>) -> StationCatalog {
    let mut builder = StationCatalogBuilder::new(names);

    for (line_no, line) in inventory_text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = builder.push_line(line) {
            warn!("Skipping inventory line {}: {}", line_no + 1, e);
        }
    }

    let catalog = builder.finish();
    if catalog.stats.lines_skipped > 0 {
        warn!(
            "Skipped {} unparseable inventory lines out of {}",
            catalog.stats.lines_skipped, catalog.stats.lines_read
        );
    }
    info!(
        "Built catalog with {} stations ({} dropped without TMAX, {} without name)",
        catalog.stats.stations_built,
        catalog.stats.stations_without_tmax,
        catalog.stats.stations_without_name
    );
    catalog
}

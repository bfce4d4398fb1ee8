// GHCN-Daily module
//
// This module handles the NOAA GHCN-Daily fixed-width text formats:
// - ghcnd-inventory.txt: per-station element coverage (first/last year)
// - ghcnd-stations.txt: station names
// - <station>.dly: daily TMAX/TMIN values, one line per station, month and element

pub mod daily_parser;
pub mod record_parser;
pub mod station_catalog;

pub use daily_parser::{parse_daily_datapoints, DailyParseResult};
pub use record_parser::{
    extract_average_value, parse_daily_line, parse_inventory_line, parse_station_name_line,
    DailyElementRecord, Element, InventoryRecord, RecordParseError,
};
pub use station_catalog::{build_catalog, parse_station_names, CatalogStats, StationCatalog};

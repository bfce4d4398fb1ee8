/// `.dly` file → monthly DataPoints
///
/// A `.dly` file lists one line per (year, month, element). TMAX and TMIN lines
/// for the same month are adjacent, so a DataPoint is emitted as soon as both
/// a TMAX and a TMIN average are held, dated with the line that completed the
/// pair. Both averages are then cleared.
///
/// An average of exactly 0.0 counts as "not yet seen" (see
/// [`extract_average_value`]), so a month whose true mean is 0.0 °C is not
/// emitted.
use tracing::{debug, warn};

use crate::db::DataPoint;
use crate::ghcn::record_parser::{
    extract_average_value, parse_daily_header, Element, DAILY_VALUES_OFFSET,
};

#[derive(Debug, Clone, Default)]
pub struct DailyParseResult {
    pub datapoints: Vec<DataPoint>,
    pub temperature_lines: usize,
    pub lines_skipped: usize,
}

#[derive(Default)]
struct PendingMonth {
    tmax: f64,
    tmin: f64,
}

impl PendingMonth {
    fn is_complete(&self) -> bool {
        self.tmax != 0.0 && self.tmin != 0.0
    }
}

/// Derive the monthly DataPoints of one station from its `.dly` text
pub fn parse_daily_datapoints(station_id: &str, text: &str) -> DailyParseResult {
    let mut result = DailyParseResult::default();
    let mut pending = PendingMonth::default();

    for (line_no, line) in text.lines().enumerate() {
        if line.len() <= DAILY_VALUES_OFFSET {
            continue;
        }

        let (line_station, year, month, element) = match parse_daily_header(line) {
            Ok(header) => header,
            Err(e) => {
                warn!("Skipping line {} of {}.dly: {}", line_no + 1, station_id, e);
                result.lines_skipped += 1;
                continue;
            }
        };

        if !element.is_temperature() {
            continue;
        }
        if line_station != station_id {
            debug!(
                "Line {} of {}.dly belongs to station {}",
                line_no + 1,
                station_id,
                line_station
            );
        }

        result.temperature_lines += 1;
        let average = extract_average_value(line);
        match element {
            Element::Tmax => pending.tmax = average,
            Element::Tmin => pending.tmin = average,
            Element::Other(_) => {}
        }

        if pending.is_complete() {
            result.datapoints.push(DataPoint {
                station_id: station_id.to_string(),
                year,
                month,
                tmax: pending.tmax,
                tmin: pending.tmin,
            });
            pending = PendingMonth::default();
        }
    }

    if result.lines_skipped > 0 {
        warn!(
            "Skipped {} unparseable lines in {}.dly",
            result.lines_skipped, station_id
        );
    }
    debug!(
        "Derived {} datapoints from {} temperature lines of {}.dly",
        result.datapoints.len(),
        result.temperature_lines,
        station_id
    );
    result
}

/// GHCN-Daily fixed-width record parser
///
/// Decodes the three line formats the service ingests:
/// - `ghcnd-inventory.txt`: station id, coordinates, element code and its first/last year
/// - `ghcnd-stations.txt`: station id and station name
/// - `<id>.dly`: one (station, year, month, element) line carrying up to 31 daily values
///
/// All column ranges are zero-based, end-exclusive byte offsets.
use std::fmt;
use std::ops::Range;
use thiserror::Error;

use crate::geo::{validate_coordinates, CoordinateError};

const STATION_ID: Range<usize> = 0..11;
const INVENTORY_LATITUDE: Range<usize> = 12..20;
const INVENTORY_LONGITUDE: Range<usize> = 21..30;
const INVENTORY_ELEMENT: Range<usize> = 31..35;
const INVENTORY_FIRST_YEAR: Range<usize> = 36..40;
const INVENTORY_LAST_YEAR: Range<usize> = 41..45;
const STATION_NAME: Range<usize> = 41..71;
const DAILY_YEAR: Range<usize> = 11..15;
const DAILY_MONTH: Range<usize> = 15..17;
const DAILY_ELEMENT: Range<usize> = 17..21;

/// First daily value column in a `.dly` line
pub const DAILY_VALUES_OFFSET: usize = 21;
/// Width of one day (5 value characters plus MFLAG, QFLAG, SFLAG)
pub const DAILY_FIELD_WIDTH: usize = 8;
const DAILY_VALUE_WIDTH: usize = 5;
/// Maximum number of day fields in a `.dly` line
pub const DAYS_PER_LINE: usize = 31;
/// Marker for a day without a measurement
pub const MISSING_VALUE: i32 = -9999;
/// Name used when a station id has no entry in the station list
pub const UNKNOWN_STATION_NAME: &str = "Unknown";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordParseError {
    #[error("Line too short for {field} (needs {needed} chars, got {actual})")]
    LineTooShort {
        field: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("Invalid number in {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid month: {0}")]
    InvalidMonth(u32),

    #[error("Empty station id")]
    EmptyStationId,

    #[error(transparent)]
    InvalidCoordinates(#[from] CoordinateError),
}

/// Measured weather variable code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Tmax,
    Tmin,
    /// PRCP, SNOW, ... kept verbatim but ignored by the temperature pipeline
    Other(String),
}

impl Element {
    pub fn from_code(code: &str) -> Self {
        match code {
            "TMAX" => Element::Tmax,
            "TMIN" => Element::Tmin,
            other => Element::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Element::Tmax => "TMAX",
            Element::Tmin => "TMIN",
            Element::Other(code) => code,
        }
    }

    pub fn is_temperature(&self) -> bool {
        matches!(self, Element::Tmax | Element::Tmin)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One line of `ghcnd-inventory.txt`
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRecord {
    pub station_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub element: Element,
    pub first_year: i32,
    pub last_year: i32,
}

/// One line of a `.dly` file. Transient: consumed into a monthly average.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyElementRecord {
    pub station_id: String,
    pub year: i32,
    pub month: u32,
    pub element: Element,
    /// Tenths of a degree Celsius, `None` for missing days
    pub values: Vec<Option<i32>>,
}

impl DailyElementRecord {
    /// Mean of the present values in degrees Celsius, rounded to 3 decimals.
    ///
    /// Returns `None` when the month has no valid day. Unlike
    /// [`extract_average_value`] this keeps "no data" apart from a real 0.0 °C mean.
    pub fn average(&self) -> Option<f64> {
        average_tenths(self.values.iter().flatten().copied())
    }
}

fn field<'a>(
    line: &'a str,
    range: Range<usize>,
    name: &'static str,
) -> Result<&'a str, RecordParseError> {
    line.get(range.clone()).ok_or(RecordParseError::LineTooShort {
        field: name,
        needed: range.end,
        actual: line.len(),
    })
}

fn parse_number<T: std::str::FromStr>(
    raw: &str,
    name: &'static str,
) -> Result<T, RecordParseError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| RecordParseError::InvalidNumber {
            field: name,
            value: raw.trim().to_string(),
        })
}

fn parse_station_id(line: &str) -> Result<String, RecordParseError> {
    let id = field(line, STATION_ID, "station id")?.trim();
    if id.is_empty() {
        return Err(RecordParseError::EmptyStationId);
    }
    Ok(id.to_string())
}

/// Parse one `ghcnd-inventory.txt` line
///
/// ```
/// use ghcn_climate_service::ghcn::record_parser::{parse_inventory_line, Element};
///
/// let record = parse_inventory_line("12345678901  48.1230  008.4560 TMAX 2020 2023").unwrap();
/// assert_eq!(record.station_id, "12345678901");
/// assert_eq!(record.latitude, 48.123);
/// assert_eq!(record.longitude, 8.456);
/// assert_eq!(record.element, Element::Tmax);
/// assert_eq!((record.first_year, record.last_year), (2020, 2023));
/// ```
pub fn parse_inventory_line(line: &str) -> Result<InventoryRecord, RecordParseError> {
    let station_id = parse_station_id(line)?;
    let latitude = parse_number(field(line, INVENTORY_LATITUDE, "latitude")?, "latitude")?;
    let longitude = parse_number(field(line, INVENTORY_LONGITUDE, "longitude")?, "longitude")?;
    // NaN fails the range check too
    validate_coordinates(latitude, longitude)?;
    let element = Element::from_code(field(line, INVENTORY_ELEMENT, "element")?.trim());
    let first_year = parse_number(
        field(line, INVENTORY_FIRST_YEAR, "first year")?,
        "first year",
    )?;
    let last_year = parse_number(field(line, INVENTORY_LAST_YEAR, "last year")?, "last year")?;

    Ok(InventoryRecord {
        station_id,
        latitude,
        longitude,
        element,
        first_year,
        last_year,
    })
}

/// Parse one `ghcnd-stations.txt` line into `(station_id, name)`
///
/// The name column ends at 71 but shorter lines are accepted; trailing
/// whitespace is stripped.
pub fn parse_station_name_line(line: &str) -> Result<(String, String), RecordParseError> {
    let station_id = parse_station_id(line)?;
    let end = line.len().min(STATION_NAME.end);
    let name = field(line, STATION_NAME.start..end.max(STATION_NAME.start), "name")?
        .trim_end()
        .to_string();
    Ok((station_id, name))
}

/// Header of a `.dly` line without decoding the values
pub fn parse_daily_header(line: &str) -> Result<(String, i32, u32, Element), RecordParseError> {
    let station_id = parse_station_id(line)?;
    let year = parse_number(field(line, DAILY_YEAR, "year")?, "year")?;
    let month: u32 = parse_number(field(line, DAILY_MONTH, "month")?, "month")?;
    if !(1..=12).contains(&month) {
        return Err(RecordParseError::InvalidMonth(month));
    }
    let element = Element::from_code(field(line, DAILY_ELEMENT, "element")?.trim());
    Ok((station_id, year, month, element))
}

/// Parse a full `.dly` line
pub fn parse_daily_line(line: &str) -> Result<DailyElementRecord, RecordParseError> {
    let (station_id, year, month, element) = parse_daily_header(line)?;
    let values = daily_value_fields(line).map(parse_daily_value).collect();
    Ok(DailyElementRecord {
        station_id,
        year,
        month,
        element,
        values,
    })
}

/// The raw 5-character value fields of a `.dly` line, at most 31
fn daily_value_fields(line: &str) -> impl Iterator<Item = &str> {
    (DAILY_VALUES_OFFSET..line.len())
        .step_by(DAILY_FIELD_WIDTH)
        .take(DAYS_PER_LINE)
        .filter_map(move |start| {
            let end = (start + DAILY_VALUE_WIDTH).min(line.len());
            line.get(start..end)
        })
}

/// A day value is an optionally negative run of digits; `-9999` and anything
/// else unparseable counts as missing.
fn parse_daily_value(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match trimmed.parse::<i32>() {
        Ok(MISSING_VALUE) | Err(_) => None,
        Ok(value) => Some(value),
    }
}

fn average_tenths(values: impl Iterator<Item = i32>) -> Option<f64> {
    let (sum, count) = values.fold((0i64, 0usize), |(sum, count), v| (sum + v as i64, count + 1));
    if count == 0 {
        return None;
    }
    let average = sum as f64 / count as f64 / 10.0;
    Some((average * 1000.0).round() / 1000.0)
}

/// Average of the valid day values of a `.dly` line in °C, rounded to 3 decimals.
///
/// Returns the sentinel `0.0` when the line has no valid day, which callers
/// cannot tell apart from a genuine 0.0 °C mean. Use
/// [`DailyElementRecord::average`] where that matters.
pub fn extract_average_value(line: &str) -> f64 {
    average_tenths(daily_value_fields(line).filter_map(parse_daily_value)).unwrap_or(0.0)
}

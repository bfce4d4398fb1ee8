//! Day-weighted temperature aggregation
//!
//! Turns monthly mean Tmin/Tmax values into yearly series for the whole year
//! and for each meteorological season (northern hemisphere). Every month is
//! weighted by its number of days, so a yearly value approximates the mean of
//! the underlying daily values.
//!
//! Winter spans the turn of the year: December of year Y is grouped with
//! January and February of year Y+1 and reported as winter Y+1.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::db::MonthlyMean;

/// Proleptic Gregorian leap year rule
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in `month` (1-12) of `year`, 0 for an invalid month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        _ => 0,
    }
}

/// Aggregation bucket, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Annual,
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Period {
    pub const ALL: [Period; 5] = [
        Period::Annual,
        Period::Spring,
        Period::Summer,
        Period::Autumn,
        Period::Winter,
    ];

    pub fn months(self) -> &'static [u32] {
        match self {
            Period::Annual => &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
            Period::Spring => &[3, 4, 5],
            Period::Summer => &[6, 7, 8],
            Period::Autumn => &[9, 10, 11],
            Period::Winter => &[12, 1, 2],
        }
    }

    pub fn contains(self, month: u32) -> bool {
        self.months().contains(&month)
    }

    /// Year a month is reported under. December belongs to the next year's winter.
    pub fn bucket_year(self, year: i32, month: u32) -> i32 {
        match (self, month) {
            (Period::Winter, 12) => year.saturating_add(1),
            _ => year,
        }
    }

    /// Calendar years whose months can land in buckets `first_year..=last_year`
    pub fn source_years(self, first_year: i32, last_year: i32) -> (i32, i32) {
        match self {
            Period::Winter => (first_year.saturating_sub(1), last_year),
            _ => (first_year, last_year),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Annual => "annual",
            Period::Spring => "spring",
            Period::Summer => "summer",
            Period::Autumn => "autumn",
            Period::Winter => "winter",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Tmin,
    Tmax,
}

impl Measure {
    pub fn as_str(self) -> &'static str {
        match self {
            Measure::Tmin => "tmin",
            Measure::Tmax => "tmax",
        }
    }
}

/// One labeled yearly series, ascending by year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSeries {
    pub label: String,
    pub period: Period,
    pub measure: Measure,
    pub values: Vec<(i32, f64)>,
}

impl AggregateSeries {
    fn new(period: Period, measure: Measure, values: Vec<(i32, f64)>) -> Self {
        Self {
            label: format!("{}_{}", period, measure.as_str()),
            period,
            measure,
            values,
        }
    }

    pub fn value_for(&self, year: i32) -> Option<f64> {
        self.values
            .iter()
            .find(|(y, _)| *y == year)
            .map(|(_, value)| *value)
    }
}

#[derive(Default)]
struct WeightedSum {
    tmin: f64,
    tmax: f64,
    days: u32,
}

/// Day-weighted Tmin and Tmax series of one period.
///
/// Rows outside the period's months are ignored, as are rows whose bucket year
/// falls outside `first_year..=last_year` after the winter shift. For winter the
/// rows must include December of `first_year - 1` (see [`Period::source_years`]).
pub fn weighted_series(
    period: Period,
    rows: &[MonthlyMean],
    first_year: i32,
    last_year: i32,
) -> (AggregateSeries, AggregateSeries) {
    let mut buckets: BTreeMap<i32, WeightedSum> = BTreeMap::new();

    for row in rows.iter().filter(|row| period.contains(row.month)) {
        let bucket = period.bucket_year(row.year, row.month);
        if bucket < first_year || bucket > last_year {
            continue;
        }
        let days = days_in_month(row.year, row.month);
        let sum = buckets.entry(bucket).or_default();
        sum.tmin += row.mean_tmin * days as f64;
        sum.tmax += row.mean_tmax * days as f64;
        sum.days += days;
    }

    let (tmin, tmax) = buckets
        .into_iter()
        .filter(|(_, sum)| sum.days > 0)
        .map(|(year, sum)| {
            let days = sum.days as f64;
            ((year, sum.tmin / days), (year, sum.tmax / days))
        })
        .unzip();

    (
        AggregateSeries::new(period, Measure::Tmin, tmin),
        AggregateSeries::new(period, Measure::Tmax, tmax),
    )
}

/// All ten series in fixed order: annual, spring, summer, autumn, winter, each
/// as Tmin then Tmax.
pub fn aggregate_monthly_means(
    rows: &[MonthlyMean],
    first_year: i32,
    last_year: i32,
) -> Vec<AggregateSeries> {
    Period::ALL
        .iter()
        .flat_map(|period| {
            let (tmin, tmax) = weighted_series(*period, rows, first_year, last_year);
            [tmin, tmax]
        })
        .collect()
}

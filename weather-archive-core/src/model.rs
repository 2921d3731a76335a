use std::{fmt, path::PathBuf};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::InvalidCoordinate;

/// A validated geographic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinate> {
        let lat_ok = (-90.0..=90.0).contains(&latitude);
        let lon_ok = (-180.0..=180.0).contains(&longitude);

        if lat_ok && lon_ok {
            Ok(Self { latitude, longitude })
        } else {
            Err(InvalidCoordinate { latitude, longitude })
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Inclusive range of calendar days requested from the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Days in a run's window.
    pub const DAYS: u64 = 7;

    /// The last seven complete days: `today - 7 ..= today - 1`.
    ///
    /// The current (partial) day is never included.
    pub fn ending_yesterday(today: NaiveDate) -> Self {
        let end = today - Days::new(1);
        let start = today - Days::new(Self::DAYS);
        Self { start, end }
    }
}

/// One per-day row produced by reconciling daily summaries with hourly readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    pub date: NaiveDate,
    #[serde(rename = "weather")]
    pub weather_code: Option<i64>,
    pub temperature: Option<f64>,
}

/// A place name resolved to coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    pub coordinate: Coordinate,
    pub display_name: String,
}

/// Everything one pipeline run produced. Also the row shape of the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifacts {
    pub timestamp: String,
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
    pub selected_csv: PathBuf,
    pub plot_image: PathBuf,
    pub raw_json: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn range_covers_seven_days_before_today() {
        let range = DateRange::ending_yesterday(date(2024, 3, 1));

        assert_eq!(range.start, date(2024, 2, 23));
        assert_eq!(range.end, date(2024, 2, 29));
        assert_eq!((range.end - range.start).num_days() + 1, 7);
    }

    #[test]
    fn coordinate_rejects_out_of_range_values() {
        assert!(Coordinate::new(28.6519, 77.2315).is_ok());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.1).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }
}

//! Parsing the archive response and reconciling its two time resolutions.
//!
//! The daily section decides which dates exist; hourly temperatures are
//! averaged per calendar date and left-joined onto it.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::{error::DataShapeError, model::ReconciledRecord};

/// Accepted spellings of the daily weather-code series, most preferred first.
pub const WEATHER_CODE_KEYS: [&str; 2] = ["weather_code", "weathercode"];

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// The parts of an archive response the reconciler reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveSeries {
    pub daily_dates: Vec<NaiveDate>,
    pub daily_codes: Vec<Option<i64>>,
    pub hourly_times: Vec<NaiveDateTime>,
    pub hourly_temps: Vec<Option<f64>>,
}

impl ArchiveSeries {
    /// Missing or null `daily`/`hourly` sections parse as empty.
    pub fn from_raw(raw: &Value) -> Result<Self, DataShapeError> {
        let daily = section(raw, "daily");
        let hourly = section(raw, "hourly");

        let code_key =
            daily.and_then(|d| WEATHER_CODE_KEYS.into_iter().find(|k| d.contains_key(*k)));

        Ok(Self {
            daily_dates: parse_array(daily, "daily", "time", parse_date)?,
            daily_codes: match code_key {
                Some(key) => parse_array(daily, "daily", key, parse_code)?,
                None => Vec::new(),
            },
            hourly_times: parse_array(hourly, "hourly", "time", parse_timestamp)?,
            hourly_temps: parse_array(hourly, "hourly", "temperature_2m", parse_temperature)?,
        })
    }

    pub fn reconcile(&self) -> Result<Vec<ReconciledRecord>, DataShapeError> {
        reconcile(&self.daily_dates, &self.daily_codes, &self.hourly_times, &self.hourly_temps)
    }
}

/// One record per entry of `daily_dates`, in order, carrying the mean hourly
/// temperature of that date or `None` where no hourly reading matches.
pub fn reconcile(
    daily_dates: &[NaiveDate],
    daily_codes: &[Option<i64>],
    hourly_times: &[NaiveDateTime],
    hourly_temps: &[Option<f64>],
) -> Result<Vec<ReconciledRecord>, DataShapeError> {
    if daily_dates.len() != daily_codes.len() {
        return Err(DataShapeError::LengthMismatch {
            section: "daily",
            left: "time",
            left_len: daily_dates.len(),
            right: "weather_code",
            right_len: daily_codes.len(),
        });
    }

    let means = if hourly_times.is_empty() || hourly_temps.is_empty() {
        HashMap::new()
    } else {
        daily_means(hourly_times, hourly_temps)?
    };

    Ok(daily_dates
        .iter()
        .zip(daily_codes)
        .map(|(date, code)| ReconciledRecord {
            date: *date,
            weather_code: *code,
            temperature: means.get(date).copied().flatten(),
        })
        .collect())
}

/// Arithmetic mean of the non-null temperatures of each calendar date.
///
/// Timestamps are already local to the requested place, so the date is
/// taken as-is.
pub fn daily_means(
    times: &[NaiveDateTime],
    temps: &[Option<f64>],
) -> Result<HashMap<NaiveDate, Option<f64>>, DataShapeError> {
    if times.len() != temps.len() {
        return Err(DataShapeError::LengthMismatch {
            section: "hourly",
            left: "time",
            left_len: times.len(),
            right: "temperature_2m",
            right_len: temps.len(),
        });
    }

    let mut sums: HashMap<NaiveDate, (f64, usize)> = HashMap::new();
    for (time, temp) in times.iter().zip(temps) {
        let entry = sums.entry(time.date()).or_insert((0.0, 0));
        if let Some(t) = temp {
            entry.0 += t;
            entry.1 += 1;
        }
    }

    Ok(sums
        .into_iter()
        .map(|(date, (sum, n))| (date, (n > 0).then(|| sum / n as f64)))
        .collect())
}

fn section<'a>(raw: &'a Value, name: &str) -> Option<&'a Map<String, Value>> {
    raw.get(name).and_then(Value::as_object)
}

fn parse_array<T>(
    section: Option<&Map<String, Value>>,
    section_name: &'static str,
    field: &'static str,
    parse: fn(&Value) -> Option<T>,
) -> Result<Vec<T>, DataShapeError> {
    let Some(value) = section.and_then(|s| s.get(field)) else {
        return Ok(Vec::new());
    };
    if value.is_null() {
        return Ok(Vec::new());
    }

    let items = value
        .as_array()
        .ok_or(DataShapeError::NotAnArray { section: section_name, field })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            parse(item).ok_or_else(|| DataShapeError::InvalidValue {
                section: section_name,
                field,
                index,
                value: item.to_string(),
            })
        })
        .collect()
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.as_str()?, DATE_FORMAT).ok()
}

fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let s = value.as_str()?;
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn parse_code(value: &Value) -> Option<Option<i64>> {
    match value {
        Value::Null => Some(None),
        Value::Number(n) => match n.as_i64() {
            Some(code) => Some(Some(code)),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Some(f as i64)),
        },
        _ => None,
    }
}

fn parse_temperature(value: &Value) -> Option<Option<f64>> {
    match value {
        Value::Null => Some(None),
        other => other.as_f64().map(Some),
    }
}

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::{
    error::FetchError,
    model::{Coordinate, DateRange},
};

use super::{ArchiveSource, read_json};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Open-Meteo historical weather API.
#[derive(Debug, Clone)]
pub struct OpenMeteoArchive {
    url: String,
    http: Client,
}

impl OpenMeteoArchive {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { url: url.into(), http })
    }

    fn query(at: Coordinate, range: DateRange) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", at.latitude().to_string()),
            ("longitude", at.longitude().to_string()),
            ("daily", "weather_code,sunrise,sunset".to_string()),
            ("hourly", "temperature_2m".to_string()),
            ("start_date", range.start.format(DATE_FORMAT).to_string()),
            ("end_date", range.end.format(DATE_FORMAT).to_string()),
            ("timezone", "auto".to_string()),
        ]
    }
}

#[async_trait]
impl ArchiveSource for OpenMeteoArchive {
    async fn fetch_archive(&self, at: Coordinate, range: DateRange) -> Result<Value, FetchError> {
        let query = Self::query(at, range);
        debug!("archive request {} {:?}", self.url, query);
        info!("Fetching archive for {at} from {} to {}", range.start, range.end);

        let res = self.http.get(&self.url).query(&query).send().await?;
        read_json(res).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn query_requests_codes_sun_times_and_hourly_temperature() {
        let at = Coordinate::new(52.52, 13.41).expect("valid coordinate");
        let today = NaiveDate::from_ymd_opt(2024, 1, 8).expect("valid date");

        let query = OpenMeteoArchive::query(at, DateRange::ending_yesterday(today));
        let get = |key: &str| {
            query.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
        };

        assert_eq!(get("latitude"), Some("52.52"));
        assert_eq!(get("longitude"), Some("13.41"));
        assert_eq!(get("daily"), Some("weather_code,sunrise,sunset"));
        assert_eq!(get("hourly"), Some("temperature_2m"));
        assert_eq!(get("start_date"), Some("2024-01-01"));
        assert_eq!(get("end_date"), Some("2024-01-07"));
        assert_eq!(get("timezone"), Some("auto"));
    }
}

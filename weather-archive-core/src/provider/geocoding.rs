use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::FetchError;

use super::{GeoMatch, Geocoder, read_json};

/// Open-Meteo geocoding API.
#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    url: String,
    http: Client,
}

impl OpenMeteoGeocoder {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { url: url.into(), http })
    }
}

#[derive(Debug, Deserialize)]
struct GcResponse {
    #[serde(default)]
    results: Option<Vec<GcResult>>,
}

#[derive(Debug, Deserialize)]
struct GcResult {
    latitude: f64,
    longitude: f64,
    name: Option<String>,
    country: Option<String>,
}

fn first_match(body: serde_json::Value) -> Result<Option<GeoMatch>, FetchError> {
    let parsed: GcResponse = serde_json::from_value(body)?;

    Ok(parsed.results.unwrap_or_default().into_iter().next().map(|r| GeoMatch {
        latitude: r.latitude,
        longitude: r.longitude,
        name: r.name,
        country: r.country,
    }))
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    async fn lookup(&self, place: &str) -> Result<Option<GeoMatch>, FetchError> {
        debug!("geocoding request {} name={place}", self.url);

        let res = self
            .http
            .get(&self.url)
            .query(&[("name", place), ("count", "1")])
            .send()
            .await?;

        first_match(read_json(res).await?)
    }
}

//! Remote data sources.
//!
//! Both seams are traits so the pipeline and resolver can be driven by
//! in-memory fakes; the Open-Meteo implementations live in the submodules.

use async_trait::async_trait;
use reqwest::Response;
use serde_json::Value;
use std::fmt::Debug;

use crate::{
    error::FetchError,
    model::{Coordinate, DateRange},
};

pub mod archive;
pub mod geocoding;

pub use archive::OpenMeteoArchive;
pub use geocoding::OpenMeteoGeocoder;

/// Historical weather for a point and date range.
#[async_trait]
pub trait ArchiveSource: Send + Sync + Debug {
    /// Returns the parsed body. Key order and number values are kept as sent
    /// so the raw backup matches what the API returned.
    async fn fetch_archive(&self, at: Coordinate, range: DateRange) -> Result<Value, FetchError>;
}

/// First geocoding match for a place name.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMatch {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub country: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// `Ok(None)` means the lookup worked but found nothing.
    async fn lookup(&self, place: &str) -> Result<Option<GeoMatch>, FetchError>;
}

/// Reads a JSON body, turning non-2xx statuses into [`FetchError::Status`].
pub(crate) async fn read_json(res: Response) -> Result<Value, FetchError> {
    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        return Err(FetchError::Status { status, body: truncate_body(&body) });
    }

    Ok(serde_json::from_str(&body)?)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

//! Core library for the `weather-archive` CLI.
//!
//! This crate defines:
//! - Geocoding of place names with a fixed fallback location
//! - Fetching the last week of historical weather from Open-Meteo
//! - Reconciling daily weather codes with hourly temperatures into one record per day
//! - Persisting the raw response, selected table, chart and an append-only run log
//!
//! It is used by `weather-archive-cli`, but can also be reused by other binaries or services.

pub mod artifact;
pub mod chart;
pub mod config;
pub mod error;
pub mod geo;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod series;

pub use config::Config;
pub use error::{DataShapeError, FetchError, InvalidCoordinate};
pub use geo::{GeoResolver, Outcome, Resolution};
pub use model::{Coordinate, DateRange, ReconciledRecord, ResolvedPlace, RunArtifacts};
pub use pipeline::Pipeline;
pub use provider::{ArchiveSource, Geocoder};

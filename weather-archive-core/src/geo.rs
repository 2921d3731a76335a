use anyhow::Result;
use log::{info, warn};

use crate::{
    config::Config,
    model::{Coordinate, ResolvedPlace},
    provider::{GeoMatch, Geocoder, OpenMeteoGeocoder},
};

/// How a place name was turned into coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Geocoded,
    NoMatch,
    /// The lookup failed; the reason is kept for display.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The name actually looked up, after blank input was replaced.
    pub query: String,
    pub place: ResolvedPlace,
    pub outcome: Outcome,
}

/// Resolves free-text place names. Never fails: anything but a usable
/// match yields the fallback coordinate.
#[derive(Debug)]
pub struct GeoResolver {
    geocoder: Box<dyn Geocoder>,
    default_place: String,
    fallback: Coordinate,
}

impl GeoResolver {
    pub fn new(geocoder: Box<dyn Geocoder>, default_place: String, fallback: Coordinate) -> Self {
        Self { geocoder, default_place, fallback }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let geocoder = OpenMeteoGeocoder::new(config.geocoding_url.clone(), config.timeout())?;
        Ok(Self::new(
            Box::new(geocoder),
            config.default_place.clone(),
            config.fallback_coordinate()?,
        ))
    }

    pub async fn resolve(&self, place: &str) -> ResolvedPlace {
        self.resolve_detailed(place).await.place
    }

    pub async fn resolve_detailed(&self, place: &str) -> Resolution {
        let query = if place.trim().is_empty() {
            self.default_place.clone()
        } else {
            place.to_string()
        };

        let outcome = match self.geocoder.lookup(&query).await {
            Ok(Some(found)) => match Self::accept(&query, found) {
                Ok(place) => {
                    info!(
                        "Geocoded '{query}' -> {} ({})",
                        place.display_name, place.coordinate
                    );
                    return Resolution { query, place, outcome: Outcome::Geocoded };
                }
                Err(reason) => Outcome::Failed(reason),
            },
            Ok(None) => Outcome::NoMatch,
            Err(err) => Outcome::Failed(err.to_string()),
        };

        match &outcome {
            Outcome::Failed(reason) => {
                warn!("Geocoding '{query}' failed ({reason}); using default coordinates")
            }
            _ => warn!("No geocoding results for '{query}'; using default coordinates"),
        }

        let place = ResolvedPlace { coordinate: self.fallback, display_name: query.clone() };
        Resolution { query, place, outcome }
    }

    fn accept(query: &str, found: GeoMatch) -> Result<ResolvedPlace, String> {
        let coordinate =
            Coordinate::new(found.latitude, found.longitude).map_err(|e| e.to_string())?;

        let name = found.name.filter(|n| !n.is_empty()).unwrap_or_else(|| query.to_string());
        let display_name = match found.country.filter(|c| !c.is_empty()) {
            Some(country) => format!("{name}, {country}"),
            None => name,
        };

        Ok(ResolvedPlace { coordinate, display_name })
    }
}

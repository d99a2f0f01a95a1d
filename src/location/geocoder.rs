//! Optional external location lookup.
//!
//! The local place tables answer almost every query. A [`Geocoder`] is only
//! consulted when all of them miss, and only when one is configured; public
//! geocoding services enforce strict rate limits, so [`NominatimGeocoder`]
//! spaces its requests at least `min_interval` apart.

use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::constants::USER_AGENT;
use crate::core::DevmapError;
use crate::geo::Coordinates;

/// An external service that turns free text into coordinates.
pub trait Geocoder: Send + Sync {
    /// Look up `query`.
    ///
    /// `Ok(None)` means the service answered but knows no such place.
    fn lookup<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Option<Coordinates>, DevmapError>>;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Client for a Nominatim-compatible `/search` endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    /// Create a client for `endpoint`, identifying itself as `user_agent`.
    ///
    /// Public Nominatim instances reject requests without a descriptive agent.
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: Option<&str>,
        min_interval: Duration,
    ) -> Result<Self, DevmapError> {
        let agent = user_agent.unwrap_or(USER_AGENT);
        let client = reqwest::Client::builder().user_agent(agent).build().map_err(|e| {
            DevmapError::ConfigError {
                message: format!("failed to build HTTP client: {e}"),
            }
        })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    async fn lookup_inner(&self, query: &str) -> Result<Option<Coordinates>, DevmapError> {
        // Holding the lock across the sleep serializes requests.
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());

        debug!("Geocoding '{}' via {}", query, self.endpoint);
        let network_error = |e: reqwest::Error| DevmapError::GeocoderError {
            query: query.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(DevmapError::GeocoderError {
                query: query.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let places: Vec<NominatimPlace> = response.json().await.map_err(network_error)?;
        Ok(places.first().and_then(parse_place))
    }
}

impl Geocoder for NominatimGeocoder {
    fn lookup<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Option<Coordinates>, DevmapError>> {
        self.lookup_inner(query).boxed()
    }
}

fn parse_place(place: &NominatimPlace) -> Option<Coordinates> {
    let lat = place.lat.parse().ok()?;
    let lng = place.lon.parse().ok()?;
    Some(Coordinates::new(lat, lng)).filter(Coordinates::is_valid)
}

//! HTTP client for a Google-Geocoding-compatible forward geocoder.
//!
//! A request is `GET {base}json?address=...&key=...`. The JSON envelope's
//! `status` decides the outcome: `OK` with at least one result is a hit,
//! `ZERO_RESULTS` is a miss, anything else surfaces as [`ClientError::Api`].

use reqwest::{Client, Url};
use serde::Deserialize;
use stockmap_core::{AppConfig, Coordinate, DEFAULT_GEOCODER_URL, DEFAULT_USER_AGENT};
use stockmap_locator::{Geocoder, ResolveError};

use crate::error::ClientError;
use crate::http::build_http_client;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Client for the geocoding API.
///
/// Use [`GeocodingClient::new`] for production or
/// [`GeocodingClient::with_base_url`] to point at a mock server in tests.
pub struct GeocodingClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl GeocodingClient {
    /// Creates a client pointed at the production geocoding API.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, ClientError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_GEOCODER_URL, DEFAULT_USER_AGENT)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
        user_agent: &str,
    ) -> Result<Self, ClientError> {
        let client = build_http_client(timeout_secs, user_agent)?;

        // Exactly one trailing slash so `join("json")` appends a segment
        // instead of replacing the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Builds a client from application config, or `None` when no API key
    /// is configured.
    ///
    /// # Errors
    ///
    /// See [`GeocodingClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, ClientError> {
        let Some(api_key) = config.geocoder_api_key.as_deref() else {
            tracing::info!("no geocoder API key configured; postcode fallback disabled");
            return Ok(None);
        };
        Self::with_base_url(
            api_key,
            config.http_timeout_secs,
            &config.geocoder_url,
            &config.user_agent,
        )
        .map(Some)
    }

    /// Forward-geocodes free text.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Api`] if the service returns an error status.
    /// - [`ClientError::UnexpectedStatus`] on a non-2xx HTTP status.
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::Deserialize`] if the body does not match the
    ///   expected shape.
    pub async fn lookup(&self, address: &str) -> Result<Option<Coordinate>, ClientError> {
        // The request URL carries the API key, so it is stripped from every
        // error before it can reach a log line.
        let url = self.build_url(address)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.base_url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Http(e.without_url()))?;
        let envelope: GeocodeResponse =
            serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
                context: format!("geocode(address={address})"),
                source: e,
            })?;

        match envelope.status.as_str() {
            "OK" => Ok(envelope.results.first().and_then(|result| {
                let LatLng { lat, lng } = result.geometry.location;
                let coordinate = Coordinate::new(lat, lng).ok();
                if coordinate.is_none() {
                    tracing::debug!(address, lat, lng, "geocoder returned out-of-range coordinate");
                }
                coordinate
            })),
            "ZERO_RESULTS" => Ok(None),
            other => Err(ClientError::Api {
                status: other.to_owned(),
                message: envelope
                    .error_message
                    .unwrap_or_else(|| "no error message".to_string()),
            }),
        }
    }

    fn build_url(&self, address: &str) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join("json")
            .map_err(|e| ClientError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", &self.api_key);
        Ok(url)
    }
}

impl Geocoder for GeocodingClient {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, ResolveError> {
        self.lookup(query).await.map_err(ResolveError::from)
    }
}

#[cfg(test)]
#[path = "geocoder_test.rs"]
mod tests;

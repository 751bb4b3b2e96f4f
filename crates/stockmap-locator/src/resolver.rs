//! Location resolution: typed postcodes and "use my location".
//!
//! Postcodes go to a [`Geocoder`] scoped to the deployment's country. Device
//! location first asks the hosting frame (when embedded) and falls through to
//! the [`DeviceLocator`] on failure or timeout. Every collaborator error is
//! converted to [`LocationQuery::Unresolved`] here.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use stockmap_core::{Coordinate, LocatorSettings};
use tokio::sync::{mpsc, oneshot};

use crate::error::ResolveError;

/// Free-text forward geocoding.
pub trait Geocoder {
    /// Returns `Ok(None)` when the service answered but found nothing.
    fn geocode(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Option<Coordinate>, ResolveError>> + Send;
}

/// A disabled geocoder (no API key configured) never finds anything.
impl<G: Geocoder + Sync> Geocoder for Option<G> {
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, ResolveError> {
        match self {
            Some(geocoder) => geocoder.geocode(query).await,
            None => Ok(None),
        }
    }
}

/// Options passed to the device for each position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub timeout: Duration,
    /// Always zero: a cached fix is never acceptable.
    pub maximum_age: Duration,
    pub high_accuracy: bool,
}

pub trait DeviceLocator {
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> impl Future<Output = Result<Coordinate, ResolveError>> + Send;
}

/// Request/response exchange with a hosting frame that may have location
/// access the embedded page lacks.
pub trait FrameProxy {
    fn is_embedded(&self) -> bool;

    fn request_position(&self) -> impl Future<Output = Result<Coordinate, ResolveError>> + Send;
}

/// Why a location could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    NoResult,
    Transport,
    PermissionDenied,
    Timeout,
    Unsupported,
}

impl From<&ResolveError> for UnresolvedReason {
    fn from(err: &ResolveError) -> Self {
        match err {
            ResolveError::PermissionDenied => Self::PermissionDenied,
            ResolveError::Timeout => Self::Timeout,
            ResolveError::Unsupported => Self::Unsupported,
            ResolveError::Transport(_) | ResolveError::NoResponse => Self::Transport,
        }
    }
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::NoResult => "no matching location found",
            Self::Transport => "location service could not be reached",
            Self::PermissionDenied => "location permission was denied",
            Self::Timeout => "location request timed out",
            Self::Unsupported => "location is not available on this device",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationQuery {
    Resolved(Coordinate),
    Unresolved(UnresolvedReason),
}

impl LocationQuery {
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Resolved(c) => Some(*c),
            Self::Unresolved(_) => None,
        }
    }
}

pub struct LocationResolver<G, D, F> {
    geocoder: G,
    device: D,
    frame: F,
    country: String,
    geolocation_timeout: Duration,
    frame_timeout: Duration,
}

impl<G, D, F> LocationResolver<G, D, F>
where
    G: Geocoder,
    D: DeviceLocator,
    F: FrameProxy,
{
    pub fn new(geocoder: G, device: D, frame: F, settings: &LocatorSettings) -> Self {
        Self {
            geocoder,
            device,
            frame,
            country: settings.country.clone(),
            geolocation_timeout: settings.geolocation_timeout,
            frame_timeout: settings.frame_timeout,
        }
    }

    /// The query string sent to the geocoder for a typed postcode.
    #[must_use]
    pub fn postcode_query(&self, postcode: &str) -> String {
        format!("{} {}", self.country, postcode.trim())
    }

    /// Geocodes a postcode within the configured country.
    pub async fn resolve_postcode(&self, postcode: &str) -> LocationQuery {
        let query = self.postcode_query(postcode);
        match self.geocoder.geocode(&query).await {
            Ok(Some(coordinate)) => {
                tracing::debug!(
                    query = %query,
                    lat = coordinate.latitude,
                    lng = coordinate.longitude,
                    "postcode geocoded"
                );
                LocationQuery::Resolved(coordinate)
            }
            Ok(None) => {
                tracing::debug!(query = %query, "geocoder returned no result");
                LocationQuery::Unresolved(UnresolvedReason::NoResult)
            }
            Err(err) => {
                tracing::warn!(query = %query, error = %err, "postcode geocoding failed");
                LocationQuery::Unresolved(UnresolvedReason::from(&err))
            }
        }
    }

    /// Resolves the visitor's current position.
    ///
    /// The frame proxy is raced against `frame_timeout`; losing that race
    /// falls through to the device, which is itself bounded by
    /// `geolocation_timeout`.
    pub async fn locate_device(&self) -> LocationQuery {
        if self.frame.is_embedded() {
            tokio::select! {
                result = self.frame.request_position() => match result {
                    Ok(coordinate) => {
                        tracing::debug!("position supplied by hosting frame");
                        return LocationQuery::Resolved(coordinate);
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "frame proxy failed; asking device");
                    }
                },
                () = tokio::time::sleep(self.frame_timeout) => {
                    tracing::debug!(
                        timeout = ?self.frame_timeout,
                        "frame proxy timed out; asking device"
                    );
                }
            }
        }

        let options = PositionOptions {
            timeout: self.geolocation_timeout,
            maximum_age: Duration::ZERO,
            high_accuracy: true,
        };
        match tokio::time::timeout(
            self.geolocation_timeout,
            self.device.current_position(options),
        )
        .await
        {
            Ok(Ok(coordinate)) => LocationQuery::Resolved(coordinate),
            Ok(Err(err)) => {
                tracing::info!(error = %err, "device location failed");
                LocationQuery::Unresolved(UnresolvedReason::from(&err))
            }
            Err(_) => {
                tracing::info!(
                    timeout = ?self.geolocation_timeout,
                    "device location timed out"
                );
                LocationQuery::Unresolved(UnresolvedReason::Timeout)
            }
        }
    }
}

/// Top-level pages have no hosting frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotEmbedded;

impl FrameProxy for NotEmbedded {
    fn is_embedded(&self) -> bool {
        false
    }

    async fn request_position(&self) -> Result<Coordinate, ResolveError> {
        Err(ResolveError::Unsupported)
    }
}

/// One position request delivered to the hosting side.
#[derive(Debug)]
pub struct FrameRequest {
    pub reply: oneshot::Sender<Result<Coordinate, ResolveError>>,
}

/// [`FrameProxy`] over tokio channels. The host owns the receiving half
/// returned by [`ChannelFrameProxy::pair`] and answers each request on its
/// `reply` sender.
#[derive(Debug, Clone)]
pub struct ChannelFrameProxy {
    requests: mpsc::Sender<FrameRequest>,
}

impl ChannelFrameProxy {
    #[must_use]
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<FrameRequest>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { requests: tx }, rx)
    }
}

impl FrameProxy for ChannelFrameProxy {
    fn is_embedded(&self) -> bool {
        !self.requests.is_closed()
    }

    async fn request_position(&self) -> Result<Coordinate, ResolveError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(FrameRequest { reply })
            .await
            .map_err(|_| ResolveError::NoResponse)?;
        response.await.map_err(|_| ResolveError::NoResponse)?
    }
}

/// A device whose position is known up front (command line, fixtures).
#[derive(Debug, Clone, Copy)]
pub struct FixedDeviceLocator(pub Coordinate);

impl DeviceLocator for FixedDeviceLocator {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, ResolveError> {
        Ok(self.0)
    }
}

/// A device without location services.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeviceLocator;

impl DeviceLocator for NoDeviceLocator {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, ResolveError> {
        Err(ResolveError::Unsupported)
    }
}

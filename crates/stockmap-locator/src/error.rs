use thiserror::Error;

/// Failures reported by the geocoding, device-location and frame-proxy
/// collaborators. The resolver converts every one of these into an
/// [`crate::resolver::LocationQuery::Unresolved`]; none reach the filter
/// engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location request timed out")]
    Timeout,

    #[error("location services unavailable")]
    Unsupported,

    #[error("transport error: {0}")]
    Transport(String),

    /// The hosting frame went away or never answered.
    #[error("no response from hosting frame")]
    NoResponse,
}

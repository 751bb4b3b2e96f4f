use thiserror::Error;

use stockmap_locator::ResolveError;

/// Errors returned by the geocoding client and feed loader.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("YAML deserialization error for {context}: {source}")]
    DeserializeYaml {
        context: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The geocoding service answered with a status other than `OK` or
    /// `ZERO_RESULTS`.
    #[error("geocoding API returned {status}: {message}")]
    Api { status: String, message: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ClientError> for ResolveError {
    fn from(err: ClientError) -> Self {
        Self::Transport(err.to_string())
    }
}

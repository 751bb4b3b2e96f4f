//! Loading the stockist feed from a local file or an HTTP endpoint.
//!
//! Two document shapes are accepted: a bare array of records, or an object
//! with a `stockists` array (the shape the CRM export produces). JSON is the
//! default; paths ending in `.yaml`/`.yml` are read as YAML. Entries that
//! do not deserialize as a record are skipped, not fatal.

use std::fmt;
use std::path::PathBuf;

use reqwest::{Client, Url};
use serde::Deserialize;
use stockmap_core::StockistRecord;

use crate::error::ClientError;

/// The document shell; entries stay as untyped values until
/// [`FeedDocument::into_records`] so one bad entry cannot sink the rest.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeedDocument<V> {
    Bare(Vec<V>),
    Wrapped { stockists: Vec<V> },
}

impl<V> FeedDocument<V> {
    fn into_records<E>(
        self,
        context: &str,
        convert: impl Fn(V) -> Result<StockistRecord, E>,
    ) -> Vec<StockistRecord>
    where
        E: fmt::Display,
    {
        let (Self::Bare(entries) | Self::Wrapped { stockists: entries }) = self;
        let total = entries.len();
        let records: Vec<_> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match convert(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::debug!(context, index, error = %e, "skipping malformed feed entry");
                    None
                }
            })
            .collect();
        if records.len() < total {
            tracing::warn!(
                context,
                skipped = total - records.len(),
                total,
                "feed contained malformed entries"
            );
        }
        records
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Json,
    Yaml,
}

impl FeedFormat {
    /// Picks the format from the final path segment's extension.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Self::Yaml
        } else {
            Self::Json
        }
    }
}

/// Where the feed lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Path(PathBuf),
    Url(Url),
}

impl FeedSource {
    /// `http://` and `https://` locations are fetched; anything else is a
    /// filesystem path.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] for an http(s) location that
    /// does not parse.
    pub fn parse(location: &str) -> Result<Self, ClientError> {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed).map_err(|e| ClientError::InvalidBaseUrl {
                url: trimmed.to_owned(),
                reason: e.to_string(),
            })?;
            Ok(Self::Url(url))
        } else {
            Ok(Self::Path(PathBuf::from(trimmed)))
        }
    }

    #[must_use]
    pub fn format(&self) -> FeedFormat {
        match self {
            Self::Path(path) => FeedFormat::from_path(&path.to_string_lossy()),
            Self::Url(url) => FeedFormat::from_path(url.path()),
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Parses a feed document body.
///
/// # Errors
///
/// Returns [`ClientError::Deserialize`] or [`ClientError::DeserializeYaml`]
/// when the body is neither accepted shape. Individual malformed entries are
/// dropped and logged instead.
pub fn parse_feed(
    body: &str,
    format: FeedFormat,
    context: &str,
) -> Result<Vec<StockistRecord>, ClientError> {
    match format {
        FeedFormat::Json => {
            let document: FeedDocument<serde_json::Value> = serde_json::from_str(body)
                .map_err(|e| ClientError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })?;
            Ok(document.into_records(context, serde_json::from_value))
        }
        FeedFormat::Yaml => {
            let document: FeedDocument<serde_yaml::Value> = serde_yaml::from_str(body)
                .map_err(|e| ClientError::DeserializeYaml {
                    context: context.to_owned(),
                    source: e,
                })?;
            Ok(document.into_records(context, serde_yaml::from_value))
        }
    }
}

/// Reads and parses the feed.
///
/// # Errors
///
/// - [`ClientError::Io`] if a local file cannot be read.
/// - [`ClientError::Http`] / [`ClientError::UnexpectedStatus`] if a remote
///   feed cannot be fetched.
/// - [`ClientError::Deserialize`] / [`ClientError::DeserializeYaml`] if the
///   document does not parse.
pub async fn load_feed(
    source: &FeedSource,
    client: &Client,
) -> Result<Vec<StockistRecord>, ClientError> {
    let body = match source {
        FeedSource::Path(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ClientError::Io {
                    path: path.display().to_string(),
                    source: e,
                })?
        }
        FeedSource::Url(url) => fetch_text(client, url).await?,
    };

    let records = parse_feed(&body, source.format(), &source.to_string())?;
    tracing::info!(source = %source, records = records.len(), "stockist feed loaded");
    Ok(records)
}

async fn fetch_text(client: &Client, url: &Url) -> Result<String, ClientError> {
    let response = client
        .get(url.clone())
        .header(
            reqwest::header::ACCEPT,
            "application/json, application/yaml;q=0.9, */*;q=0.1",
        )
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.text().await?)
}

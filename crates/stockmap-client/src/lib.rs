//! HTTP-backed collaborators: the forward geocoder and the stockist feed.

pub mod backfill;
pub mod error;
pub mod feed;
pub mod geocoder;
mod http;

pub use backfill::{backfill_coordinates, BackfillSummary};
pub use error::ClientError;
pub use feed::{load_feed, parse_feed, FeedFormat, FeedSource};
pub use geocoder::GeocodingClient;
pub use http::build_http_client;

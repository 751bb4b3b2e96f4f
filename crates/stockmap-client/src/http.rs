use std::time::Duration;

use reqwest::Client;

use crate::error::ClientError;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Builds the shared `reqwest` client used for geocoding and feed fetches.
///
/// # Errors
///
/// Returns [`ClientError::Http`] if the client cannot be constructed.
pub fn build_http_client(timeout_secs: u64, user_agent: &str) -> Result<Client, ClientError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(user_agent)
        .build()?)
}

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Tunables for the filter engine, location resolver, viewport and list.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorSettings {
    /// Country prefixed to postcode geocoding queries.
    pub country: String,
    /// Radius used when a postcode has no direct match and is geocoded instead.
    pub postcode_radius_km: f64,
    /// Radius used by "use my location".
    pub near_me_radius_km: f64,
    pub geolocation_timeout: Duration,
    /// How long to wait for a hosting frame before asking the device directly.
    pub frame_timeout: Duration,
    /// Coarsest zoom a framed result may settle at.
    pub min_zoom: f64,
    /// Zoom cap for the first automatic fit only.
    pub initial_max_zoom: Option<f64>,
    pub fit_padding_px: u32,
    pub fit_duration_ms: u64,
    /// Viewports narrower than this are treated as mobile.
    pub narrow_breakpoint_px: u32,
    pub mobile_max_items: usize,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            country: "Australia".to_string(),
            postcode_radius_km: 5.0,
            near_me_radius_km: 10.0,
            geolocation_timeout: Duration::from_millis(8_000),
            frame_timeout: Duration::from_millis(3_000),
            min_zoom: 4.0,
            initial_max_zoom: None,
            fit_padding_px: 50,
            fit_duration_ms: 1_000,
            narrow_breakpoint_px: 768,
            mobile_max_items: 10,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Path or URL of the stockist feed.
    pub feed: Option<String>,
    pub locator: LocatorSettings,
    pub geocoder_url: String,
    pub geocoder_api_key: Option<String>,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("feed", &self.feed)
            .field("locator", &self.locator)
            .field("geocoder_url", &self.geocoder_url)
            .field(
                "geocoder_api_key",
                &self.geocoder_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

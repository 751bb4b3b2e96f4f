use std::time::Duration;

use crate::app_config::{AppConfig, Environment, LocatorSettings};
use crate::ConfigError;

pub const DEFAULT_GEOCODER_URL: &str = "https://maps.googleapis.com/maps/api/geocode/";
pub const DEFAULT_USER_AGENT: &str = "stockmap/0.1 (store-locator)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = LocatorSettings::default();

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: u32| -> Result<u32, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw.trim().parse::<u32>().map_err(|e| invalid(var, e.to_string())),
            Err(_) => Ok(default),
        }
    };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| invalid(var, e.to_string())),
            Err(_) => Ok(default),
        }
    };

    let parse_usize = |var: &str, default: usize| -> Result<usize, ConfigError> {
        match lookup(var) {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid(var, e.to_string())),
            Err(_) => Ok(default),
        }
    };

    // Radii and zoom levels must be finite and non-negative.
    let parse_non_negative = |var: &str, raw: &str| -> Result<f64, ConfigError> {
        let value = raw.trim().parse::<f64>().map_err(|e| invalid(var, e.to_string()))?;
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(invalid(var, format!("expected a non-negative number, got {value}")))
        }
    };

    let parse_f64 = |var: &str, default: f64| -> Result<f64, ConfigError> {
        match lookup(var) {
            Ok(raw) => parse_non_negative(var, &raw),
            Err(_) => Ok(default),
        }
    };

    let parse_opt_f64 = |var: &str| -> Result<Option<f64>, ConfigError> {
        match lookup(var) {
            Ok(raw) if !raw.trim().is_empty() => parse_non_negative(var, &raw).map(Some),
            _ => Ok(None),
        }
    };

    let env = parse_environment(&or_default("STOCKMAP_ENV", "development"))?;
    let log_level = or_default("STOCKMAP_LOG_LEVEL", "info");
    let feed = lookup("STOCKMAP_FEED").ok().filter(|s| !s.trim().is_empty());

    let locator = LocatorSettings {
        country: or_default("STOCKMAP_COUNTRY", &defaults.country),
        postcode_radius_km: parse_f64("STOCKMAP_POSTCODE_RADIUS_KM", defaults.postcode_radius_km)?,
        near_me_radius_km: parse_f64("STOCKMAP_NEAR_ME_RADIUS_KM", defaults.near_me_radius_km)?,
        geolocation_timeout: Duration::from_millis(parse_u64(
            "STOCKMAP_GEOLOCATION_TIMEOUT_MS",
            8_000,
        )?),
        frame_timeout: Duration::from_millis(parse_u64("STOCKMAP_FRAME_TIMEOUT_MS", 3_000)?),
        min_zoom: parse_f64("STOCKMAP_MIN_ZOOM", defaults.min_zoom)?,
        initial_max_zoom: parse_opt_f64("STOCKMAP_INITIAL_MAX_ZOOM")?,
        fit_padding_px: parse_u32("STOCKMAP_FIT_PADDING_PX", defaults.fit_padding_px)?,
        fit_duration_ms: parse_u64("STOCKMAP_FIT_DURATION_MS", defaults.fit_duration_ms)?,
        narrow_breakpoint_px: parse_u32(
            "STOCKMAP_NARROW_BREAKPOINT_PX",
            defaults.narrow_breakpoint_px,
        )?,
        mobile_max_items: parse_usize("STOCKMAP_MOBILE_MAX_ITEMS", defaults.mobile_max_items)?,
    };

    let geocoder_url = or_default("STOCKMAP_GEOCODER_URL", DEFAULT_GEOCODER_URL);
    let geocoder_api_key = lookup("STOCKMAP_GEOCODER_API_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty());
    let http_timeout_secs = parse_u64("STOCKMAP_HTTP_TIMEOUT_SECS", 10)?;
    let user_agent = or_default("STOCKMAP_USER_AGENT", DEFAULT_USER_AGENT);

    Ok(AppConfig {
        env,
        log_level,
        feed,
        locator,
        geocoder_url,
        geocoder_api_key,
        http_timeout_secs,
        user_agent,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "STOCKMAP_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

mod app_config;
mod config;
mod error;
pub mod geo;
pub mod registry;
pub mod stockist;
pub mod text;

pub use app_config::{AppConfig, Environment, LocatorSettings};
pub use config::{
    load_app_config, load_app_config_from_env, DEFAULT_GEOCODER_URL, DEFAULT_USER_AGENT,
};
pub use error::{ConfigError, CoreError};
pub use geo::{distance, distance_km, Bounds, Coordinate, EARTH_RADIUS_KM};
pub use registry::StockistRegistry;
pub use stockist::{make_stockist_key, Stockist, StockistRecord};
pub use text::{escape_for_display, normalize_region_code, title_case};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use stockmap_client::{
    backfill_coordinates, build_http_client, load_feed, FeedSource, GeocodingClient,
};
use stockmap_core::{AppConfig, Coordinate, StockistRegistry};
use stockmap_locator::{
    DeviceLocator, FilterCriteria, FixedDeviceLocator, HeadlessMap, LocationResolver,
    LocatorSession, MapSurface, NoDeviceLocator, NotEmbedded, Outcome,
};
use tracing_subscriber::EnvFilter;

mod render;

/// Starting camera before the first fit: the whole of Australia.
const INITIAL_CENTER: (f64, f64) = (-25.27, 133.77);
const INITIAL_ZOOM: f64 = 3.0;

#[derive(Debug, Parser)]
#[command(name = "stockmap")]
#[command(about = "Filter and locate stockists from a stockist feed")]
struct Cli {
    /// Stockist feed: a JSON/YAML file path or an http(s) URL
    #[arg(long, global = true, env = "STOCKMAP_FEED")]
    feed: Option<String>,
    /// Viewport width in pixels; below the breakpoint the list is truncated
    #[arg(long, global = true, default_value = "1024")]
    width: u32,
    /// Viewport height in pixels
    #[arg(long, global = true, default_value = "768")]
    height: u32,
    /// Expand a truncated list
    #[arg(long, global = true)]
    show_all: bool,
    /// Geocode feed records that lack coordinates before filtering
    #[arg(long, global = true)]
    backfill: bool,
    /// Print the view as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Filter by name, postcode and state, falling back to a postcode radius
    Search {
        /// Case-insensitive substring of the stockist name
        #[arg(long, default_value = "")]
        name: String,
        /// Postcode (substring match; geocoded when nothing matches)
        #[arg(long, default_value = "")]
        postcode: String,
        /// State or region code (e.g., NSW)
        #[arg(long, default_value = "")]
        state: String,
    },
    /// Show stockists near a position, as "use my location" would
    Near {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Overrides STOCKMAP_NEAR_ME_RADIUS_KM
        #[arg(long)]
        radius_km: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = stockmap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli, config).await
}

async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<()> {
    let geocoder = GeocodingClient::from_config(&config)?;
    let registry = load_registry(&cli, &config, &geocoder).await?;
    if registry.is_empty() {
        tracing::warn!("stockist registry is empty");
    }

    match cli.command {
        Commands::Search {
            ref name,
            ref postcode,
            ref state,
        } => {
            let criteria = FilterCriteria::new(name, postcode, state);
            let session = build_session(&cli, &config, registry, geocoder, NoDeviceLocator)?;
            session.start().await;
            let outcome = session.set_criteria(criteria).await;
            report(&cli, &session, outcome).await
        }
        Commands::Near {
            lat,
            lng,
            radius_km,
        } => {
            if let Some(radius_km) = radius_km {
                if !radius_km.is_finite() || radius_km < 0.0 {
                    bail!("--radius-km must be a non-negative number, got {radius_km}");
                }
                config.locator.near_me_radius_km = radius_km;
            }
            let position = Coordinate::new(lat, lng)?;
            let device = FixedDeviceLocator(position);
            let session = build_session(&cli, &config, registry, geocoder, device)?;
            session.start().await;
            let outcome = session.use_my_location().await;
            report(&cli, &session, outcome).await
        }
    }
}

async fn load_registry(
    cli: &Cli,
    config: &AppConfig,
    geocoder: &Option<GeocodingClient>,
) -> anyhow::Result<StockistRegistry> {
    let Some(location) = cli.feed.as_deref().or(config.feed.as_deref()) else {
        bail!("no stockist feed given; pass --feed or set STOCKMAP_FEED");
    };
    let source = FeedSource::parse(location)?;
    let http = build_http_client(config.http_timeout_secs, &config.user_agent)?;
    let mut records = load_feed(&source, &http)
        .await
        .with_context(|| format!("loading stockist feed from {source}"))?;

    if cli.backfill {
        if geocoder.is_none() {
            tracing::warn!("--backfill without STOCKMAP_GEOCODER_API_KEY drops unlocated records");
        }
        let (located, summary) =
            backfill_coordinates(records, geocoder, &config.locator.country).await;
        tracing::info!(
            geocoded = summary.geocoded,
            dropped = summary.dropped,
            "coordinate backfill finished"
        );
        records = located;
    }

    Ok(StockistRegistry::from_records(records))
}

fn build_session<D: DeviceLocator>(
    cli: &Cli,
    config: &AppConfig,
    registry: StockistRegistry,
    geocoder: Option<GeocodingClient>,
    device: D,
) -> anyhow::Result<LocatorSession<Option<GeocodingClient>, D, NotEmbedded, HeadlessMap>> {
    let settings = config.locator.clone();
    let resolver = LocationResolver::new(geocoder, device, NotEmbedded, &settings);
    let (lat, lng) = INITIAL_CENTER;
    let map = HeadlessMap::new(cli.width, cli.height, Coordinate::new(lat, lng)?, INITIAL_ZOOM);
    Ok(LocatorSession::new(registry, settings, resolver, map, cli.width))
}

async fn report<D: DeviceLocator>(
    cli: &Cli,
    session: &LocatorSession<Option<GeocodingClient>, D, NotEmbedded, HeadlessMap>,
    outcome: Outcome,
) -> anyhow::Result<()> {
    let mut view = match outcome {
        Outcome::Applied(view) => view,
        Outcome::LocationFailed(notice) => bail!(notice.message()),
        Outcome::Superseded => bail!("search was superseded before it completed"),
        Outcome::LocateInProgress => bail!("a location lookup is already in progress"),
    };
    if cli.show_all {
        view.list = session.show_all().await;
    }
    let (center, zoom) = session.with_map(|m| (m.center(), m.zoom())).await;

    let output = if cli.json {
        render::render_json(&view, center, zoom)?
    } else {
        render::render_text(&view, session.registry().len(), center, zoom)
    };
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests;

use stockmap_core::{LocatorSettings, StockistRecord};
use stockmap_locator::{
    direct_matches, nearby, render_list, FilterCriteria, Layout, Search, View, ViewportOutcome,
};

use super::*;

#[test]
fn parses_search_with_filters() {
    let cli = Cli::try_parse_from([
        "stockmap", "--feed", "feed.json", "search", "--name", "acme", "--state", "nsw",
    ])
    .expect("expected valid cli args");

    assert_eq!(cli.feed.as_deref(), Some("feed.json"));
    assert!(matches!(
        cli.command,
        Commands::Search { ref name, ref postcode, ref state }
            if name == "acme" && postcode.is_empty() && state == "nsw"
    ));
}

#[test]
fn parses_near_with_negative_latitude() {
    let cli = Cli::try_parse_from([
        "stockmap", "near", "--lat", "-33.87", "--lng", "151.21", "--radius-km", "2.5",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Commands::Near {
            lat,
            lng,
            radius_km,
        } => {
            assert!((lat + 33.87).abs() < 1e-9);
            assert!((lng - 151.21).abs() < 1e-9);
            assert_eq!(radius_km, Some(2.5));
        }
        Commands::Search { .. } => panic!("expected near"),
    }
}

#[test]
fn global_flags_follow_subcommand() {
    let cli = Cli::try_parse_from(["stockmap", "search", "--width", "375", "--show-all", "--json"])
        .expect("expected valid cli args");
    assert_eq!(cli.width, 375);
    assert!(cli.show_all);
    assert!(cli.json);
    assert!(!cli.backfill);
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["stockmap"]).is_err());
}

fn registry() -> StockistRegistry {
    StockistRegistry::from_records(vec![
        StockistRecord {
            id: Some("acme".into()),
            name: "acme".into(),
            address: Some("1 George St".into()),
            city: Some("sydney".into()),
            state: Some("NSW".into()),
            postcode: Some("2000".into()),
            latitude: Some(-33.87),
            longitude: Some(151.21),
            ..StockistRecord::default()
        },
        StockistRecord {
            id: Some("beta".into()),
            name: "beta".into(),
            state: Some("VIC".into()),
            latitude: Some(-37.81),
            longitude: Some(144.96),
            ..StockistRecord::default()
        },
    ])
}

fn origin() -> Coordinate {
    Coordinate::new(-33.87, 151.21).unwrap()
}

#[test]
fn text_output_lists_entries_and_viewport() {
    let registry = registry();
    let criteria = FilterCriteria::new("", "", "NSW");
    let visible = direct_matches(&registry, &criteria);
    let view = View {
        search: Search::Criteria(criteria),
        list: render_list(&registry, &visible, Layout::Wide, 10, false),
        visible,
        layout: Layout::Wide,
        viewport: Some(ViewportOutcome::Floored {
            natural_zoom: 2.5,
            zoom: 4.0,
        }),
    };

    let text = render::render_text(&view, registry.len(), origin(), 4.0);

    assert!(text.starts_with("1 of 2 stockists, matching filters\n"), "{text}");
    assert!(text.contains("\nAcme\n  1 George St\n  Sydney NSW 2000\n"), "{text}");
    assert!(text.ends_with("viewport: zoom 4.0 (raised from 2.5) at -33.87000, 151.21000"));
}

#[test]
fn text_output_shows_distance_for_near_searches() {
    let registry = registry();
    let visible = nearby(&registry, origin(), 10.0);
    let view = View {
        search: Search::NearMe { origin: origin() },
        list: render_list(&registry, &visible, Layout::Wide, 10, false),
        visible,
        layout: Layout::Wide,
        viewport: Some(ViewportOutcome::Fitted { zoom: 12.0 }),
    };

    let text = render::render_text(&view, registry.len(), origin(), 12.0);

    assert!(text.contains("within 10 km of you"), "{text}");
    assert!(text.contains("Sydney NSW 2000 (0.0 km)"), "{text}");
    assert!(!text.contains("Beta"));
}

#[test]
fn empty_view_says_so_and_keeps_viewport() {
    let registry = registry();
    let criteria = FilterCriteria::new("", "9999", "");
    let visible = direct_matches(&registry, &criteria);
    let view = View {
        search: Search::Criteria(criteria),
        list: render_list(&registry, &visible, Layout::Wide, 10, false),
        visible,
        layout: Layout::Wide,
        viewport: None,
    };

    let text = render::render_text(&view, registry.len(), origin(), 6.5);

    assert!(text.starts_with("No stockists found."));
    assert!(text.contains("viewport: unchanged (zoom 6.5"));
}

#[test]
fn json_output_is_structured() {
    let registry = registry();
    let criteria = FilterCriteria::default();
    let visible = direct_matches(&registry, &criteria);
    let view = View {
        search: Search::Criteria(criteria),
        list: render_list(&registry, &visible, Layout::Narrow, 1, false),
        visible,
        layout: Layout::Narrow,
        viewport: Some(ViewportOutcome::Fitted { zoom: 5.0 }),
    };

    let json = render::render_json(&view, origin(), 5.0).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["view"]["layout"], "narrow");
    assert_eq!(value["view"]["search"]["kind"], "criteria");
    assert_eq!(value["view"]["list"]["show_all"]["total"], 2);
    assert_eq!(value["view"]["viewport"]["kind"], "fitted");
    assert_eq!(value["map"]["zoom"], 5.0);
}

#[tokio::test]
async fn missing_feed_is_reported() {
    let cli = Cli::try_parse_from(["stockmap", "search"]).expect("expected valid cli args");
    let config = AppConfig {
        feed: None,
        ..test_config()
    };
    // Only meaningful when STOCKMAP_FEED is not set in the test environment.
    if cli.feed.is_none() {
        let err = load_registry(&cli, &config, &None).await.unwrap_err();
        assert!(err.to_string().contains("no stockist feed"));
    }
}

#[test]
fn session_uses_configured_settings() {
    let cli = Cli::try_parse_from(["stockmap", "search", "--width", "375"]).unwrap();
    let config = test_config();
    let session = build_session(&cli, &config, registry(), None, NoDeviceLocator).unwrap();
    assert_eq!(session.registry().len(), 2);
}

fn test_config() -> AppConfig {
    AppConfig {
        env: stockmap_core::Environment::Test,
        log_level: "debug".to_string(),
        feed: None,
        locator: LocatorSettings::default(),
        geocoder_url: "https://geo.example.com/".to_string(),
        geocoder_api_key: None,
        http_timeout_secs: 5,
        user_agent: "stockmap-test".to_string(),
    }
}

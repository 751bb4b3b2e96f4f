//! Terminal output for a committed [`View`].

use std::fmt::Write as _;

use stockmap_core::Coordinate;
use stockmap_locator::{MatchMode, View, ViewportOutcome};

fn describe_mode(mode: MatchMode) -> String {
    match mode {
        MatchMode::Direct => "matching filters".to_string(),
        MatchMode::RadiusFallback { radius_km, .. } => {
            format!("within {radius_km} km of the postcode")
        }
        MatchMode::Nearby { radius_km, .. } => format!("within {radius_km} km of you"),
    }
}

fn describe_viewport(viewport: Option<ViewportOutcome>, center: Coordinate, zoom: f64) -> String {
    let at = format!("{:.5}, {:.5}", center.latitude, center.longitude);
    match viewport {
        None => format!("viewport: unchanged (zoom {zoom:.1} at {at})"),
        Some(ViewportOutcome::Fitted { zoom }) => format!("viewport: zoom {zoom:.1} at {at}"),
        Some(ViewportOutcome::Floored { natural_zoom, zoom }) => {
            format!("viewport: zoom {zoom:.1} (raised from {natural_zoom:.1}) at {at}")
        }
    }
}

pub(crate) fn render_text(view: &View, total: usize, center: Coordinate, zoom: f64) -> String {
    let mut out = String::new();
    let visible = view.visible.len();

    if visible == 0 {
        out.push_str("No stockists found.\n");
    } else {
        let _ = writeln!(
            out,
            "{visible} of {total} stockists, {}",
            describe_mode(view.visible.mode())
        );
        for entry in &view.list.entries {
            let _ = writeln!(out, "\n{}", entry.title);
            if !entry.address.is_empty() {
                let _ = writeln!(out, "  {}", entry.address);
            }
            match (entry.locality.is_empty(), entry.distance_label()) {
                (false, Some(distance)) => {
                    let _ = writeln!(out, "  {} ({distance})", entry.locality);
                }
                (false, None) => {
                    let _ = writeln!(out, "  {}", entry.locality);
                }
                (true, Some(distance)) => {
                    let _ = writeln!(out, "  {distance}");
                }
                (true, None) => {}
            }
        }
        if let Some(show_all) = view.list.show_all {
            let _ = writeln!(out, "\n[{}]", show_all.label());
        }
    }

    out.push('\n');
    out.push_str(&describe_viewport(view.viewport, center, zoom));
    out
}

pub(crate) fn render_json(view: &View, center: Coordinate, zoom: f64) -> anyhow::Result<String> {
    let body = serde_json::json!({
        "view": view,
        "map": { "center": center, "zoom": zoom },
    });
    Ok(serde_json::to_string_pretty(&body)?)
}

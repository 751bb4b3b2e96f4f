//! Keeps markers and the sidebar list in step with the current
//! [`VisibleSet`].
//!
//! Markers: every registry stockist is shown iff it is in the set. List:
//! rebuilt in full on every change, truncated on narrow layouts until the
//! visitor asks for everything.

use std::collections::HashSet;

use serde::Serialize;
use stockmap_core::{
    distance_km, escape_for_display, title_case, LocatorSettings, Stockist, StockistRegistry,
};

use crate::filter::VisibleSet;
use crate::viewport::MapSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Narrow,
    Wide,
}

impl Layout {
    #[must_use]
    pub fn classify(width_px: u32, breakpoint_px: u32) -> Self {
        if width_px < breakpoint_px {
            Self::Narrow
        } else {
            Self::Wide
        }
    }
}

/// One sidebar row, with display strings already escaped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEntry {
    pub id: String,
    pub title: String,
    pub address: String,
    /// `"{city} {STATE} {postcode}"`, blanks skipped.
    pub locality: String,
    /// Distance from the search origin when the search had one.
    pub distance_km: Option<f64>,
}

impl ListEntry {
    fn from_stockist(stockist: &Stockist, visible: &VisibleSet) -> Self {
        let locality = [
            title_case(&stockist.city),
            stockist.state.clone(),
            stockist.postcode.clone(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Self {
            id: stockist.id.clone(),
            title: escape_for_display(&title_case(&stockist.name)),
            address: escape_for_display(&stockist.address),
            locality: escape_for_display(&locality),
            distance_km: visible
                .origin()
                .map(|origin| distance_km(origin, stockist.coordinate)),
        }
    }

    #[must_use]
    pub fn distance_label(&self) -> Option<String> {
        self.distance_km.map(|d| format!("{d:.1} km"))
    }
}

/// The trailing "show all" control shown under a truncated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShowAll {
    pub total: usize,
}

impl ShowAll {
    #[must_use]
    pub fn label(&self) -> String {
        format!("Show all ({})", self.total)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedList {
    pub entries: Vec<ListEntry>,
    pub show_all: Option<ShowAll>,
}

/// Builds the sidebar list for `visible`.
///
/// Truncates to `max_items` with a [`ShowAll`] affordance only on a narrow
/// layout that has not been expanded.
#[must_use]
pub fn render_list(
    registry: &StockistRegistry,
    visible: &VisibleSet,
    layout: Layout,
    max_items: usize,
    expanded: bool,
) -> RenderedList {
    let total = visible.len();
    let truncate = layout == Layout::Narrow && !expanded && total > max_items;
    let limit = if truncate { max_items } else { total };

    RenderedList {
        entries: visible
            .stockists(registry)
            .take(limit)
            .map(|s| ListEntry::from_stockist(s, visible))
            .collect(),
        show_all: truncate.then_some(ShowAll { total }),
    }
}

/// Stateful side of the sync: current layout and whether the visitor has
/// expanded the list.
#[derive(Debug, Clone)]
pub struct Presentation {
    layout: Layout,
    expanded: bool,
    breakpoint_px: u32,
    max_items: usize,
}

impl Presentation {
    #[must_use]
    pub fn new(settings: &LocatorSettings, width_px: u32) -> Self {
        Self {
            layout: Layout::classify(width_px, settings.narrow_breakpoint_px),
            expanded: false,
            breakpoint_px: settings.narrow_breakpoint_px,
            max_items: settings.mobile_max_items,
        }
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Reclassifies for a new viewport width.
    pub fn resize(&mut self, width_px: u32) -> Layout {
        self.layout = Layout::classify(width_px, self.breakpoint_px);
        self.layout
    }

    /// Re-truncates the list; called when the search itself changes.
    pub fn collapse(&mut self) {
        self.expanded = false;
    }

    /// Pushes marker visibility for the whole registry and rebuilds the list.
    pub fn sync<M: MapSurface>(
        &self,
        registry: &StockistRegistry,
        visible: &VisibleSet,
        surface: &mut M,
    ) -> RenderedList {
        let shown: HashSet<&str> = visible.ids().iter().map(String::as_str).collect();
        for stockist in registry {
            surface.set_marker_visible(&stockist.id, shown.contains(stockist.id.as_str()));
        }
        self.render(registry, visible)
    }

    /// Activates "show all": the full list renders and the affordance goes.
    pub fn expand(&mut self, registry: &StockistRegistry, visible: &VisibleSet) -> RenderedList {
        self.expanded = true;
        self.render(registry, visible)
    }

    #[must_use]
    pub fn render(&self, registry: &StockistRegistry, visible: &VisibleSet) -> RenderedList {
        render_list(registry, visible, self.layout, self.max_items, self.expanded)
    }
}

#[cfg(test)]
mod tests {
    use stockmap_core::{Coordinate, StockistRecord};

    use super::*;
    use crate::filter::{direct_matches, nearby, FilterCriteria};
    use crate::viewport::HeadlessMap;

    fn registry(n: usize) -> StockistRegistry {
        StockistRegistry::from_records((0..n).map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let offset = i as f64 * 0.01;
            StockistRecord {
                id: Some(format!("s{i}")),
                name: format!("store {i}"),
                city: Some("sydney".to_string()),
                state: Some("NSW".to_string()),
                postcode: Some("2000".to_string()),
                latitude: Some(-33.87 + offset),
                longitude: Some(151.21),
                ..StockistRecord::default()
            }
        }))
    }

    fn all(r: &StockistRegistry) -> VisibleSet {
        direct_matches(r, &FilterCriteria::default())
    }

    #[test]
    fn layout_breakpoint_is_exclusive() {
        assert_eq!(Layout::classify(767, 768), Layout::Narrow);
        assert_eq!(Layout::classify(768, 768), Layout::Wide);
    }

    #[test]
    fn narrow_layout_truncates_to_max_items_with_total() {
        let r = registry(15);
        let list = render_list(&r, &all(&r), Layout::Narrow, 10, false);
        assert_eq!(list.entries.len(), 10);
        let show_all = list.show_all.unwrap();
        assert_eq!(show_all.total, 15);
        assert_eq!(show_all.label(), "Show all (15)");
    }

    #[test]
    fn expanding_renders_everything_and_drops_affordance() {
        let r = registry(15);
        let visible = all(&r);
        let mut presentation = Presentation::new(&LocatorSettings::default(), 375);
        assert_eq!(presentation.render(&r, &visible).entries.len(), 10);

        let list = presentation.expand(&r, &visible);
        assert_eq!(list.entries.len(), 15);
        assert!(list.show_all.is_none());
    }

    #[test]
    fn wide_layout_never_truncates() {
        let r = registry(15);
        let list = render_list(&r, &all(&r), Layout::Wide, 10, false);
        assert_eq!(list.entries.len(), 15);
        assert!(list.show_all.is_none());
    }

    #[test]
    fn exactly_max_items_has_no_affordance() {
        let r = registry(10);
        let list = render_list(&r, &all(&r), Layout::Narrow, 10, false);
        assert_eq!(list.entries.len(), 10);
        assert!(list.show_all.is_none());
    }

    #[test]
    fn list_follows_visible_order() {
        let r = registry(3);
        let list = render_list(&r, &all(&r), Layout::Wide, 10, false);
        let ids: Vec<_> = list.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["s0", "s1", "s2"]);
        assert_eq!(list.entries[0].title, "Store 0");
        assert_eq!(list.entries[0].locality, "Sydney NSW 2000");
        assert!(list.entries[0].distance_km.is_none());
    }

    #[test]
    fn entries_carry_distance_for_proximity_searches() {
        let r = registry(2);
        let origin = Coordinate::new(-33.87, 151.21).unwrap();
        let list = render_list(&r, &nearby(&r, origin, 5.0), Layout::Wide, 10, false);
        assert_eq!(list.entries[0].distance_label().as_deref(), Some("0.0 km"));
        assert_eq!(list.entries[1].distance_label().as_deref(), Some("1.1 km"));
    }

    #[test]
    fn sync_sets_marker_visibility_for_every_stockist() {
        let r = registry(4);
        let visible = direct_matches(&r, &FilterCriteria::new("store 1", "", ""));
        let presentation = Presentation::new(&LocatorSettings::default(), 1024);
        let mut map = HeadlessMap::new(1024, 768, Coordinate::new(-33.87, 151.21).unwrap(), 10.0);

        presentation.sync(&r, &visible, &mut map);

        assert_eq!(map.marker_visible("s1"), Some(true));
        for id in ["s0", "s2", "s3"] {
            assert_eq!(map.marker_visible(id), Some(false), "{id} should be hidden");
        }
        assert_eq!(map.visible_marker_count(), 1);
    }

    #[test]
    fn display_strings_are_escaped() {
        let r = StockistRegistry::from_records(vec![StockistRecord {
            id: Some("x".into()),
            name: "tom & jerry's".into(),
            address: Some("<b>1</b> Main St".into()),
            latitude: Some(0.0),
            longitude: Some(0.0),
            ..StockistRecord::default()
        }]);
        let list = render_list(&r, &all(&r), Layout::Wide, 10, false);
        assert_eq!(list.entries[0].title, "Tom &amp; Jerry&#39;s");
        assert_eq!(list.entries[0].address, "&lt;b&gt;1&lt;/b&gt; Main St");
        assert_eq!(list.entries[0].locality, "");
    }
}

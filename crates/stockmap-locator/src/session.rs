//! The per-page locator session.
//!
//! Owns the registry, the resolver and the map, and is the only thing that
//! mutates marker visibility or the viewport. Every triggering event takes a
//! ticket from a monotonic generation counter; a result that finishes after a
//! newer event started is dropped as [`Outcome::Superseded`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use stockmap_core::{Coordinate, LocatorSettings, StockistRegistry};
use tokio::sync::Mutex;

use crate::filter::{self, FilterCriteria, VisibleSet};
use crate::presentation::{Layout, Presentation, RenderedList};
use crate::resolver::{
    DeviceLocator, FrameProxy, Geocoder, LocationQuery, LocationResolver, UnresolvedReason,
};
use crate::viewport::{MapSurface, ViewportController, ViewportOutcome};

/// The search currently driving the map, re-run on resize.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Search {
    Criteria(FilterCriteria),
    NearMe { origin: Coordinate },
}

/// What the visitor sees after a committed update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub search: Search,
    pub visible: VisibleSet,
    pub layout: Layout,
    pub list: RenderedList,
    /// `None` when nothing matched and the viewport stayed put.
    pub viewport: Option<ViewportOutcome>,
}

/// User-facing failure notice for "use my location".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub reason: UnresolvedReason,
}

impl Notice {
    #[must_use]
    pub fn message(&self) -> String {
        format!("We couldn't find your location: {}. Please try again.", self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied(View),
    /// A newer event started while this one was waiting; nothing changed.
    Superseded,
    /// Location lookup failed; the previous view is untouched.
    LocationFailed(Notice),
    /// "Use my location" is already in flight.
    LocateInProgress,
}

/// The latest event, which may still be waiting on the resolver.
#[derive(Debug, Clone)]
enum Requested {
    Search(Search),
    Locate,
}

struct SessionState<M> {
    map: M,
    viewport: ViewportController,
    presentation: Presentation,
    /// Last committed search.
    search: Search,
    requested: Requested,
    visible: VisibleSet,
    list: RenderedList,
    locate_enabled: bool,
    notice: Option<Notice>,
}

pub struct LocatorSession<G, D, F, M> {
    registry: StockistRegistry,
    settings: LocatorSettings,
    resolver: LocationResolver<G, D, F>,
    generation: AtomicU64,
    state: Mutex<SessionState<M>>,
}

impl<G, D, F, M> LocatorSession<G, D, F, M>
where
    G: Geocoder,
    D: DeviceLocator,
    F: FrameProxy,
    M: MapSurface,
{
    pub fn new(
        registry: StockistRegistry,
        settings: LocatorSettings,
        resolver: LocationResolver<G, D, F>,
        map: M,
        width_px: u32,
    ) -> Self {
        let state = SessionState {
            map,
            viewport: ViewportController::new(&settings),
            presentation: Presentation::new(&settings, width_px),
            search: Search::Criteria(FilterCriteria::default()),
            requested: Requested::Search(Search::Criteria(FilterCriteria::default())),
            visible: VisibleSet::empty(),
            list: RenderedList::default(),
            locate_enabled: true,
            notice: None,
        };
        Self {
            registry,
            settings,
            resolver,
            generation: AtomicU64::new(0),
            state: Mutex::new(state),
        }
    }

    pub fn registry(&self) -> &StockistRegistry {
        &self.registry
    }

    /// Takes a ticket. Callers hold the state lock so that `requested`
    /// always belongs to the newest ticket.
    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// First render: everything visible, framed with the initial zoom cap.
    pub async fn start(&self) -> Outcome {
        self.set_criteria(FilterCriteria::default()).await
    }

    /// Re-filters for new form input.
    pub async fn set_criteria(&self, criteria: FilterCriteria) -> Outcome {
        let ticket = {
            let mut state = self.state.lock().await;
            state.requested = Requested::Search(Search::Criteria(criteria.clone()));
            self.begin()
        };
        let visible = filter::apply_filters(
            &self.registry,
            &criteria,
            &self.resolver,
            self.settings.postcode_radius_km,
        )
        .await;

        let mut state = self.state.lock().await;
        if !self.is_current(ticket) {
            tracing::debug!(ticket, "discarding superseded filter result");
            return Outcome::Superseded;
        }
        state.presentation.collapse();
        Outcome::Applied(self.commit(&mut state, Search::Criteria(criteria), visible))
    }

    /// "Use my location": shows stockists within the near-me radius of the
    /// device, replacing any text filters.
    ///
    /// On failure the previous view stays and a [`Notice`] is raised. The
    /// action is re-enabled either way.
    pub async fn use_my_location(&self) -> Outcome {
        let ticket = {
            let mut state = self.state.lock().await;
            if !state.locate_enabled {
                return Outcome::LocateInProgress;
            }
            state.locate_enabled = false;
            state.notice = None;
            state.requested = Requested::Locate;
            self.begin()
        };

        let query = self.resolver.locate_device().await;

        let mut state = self.state.lock().await;
        state.locate_enabled = true;
        match query {
            LocationQuery::Resolved(origin) => {
                if !self.is_current(ticket) {
                    tracing::debug!(ticket, "discarding superseded device location");
                    return Outcome::Superseded;
                }
                let visible =
                    filter::nearby(&self.registry, origin, self.settings.near_me_radius_km);
                let search = Search::NearMe { origin };
                state.requested = Requested::Search(search.clone());
                state.presentation.collapse();
                Outcome::Applied(self.commit(&mut state, search, visible))
            }
            LocationQuery::Unresolved(reason) => {
                if self.is_current(ticket) {
                    let committed = state.search.clone();
                    state.requested = Requested::Search(committed);
                }
                let notice = Notice { reason };
                state.notice = Some(notice);
                Outcome::LocationFailed(notice)
            }
        }
    }

    /// Reclassifies the layout and re-runs the latest requested search, so a
    /// radius fallback or near-me result survives the resize and a filter
    /// still waiting on the geocoder is not replaced by an older one.
    ///
    /// While "use my location" is in flight the committed view is only
    /// re-laid out; the pending lookup commits over it when it lands.
    pub async fn resize(&self, width_px: u32, height_px: u32) -> Outcome {
        let (ticket, search) = {
            let mut state = self.state.lock().await;
            state.map.resize(width_px, height_px);
            let layout = state.presentation.resize(width_px);
            tracing::debug!(width_px, ?layout, "viewport resized");
            match state.requested.clone() {
                Requested::Search(search) => (self.begin(), search),
                Requested::Locate => {
                    let search = state.search.clone();
                    let visible = state.visible.clone();
                    return Outcome::Applied(self.commit(&mut state, search, visible));
                }
            }
        };

        let visible = match &search {
            Search::Criteria(criteria) => {
                filter::apply_filters(
                    &self.registry,
                    criteria,
                    &self.resolver,
                    self.settings.postcode_radius_km,
                )
                .await
            }
            Search::NearMe { origin } => {
                filter::nearby(&self.registry, *origin, self.settings.near_me_radius_km)
            }
        };

        let mut state = self.state.lock().await;
        if !self.is_current(ticket) {
            return Outcome::Superseded;
        }
        Outcome::Applied(self.commit(&mut state, search, visible))
    }

    /// Activates the "show all" affordance.
    pub async fn show_all(&self) -> RenderedList {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.list = state.presentation.expand(&self.registry, &state.visible);
        state.list.clone()
    }

    pub async fn visible(&self) -> VisibleSet {
        self.state.lock().await.visible.clone()
    }

    pub async fn list(&self) -> RenderedList {
        self.state.lock().await.list.clone()
    }

    pub async fn locate_enabled(&self) -> bool {
        self.state.lock().await.locate_enabled
    }

    pub async fn take_notice(&self) -> Option<Notice> {
        self.state.lock().await.notice.take()
    }

    /// Read access to the map surface.
    pub async fn with_map<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&self.state.lock().await.map)
    }

    fn commit(&self, state: &mut SessionState<M>, search: Search, visible: VisibleSet) -> View {
        let list = state.presentation.sync(&self.registry, &visible, &mut state.map);

        let mut viewport = None;
        if let Some(command) = state.viewport.frame(&visible.coordinates(&self.registry)) {
            viewport = Some(state.viewport.apply(&mut state.map, &command));
        }

        tracing::debug!(
            visible = visible.len(),
            listed = list.entries.len(),
            truncated = list.show_all.is_some(),
            "view committed"
        );

        state.search = search.clone();
        state.visible = visible.clone();
        state.list = list.clone();

        View {
            search,
            visible,
            layout: state.presentation.layout(),
            list,
            viewport,
        }
    }
}

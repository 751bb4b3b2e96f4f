//! Store-locator engine: filtering, location resolution, viewport framing and
//! list/marker sync over a [`stockmap_core::StockistRegistry`].

pub mod error;
pub mod filter;
pub mod presentation;
pub mod resolver;
pub mod session;
pub mod viewport;

pub use error::ResolveError;
pub use filter::{apply_filters, direct_matches, nearby, FilterCriteria, MatchMode, VisibleSet};
pub use presentation::{render_list, Layout, ListEntry, Presentation, RenderedList, ShowAll};
pub use resolver::{
    ChannelFrameProxy, DeviceLocator, FixedDeviceLocator, FrameProxy, FrameRequest, Geocoder,
    LocationQuery, LocationResolver, NoDeviceLocator, NotEmbedded, PositionOptions,
    UnresolvedReason,
};
pub use session::{LocatorSession, Notice, Outcome, Search, View};
pub use viewport::{
    fit_zoom, HeadlessMap, MapCommand, MapSurface, ViewportCommand, ViewportController,
    ViewportOutcome, MAX_MAP_ZOOM, SINGLE_POINT_MAX_ZOOM,
};

//! Framing visible stockists on the map.
//!
//! [`ViewportController::frame`] turns a set of coordinates into a fit
//! command; [`ViewportController::apply`] sends it to a [`MapSurface`] and then
//! enforces the zoom floor once the fit has settled.

use std::collections::HashMap;
use std::f64::consts::PI;

use serde::Serialize;
use stockmap_core::{Bounds, Coordinate, LocatorSettings};

/// Deepest zoom the rendering surface supports.
pub const MAX_MAP_ZOOM: f64 = 22.0;

/// Cap for a region that has collapsed to one point, which would otherwise
/// fit at [`MAX_MAP_ZOOM`].
pub const SINGLE_POINT_MAX_ZOOM: f64 = 16.0;

/// Pixel width of one world tile at zoom 0.
const TILE_SIZE_PX: f64 = 512.0;

/// Web Mercator stops here; beyond it the projection diverges.
const MAX_MERCATOR_LAT: f64 = 85.051_129;

/// The map rendering library, seen as a sink of viewport and marker commands.
///
/// Calls look synchronous but real surfaces animate; [`MapSurface::zoom`]
/// reports the zoom the last command settles at.
pub trait MapSurface {
    fn fit_bounds(
        &mut self,
        bounds: Bounds,
        padding_px: u32,
        duration_ms: u64,
        max_zoom: Option<f64>,
    );

    fn ease_to(&mut self, center: Coordinate, zoom: f64, duration_ms: u64);

    fn zoom(&self) -> f64;

    fn set_marker_visible(&mut self, id: &str, visible: bool);

    fn resize(&mut self, width_px: u32, height_px: u32);
}

/// A request to frame a bounding region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportCommand {
    pub bounds: Bounds,
    pub padding_px: u32,
    pub duration_ms: u64,
    /// Zoom-in cap: the configured initial cap on the first automatic fit,
    /// and at most [`SINGLE_POINT_MAX_ZOOM`] for a single point.
    pub max_zoom: Option<f64>,
}

/// Where the map ended up after [`ViewportController::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewportOutcome {
    Fitted { zoom: f64 },
    /// The natural fit was coarser than the floor, so the map eased in.
    Floored { natural_zoom: f64, zoom: f64 },
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    padding_px: u32,
    duration_ms: u64,
    min_zoom: f64,
    initial_max_zoom: Option<f64>,
    has_fitted: bool,
}

impl ViewportController {
    #[must_use]
    pub fn new(settings: &LocatorSettings) -> Self {
        Self {
            padding_px: settings.fit_padding_px,
            duration_ms: settings.fit_duration_ms,
            min_zoom: settings.min_zoom,
            initial_max_zoom: settings.initial_max_zoom,
            has_fitted: false,
        }
    }

    /// Fit command for `coords`, or `None` when there is nothing to frame and
    /// the viewport should stay where it is.
    #[must_use]
    pub fn frame(&self, coords: &[Coordinate]) -> Option<ViewportCommand> {
        let bounds = Bounds::from_coordinates(coords.iter().copied())?;
        let mut max_zoom = if self.has_fitted {
            None
        } else {
            self.initial_max_zoom
        };
        if bounds.is_point() {
            max_zoom = Some(max_zoom.map_or(SINGLE_POINT_MAX_ZOOM, |cap| {
                cap.min(SINGLE_POINT_MAX_ZOOM)
            }));
        }
        Some(ViewportCommand {
            bounds,
            padding_px: self.padding_px,
            duration_ms: self.duration_ms,
            max_zoom,
        })
    }

    /// Sends `command` to the surface, then eases to the floor zoom if the fit
    /// settled more zoomed-out than allowed.
    pub fn apply<M: MapSurface>(
        &mut self,
        surface: &mut M,
        command: &ViewportCommand,
    ) -> ViewportOutcome {
        surface.fit_bounds(
            command.bounds,
            command.padding_px,
            command.duration_ms,
            command.max_zoom,
        );
        self.has_fitted = true;

        let natural_zoom = surface.zoom();
        if natural_zoom < self.min_zoom {
            surface.ease_to(command.bounds.center(), self.min_zoom, self.duration_ms);
            tracing::debug!(natural_zoom, floor = self.min_zoom, "viewport zoom floored");
            ViewportOutcome::Floored {
                natural_zoom,
                zoom: self.min_zoom,
            }
        } else {
            ViewportOutcome::Fitted { zoom: natural_zoom }
        }
    }
}

fn mercator_x(longitude: f64) -> f64 {
    (longitude + 180.0) / 360.0
}

fn mercator_y(latitude: f64) -> f64 {
    let sin = latitude
        .clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT)
        .to_radians()
        .sin();
    0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * PI)
}

/// Web Mercator zoom at which `bounds` fits inside a `width_px` × `height_px`
/// viewport with `padding_px` on every side, capped at `max_zoom`.
///
/// A point-sized region fits at any zoom, so it lands on the cap.
#[must_use]
pub fn fit_zoom(
    bounds: &Bounds,
    width_px: u32,
    height_px: u32,
    padding_px: u32,
    max_zoom: f64,
) -> f64 {
    let ne = bounds.north_east;
    let sw = bounds.south_west;
    let span_x = (mercator_x(ne.longitude) - mercator_x(sw.longitude)).abs();
    let span_y = (mercator_y(sw.latitude) - mercator_y(ne.latitude)).abs();

    let usable = |size: u32| f64::from(size.saturating_sub(padding_px.saturating_mul(2)).max(1));
    let zoom_for = |span: f64, size: u32| {
        if span > 0.0 {
            (usable(size) / (span * TILE_SIZE_PX)).log2()
        } else {
            f64::INFINITY
        }
    };

    zoom_for(span_x, width_px)
        .min(zoom_for(span_y, height_px))
        .min(max_zoom)
        .max(0.0)
}

/// A recorded surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    FitBounds { bounds: Bounds, max_zoom: Option<f64> },
    EaseTo { center: Coordinate, zoom: f64 },
}

/// In-memory [`MapSurface`] for the command line and tests. Fits settle
/// instantly at [`fit_zoom`].
#[derive(Debug, Clone)]
pub struct HeadlessMap {
    width_px: u32,
    height_px: u32,
    center: Coordinate,
    zoom: f64,
    markers: HashMap<String, bool>,
    commands: Vec<MapCommand>,
}

impl HeadlessMap {
    #[must_use]
    pub fn new(width_px: u32, height_px: u32, center: Coordinate, zoom: f64) -> Self {
        Self {
            width_px,
            height_px,
            center,
            zoom,
            markers: HashMap::new(),
            commands: Vec::new(),
        }
    }

    #[must_use]
    pub fn center(&self) -> Coordinate {
        self.center
    }

    #[must_use]
    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    /// `None` if the marker was never touched.
    #[must_use]
    pub fn marker_visible(&self, id: &str) -> Option<bool> {
        self.markers.get(id).copied()
    }

    #[must_use]
    pub fn visible_marker_count(&self) -> usize {
        self.markers.values().filter(|v| **v).count()
    }

    #[must_use]
    pub fn commands(&self) -> &[MapCommand] {
        &self.commands
    }
}

impl MapSurface for HeadlessMap {
    fn fit_bounds(
        &mut self,
        bounds: Bounds,
        padding_px: u32,
        _duration_ms: u64,
        max_zoom: Option<f64>,
    ) {
        let cap = max_zoom.unwrap_or(MAX_MAP_ZOOM).min(MAX_MAP_ZOOM);
        self.zoom = fit_zoom(&bounds, self.width_px, self.height_px, padding_px, cap);
        self.center = bounds.center();
        self.commands.push(MapCommand::FitBounds { bounds, max_zoom });
    }

    fn ease_to(&mut self, center: Coordinate, zoom: f64, _duration_ms: u64) {
        self.center = center;
        self.zoom = zoom;
        self.commands.push(MapCommand::EaseTo { center, zoom });
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn set_marker_visible(&mut self, id: &str, visible: bool) {
        self.markers.insert(id.to_string(), visible);
    }

    fn resize(&mut self, width_px: u32, height_px: u32) {
        self.width_px = width_px;
        self.height_px = height_px;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn sydney() -> Coordinate {
        coord(-33.87, 151.21)
    }

    fn perth() -> Coordinate {
        coord(-31.95, 115.86)
    }

    fn start_map() -> HeadlessMap {
        HeadlessMap::new(1024, 768, coord(-25.27, 133.77), 3.0)
    }

    #[test]
    fn empty_frame_is_none_and_leaves_map_alone() {
        let controller = ViewportController::new(&LocatorSettings::default());
        let map = start_map();
        assert!(controller.frame(&[]).is_none());
        assert!(map.commands().is_empty());
        assert!((map.zoom() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn frame_uses_minimal_bounds_and_configured_padding() {
        let controller = ViewportController::new(&LocatorSettings::default());
        let cmd = controller.frame(&[sydney(), perth()]).unwrap();
        assert_eq!(cmd.bounds.south_west, coord(-33.87, 115.86));
        assert_eq!(cmd.bounds.north_east, coord(-31.95, 151.21));
        assert_eq!(cmd.padding_px, 50);
        assert_eq!(cmd.duration_ms, 1_000);
    }

    #[test]
    fn coarse_fit_is_raised_to_floor() {
        let settings = LocatorSettings {
            min_zoom: 6.0,
            ..LocatorSettings::default()
        };
        let mut controller = ViewportController::new(&settings);
        let mut map = start_map();
        let cmd = controller.frame(&[sydney(), perth()]).unwrap();

        let outcome = controller.apply(&mut map, &cmd);

        match outcome {
            ViewportOutcome::Floored { natural_zoom, zoom } => {
                assert!(natural_zoom < 6.0);
                assert!((zoom - 6.0).abs() < f64::EPSILON);
            }
            other @ ViewportOutcome::Fitted { .. } => panic!("expected floor, got {other:?}"),
        }
        assert!((map.zoom() - 6.0).abs() < f64::EPSILON);
        assert_eq!(map.center(), cmd.bounds.center());
        assert!(matches!(map.commands().last(), Some(MapCommand::EaseTo { .. })));
    }

    #[test]
    fn tight_fit_is_left_alone() {
        let mut controller = ViewportController::new(&LocatorSettings::default());
        let mut map = start_map();
        let cmd = controller
            .frame(&[sydney(), coord(-33.88, 151.22)])
            .unwrap();

        let outcome = controller.apply(&mut map, &cmd);

        assert!(matches!(outcome, ViewportOutcome::Fitted { zoom } if zoom > 10.0));
        assert_eq!(map.commands().len(), 1);
    }

    #[test]
    fn single_point_does_not_settle_at_country_zoom() {
        let mut controller = ViewportController::new(&LocatorSettings::default());
        let mut map = start_map();
        let cmd = controller.frame(&[sydney()]).unwrap();
        let outcome = controller.apply(&mut map, &cmd);
        assert!(matches!(outcome, ViewportOutcome::Fitted { zoom } if zoom >= 4.0));
    }

    #[test]
    fn single_point_stops_at_street_zoom() {
        let mut controller = ViewportController::new(&LocatorSettings::default());
        let mut map = start_map();

        let cmd = controller.frame(&[sydney(), sydney()]).unwrap();
        assert_eq!(cmd.max_zoom, Some(SINGLE_POINT_MAX_ZOOM));
        let outcome = controller.apply(&mut map, &cmd);

        assert_eq!(outcome, ViewportOutcome::Fitted { zoom: SINGLE_POINT_MAX_ZOOM });
        assert!(map.zoom() < MAX_MAP_ZOOM);

        // Two distinct points are not capped after the first fit.
        let pair = controller.frame(&[sydney(), perth()]).unwrap();
        assert_eq!(pair.max_zoom, None);
    }

    #[test]
    fn initial_cap_applies_only_to_first_fit() {
        let settings = LocatorSettings {
            initial_max_zoom: Some(14.0),
            ..LocatorSettings::default()
        };
        let mut controller = ViewportController::new(&settings);
        let mut map = start_map();

        let pair = [sydney(), coord(-33.871, 151.211)];
        let first = controller.frame(&pair).unwrap();
        assert_eq!(first.max_zoom, Some(14.0));
        controller.apply(&mut map, &first);
        assert!((map.zoom() - 14.0).abs() < f64::EPSILON);

        let second = controller.frame(&pair).unwrap();
        assert_eq!(second.max_zoom, None);
        controller.apply(&mut map, &second);
        assert!(map.zoom() > 14.0);
    }

    #[test]
    fn fit_zoom_narrower_viewport_zooms_out_further() {
        let bounds = Bounds::from_coordinates([sydney(), perth()]).unwrap();
        let wide = fit_zoom(&bounds, 1024, 768, 50, MAX_MAP_ZOOM);
        let narrow = fit_zoom(&bounds, 375, 667, 50, MAX_MAP_ZOOM);
        assert!(narrow < wide);
        // Sydney to Perth spans ~35 degrees of longitude.
        assert!(wide > 3.5 && wide < 5.0, "got {wide}");
    }

    #[test]
    fn fit_zoom_never_negative() {
        let bounds = Bounds::from_coordinates([coord(-80.0, -179.0), coord(80.0, 179.0)]).unwrap();
        assert!(fit_zoom(&bounds, 200, 200, 90, MAX_MAP_ZOOM) >= 0.0);
    }
}

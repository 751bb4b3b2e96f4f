//! Two-pass stockist matching.
//!
//! Pass 1 is a direct AND-match on name, postcode and state. Pass 2 runs
//! only when a postcode was typed and pass 1 came back empty: the postcode is
//! geocoded and every stockist within the fallback radius becomes visible,
//! regardless of the name and state filters.
//!
//! Results are always in registry order, including radius queries.

use serde::Serialize;
use stockmap_core::{distance_km, normalize_region_code, Coordinate, Stockist, StockistRegistry};

use crate::resolver::{DeviceLocator, FrameProxy, Geocoder, LocationQuery, LocationResolver};

/// The live search state, rebuilt from the form on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    /// Case-insensitive substring of the stockist name.
    pub name_pattern: String,
    /// Substring of the stockist postcode.
    pub postcode: String,
    /// Exact, normalized region code.
    pub state_code: String,
}

impl FilterCriteria {
    #[must_use]
    pub fn new(name_pattern: &str, postcode: &str, state_code: &str) -> Self {
        Self {
            name_pattern: name_pattern.trim().to_string(),
            postcode: postcode.trim().to_string(),
            state_code: normalize_region_code(state_code),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name_pattern.is_empty() && self.postcode.is_empty() && self.state_code.is_empty()
    }

    /// True when `stockist` satisfies all three predicates.
    #[must_use]
    pub fn matches(&self, stockist: &Stockist) -> bool {
        let name_ok = self.name_pattern.is_empty()
            || stockist
                .name
                .to_lowercase()
                .contains(&self.name_pattern.to_lowercase());
        let postcode_ok = self.postcode.is_empty() || stockist.postcode.contains(&self.postcode);
        let state_ok = self.state_code.is_empty() || stockist.state == self.state_code;
        name_ok && postcode_ok && state_ok
    }
}

/// How a [`VisibleSet`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchMode {
    Direct,
    RadiusFallback { origin: Coordinate, radius_km: f64 },
    Nearby { origin: Coordinate, radius_km: f64 },
}

/// Ordered ids of the stockists currently matching, in registry order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleSet {
    ids: Vec<String>,
    mode: MatchMode,
}

impl VisibleSet {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ids: Vec::new(),
            mode: MatchMode::Direct,
        }
    }

    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[must_use]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Point distances are measured from, for radius and near-me searches.
    #[must_use]
    pub fn origin(&self) -> Option<Coordinate> {
        match self.mode {
            MatchMode::Direct => None,
            MatchMode::RadiusFallback { origin, .. } | MatchMode::Nearby { origin, .. } => {
                Some(origin)
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|v| v == id)
    }

    /// Resolves the ids against `registry`, keeping order.
    pub fn stockists<'a>(
        &'a self,
        registry: &'a StockistRegistry,
    ) -> impl Iterator<Item = &'a Stockist> + 'a {
        self.ids.iter().filter_map(|id| registry.get(id))
    }

    /// Coordinates of every visible stockist, for viewport framing.
    #[must_use]
    pub fn coordinates(&self, registry: &StockistRegistry) -> Vec<Coordinate> {
        self.stockists(registry).map(|s| s.coordinate).collect()
    }
}

/// Pass 1: stockists satisfying every non-empty criterion.
#[must_use]
pub fn direct_matches(registry: &StockistRegistry, criteria: &FilterCriteria) -> VisibleSet {
    VisibleSet {
        ids: registry
            .iter()
            .filter(|s| criteria.matches(s))
            .map(|s| s.id.clone())
            .collect(),
        mode: MatchMode::Direct,
    }
}

/// Stockists within `radius_km` of `origin`, boundary inclusive. Text
/// filters play no part.
#[must_use]
pub fn nearby(registry: &StockistRegistry, origin: Coordinate, radius_km: f64) -> VisibleSet {
    VisibleSet {
        ids: within_radius(registry, origin, radius_km),
        mode: MatchMode::Nearby { origin, radius_km },
    }
}

fn within_radius(registry: &StockistRegistry, origin: Coordinate, radius_km: f64) -> Vec<String> {
    registry
        .iter()
        .filter(|s| distance_km(origin, s.coordinate) <= radius_km)
        .map(|s| s.id.clone())
        .collect()
}

/// Whether pass 2 runs: a postcode was typed and nothing matched directly.
#[must_use]
pub fn needs_radius_fallback(criteria: &FilterCriteria, direct: &VisibleSet) -> bool {
    !criteria.postcode.is_empty() && direct.is_empty()
}

/// Full two-pass filter.
///
/// An unresolved postcode leaves the set empty: "no results" is the final
/// answer, never "show everything".
pub async fn apply_filters<G, D, F>(
    registry: &StockistRegistry,
    criteria: &FilterCriteria,
    resolver: &LocationResolver<G, D, F>,
    fallback_radius_km: f64,
) -> VisibleSet
where
    G: Geocoder,
    D: DeviceLocator,
    F: FrameProxy,
{
    let direct = direct_matches(registry, criteria);
    if !needs_radius_fallback(criteria, &direct) {
        tracing::debug!(matches = direct.len(), "direct filter applied");
        return direct;
    }

    match resolver.resolve_postcode(&criteria.postcode).await {
        LocationQuery::Resolved(origin) => {
            let ids = within_radius(registry, origin, fallback_radius_km);
            tracing::debug!(
                postcode = %criteria.postcode,
                radius_km = fallback_radius_km,
                matches = ids.len(),
                "postcode radius fallback applied"
            );
            VisibleSet {
                ids,
                mode: MatchMode::RadiusFallback {
                    origin,
                    radius_km: fallback_radius_km,
                },
            }
        }
        LocationQuery::Unresolved(reason) => {
            tracing::debug!(postcode = %criteria.postcode, %reason, "postcode unresolved");
            direct
        }
    }
}

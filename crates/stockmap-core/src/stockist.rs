//! Stockist records as they arrive from the feed, and the validated form the
//! registry holds.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::Coordinate;
use crate::text::normalize_region_code;

/// One entry of the stockist feed, before validation.
///
/// Feeds exported from spreadsheets and the CRM are loose about types: ids
/// may be numbers, coordinates and postcodes may arrive quoted. Id, postcode
/// and coordinate values of any other type deserialize to `None`, a missing
/// name to `""` and `"tags": null` to no tags; validation drops the record
/// later. Records that still fail to deserialize are skipped by the feed
/// loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockistRecord {
    #[serde(default, deserialize_with = "de_opt_text")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "address1", alias = "address_line1")]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, alias = "province_code", alias = "region")]
    pub state: Option<String>,
    #[serde(
        default,
        alias = "zip",
        alias = "postal_code",
        deserialize_with = "de_opt_text"
    )]
    pub postcode: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, alias = "lat", deserialize_with = "de_opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lng", alias = "lon", deserialize_with = "de_opt_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "de_tags")]
    pub tags: Vec<String>,
}

impl StockistRecord {
    /// Single-line postal address used as a geocoding query.
    #[must_use]
    pub fn postal_address(&self) -> String {
        let locality = [self.city.as_deref(), self.state.as_deref(), self.postcode.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        [self.address.as_deref(), Some(locality.as_str()), self.country.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Loose>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        let text = match v {
            Loose::Int(n) => n.to_string(),
            Loose::Float(f) => f.to_string(),
            Loose::Text(s) => s.trim().to_string(),
            Loose::Other(_) => String::new(),
        };
        (!text.is_empty()).then_some(text)
    }))
}

fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Loose>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        #[allow(clippy::cast_precision_loss)]
        Loose::Int(n) => Some(n as f64),
        Loose::Float(f) => Some(f),
        Loose::Text(s) => s.trim().parse::<f64>().ok(),
        Loose::Other(_) => None,
    }))
}

fn de_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A located stockist. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stockist {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    /// Upper-cased region code, e.g. `"NSW"`.
    pub state: String,
    /// Kept as text so leading zeros survive (`"0800"`).
    pub postcode: String,
    pub country: String,
    pub coordinate: Coordinate,
    pub tags: Vec<String>,
}

impl Stockist {
    /// Validates a feed record. Returns `None` when the record has no usable
    /// coordinate or no name.
    #[must_use]
    pub fn from_record(record: StockistRecord) -> Option<Self> {
        let name = record.name.trim().to_string();
        if name.is_empty() {
            return None;
        }
        let coordinate = Coordinate::new(record.latitude?, record.longitude?).ok()?;
        let id = record
            .id
            .clone()
            .unwrap_or_else(|| make_stockist_key(&record));

        Some(Self {
            id,
            name,
            address: trimmed(record.address),
            city: trimmed(record.city),
            state: normalize_region_code(record.state.as_deref().unwrap_or("")),
            postcode: trimmed(record.postcode),
            country: trimmed(record.country),
            coordinate,
            tags: record.tags,
        })
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Stable id for records the feed did not assign one to.
///
/// SHA-256 over `name || city || state || postcode`, lower-case name/city,
/// upper-case state. Hex-encoded, so a reordered feed keeps the same ids.
#[must_use]
pub fn make_stockist_key(record: &StockistRecord) -> String {
    use sha2::{Digest, Sha256};
    let input = format!(
        "{}\x00{}\x00{}\x00{}",
        record.name.trim().to_lowercase(),
        record.city.as_deref().unwrap_or("").trim().to_lowercase(),
        normalize_region_code(record.state.as_deref().unwrap_or("")),
        record.postcode.as_deref().unwrap_or("").trim(),
    );
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: serde_json::Value) -> StockistRecord {
        serde_json::from_value(json).expect("record should deserialize")
    }

    #[test]
    fn loose_numeric_fields_are_accepted() {
        let r = record(serde_json::json!({
            "id": 42,
            "name": "Acme",
            "zip": "0800",
            "lat": "-12.46",
            "lng": 130.84
        }));
        assert_eq!(r.id.as_deref(), Some("42"));
        assert_eq!(r.postcode.as_deref(), Some("0800"));
        assert_eq!(r.latitude, Some(-12.46));
        assert_eq!(r.longitude, Some(130.84));
    }

    #[test]
    fn unparseable_coordinate_becomes_none() {
        let r = record(serde_json::json!({
            "name": "Acme",
            "latitude": "n/a",
            "longitude": null
        }));
        assert!(r.latitude.is_none());
        assert!(r.longitude.is_none());
        assert!(!r.has_coordinates());
    }

    #[test]
    fn odd_field_types_do_not_fail_the_record() {
        let r = record(serde_json::json!({
            "id": true,
            "zip": {"code": "2000"},
            "lat": [1.0],
            "lng": false,
            "tags": null
        }));
        assert!(r.id.is_none());
        assert!(r.postcode.is_none());
        assert!(!r.has_coordinates());
        assert!(r.tags.is_empty());
        assert!(r.name.is_empty());
        assert!(Stockist::from_record(r).is_none());
    }

    #[test]
    fn from_record_normalizes_state_and_keeps_leading_zeros() {
        let r = record(serde_json::json!({
            "id": "s-1",
            "name": "  Top End Grocer ",
            "state": " nt",
            "postcode": "0800",
            "latitude": -12.46,
            "longitude": 130.84
        }));
        let s = Stockist::from_record(r).unwrap();
        assert_eq!(s.name, "Top End Grocer");
        assert_eq!(s.state, "NT");
        assert_eq!(s.postcode, "0800");
    }

    #[test]
    fn from_record_rejects_missing_or_invalid_coordinates() {
        let missing = record(serde_json::json!({ "name": "Acme", "latitude": -33.0 }));
        assert!(Stockist::from_record(missing).is_none());

        let out_of_range = record(serde_json::json!({
            "name": "Acme", "latitude": -133.0, "longitude": 151.0
        }));
        assert!(Stockist::from_record(out_of_range).is_none());
    }

    #[test]
    fn from_record_rejects_blank_name() {
        let r = record(serde_json::json!({ "name": "  ", "latitude": 1.0, "longitude": 1.0 }));
        assert!(Stockist::from_record(r).is_none());
    }

    #[test]
    fn missing_id_falls_back_to_stable_key() {
        let json = serde_json::json!({
            "name": "Acme", "city": "Sydney", "state": "nsw", "postcode": "2000",
            "latitude": -33.87, "longitude": 151.21
        });
        let a = Stockist::from_record(record(json.clone())).unwrap();
        let b = Stockist::from_record(record(json)).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 64);
    }

    #[test]
    fn stockist_key_ignores_case_and_whitespace() {
        let a = record(serde_json::json!({ "name": "ACME ", "city": "sydney", "state": "NSW" }));
        let b = record(serde_json::json!({ "name": "acme", "city": " Sydney", "state": "nsw" }));
        assert_eq!(make_stockist_key(&a), make_stockist_key(&b));
    }

    #[test]
    fn postal_address_skips_blank_parts() {
        let r = record(serde_json::json!({
            "name": "Acme",
            "address": "1 George St",
            "city": "Sydney",
            "state": "NSW",
            "postcode": "2000",
            "country": "Australia"
        }));
        assert_eq!(r.postal_address(), "1 George St, Sydney NSW 2000, Australia");

        let sparse = record(serde_json::json!({ "name": "Acme", "postcode": "3000" }));
        assert_eq!(sparse.postal_address(), "3000");
    }

    #[test]
    fn yaml_feed_entries_deserialize() {
        let yaml = "name: Beta\npostcode: 3000\nlat: -37.81\nlng: 144.96\n";
        let r: StockistRecord = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(r.postcode.as_deref(), Some("3000"));
        assert!(r.has_coordinates());
    }
}

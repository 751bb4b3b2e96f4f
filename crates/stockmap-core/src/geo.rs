//! Great-circle distance and bounding regions over WGS84 coordinates.
//!
//! Everything here is pure: no I/O, no logging, no allocation beyond the
//! returned values.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated latitude/longitude pair in decimal degrees.
///
/// Deserialization goes through [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Builds a coordinate, rejecting NaN/infinite values and anything outside
    /// `[-90, 90]` latitude or `[-180, 180]` longitude.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinate`] when either component is out
    /// of range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        if is_valid_latitude(latitude) && is_valid_longitude(longitude) {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(CoreError::InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoreError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

fn is_valid_latitude(value: f64) -> bool {
    value.is_finite() && (-90.0..=90.0).contains(&value)
}

fn is_valid_longitude(value: f64) -> bool {
    value.is_finite() && (-180.0..=180.0).contains(&value)
}

/// Haversine distance in kilometres between two points given in degrees.
///
/// Deltas are taken as absolute values so the result is bit-for-bit
/// symmetric in its arguments.
#[must_use]
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).abs().to_radians();
    let d_lon = (lon2 - lon1).abs().to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1.0 for antipodal points.
    let c = 2.0 * a.min(1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// [`distance`] over two [`Coordinate`]s.
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Axis-aligned bounding region, south-west and north-east corners.
///
/// Does not handle sets that straddle the antimeridian; stockist feeds are
/// scoped to a single country.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    /// Smallest region containing every coordinate, or `None` for an empty
    /// input.
    pub fn from_coordinates<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            south_west: first,
            north_east: first,
        };
        for c in iter {
            bounds.south_west.latitude = bounds.south_west.latitude.min(c.latitude);
            bounds.south_west.longitude = bounds.south_west.longitude.min(c.longitude);
            bounds.north_east.latitude = bounds.north_east.latitude.max(c.latitude);
            bounds.north_east.longitude = bounds.north_east.longitude.max(c.longitude);
        }
        Some(bounds)
    }

    #[must_use]
    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: (self.south_west.latitude + self.north_east.latitude) / 2.0,
            longitude: (self.south_west.longitude + self.north_east.longitude) / 2.0,
        }
    }

    /// True when the region has collapsed to a single point.
    #[must_use]
    pub fn is_point(&self) -> bool {
        self.south_west == self.north_east
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYDNEY: (f64, f64) = (-33.87, 151.21);
    const MELBOURNE: (f64, f64) = (-37.81, 144.96);

    #[test]
    fn distance_is_zero_for_identical_points() {
        assert_eq!(distance(SYDNEY.0, SYDNEY.1, SYDNEY.0, SYDNEY.1), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance(SYDNEY.0, SYDNEY.1, MELBOURNE.0, MELBOURNE.1);
        let back = distance(MELBOURNE.0, MELBOURNE.1, SYDNEY.0, SYDNEY.1);
        assert_eq!(there, back);
    }

    #[test]
    fn sydney_to_melbourne_is_about_713_km() {
        let d = distance(SYDNEY.0, SYDNEY.1, MELBOURNE.0, MELBOURNE.1);
        assert!((d - 713.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn antipodal_points_do_not_produce_nan() {
        let d = distance(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn coordinate_rejects_out_of_range_and_nan() {
        assert!(Coordinate::new(-33.87, 151.21).is_ok());
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn deserializing_validates_range() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude": -33.87, "longitude": 151.21}"#).unwrap();
        assert_eq!(ok, Coordinate::new(-33.87, 151.21).unwrap());

        let err = serde_json::from_str::<Coordinate>(r#"{"latitude": 123.0, "longitude": 0.0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("invalid coordinate"), "{err}");
    }

    #[test]
    fn bounds_of_empty_input_is_none() {
        assert!(Bounds::from_coordinates(Vec::new()).is_none());
    }

    #[test]
    fn bounds_cover_all_points() {
        let coords = vec![
            Coordinate::new(SYDNEY.0, SYDNEY.1).unwrap(),
            Coordinate::new(MELBOURNE.0, MELBOURNE.1).unwrap(),
            Coordinate::new(-27.47, 153.03).unwrap(),
        ];
        let b = Bounds::from_coordinates(coords).unwrap();
        assert_eq!(b.south_west.latitude, -37.81);
        assert_eq!(b.south_west.longitude, 144.96);
        assert_eq!(b.north_east.latitude, -27.47);
        assert_eq!(b.north_east.longitude, 153.03);
        assert!(!b.is_point());
    }

    #[test]
    fn single_point_bounds_collapse() {
        let c = Coordinate::new(SYDNEY.0, SYDNEY.1).unwrap();
        let b = Bounds::from_coordinates([c]).unwrap();
        assert!(b.is_point());
        assert_eq!(b.center(), c);
    }
}

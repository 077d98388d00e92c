//! Geographic value types shared by search and persistence.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A validated latitude/longitude pair in decimal degrees.
///
/// Construction always checks the ranges, so a `Coordinate` in hand is
/// guaranteed to satisfy `lat ∈ [-90, 90]` and `lng ∈ [-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoreError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lng)
    }
}

impl Coordinate {
    /// Creates a coordinate, rejecting out-of-range or non-finite components.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::LatitudeOutOfRange`] or
    /// [`CoreError::LongitudeOutOfRange`].
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoreError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoreError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(CoreError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    #[must_use]
    pub fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lng(self) -> f64 {
        self.lng
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

/// The raw `location` field of a provider record, before any parsing.
///
/// Providers enter their location however the profile form allowed: a
/// structured object, a `"lat,lng"` string, a JSON string, or an address.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LocationSpec {
    #[default]
    Absent,
    Structured(serde_json::Map<String, serde_json::Value>),
    Text(String),
}

impl From<serde_json::Value> for LocationSpec {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => LocationSpec::Absent,
            serde_json::Value::Object(map) => LocationSpec::Structured(map),
            serde_json::Value::String(s) => LocationSpec::Text(s),
            other => LocationSpec::Text(other.to_string()),
        }
    }
}

impl From<Option<serde_json::Value>> for LocationSpec {
    fn from(value: Option<serde_json::Value>) -> Self {
        value.map_or(LocationSpec::Absent, LocationSpec::from)
    }
}

impl From<&str> for LocationSpec {
    fn from(value: &str) -> Self {
        LocationSpec::Text(value.to_string())
    }
}

impl From<Coordinate> for LocationSpec {
    fn from(coord: Coordinate) -> Self {
        let mut map = serde_json::Map::new();
        map.insert("lat".to_string(), coord.lat.into());
        map.insert("lng".to_string(), coord.lng.into());
        LocationSpec::Structured(map)
    }
}

impl LocationSpec {
    /// Render back to the JSON shape stored in the `location` column.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            LocationSpec::Absent => serde_json::Value::Null,
            LocationSpec::Structured(map) => serde_json::Value::Object(map.clone()),
            LocationSpec::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl Serialize for LocationSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LocationSpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<serde_json::Value>::deserialize(deserializer)?.into())
    }
}

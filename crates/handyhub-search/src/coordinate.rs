//! Total parsing of raw provider locations into [`Coordinate`]s.
//!
//! Rules are tried in a fixed order and the first success wins:
//!
//! 1. structured object with `lat`/`latitude` and `lng`/`longitude`
//! 2. `"lat,lng"`
//! 3. `"lat lng"`
//! 4. JSON text, then rule 1 on the decoded object
//!
//! A field that is not numeric, or a pair outside the valid ranges, fails
//! that rule and parsing moves on. Nothing here panics or returns an error.

use handyhub_core::{Coordinate, LocationSpec};
use serde_json::{Map, Value};

/// Parse a raw location into a coordinate, or `None` if no rule applies.
#[must_use]
pub fn parse_coordinate(raw: &LocationSpec) -> Option<Coordinate> {
    match raw {
        LocationSpec::Absent => None,
        LocationSpec::Structured(map) => from_object(map),
        LocationSpec::Text(text) => parse_text(text),
    }
}

/// Parse free text using the delimited and JSON rules.
#[must_use]
pub fn parse_text(text: &str) -> Option<Coordinate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    from_delimited(text, ',')
        .or_else(|| from_whitespace(text))
        .or_else(|| from_json(text))
}

fn from_object(map: &Map<String, Value>) -> Option<Coordinate> {
    let lat = map
        .get("lat")
        .or_else(|| map.get("latitude"))
        .and_then(value_as_f64)?;
    let lng = map
        .get("lng")
        .or_else(|| map.get("longitude"))
        .and_then(value_as_f64)?;
    Coordinate::new(lat, lng).ok()
}

fn from_delimited(text: &str, delimiter: char) -> Option<Coordinate> {
    let mut parts = text.split(delimiter);
    let lat = parts.next()?;
    let lng = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    pair(lat, lng)
}

fn from_whitespace(text: &str) -> Option<Coordinate> {
    let mut parts = text.split_whitespace();
    let lat = parts.next()?;
    let lng = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    pair(lat, lng)
}

fn from_json(text: &str) -> Option<Coordinate> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => from_object(&map),
        _ => None,
    }
}

fn pair(lat: &str, lng: &str) -> Option<Coordinate> {
    let lat = lat.trim().parse::<f64>().ok()?;
    let lng = lng.trim().parse::<f64>().ok()?;
    Coordinate::new(lat, lng).ok()
}

fn value_as_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(value: Value) -> LocationSpec {
        LocationSpec::from(value)
    }

    fn text(s: &str) -> LocationSpec {
        LocationSpec::Text(s.to_string())
    }

    fn expected() -> Coordinate {
        Coordinate::new(-29.8587, 31.0218).expect("valid coordinate")
    }

    #[test]
    fn all_supported_shapes_agree() {
        assert_eq!(parse_coordinate(&text("-29.8587, 31.0218")), Some(expected()));
        assert_eq!(parse_coordinate(&text("-29.8587 31.0218")), Some(expected()));
        assert_eq!(
            parse_coordinate(&structured(json!({"lat": -29.8587, "lng": 31.0218}))),
            Some(expected())
        );
        assert_eq!(
            parse_coordinate(&structured(
                json!({"latitude": -29.8587, "longitude": 31.0218})
            )),
            Some(expected())
        );
        assert_eq!(
            parse_coordinate(&text(r#"{"latitude": "-29.8587", "lng": "31.0218"}"#)),
            Some(expected())
        );
    }

    #[test]
    fn structured_accepts_numeric_strings() {
        assert_eq!(
            parse_coordinate(&structured(json!({"lat": "-29.8587", "lng": " 31.0218 "}))),
            Some(expected())
        );
    }

    #[test]
    fn free_text_is_none() {
        assert_eq!(parse_coordinate(&text("not a location")), None);
        assert_eq!(parse_coordinate(&text("12 Florida Road, Durban")), None);
        assert_eq!(parse_coordinate(&text("   ")), None);
        assert_eq!(parse_coordinate(&LocationSpec::Absent), None);
    }

    #[test]
    fn out_of_range_is_none() {
        assert_eq!(
            parse_coordinate(&structured(json!({"lat": 200, "lng": 31}))),
            None
        );
        assert_eq!(parse_coordinate(&text("-29.8587, 190")), None);
        assert_eq!(parse_coordinate(&text("NaN, 31")), None);
        assert_eq!(parse_coordinate(&text("inf 31")), None);
    }

    #[test]
    fn structured_missing_or_non_numeric_field_is_none() {
        assert_eq!(parse_coordinate(&structured(json!({"lat": -29.8}))), None);
        assert_eq!(
            parse_coordinate(&structured(json!({"lat": "south", "lng": 31.0}))),
            None
        );
        assert_eq!(
            parse_coordinate(&structured(json!({"lat": true, "lng": 31.0}))),
            None
        );
    }

    #[test]
    fn wrong_field_counts_are_rejected() {
        assert_eq!(parse_coordinate(&text("-29.8587, 31.0218, 12")), None);
        assert_eq!(parse_coordinate(&text("-29.8587 31.0218 12")), None);
        assert_eq!(parse_coordinate(&text("-29.8587")), None);
    }

    #[test]
    fn comma_rule_wins_over_whitespace_rule() {
        // "1 2, 3" fails the comma rule ("1 2" is not a number) and has three
        // whitespace fields, so nothing matches.
        assert_eq!(parse_coordinate(&text("1 2, 3")), None);
        // Spaces around the comma are handled by the comma rule.
        let c = parse_coordinate(&text("10 , 20")).expect("comma rule");
        assert!((c.lat() - 10.0).abs() < f64::EPSILON);
        assert!((c.lng() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn json_non_object_is_none() {
        assert_eq!(parse_coordinate(&text("[-29.8587, 31.0218]")), None);
        assert_eq!(parse_coordinate(&text(r#""-29.8587, 31.0218""#)), None);
    }

    #[test]
    fn value_as_f64_accepts_numeric_strings() {
        assert_eq!(value_as_f64(&json!(42.5)), Some(42.5));
        assert_eq!(value_as_f64(&json!("42.5")), Some(42.5));
        assert_eq!(value_as_f64(&json!("not-a-number")), None);
    }
}

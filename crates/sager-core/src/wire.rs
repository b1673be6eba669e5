//! Feed wire format: GeoJSON-style feature collections of drone reports.
//! Flat reports (fields at the top level, `registrationCode` for the
//! registration) are accepted in place of features.
//!
//! Decoding is lenient per feature. A payload that parses as JSON always
//! yields one [`RawReport`] per feature; a feature missing what the engine
//! needs is rejected later, during reconciliation, without affecting its
//! neighbours.

use serde_json::{json, Value};
use thiserror::Error;

use crate::models::{Coordinate, RawReport};

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a text frame from the feed into raw reports.
pub fn decode_payload_str(text: &str) -> Result<Vec<RawReport>, PayloadError> {
    let payload: Value = serde_json::from_str(text)?;
    Ok(decode_payload(&payload))
}

/// Extract raw reports from a feature collection.
///
/// Accepts `{"features": [...]}` or a bare array of features. Anything else,
/// including a missing or null `features` member, is an empty batch.
pub fn decode_payload(payload: &Value) -> Vec<RawReport> {
    let features = payload
        .as_array()
        .or_else(|| payload.get("features").and_then(Value::as_array));

    match features {
        Some(features) => features.iter().map(decode_feature).collect(),
        None => Vec::new(),
    }
}

fn decode_feature(feature: &Value) -> RawReport {
    let (properties, geometry) = match (feature.get("properties"), feature.get("geometry")) {
        (None, None) => return decode_flat_report(feature),
        (properties, geometry) => (
            properties.unwrap_or(&Value::Null),
            geometry.unwrap_or(&Value::Null),
        ),
    };

    RawReport {
        id: first_string(&[properties.get("serial"), feature.get("id")]),
        coordinates: decode_coordinates(geometry.get("coordinates")),
        heading: first_number(&[properties.get("yaw"), properties.get("heading")]),
        registration: first_string(&[properties.get("registration")]),
        name: first_string(&[properties.get("Name"), properties.get("name")]),
        serial: first_string(&[properties.get("serial")]),
        pilot: first_string(&[properties.get("pilot")]),
        organization: first_string(&[properties.get("organization")]),
        altitude: first_number(&[properties.get("altitude")]),
    }
}

/// A report with its fields at the top level, e.g.
/// `{"id": "A1", "coordinates": [lon, lat], "registrationCode": "SD-B001"}`.
fn decode_flat_report(report: &Value) -> RawReport {
    RawReport {
        id: first_string(&[report.get("id"), report.get("serial")]),
        coordinates: decode_coordinates(report.get("coordinates")),
        heading: first_number(&[report.get("heading"), report.get("yaw")]),
        registration: first_string(&[report.get("registrationCode"), report.get("registration")]),
        name: first_string(&[report.get("name"), report.get("Name")]),
        serial: first_string(&[report.get("serial")]),
        pilot: first_string(&[report.get("pilot")]),
        organization: first_string(&[report.get("organization")]),
        altitude: first_number(&[report.get("altitude")]),
    }
}

fn decode_coordinates(value: Option<&Value>) -> Option<Coordinate> {
    let pair = value?.as_array()?;
    let lon = to_f64(pair.first())?;
    let lat = to_f64(pair.get(1))?;
    Some(Coordinate::new(lon, lat))
}

fn first_number(candidates: &[Option<&Value>]) -> Option<f64> {
    candidates.iter().find_map(|value| to_f64(*value))
}

fn first_string(candidates: &[Option<&Value>]) -> Option<String> {
    candidates
        .iter()
        .find_map(|value| value.and_then(Value::as_str))
        .map(str::to_string)
}

fn to_f64(value: Option<&Value>) -> Option<f64> {
    let value = value?;
    if let Some(num) = value.as_f64() {
        return Some(num);
    }
    value.as_str()?.trim().parse::<f64>().ok()
}

/// Build the feed's feature-collection payload for a batch of reports.
pub fn encode_batch(reports: &[RawReport]) -> Value {
    let features: Vec<Value> = reports.iter().map(encode_feature).collect();
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn encode_feature(report: &RawReport) -> Value {
    let coordinates = report.coordinates.map(<[f64; 2]>::from);
    json!({
        "type": "Feature",
        "properties": {
            "serial": report.serial.as_deref().or(report.id.as_deref()),
            "registration": report.registration,
            "Name": report.name,
            "altitude": report.altitude,
            "pilot": report.pilot,
            "organization": report.organization,
            "yaw": report.heading,
        },
        "geometry": {
            "type": "Point",
            "coordinates": coordinates,
        },
    })
}

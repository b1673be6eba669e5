//! Core data models for the drone tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registration::is_authorized;
use crate::session::format_elapsed;

/// Prior positions kept when a tracked drone is sighted again.
pub const PRIOR_PATH_LEN: usize = 30;

/// Longest trajectory a tracked drone can carry (prior history + newest fix).
pub const MAX_PATH_LEN: usize = PRIOR_PATH_LEN + 1;

/// A longitude/latitude pair, serialized as `[lon, lat]` like GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coord: Coordinate) -> Self {
        [coord.lon, coord.lat]
    }
}

/// One drone report as delivered by the feed, before validation.
///
/// Every field is optional. A report missing what the engine needs is
/// rejected by [`Sighting::try_from`], not while decoding the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReport {
    pub id: Option<String>,
    pub coordinates: Option<Coordinate>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default, alias = "registrationCode")]
    pub registration: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub pilot: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub altitude: Option<f64>,
}

/// Report fields carried through to the display unmodified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportDetails {
    pub name: Option<String>,
    pub serial: Option<String>,
    pub registration: Option<String>,
    pub pilot: Option<String>,
    pub organization: Option<String>,
    pub altitude: Option<f64>,
}

/// Why a single report was left out of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ReportError {
    #[error("report has no identifier")]
    MissingIdentifier,
    #[error("report identifier {id:?} is malformed")]
    MalformedIdentifier { id: String },
    #[error("report {id} has no coordinates")]
    MissingCoordinates { id: String },
    #[error("report {id} has non-finite coordinates")]
    InvalidCoordinates { id: String },
}

/// A validated report, ready to merge into a tracked drone.
#[derive(Debug, Clone, PartialEq)]
pub struct Sighting {
    pub id: String,
    pub coordinate: Coordinate,
    pub heading: f64,
    pub authorized: bool,
    pub details: ReportDetails,
}

impl TryFrom<RawReport> for Sighting {
    type Error = ReportError;

    fn try_from(report: RawReport) -> Result<Self, Self::Error> {
        let id = report.id.ok_or(ReportError::MissingIdentifier)?;
        if id.trim().is_empty() || id.chars().any(char::is_control) {
            return Err(ReportError::MalformedIdentifier { id });
        }

        let coordinate = match report.coordinates {
            Some(coord) if coord.is_finite() => coord,
            Some(_) => return Err(ReportError::InvalidCoordinates { id }),
            None => return Err(ReportError::MissingCoordinates { id }),
        };

        let authorized = report
            .registration
            .as_deref()
            .map(is_authorized)
            .unwrap_or(false);

        Ok(Self {
            id,
            coordinate,
            heading: report.heading.filter(|h| h.is_finite()).unwrap_or(0.0),
            authorized,
            details: ReportDetails {
                name: report.name,
                serial: report.serial,
                registration: report.registration,
                pilot: report.pilot,
                organization: report.organization,
                altitude: report.altitude,
            },
        })
    }
}

/// Merged, in-process view of one drone: latest report plus bounded history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub id: String,
    pub position: Coordinate,
    pub heading: f64,
    pub authorized: bool,
    /// Chronological, oldest first, never longer than [`MAX_PATH_LEN`].
    pub path: Vec<Coordinate>,
    /// Number of sightings after the first one.
    pub flight_time_ticks: u64,
    pub last_seen: DateTime<Utc>,
    #[serde(flatten)]
    pub details: ReportDetails,
}

impl TrackedEntity {
    /// Create a tracked drone from its first sighting.
    pub fn from_sighting(sighting: Sighting, seen_at: DateTime<Utc>) -> Self {
        Self {
            id: sighting.id,
            position: sighting.coordinate,
            heading: sighting.heading,
            authorized: sighting.authorized,
            path: vec![sighting.coordinate],
            flight_time_ticks: 0,
            last_seen: seen_at,
            details: sighting.details,
        }
    }

    /// Fold a later sighting of the same drone into its state.
    pub fn update(&mut self, sighting: Sighting, seen_at: DateTime<Utc>) {
        if self.path.len() > PRIOR_PATH_LEN {
            let excess = self.path.len() - PRIOR_PATH_LEN;
            self.path.drain(..excess);
        }
        self.path.push(sighting.coordinate);
        self.flight_time_ticks = self.flight_time_ticks.saturating_add(1);

        self.position = sighting.coordinate;
        self.heading = sighting.heading;
        self.authorized = sighting.authorized;
        self.last_seen = seen_at;
        self.details = sighting.details;
    }

    /// Flight time as `MM:SS` / `HH:MM:SS`, one tick per second.
    pub fn flight_time_display(&self) -> String {
        format_elapsed(self.flight_time_ticks)
    }
}

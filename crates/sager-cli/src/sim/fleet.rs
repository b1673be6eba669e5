//! Simulated fleets that emit feed reports.

use std::f64::consts::PI;
use std::sync::Arc;

use sager_core::{Coordinate, RawReport};

use super::paths::{CircularPath, FlightPath, LinearPath};

const MODELS: [&str; 3] = ["DJI Mavic 3 Pro", "DJI Matrice 300", "Skydio X10"];
const PILOTS: [&str; 4] = ["Ahmad", "Lina", "Omar", "Rania"];

/// One simulated drone and the metadata its reports carry.
pub struct SimDrone {
    pub serial: String,
    pub registration: String,
    pub name: String,
    pub pilot: String,
    pub organization: String,
    pub path: Arc<dyn FlightPath>,
}

impl SimDrone {
    pub fn report_at(&self, t: f64) -> RawReport {
        RawReport {
            id: Some(self.serial.clone()),
            coordinates: Some(self.path.position(t)),
            heading: Some(self.path.heading(t).round()),
            registration: Some(self.registration.clone()),
            name: Some(self.name.clone()),
            serial: Some(self.serial.clone()),
            pilot: Some(self.pilot.clone()),
            organization: Some(self.organization.clone()),
            altitude: Some(self.path.altitude_m()),
        }
    }
}

pub struct Fleet {
    pub drones: Vec<SimDrone>,
}

impl Fleet {
    /// One feed batch: every drone's report at `t` seconds.
    pub fn reports_at(&self, t: f64) -> Vec<RawReport> {
        self.drones.iter().map(|drone| drone.report_at(t)).collect()
    }

    pub fn len(&self) -> usize {
        self.drones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty()
    }
}

/// `count` drones around `center`, alternating orbits and transit legs.
///
/// Every third drone carries a registration outside the authorized `B`
/// class so both classifications show up on the map.
pub fn mixed_fleet(center: Coordinate, count: usize) -> Fleet {
    let drones = (0..count)
        .map(|i| {
            let bearing = 2.0 * PI * i as f64 / count.max(1) as f64;
            let path: Arc<dyn FlightPath> = if i % 2 == 0 {
                Arc::new(CircularPath::new(
                    center,
                    200.0 + 75.0 * i as f64,
                    60.0 + 10.0 * (i % 4) as f64,
                    10.0 + (i % 3) as f64 * 2.0,
                    bearing,
                    i % 4 == 0,
                ))
            } else {
                let start = offset(center, 1_500.0, bearing);
                let end = offset(center, 1_500.0, bearing + PI);
                Arc::new(LinearPath::new(start, end, 90.0, 14.0))
            };

            let class = if i % 3 == 2 { 'X' } else { 'B' };
            SimDrone {
                serial: format!("SD-{:04}", i + 1),
                registration: format!("SD-{}{:05}", class, i + 1),
                name: MODELS[i % MODELS.len()].to_string(),
                pilot: PILOTS[i % PILOTS.len()].to_string(),
                organization: "Sager Drone".to_string(),
                path,
            }
        })
        .collect();

    Fleet { drones }
}

fn offset(origin: Coordinate, distance_m: f64, bearing_rad: f64) -> Coordinate {
    let dlat = distance_m * bearing_rad.cos() / 111_320.0;
    let dlon = distance_m * bearing_rad.sin() / (111_320.0 * origin.lat.to_radians().cos());
    Coordinate::new(origin.lon + dlon, origin.lat + dlat)
}

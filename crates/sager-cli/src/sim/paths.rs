//! Flight paths for simulated drones.

use std::f64::consts::PI;

use sager_core::Coordinate;

const METERS_PER_DEG_LAT: f64 = 111_320.0;

pub trait FlightPath: Send + Sync {
    /// Position at `t` seconds after launch.
    fn position(&self, t: f64) -> Coordinate;

    fn altitude_m(&self) -> f64;

    /// Heading in degrees clockwise from north.
    fn heading(&self, t: f64) -> f64 {
        let here = self.position(t);
        let ahead = self.position(t + 0.1);
        bearing_deg(here, ahead)
    }
}

/// Orbit around a fixed point.
pub struct CircularPath {
    center: Coordinate,
    radius_m: f64,
    altitude_m: f64,
    start_angle: f64,
    clockwise: bool,
    period_s: f64,
}

impl CircularPath {
    pub fn new(
        center: Coordinate,
        radius_m: f64,
        altitude_m: f64,
        speed_mps: f64,
        start_angle: f64,
        clockwise: bool,
    ) -> Self {
        let period_s = if speed_mps > 0.0 {
            2.0 * PI * radius_m / speed_mps
        } else {
            f64::INFINITY
        };
        Self {
            center,
            radius_m,
            altitude_m,
            start_angle,
            clockwise,
            period_s,
        }
    }

    pub fn period_s(&self) -> f64 {
        self.period_s
    }
}

impl FlightPath for CircularPath {
    fn position(&self, t: f64) -> Coordinate {
        let sweep = 2.0 * PI * t / self.period_s;
        let angle = if self.clockwise {
            self.start_angle + sweep
        } else {
            self.start_angle - sweep
        };

        // Angle measured clockwise from north.
        let dlat = self.radius_m * angle.cos() / METERS_PER_DEG_LAT;
        let dlon =
            self.radius_m * angle.sin() / (METERS_PER_DEG_LAT * self.center.lat.to_radians().cos());
        Coordinate::new(self.center.lon + dlon, self.center.lat + dlat)
    }

    fn altitude_m(&self) -> f64 {
        self.altitude_m
    }
}

/// Straight leg that holds at its end point once reached.
pub struct LinearPath {
    start: Coordinate,
    end: Coordinate,
    altitude_m: f64,
    duration_s: f64,
    heading: f64,
}

impl LinearPath {
    pub fn new(start: Coordinate, end: Coordinate, altitude_m: f64, speed_mps: f64) -> Self {
        let distance_m = haversine_m(start, end);
        let duration_s = if speed_mps > 0.0 {
            distance_m / speed_mps
        } else {
            0.0
        };
        Self {
            start,
            end,
            altitude_m,
            duration_s,
            heading: bearing_deg(start, end),
        }
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }
}

impl FlightPath for LinearPath {
    fn position(&self, t: f64) -> Coordinate {
        let progress = if self.duration_s > 0.0 {
            (t / self.duration_s).clamp(0.0, 1.0)
        } else {
            1.0
        };
        Coordinate::new(
            self.start.lon + progress * (self.end.lon - self.start.lon),
            self.start.lat + progress * (self.end.lat - self.start.lat),
        )
    }

    fn altitude_m(&self) -> f64 {
        self.altitude_m
    }

    fn heading(&self, _t: f64) -> f64 {
        self.heading
    }
}

/// Flat-earth bearing, good enough at simulation scale.
fn bearing_deg(from: Coordinate, to: Coordinate) -> f64 {
    let dlat = to.lat - from.lat;
    let dlon = (to.lon - from.lon) * from.lat.to_radians().cos();
    if dlat.abs() < 1e-12 && dlon.abs() < 1e-12 {
        return 0.0;
    }
    dlon.atan2(dlat).to_degrees().rem_euclid(360.0)
}

fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

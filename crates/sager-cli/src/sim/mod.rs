//! Simulated drone fleet.

pub mod fleet;
pub mod paths;

pub use fleet::{mixed_fleet, Fleet, SimDrone};
pub use paths::{CircularPath, FlightPath, LinearPath};

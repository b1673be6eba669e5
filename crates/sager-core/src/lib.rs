//! Sager core: track store and reconciliation engine for live drone reports.
//!
//! Pure, synchronous logic with no I/O. The server drives it from a single
//! event loop; tests drive it directly.

pub mod models;
pub mod reconcile;
pub mod registration;
pub mod session;
pub mod stats;
pub mod store;
pub mod stream;
pub mod wire;

pub use models::{
    Coordinate, RawReport, ReportDetails, ReportError, Sighting, TrackedEntity, MAX_PATH_LEN,
};
pub use reconcile::{ChangeSet, Reconciler, SkippedReport};
pub use registration::is_authorized;
pub use session::{format_elapsed, SessionClock};
pub use stats::FleetStats;
pub use store::{InMemoryTrackStore, TrackStore};
pub use stream::{FeedStatus, StatsReport, StreamEvent};
pub use wire::{decode_payload, decode_payload_str, encode_batch, PayloadError};

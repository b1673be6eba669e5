//! Messages shared between the server and rendering clients.

use serde::{Deserialize, Serialize};

use crate::models::TrackedEntity;
use crate::session::format_elapsed;
use crate::stats::FleetStats;

/// One frame on the change stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Sent once when a client connects.
    Snapshot {
        drones: Vec<TrackedEntity>,
        stats: StatsReport,
    },
    /// A drone created or updated by the latest batch.
    Update { drone: TrackedEntity },
    /// Ids touched by one batch, sent after its updates.
    Changes { changed: Vec<String>, skipped: usize },
    /// Session clock advanced.
    Session { elapsed_s: u64, elapsed: String },
}

/// Fleet counts plus the session readout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsReport {
    pub total: usize,
    pub authorized: usize,
    pub unauthorized: usize,
    pub session_elapsed_s: u64,
    pub session_elapsed: String,
}

impl StatsReport {
    pub fn new(stats: FleetStats, session_elapsed_s: u64) -> Self {
        Self {
            total: stats.total,
            authorized: stats.authorized,
            unauthorized: stats.unauthorized,
            session_elapsed_s,
            session_elapsed: format_elapsed(session_elapsed_s),
        }
    }
}

/// Connection state of the upstream report feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedStatus {
    /// No upstream feed configured; batches arrive over HTTP only.
    #[default]
    Disabled,
    Connecting,
    Connected,
    Disconnected,
    Error { message: String },
}

impl FeedStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, FeedStatus::Connected)
    }
}

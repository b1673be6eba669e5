//! Sager SDK - client library for the drone tracking server
//!
//! Feeders push report batches; rendering clients read snapshots and
//! subscribe to the change stream.

pub mod client;
pub mod stream;

pub use client::{SagerClient, StatusResponse};
pub use sager_core::{FeedStatus, RawReport, StatsReport, StreamEvent, TrackedEntity};
pub use stream::{StreamFilter, TrackStream};

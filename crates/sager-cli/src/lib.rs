//! Sager CLI - command line tools around the drone tracker.
//!
//! - drone_feed: simulated fleet, pushed over HTTP or served as an upstream feed
//! - watch_tracks: prints the live change stream

pub mod sim;

//! Shared library surface for the tracking server and its tests.

pub mod api;
pub mod backoff;
pub mod config;
pub mod engine;
pub mod loops;
pub mod runtime;
pub mod state;

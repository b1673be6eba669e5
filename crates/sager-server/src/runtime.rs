//! Wiring and teardown of the engine and its loops.

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::Router;
use sager_core::FeedStatus;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::engine::{Engine, EngineEvent};
use crate::loops::{feed_loop, session_loop};
use crate::state::{AppState, TrackSnapshot};

/// Handles to the running engine and the loops that feed it.
pub struct TrackerRuntime {
    shutdown: watch::Sender<bool>,
    loops: Vec<JoinHandle<()>>,
    events: mpsc::Sender<EngineEvent>,
    engine: JoinHandle<()>,
}

impl TrackerRuntime {
    /// Spawn the engine, the session clock and (if configured) the feed loop.
    pub fn start(config: Config) -> (Arc<AppState>, Self) {
        let (events_tx, events_rx) = mpsc::channel(config.event_queue);
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(TrackSnapshot::default()));
        let (stream_tx, _) = broadcast::channel(config.stream_capacity);
        let (status_tx, status_rx) = watch::channel(FeedStatus::Disabled);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let engine = tokio::spawn(Engine::new(snapshot_tx, stream_tx.clone()).run(events_rx));

        let mut loops = vec![tokio::spawn(session_loop::run_session_loop(
            events_tx.clone(),
            config.tick_interval,
            shutdown_rx.clone(),
        ))];

        if let Some(feed_url) = config.feed_url.clone() {
            loops.push(tokio::spawn(feed_loop::run_feed_loop(
                feed_url,
                config.clone(),
                events_tx.clone(),
                status_tx,
                shutdown_rx,
            )));
        } else {
            tracing::info!("No SAGER_FEED_URL set; accepting batches over HTTP only");
        }

        let state = Arc::new(AppState::new(
            config,
            events_tx.clone(),
            snapshot_rx,
            status_rx,
            stream_tx,
        ));

        let runtime = Self {
            shutdown: shutdown_tx,
            loops,
            events: events_tx,
            engine,
        };
        (state, runtime)
    }

    /// Serve `app` on `listener` until `signal` resolves, then tear down.
    ///
    /// The runtime is shut down whether serving ended cleanly or with an
    /// error; the serve result is returned afterwards.
    pub async fn serve<F>(self, listener: TcpListener, app: Router, signal: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await;
        if let Err(e) = &served {
            tracing::error!("HTTP server failed: {}", e);
        }

        self.shutdown().await;
        served
    }

    /// Stop the feed and the session clock, then the engine.
    ///
    /// The loops are awaited before the engine is told to stop, so no batch
    /// can arrive after the track store is released.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for handle in self.loops {
            if let Err(e) = handle.await {
                tracing::error!("Background loop ended abnormally: {}", e);
            }
        }

        if self.events.send(EngineEvent::Shutdown).await.is_err() {
            tracing::warn!("Engine already stopped");
        }
        if let Err(e) = self.engine.await {
            tracing::error!("Engine task ended abnormally: {}", e);
        }
        tracing::info!("Tracker runtime shut down");
    }
}

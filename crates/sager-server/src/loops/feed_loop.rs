//! Upstream feed loop.
//!
//! Subscribes to the report feed over WebSocket, forwards every frame to the
//! engine as one batch, and publishes the connection state for the UI. A
//! dropped connection only pauses ingest; tracked drones are kept and the
//! loop reconnects with backoff.

use futures_util::{SinkExt, StreamExt};
use sager_core::{decode_payload_str, FeedStatus, RawReport};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::backoff::Backoff;
use crate::config::Config;
use crate::engine::EngineEvent;

enum FeedExit {
    Shutdown,
    EngineClosed,
    Closed,
    Failed(String),
}

/// Start the feed loop. Returns once shutdown is signalled or the engine is gone.
pub async fn run_feed_loop(
    feed_url: String,
    config: Config,
    events: mpsc::Sender<EngineEvent>,
    status: watch::Sender<FeedStatus>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut backoff = Backoff::new(config.feed_backoff_base, config.feed_backoff_max);

    loop {
        status.send_replace(FeedStatus::Connecting);
        tracing::info!("Connecting to report feed at {}", feed_url);

        let connected = tokio::select! {
            result = connect_async(feed_url.as_str()) => result,
            _ = shutdown.changed() => break,
        };

        match connected {
            Ok((socket, _)) => {
                status.send_replace(FeedStatus::Connected);
                tracing::info!("Report feed connected");
                backoff.reset();

                match pump_frames(socket, &events, &mut shutdown).await {
                    FeedExit::Shutdown | FeedExit::EngineClosed => break,
                    FeedExit::Closed => {
                        status.send_replace(FeedStatus::Disconnected);
                        tracing::warn!("Report feed closed by upstream");
                    }
                    FeedExit::Failed(message) => {
                        tracing::warn!("Report feed dropped: {}", message);
                        status.send_replace(FeedStatus::Error { message });
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Report feed connection failed: {}", e);
                status.send_replace(FeedStatus::Error {
                    message: e.to_string(),
                });
            }
        }

        let delay = backoff.next_delay();
        tracing::debug!("Reconnecting to report feed in {:?}", delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    status.send_replace(FeedStatus::Disconnected);
    tracing::info!("Report feed loop stopped");
}

async fn pump_frames<S>(
    mut socket: S,
    events: &mpsc::Sender<EngineEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> FeedExit
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures_util::Sink<Message>
        + Unpin,
{
    loop {
        let frame = tokio::select! {
            frame = socket.next() => frame,
            _ = shutdown.changed() => {
                let _ = socket.close().await;
                return FeedExit::Shutdown;
            }
        };

        let batch = match frame {
            Some(Ok(Message::Text(text))) => decode_frame(&text),
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => decode_frame(text),
                Err(_) => {
                    tracing::warn!("Ignoring non-UTF-8 binary feed frame");
                    None
                }
            },
            Some(Ok(Message::Ping(payload))) => {
                if socket.send(Message::Pong(payload)).await.is_err() {
                    return FeedExit::Failed("failed to answer ping".to_string());
                }
                None
            }
            Some(Ok(Message::Close(_))) | None => return FeedExit::Closed,
            Some(Ok(_)) => None,
            Some(Err(e)) => return FeedExit::Failed(e.to_string()),
        };

        if let Some(batch) = batch {
            if events.send(EngineEvent::Batch(batch)).await.is_err() {
                return FeedExit::EngineClosed;
            }
        }
    }
}

fn decode_frame(text: &str) -> Option<Vec<RawReport>> {
    match decode_payload_str(text) {
        Ok(batch) => Some(batch),
        Err(e) => {
            tracing::warn!("Dropping feed frame: {}", e);
            None
        }
    }
}

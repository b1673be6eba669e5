//! Session clock loop: one `Tick` into the engine queue per interval.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::engine::EngineEvent;

pub async fn run_session_loop(
    events: mpsc::Sender<EngineEvent>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    // Missed ticks are replayed so the count keeps pace with wall-clock time.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    // The first tick completes immediately; the clock starts at zero.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if events.send(EngineEvent::Tick).await.is_err() {
                    tracing::debug!("Engine queue closed, stopping session clock");
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    tracing::debug!("Session clock stopped");
}

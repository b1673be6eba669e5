//! Simulated drone feed.
//!
//! Pushes one batch per interval to the tracker over HTTP, or with `--serve`
//! acts as the upstream WebSocket feed the tracker connects to.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use futures_util::SinkExt;
use sager_cli::sim::{mixed_fleet, Fleet};
use sager_core::{encode_batch, Coordinate};
use sager_sdk::SagerClient;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Simulated fleet feeding the Sager tracker
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Tracker URL for HTTP ingest
    #[arg(long, default_value = "http://localhost:9013")]
    url: String,

    /// Serve the feed over WebSocket on this port instead of posting
    #[arg(long)]
    serve: Option<u16>,

    /// Number of simulated drones
    #[arg(long, default_value_t = 8)]
    drones: usize,

    /// Center longitude (default: Amman)
    #[arg(long, default_value_t = 35.93)]
    lon: f64,

    /// Center latitude (default: Amman)
    #[arg(long, default_value_t = 31.95)]
    lat: f64,

    /// Seconds between batches
    #[arg(long, default_value_t = 1.0)]
    interval: f64,

    /// Stop after this many seconds (0 runs until interrupted)
    #[arg(long, default_value_t = 0)]
    duration: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("drone_feed=info".parse()?))
        .init();

    let args = Args::parse();
    if !(args.interval.is_finite() && args.interval > 0.0) {
        anyhow::bail!("--interval must be a positive number of seconds");
    }

    let fleet = mixed_fleet(Coordinate::new(args.lon, args.lat), args.drones);
    tracing::info!("Simulating {} drones", fleet.len());

    match args.serve {
        Some(port) => serve_feed(&args, &fleet, port).await,
        None => post_batches(&args, &fleet).await,
    }
}

async fn post_batches(args: &Args, fleet: &Fleet) -> anyhow::Result<()> {
    let client = SagerClient::new(&args.url);
    tracing::info!("Posting batches to {}", client.base_url());

    let mut ticker = Ticker::new(args);
    let mut sent = 0u64;
    while let Some(t) = ticker.next().await {
        match client.send_batch(&fleet.reports_at(t)).await {
            Ok(resp) => {
                sent += 1;
                tracing::info!("[{:4}] batch accepted ({} reports)", sent, resp.reports);
            }
            Err(e) => tracing::warn!("Failed to post batch: {}", e),
        }
    }

    tracing::info!("Feed stopped after {} batches", sent);
    Ok(())
}

async fn serve_feed(args: &Args, fleet: &Fleet, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Serving feed on ws://{}", addr);

    let (frames, _) = broadcast::channel::<String>(16);
    let accept_frames = frames.clone();
    let acceptor = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    tokio::spawn(handle_subscriber(stream, peer, accept_frames.subscribe()));
                }
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }
    });

    let mut ticker = Ticker::new(args);
    while let Some(t) = ticker.next().await {
        let frame = encode_batch(&fleet.reports_at(t)).to_string();
        // Batches produced while no tracker is connected are dropped.
        let _ = frames.send(frame);
    }

    acceptor.abort();
    Ok(())
}

async fn handle_subscriber(
    stream: TcpStream,
    peer: SocketAddr,
    mut frames: broadcast::Receiver<String>,
) {
    let mut socket = match tokio_tungstenite::accept_async(stream).await {
        Ok(socket) => socket,
        Err(e) => {
            tracing::warn!("Handshake with {} failed: {}", peer, e);
            return;
        }
    };
    tracing::info!("Tracker connected from {}", peer);

    loop {
        match frames.recv().await {
            Ok(frame) => {
                if socket.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("{} lagged by {} batches", peer, skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::info!("Tracker {} disconnected", peer);
}

/// Simulation clock: yields seconds since start once per interval until
/// the duration elapses or ctrl-c arrives.
struct Ticker {
    start: time::Instant,
    interval: time::Interval,
    duration: Option<Duration>,
}

impl Ticker {
    fn new(args: &Args) -> Self {
        let mut interval = time::interval(Duration::from_secs_f64(args.interval));
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        Self {
            start: time::Instant::now(),
            interval,
            duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        }
    }

    async fn next(&mut self) -> Option<f64> {
        tokio::select! {
            _ = self.interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                return None;
            }
        }

        let elapsed = self.start.elapsed();
        if self.duration.is_some_and(|limit| elapsed > limit) {
            return None;
        }
        Some(elapsed.as_secs_f64())
    }
}

//! Prints the tracker's live change stream, one line per event.

use clap::Parser;
use sager_core::{StreamEvent, TrackedEntity};
use sager_sdk::{SagerClient, StreamFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Watch live drone tracks
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Tracker URL
    #[arg(long, default_value = "http://localhost:9013")]
    url: String,

    /// Only show this drone
    #[arg(long)]
    drone: Option<String>,

    /// Only show drones with this classification
    #[arg(long)]
    authorized: Option<bool>,

    /// Also print session clock ticks
    #[arg(long)]
    ticks: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("watch_tracks=info".parse()?))
        .init();

    let args = Args::parse();
    let client = SagerClient::new(&args.url);

    let status = client.status().await?;
    tracing::info!(
        "Connected to {} ({} tracked, feed {:?})",
        client.base_url(),
        status.tracked,
        status.feed
    );

    let filter = StreamFilter {
        drone_id: args.drone.clone(),
        authorized: args.authorized,
    };
    let mut stream = client.subscribe(filter).await?;

    while let Some(event) = stream.next_event().await? {
        match event {
            StreamEvent::Snapshot { drones, stats } => {
                println!(
                    "snapshot: {} drones ({} authorized, {} unauthorized), session {}",
                    stats.total, stats.authorized, stats.unauthorized, stats.session_elapsed
                );
                for drone in &drones {
                    println!("  {}", describe(drone));
                }
            }
            StreamEvent::Update { drone } => println!("{}", describe(&drone)),
            StreamEvent::Changes { changed, skipped } => {
                if skipped > 0 {
                    println!("batch: {} changed, {} skipped", changed.len(), skipped);
                }
            }
            StreamEvent::Session { elapsed, .. } => {
                if args.ticks {
                    println!("session {}", elapsed);
                }
            }
        }
    }

    tracing::info!("Stream closed");
    Ok(())
}

fn describe(drone: &TrackedEntity) -> String {
    format!(
        "{:<10} {:>11.6},{:>10.6} hdg {:>5.1} flight {} {}",
        drone.id,
        drone.position.lon,
        drone.position.lat,
        drone.heading,
        drone.flight_time_display(),
        if drone.authorized { "AUTHORIZED" } else { "UNAUTHORIZED" },
    )
}

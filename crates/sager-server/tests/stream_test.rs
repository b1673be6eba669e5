//! End-to-end tests over real sockets: the change stream and the upstream feed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use sager_core::{decode_payload, FeedStatus, StreamEvent};
use sager_server::{api, config::Config, runtime::TrackerRuntime, state::AppState};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn test_config() -> Config {
    Config {
        tick_interval: Duration::from_secs(3600),
        feed_backoff_base: Duration::from_millis(20),
        feed_backoff_max: Duration::from_millis(100),
        ..Config::default()
    }
}

async fn spawn_server(config: Config) -> (SocketAddr, Arc<AppState>, TrackerRuntime) {
    let (state, runtime) = TrackerRuntime::start(config);
    let app = api::routes().with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state, runtime)
}

async fn next_event(client: &mut Client) -> StreamEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("stream timeout")
            .expect("stream open")
            .expect("stream frame");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("stream event");
        }
    }
}

fn batch(features: &[(&str, &str, f64, f64)]) -> Value {
    let features: Vec<Value> = features
        .iter()
        .map(|(serial, registration, lon, lat)| {
            json!({
                "type": "Feature",
                "properties": { "serial": serial, "registration": registration, "yaw": 10 },
                "geometry": { "type": "Point", "coordinates": [lon, lat] }
            })
        })
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}

#[tokio::test]
async fn stream_sends_snapshot_then_changes() {
    let (addr, state, runtime) = spawn_server(test_config()).await;
    state
        .submit_batch(decode_payload(&batch(&[("A1", "SD-B001", 35.0, 31.0)])))
        .await
        .unwrap();
    let mut snapshots = state.watch_snapshots();
    snapshots.wait_for(|s| s.drones.len() == 1).await.unwrap();

    let (mut client, _) = connect_async(format!("ws://{}/v1/stream", addr)).await.unwrap();

    match next_event(&mut client).await {
        StreamEvent::Snapshot { drones, stats } => {
            assert_eq!(drones.len(), 1);
            assert_eq!(stats.authorized, 1);
        }
        other => panic!("expected snapshot, got {:?}", other),
    }

    state
        .submit_batch(decode_payload(&batch(&[
            ("A1", "SD-B001", 35.1, 31.1),
            ("B2", "SD-X002", 35.5, 31.5),
        ])))
        .await
        .unwrap();

    let mut updated = Vec::new();
    for _ in 0..2 {
        match next_event(&mut client).await {
            StreamEvent::Update { drone } => updated.push(drone),
            other => panic!("expected update, got {:?}", other),
        }
    }
    updated.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(updated[0].id, "A1");
    assert_eq!(updated[0].flight_time_ticks, 1);
    assert_eq!(updated[0].path.len(), 2);
    assert_eq!(updated[1].id, "B2");
    assert!(!updated[1].authorized);

    match next_event(&mut client).await {
        StreamEvent::Changes { changed, skipped } => {
            assert_eq!(changed, vec!["A1".to_string(), "B2".to_string()]);
            assert_eq!(skipped, 0);
        }
        other => panic!("expected changes, got {:?}", other),
    }

    client.close(None).await.ok();
    runtime.shutdown().await;
}

#[tokio::test]
async fn stream_filters_by_drone() {
    let (addr, state, runtime) = spawn_server(test_config()).await;
    let (mut client, _) = connect_async(format!("ws://{}/v1/stream?drone_id=B2", addr))
        .await
        .unwrap();
    assert!(matches!(
        next_event(&mut client).await,
        StreamEvent::Snapshot { .. }
    ));

    state
        .submit_batch(decode_payload(&batch(&[
            ("A1", "SD-B001", 35.0, 31.0),
            ("B2", "SD-X002", 35.5, 31.5),
        ])))
        .await
        .unwrap();

    match next_event(&mut client).await {
        StreamEvent::Update { drone } => assert_eq!(drone.id, "B2"),
        other => panic!("expected B2 update, got {:?}", other),
    }
    assert!(matches!(
        next_event(&mut client).await,
        StreamEvent::Changes { .. }
    ));

    client.close(None).await.ok();
    runtime.shutdown().await;
}

/// Upstream feed that sends one frame per connection, then hangs up.
async fn spawn_feed(frames: Vec<String>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut frames = frames.into_iter();
        while let Ok((stream, _)) = listener.accept().await {
            let Ok(mut socket) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            if let Some(frame) = frames.next() {
                socket.send(Message::Text(frame)).await.ok();
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            socket.close(None).await.ok();
        }
    });
    addr
}

#[tokio::test]
async fn feed_batches_survive_reconnects() {
    let frames = vec![
        batch(&[("F1", "SD-B100", 35.0, 31.0)]).to_string(),
        "{not json".to_string(),
        batch(&[("F1", "SD-B100", 35.2, 31.2)]).to_string(),
    ];
    let feed_addr = spawn_feed(frames).await;

    let config = Config {
        feed_url: Some(format!("ws://{}", feed_addr)),
        ..test_config()
    };
    let (_addr, state, runtime) = spawn_server(config).await;

    let mut snapshots = state.watch_snapshots();
    tokio::time::timeout(
        Duration::from_secs(5),
        snapshots.wait_for(|s| s.get("F1").is_some_and(|d| d.flight_time_ticks == 1)),
    )
    .await
    .expect("feed batches applied")
    .unwrap();

    let snapshot = state.snapshot();
    let drone = snapshot.get("F1").unwrap();
    assert_eq!(drone.path.len(), 2);
    assert!(drone.authorized);
    assert_ne!(state.feed_status(), FeedStatus::Disabled);

    runtime.shutdown().await;
    assert_eq!(state.feed_status(), FeedStatus::Disconnected);
    // Store contents outlive the feed connection.
    assert!(state.snapshot().get("F1").is_some());
}

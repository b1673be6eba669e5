//! Change stream subscription.

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use sager_core::StreamEvent;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Narrow the stream to one drone and/or one classification.
#[derive(Debug, Clone, Default)]
pub struct StreamFilter {
    pub drone_id: Option<String>,
    pub authorized: Option<bool>,
}

/// Live `/v1/stream` connection.
pub struct TrackStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TrackStream {
    pub(crate) async fn connect(base_url: &str, filter: &StreamFilter) -> Result<Self> {
        let url = build_ws_url(base_url, "/v1/stream", filter)?;
        let (socket, _) = connect_async(url.as_str()).await?;
        Ok(Self { socket })
    }

    /// Next event from the server (returns None on close).
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>> {
        while let Some(msg) = self.socket.next().await {
            match msg? {
                Message::Text(text) => match serde_json::from_str(&text) {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => tracing::warn!("Ignoring unknown stream frame: {}", e),
                },
                Message::Ping(payload) => self.socket.send(Message::Pong(payload)).await?,
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }
}

fn build_ws_url(base: &str, path: &str, filter: &StreamFilter) -> Result<Url> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => other,
    }
    .to_string();

    url.set_scheme(&scheme)
        .map_err(|_| anyhow::anyhow!("Invalid base URL scheme"))?;
    url.set_path(path);
    {
        let mut query = url.query_pairs_mut();
        if let Some(drone_id) = filter.drone_id.as_deref() {
            query.append_pair("drone_id", drone_id);
        }
        if let Some(authorized) = filter.authorized {
            query.append_pair("authorized", if authorized { "true" } else { "false" });
        }
    }
    // Drop the dangling `?` left when no filter applies.
    if url.query() == Some("") {
        url.set_query(None);
    }
    Ok(url)
}

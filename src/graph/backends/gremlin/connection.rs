//! Pooled WebSocket connections to a Gremlin endpoint.

use std::time::Duration;

use deadpool::managed::{self, Metrics, RecycleError, RecycleResult};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::config::GremlinConfig;
use crate::error::GraphError;

use super::protocol::Response;

/// A single WebSocket connection checked out of the pool.
pub struct GremlinConnection {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Set while a request is outstanding. A connection returned with the
    /// flag still set was abandoned mid-response and is not reused.
    pub(crate) busy: bool,
}

impl GremlinConnection {
    pub async fn send(&mut self, frame: Vec<u8>) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        self.socket.send(Message::Binary(frame)).await
    }

    /// Waits for the next response message, skipping control frames.
    pub async fn receive(&mut self) -> Result<Response, GraphError> {
        loop {
            let message = match self.socket.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(GraphError::query("WebSocket read failed", "", e)),
                None => return Err(GraphError::rejected("connection closed by server", "")),
            };

            match message {
                Message::Text(text) => return Response::from_slice(text.as_bytes()),
                Message::Binary(bytes) => return Response::from_slice(&bytes),
                Message::Close(frame) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_default();
                    return Err(GraphError::rejected(
                        format!("connection closed by server: {}", reason),
                        "",
                    ));
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    /// Sends a ping and waits up to `wait` for the pong.
    async fn ping(&mut self, wait: Duration) -> Result<(), GraphError> {
        self.socket
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| GraphError::query("keep-alive ping failed", "", e))?;

        let pong = async {
            loop {
                match self.socket.next().await {
                    Some(Ok(Message::Pong(_))) => return Ok(()),
                    Some(Ok(Message::Ping(_))) => continue,
                    Some(Ok(other)) => {
                        return Err(GraphError::rejected(
                            format!("unexpected message while idle: {:?}", other),
                            "",
                        ))
                    }
                    Some(Err(e)) => return Err(GraphError::query("keep-alive ping failed", "", e)),
                    None => return Err(GraphError::rejected("connection closed by server", "")),
                }
            }
        };

        tokio::time::timeout(wait, pong)
            .await
            .map_err(|e| GraphError::query("keep-alive ping timed out", "", e))?
    }
}

/// Opens, checks and retires [`GremlinConnection`]s for the pool.
pub struct GremlinManager {
    endpoint: String,
    reconnection_attempts: u32,
    reconnection_base_delay: Duration,
    keep_alive_interval: Duration,
}

impl GremlinManager {
    pub fn new(config: &GremlinConfig) -> Self {
        Self {
            endpoint: config.endpoint(),
            reconnection_attempts: config.reconnection_attempts,
            reconnection_base_delay: config.reconnection_base_delay(),
            keep_alive_interval: config.keep_alive_interval(),
        }
    }

    /// Delay before retry number `attempt` (zero based).
    fn backoff(&self, attempt: u32) -> Duration {
        self.reconnection_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl managed::Manager for GremlinManager {
    type Type = GremlinConnection;
    type Error = GraphError;

    async fn create(&self) -> Result<GremlinConnection, GraphError> {
        let mut attempt = 0;
        loop {
            match connect_async(self.endpoint.as_str()).await {
                Ok((socket, _)) => {
                    debug!(endpoint = %self.endpoint, "Opened Gremlin connection");
                    return Ok(GremlinConnection {
                        socket,
                        busy: false,
                    });
                }
                Err(e) if attempt < self.reconnection_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        endpoint = %self.endpoint,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Gremlin connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(GraphError::query(
                        format!("failed to connect to {}", self.endpoint),
                        "",
                        e,
                    ))
                }
            }
        }
    }

    async fn recycle(
        &self,
        conn: &mut GremlinConnection,
        metrics: &Metrics,
    ) -> RecycleResult<GraphError> {
        if conn.busy {
            warn!(endpoint = %self.endpoint, "Discarding connection abandoned mid-response");
            return Err(RecycleError::Message(
                "connection abandoned mid-response".into(),
            ));
        }

        if metrics.last_used() >= self.keep_alive_interval {
            if let Err(e) = conn.ping(self.keep_alive_interval).await {
                warn!(endpoint = %self.endpoint, error = %e, "Keep-alive failed, replacing connection");
                return Err(RecycleError::Backend(e));
            }
        }
        Ok(())
    }
}

pub type GremlinPool = managed::Pool<GremlinManager>;

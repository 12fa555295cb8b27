//! Seams to the outside world: the push-based state source, the map document store and
//! the append-only command sink, plus their implementation against the relay server.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use shared::{
    domain::{MapData, MapId},
    error::ApiError,
    protocol::{AppendResponse, StateFrame},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ClientError;

const SUBSCRIPTION_BUFFER: usize = 64;

/// Live stream of snapshots for one state path.
///
/// Dropping the subscription (or calling [`Subscription::unsubscribe`]) stops the
/// background reader, so no listener outlives its owner.
pub struct Subscription {
    path: String,
    frames: ReceiverStream<Value>,
    reader: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(path: impl Into<String>, rx: mpsc::Receiver<Value>, reader: Option<JoinHandle<()>>) -> Self {
        Self {
            path: path.into(),
            frames: ReceiverStream::new(rx),
            reader,
        }
    }

    /// A subscription fed by hand, for local sources and tests.
    pub fn channel(path: impl Into<String>) -> (mpsc::Sender<Value>, Self) {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        (tx, Self::new(path, rx, None))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn unsubscribe(mut self) {
        self.stop_reader();
    }

    fn stop_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            debug!(path = %self.path, "unsubscribing from state path");
            reader.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop_reader();
    }
}

impl Stream for Subscription {
    type Item = Value;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Value>> {
        Pin::new(&mut self.get_mut().frames).poll_next(cx)
    }
}

#[async_trait]
pub trait StateSource: Send + Sync {
    async fn subscribe(&self, path: &str) -> Result<Subscription, ClientError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` means the document does not exist.
    async fn fetch_map(&self, map_id: &MapId) -> Result<Option<MapData>, ClientError>;
}

#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Appends `value` under `path` and returns the generated child id.
    async fn append(&self, path: &str, value: Value) -> Result<String, ClientError>;
}

/// HTTP + websocket client for the relay server.
#[derive(Clone)]
pub struct RelayClient {
    http: Client,
    server_url: String,
}

impl RelayClient {
    pub fn new(server_url: impl Into<String>) -> Result<Self, ClientError> {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(ClientError::InvalidServerUrl(server_url));
        }
        Ok(Self {
            http: Client::new(),
            server_url,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn ws_url(&self, path: &str) -> Result<Url, ClientError> {
        let ws_base = if self.server_url.starts_with("https://") {
            self.server_url.replacen("https://", "wss://", 1)
        } else {
            self.server_url.replacen("http://", "ws://", 1)
        };
        let mut url = Url::parse(&format!("{ws_base}/ws/state"))?;
        url.query_pairs_mut().append_pair("path", path);
        Ok(url)
    }

    fn state_url(&self, route: &str, path: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&format!("{}{route}", self.server_url))?;
        url.query_pairs_mut().append_pair("path", path);
        Ok(url)
    }

    /// Replaces the node at `path`. Used by feeders; the dashboard itself only appends.
    pub async fn set_state(&self, path: &str, value: &Value) -> Result<(), ClientError> {
        self.http
            .put(self.state_url("/state", path)?)
            .json(value)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn put_map(&self, map_id: &MapId, map: &MapData) -> Result<(), ClientError> {
        self.http
            .put(format!("{}/maps/{map_id}", self.server_url))
            .json(map)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl StateSource for RelayClient {
    async fn subscribe(&self, path: &str) -> Result<Subscription, ClientError> {
        let url = self.ws_url(path)?;
        let (ws_stream, _) =
            connect_async(url.as_str())
                .await
                .map_err(|source| ClientError::Connect {
                    url: url.to_string(),
                    source: Box::new(source),
                })?;
        let (_, mut ws_reader) = ws_stream.split();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let subscribed_path = path.to_string();
        info!(path = %subscribed_path, "subscribed to state path");

        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<StateFrame>(&text) {
                        Ok(frame) => {
                            if tx.send(frame.value).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(path = %subscribed_path, error = %err, "invalid state frame");
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(path = %subscribed_path, error = %err, "state websocket receive failed");
                        break;
                    }
                }
            }
            debug!(path = %subscribed_path, "state stream ended");
        });

        Ok(Subscription::new(path, rx, Some(reader)))
    }
}

#[async_trait]
impl DocumentStore for RelayClient {
    async fn fetch_map(&self, map_id: &MapId) -> Result<Option<MapData>, ClientError> {
        let res = self
            .http
            .get(format!("{}/maps/{map_id}", self.server_url))
            .send()
            .await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status();
            return match res.json::<ApiError>().await {
                Ok(api_error) => Err(ClientError::Api(api_error)),
                Err(_) => Err(ClientError::Api(ApiError::new(
                    shared::error::ErrorCode::Internal,
                    format!("map fetch returned {status}"),
                ))),
            };
        }
        Ok(Some(res.json().await?))
    }
}

#[async_trait]
impl CommandSink for RelayClient {
    async fn append(&self, path: &str, value: Value) -> Result<String, ClientError> {
        let res = self
            .http
            .post(self.state_url("/state/append", path)?)
            .json(&value)
            .send()
            .await?
            .error_for_status()?;
        let body: AppendResponse = res.json().await?;
        Ok(body.id)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;

use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server_url must start with http:// or https://, got '{0}'")]
    InvalidServerUrl(String),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to connect websocket {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("server rejected request: {0}")]
    Api(#[from] ApiError),
    #[error("local cache failure: {0}")]
    Cache(#[source] anyhow::Error),
}

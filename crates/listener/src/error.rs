use tokio_tungstenite::tungstenite;

/// Errors raised while talking to the realtime feed or the jobs API.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Channel join rejected: {0}")]
    JoinRejected(String),

    #[error("Realtime channel closed: {0}")]
    ChannelClosed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed message: {0}")]
    Decode(#[from] serde_json::Error),

    /// A newer request replaced this one before it finished.
    #[error("Request superseded")]
    Superseded,
}

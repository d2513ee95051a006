use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A failure reported by the other side of the channel, already worded
    #[error("{0}")]
    Relay(String),

    #[error("{0}")]
    Config(String),

    #[error("Storage changed concurrently (expected revision {expected}, found {found})")]
    Conflict { expected: u64, found: u64 },

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Speech recognition error: {0}")]
    Speech(String),

    #[error("JS interop error: {0}")]
    JsInterop(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for PanelError {
    fn from(e: serde_json::Error) -> Self {
        PanelError::Serialization(e.to_string())
    }
}

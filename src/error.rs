use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP response: {0}")]
    Http(String),

    #[error("failed to parse tracking response: {0}")]
    Parse(String),

    #[error("webhook delivery failed: {0}")]
    Delivery(String),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl TrackerError {
    /// Whether the next poll gets another chance at what failed. A failed
    /// delivery is not resent because the record is already marked as seen.
    pub const fn retried_next_poll(&self) -> bool {
        !matches!(self, Self::Delivery(_))
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

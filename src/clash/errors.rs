use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClashApiError {
    #[error("Missing Clash of Clans API token")]
    MissingToken,

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Not found")]
    NotFound,

    #[error("Clash of Clans API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum WarCacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

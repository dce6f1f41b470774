use thiserror::Error;

use stockwatch_inventory::LayoutError;

/// Failure to obtain a fresh snapshot. Aborts the run; nothing is persisted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("sheets authentication failed: {0}")]
    Auth(String),

    #[error("sheets request failed: {0}")]
    Network(String),

    #[error("sheets api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("sheet data is malformed: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}

impl From<LayoutError> for FetchError {
    fn from(value: LayoutError) -> Self {
        Self::Malformed(value.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        Self::Network(value.to_string())
    }
}

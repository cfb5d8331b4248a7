/// Error types shared by the store, export and browser layers
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, TabKeeperError>;

/// Errors that can surface to the user.
///
/// Duplicate-policy rejections and missing group/tab indices are not errors:
/// the former are reported as a `rejected` url list, the latter are logged
/// and turned into no-ops.
#[derive(Error, Debug)]
pub enum TabKeeperError {
    /// The key-value store failed to read or write
    #[error("storage error: {0}")]
    Storage(String),

    /// A persisted record could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The remote document API answered with a non-success status
    #[error("remote export failed: {status} {body}")]
    Remote { status: u16, body: String },

    /// The remote document API could not be reached
    #[error("failed to reach the remote document API: {0}")]
    Network(String),

    /// The local file download could not be triggered
    #[error("download failed: {0}")]
    Download(String),

    /// The browser tab API refused an open/close/query call
    #[error("tab API error: {0}")]
    TabApi(String),

    #[error("a group named \"{0}\" already exists")]
    DuplicateGroupName(String),

    #[error("invalid group name")]
    InvalidGroupName,

    #[error("invalid settings file: {0}")]
    InvalidSettingsBundle(String),
}

impl From<reqwest::Error> for TabKeeperError {
    fn from(error: reqwest::Error) -> Self {
        TabKeeperError::Network(error.to_string())
    }
}

impl From<url::ParseError> for TabKeeperError {
    fn from(error: url::ParseError) -> Self {
        TabKeeperError::Network(format!("invalid endpoint: {}", error))
    }
}

impl TabKeeperError {
    /// True for failures of the remote document API (status or transport)
    pub fn is_remote(&self) -> bool {
        matches!(self, TabKeeperError::Remote { .. } | TabKeeperError::Network(_))
    }
}

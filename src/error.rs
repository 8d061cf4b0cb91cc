use std::path::PathBuf;

use thiserror::Error;

/// Failures that terminate a command with exit status 1.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("configuration error ({path}): {reason}")]
    Configuration { path: PathBuf, reason: String },

    /// Transport failure, undecodable body or non-2xx answer (`status` set).
    #[error(
        "remote fetch failed{}: {message}",
        .status.map(|status| format!(" with status {status}")).unwrap_or_default()
    )]
    RemoteFetch {
        status: Option<u16>,
        message: String,
    },

    #[error("test run submission returned no job id")]
    MissingJobId,

    #[error("report rendering failed ({path}): {reason}")]
    Rendering { path: PathBuf, reason: String },
}

impl ToolError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            status: None,
            message: message.into(),
        }
    }

    pub fn remote_status(status: u16, body: impl Into<String>) -> Self {
        Self::RemoteFetch {
            status: Some(status),
            message: body.into(),
        }
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        Self::RemoteFetch {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}

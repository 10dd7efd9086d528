use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type ApiError = (StatusCode, Json<ServerError>);

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ServerError {
    pub detail: String,
}

impl ServerError {
    pub fn with_message<S: Into<String>>(message: S) -> Self {
        ServerError {
            detail: message.into(),
        }
    }

    pub fn into_api_error(self, status: StatusCode) -> ApiError {
        (status, Json(self))
    }
}

impl From<String> for ServerError {
    fn from(str: String) -> Self {
        ServerError::with_message(str)
    }
}

impl From<&str> for ServerError {
    fn from(str: &str) -> Self {
        ServerError::with_message(str)
    }
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Failed to run yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("yt-dlp exited with status {code:?}: {message}")]
    ExtractorFailed { code: Option<i32>, message: String },

    #[error("No converted audio file found in {0:?}")]
    OutputMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write library index: {0}")]
    Index(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
#[error("The download queue is no longer accepting jobs")]
pub struct QueueClosed;

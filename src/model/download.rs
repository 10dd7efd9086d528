use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadRequest {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileListResponse {
    pub files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub id: Uuid,
    pub url: String,
}

impl DownloadJob {
    pub fn new<S: Into<String>>(url: S) -> Self {
        DownloadJob {
            id: Uuid::new_v4(),
            url: url.into(),
        }
    }
}

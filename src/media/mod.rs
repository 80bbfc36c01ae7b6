pub mod imagekit;
pub mod spool;

use std::path::Path;

use async_trait::async_trait;

pub use imagekit::ImageKitClient;
pub use spool::SpooledUpload;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request to media host failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Media host rejected upload with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response from media host: {0}")]
    InvalidResponse(String),
}

/// Options forwarded to the host with every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub use_unique_file_name: bool,
    pub tags: Vec<String>,
}

/// Where the host stored an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    /// Public URL of the stored file; never empty.
    pub url: String,
    /// File name as stored by the host (may differ when made unique).
    pub name: String,
    pub file_id: Option<String>,
}

/// External service that stores media files and serves them publicly.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload the file at `path` under `file_name`.
    async fn upload(
        &self,
        path: &Path,
        file_name: &str,
        options: &UploadOptions,
    ) -> Result<UploadedMedia, MediaError>;
}

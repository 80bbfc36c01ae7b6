use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::MediaConfig;
use crate::media::{MediaError, MediaHost, UploadOptions, UploadedMedia};

/// Client for an ImageKit-compatible upload endpoint.
/// Authenticates with HTTP basic auth: the private key as user, empty password.
pub struct ImageKitClient {
    client: reqwest::Client,
    upload_url: String,
    private_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
}

impl ImageKitClient {
    pub fn new(config: &MediaConfig) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            upload_url: config.upload_url.clone(),
            private_key: config.private_key.clone().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl MediaHost for ImageKitClient {
    async fn upload(
        &self,
        path: &Path,
        file_name: &str,
        options: &UploadOptions,
    ) -> Result<UploadedMedia, MediaError> {
        // Streamed from disk; the body is never held in memory whole
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();

        let part = multipart::Part::stream_with_length(reqwest::Body::from(file), size)
            .file_name(file_name.to_string());
        let mut form = multipart::Form::new()
            .part("file", part)
            .text("fileName", file_name.to_string())
            .text("useUniqueFileName", options.use_unique_file_name.to_string());
        if !options.tags.is_empty() {
            form = form.text("tags", options.tags.join(","));
        }

        tracing::debug!(file_name, size, "Uploading to media host");

        let response = self
            .client
            .post(&self.upload_url)
            .basic_auth(&self.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response.json().await?;
        if body.url.is_empty() {
            return Err(MediaError::InvalidResponse(
                "upload response carried no url".into(),
            ));
        }

        tracing::info!(file_name = %body.name, url = %body.url, "Uploaded media");

        Ok(UploadedMedia {
            name: if body.name.is_empty() {
                file_name.to_string()
            } else {
                body.name
            },
            url: body.url,
            file_id: body.file_id,
        })
    }
}

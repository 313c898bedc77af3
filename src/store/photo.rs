//! Photo storage behind a narrow upload/delete contract.

use async_trait::async_trait;
use image::ImageFormat;
use reqwest::Client;
use uuid::Uuid;

use crate::error::AppError;

/// Upload bytes, get back a public URL. The image format is sniffed
/// from the content, never trusted from client-supplied metadata.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn upload(&self, bytes: &[u8]) -> Result<String, AppError>;

    /// Best-effort removal of an uploaded photo. Callers log failures
    /// instead of surfacing them.
    async fn delete(&self, url: &str) -> Result<(), AppError>;
}

/// Supabase Storage REST client.
pub struct SupabasePhotoStore {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabasePhotoStore {
    pub fn new(base_url: &str, api_key: &str, bucket: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
        }
    }
}

fn sniff_format(bytes: &[u8]) -> Result<(&'static str, &'static str), AppError> {
    let unsupported =
        || AppError::Validation("Unsupported image format; expected JPEG, PNG or WebP".to_string());

    match image::guess_format(bytes).map_err(|_| unsupported())? {
        ImageFormat::Jpeg => Ok(("jpg", "image/jpeg")),
        ImageFormat::Png => Ok(("png", "image/png")),
        ImageFormat::WebP => Ok(("webp", "image/webp")),
        _ => Err(unsupported()),
    }
}

#[async_trait]
impl PhotoStore for SupabasePhotoStore {
    async fn upload(&self, bytes: &[u8]) -> Result<String, AppError> {
        let (ext, content_type) = sniff_format(bytes)?;

        let object_path = format!("{}/{}.{}", self.bucket, Uuid::new_v4(), ext);
        let upload_url = format!("{}/storage/v1/object/{}", self.base_url, object_path);

        let resp = self
            .client
            .post(&upload_url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "photo upload request failed");
                AppError::Internal("Photo upload failed".to_string())
            })?;

        if !resp.status().is_success() {
            tracing::error!(status = %resp.status(), path = %object_path, "photo upload rejected");
            return Err(AppError::Internal("Photo upload failed".to_string()));
        }

        Ok(format!(
            "{}/storage/v1/object/public/{}",
            self.base_url, object_path
        ))
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        // Public URLs look like {base}/storage/v1/object/public/{bucket}/{name}
        let object_path = url
            .strip_prefix(&format!("{}/storage/v1/object/public/", self.base_url))
            .ok_or_else(|| AppError::Validation("URL is not in this photo store".to_string()))?;

        let delete_url = format!("{}/storage/v1/object/{}", self.base_url, object_path);
        let resp = self
            .client
            .delete(&delete_url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "photo delete request failed");
                AppError::Internal("Photo delete failed".to_string())
            })?;

        if !resp.status().is_success() {
            return Err(AppError::Internal("Photo delete failed".to_string()));
        }
        Ok(())
    }
}

//! Image upload contract and the local validation that precedes it.

use async_trait::async_trait;

use crate::export::images::to_data_url;
use crate::foundation::config::UploadConfig;
use crate::foundation::error::{CardError, CardResult};
use crate::model::ImageOptions;

/// File handed to the upload collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    /// Declared MIME type, if the caller knows one.
    pub mime: Option<String>,
    pub name: Option<String>,
}

impl Blob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: None,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Result of an upload: a hosted URL or the collaborator's error message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Url(String),
    Error(String),
}

/// Asset upload collaborator.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(&self, blob: Blob) -> UploadOutcome;
}

/// Uploader that "hosts" blobs as `data:` URLs; for offline use and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineUploader;

#[async_trait]
impl AssetUploader for InlineUploader {
    async fn upload(&self, blob: Blob) -> UploadOutcome {
        let mime = blob.mime.as_deref().unwrap_or("application/octet-stream");
        UploadOutcome::Url(to_data_url(mime, &blob.bytes))
    }
}

/// Check size and sniffed type against the field's limits (or the editor-wide defaults).
///
/// Returns the sniffed MIME type.
pub fn validate_upload(
    blob: &Blob,
    options: &ImageOptions,
    cfg: &UploadConfig,
) -> CardResult<&'static str> {
    if blob.bytes.is_empty() {
        return Err(CardError::validation("upload is empty"));
    }
    let max = options.max_bytes.unwrap_or(cfg.max_bytes);
    if blob.bytes.len() as u64 > max {
        return Err(CardError::validation(format!(
            "upload is {} bytes, limit is {max}",
            blob.bytes.len()
        )));
    }
    let format = image::guess_format(&blob.bytes)
        .map_err(|_| CardError::validation("upload is not a recognized image"))?;
    let mime = format.to_mime_type();
    let accepted = if options.accept.is_empty() {
        &cfg.accepted
    } else {
        &options.accept
    };
    if !accepted.iter().any(|a| a.eq_ignore_ascii_case(mime)) {
        return Err(CardError::validation(format!(
            "upload type {mime} is not accepted"
        )));
    }
    if let Some(declared) = &blob.mime
        && !declared.eq_ignore_ascii_case(mime)
    {
        tracing::debug!(declared = %declared, sniffed = mime, "declared upload type ignored");
    }
    Ok(mime)
}

#[cfg(test)]
#[path = "../../tests/unit/collab/upload.rs"]
mod tests;

//! Photo ingestion: validate, name, resize, store.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use storefinder_core::defaults::{PHOTO_MAX_BYTES, PHOTO_MAX_WIDTH};
use storefinder_core::{
    ensure_image_content, ensure_image_mime, generate_photo_filename, resize_to_width, Error,
    PhotoUpload, Result,
};

use crate::config::CatalogConfig;
use crate::file_storage::{FilesystemBackend, StorageBackend};

/// Turns uploaded image bytes into a stored, width-bounded photo file.
///
/// Each successful ingestion writes exactly one file and returns its name.
/// Superseded photos are never removed.
#[derive(Clone)]
pub struct PhotoPipeline {
    backend: Arc<dyn StorageBackend>,
    max_width: u32,
    max_bytes: usize,
}

impl PhotoPipeline {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            max_width: PHOTO_MAX_WIDTH,
            max_bytes: PHOTO_MAX_BYTES,
        }
    }

    /// Pipeline over the configured filesystem directory and limits.
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(FilesystemBackend::new(&config.photo_storage_path))
            .with_max_width(config.photo_max_width)
            .with_max_bytes(config.photo_max_bytes)
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = max_width;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Ingest an optional upload. No upload is the "photo unchanged" case and
    /// yields `Ok(None)` without touching storage.
    pub async fn ingest(&self, upload: Option<PhotoUpload>) -> Result<Option<String>> {
        match upload {
            None => {
                debug!(
                    subsystem = "photos",
                    op = "ingest",
                    "No photo supplied, nothing to ingest"
                );
                Ok(None)
            }
            Some(upload) => self
                .ingest_bytes(upload.bytes, &upload.mime_type)
                .await
                .map(Some),
        }
    }

    /// Validate, resize and store one image. Returns the generated filename.
    ///
    /// Fails with [`Error::UnsupportedMediaType`] before looking at the bytes
    /// when `mime_type` is not `image/*`. Nothing is written on any failure.
    pub async fn ingest_bytes(&self, bytes: Vec<u8>, mime_type: &str) -> Result<String> {
        let start = Instant::now();

        ensure_image_mime(mime_type)?;
        if bytes.len() > self.max_bytes {
            return Err(Error::Validation(format!(
                "Photo is {} bytes, the limit is {}",
                bytes.len(),
                self.max_bytes
            )));
        }
        ensure_image_content(&bytes, mime_type)?;

        let filename = generate_photo_filename(mime_type);
        let max_width = self.max_width;
        let resized = tokio::task::spawn_blocking(move || resize_to_width(&bytes, max_width))
            .await
            .map_err(|e| Error::Internal(format!("photo resize task failed: {}", e)))??;

        self.backend.write(&filename, &resized.bytes).await?;

        info!(
            subsystem = "photos",
            op = "ingest",
            photo = %filename,
            width = resized.width,
            height = resized.height,
            size = resized.bytes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Photo stored"
        );
        Ok(filename)
    }
}

use crate::api::error::AppError;
use crate::models::{CompressionJob, StagedUpload, StoredObject, UploadOptions};
use crate::services::compressor::PdfCompressor;
use crate::services::storage::StorageService;
use crate::services::temp_files::{TempArtifacts, TempFileManager};
use crate::utils::validation::{bytes_to_mb, resolve_storage_path, round_mb};
use bytes::Bytes;
use std::sync::Arc;

/// Compress a staged PDF, enforce the output ceiling, and publish it.
pub struct CompressUploadService {
    compressor: Arc<dyn PdfCompressor>,
    storage: Arc<dyn StorageService>,
    temp_files: TempFileManager,
    preset: String,
    max_output_mb: u64,
}

impl CompressUploadService {
    pub fn new(
        compressor: Arc<dyn PdfCompressor>,
        storage: Arc<dyn StorageService>,
        temp_files: TempFileManager,
        preset: String,
        max_output_mb: u64,
    ) -> Self {
        Self {
            compressor,
            storage,
            temp_files,
            preset,
            max_output_mb,
        }
    }

    pub fn temp_files(&self) -> &TempFileManager {
        &self.temp_files
    }

    /// Every temp path created here is registered in `artifacts`; the caller
    /// owns cleanup.
    pub async fn process(
        &self,
        upload: &StagedUpload,
        options: &UploadOptions,
        artifacts: &mut TempArtifacts,
    ) -> Result<StoredObject, AppError> {
        let output = artifacts.register(self.temp_files.output_path()?);
        let job = CompressionJob {
            source: upload.path.clone(),
            destination: output.clone(),
            preset: self.preset.clone(),
        };
        self.compressor.compress(&job).await?;

        let compressed = Bytes::from(tokio::fs::read(&output).await?);
        let compressed_size_mb = bytes_to_mb(compressed.len() as u64);

        if compressed_size_mb > self.max_output_mb as f64 {
            tracing::warn!(
                "📏 Compressed '{}' is {:.2} MB, over the {} MB limit",
                upload.original_name,
                compressed_size_mb,
                self.max_output_mb
            );
            return Err(AppError::OutputTooLarge {
                limit_mb: self.max_output_mb,
                compressed_size_mb: round_mb(compressed_size_mb),
            });
        }

        let path = resolve_storage_path(
            options.storage_path.as_deref(),
            &upload.original_name,
            options.user_id.as_deref(),
        );

        self.storage
            .upload_new(&path, compressed, mime::APPLICATION_PDF.as_ref())
            .await
            .map_err(AppError::Storage)?;
        let url = self
            .storage
            .public_url(&path)
            .await
            .map_err(AppError::Storage)?;

        let original_size_mb = bytes_to_mb(upload.size);
        tracing::info!(
            "✅ Stored {} ({:.2} MB -> {:.2} MB)",
            path,
            original_size_mb,
            compressed_size_mb
        );

        Ok(StoredObject {
            path,
            url,
            original_size_mb: round_mb(original_size_mb),
            compressed_size_mb: round_mb(compressed_size_mb),
        })
    }
}

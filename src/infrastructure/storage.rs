use crate::config::{StorageBackend, StorageConfig};
use crate::services::storage::{S3StorageService, StorageService, SupabaseStorageService};
use anyhow::{Context, Result};
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &StorageConfig) -> Result<Arc<dyn StorageService>> {
    match config.backend {
        StorageBackend::Supabase => {
            info!("☁️  Supabase Storage: {} (Bucket: {})", config.url, config.bucket);
            let client = reqwest::Client::builder()
                .build()
                .context("Failed to build HTTP client for storage")?;
            Ok(Arc::new(SupabaseStorageService::new(
                client,
                &config.url,
                config.public_base(),
                config.service_key.clone(),
                config.bucket.clone(),
            )))
        }
        StorageBackend::S3 => {
            info!("☁️  S3 Storage: {} (Bucket: {})", config.url, config.bucket);
            let (access_key, secret_key) = config
                .service_key
                .split_once(':')
                .context("STORAGE_SERVICE_KEY must be ACCESS_KEY_ID:SECRET_ACCESS_KEY for the s3 backend")?;

            let aws_config = aws_config::from_env()
                .endpoint_url(&config.url)
                .region(Region::new(config.region.clone()))
                .credentials_provider(Credentials::new(
                    access_key, secret_key, None, None, "static",
                ))
                .load()
                .await;

            let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true)
                .build();

            let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
            Ok(Arc::new(S3StorageService::new(
                s3_client,
                config.bucket.clone(),
                config.public_base(),
            )))
        }
    }
}

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Cache directive attached to every stored object
pub const CACHE_CONTROL: &str = "max-age=3600";

/// Characters escaped in object paths. `/` stays literal so nested paths
/// keep their shape in URLs.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

pub fn encode_object_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE_SET).to_string()
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Stores `data` at `path`. Fails if the path is already taken.
    async fn upload_new(&self, path: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Unauthenticated URL for an object in the bucket
    async fn public_url(&self, path: &str) -> Result<String>;
}

/// Supabase Storage REST API
pub struct SupabaseStorageService {
    client: reqwest::Client,
    base_url: String,
    public_base: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorageService {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        public_base: &str,
        service_key: String,
        bucket: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        }
    }

    fn object_endpoint(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            encode_object_path(&self.bucket),
            encode_object_path(path)
        )
    }
}

/// Pulls a readable message out of a Supabase error body
pub fn supabase_error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "error"]
                .iter()
                .find_map(|key| json.get(key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| format!("Storage upload failed with status {}", status))
}

#[async_trait]
impl StorageService for SupabaseStorageService {
    async fn upload_new(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        let res = self
            .client
            .post(self.object_endpoint(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CACHE_CONTROL, CACHE_CONTROL)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = supabase_error_message(status, &body);
            tracing::error!(
                "Supabase upload failed: bucket={}, path={}, status={}, message={}",
                self.bucket,
                path,
                status,
                message
            );
            bail!(message);
        }
        Ok(())
    }

    async fn public_url(&self, path: &str) -> Result<String> {
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.public_base,
            encode_object_path(&self.bucket),
            encode_object_path(path)
        ))
    }
}

/// Any S3 compatible endpoint, addressed path-style
pub struct S3StorageService {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String, public_base: &str) -> Self {
        Self {
            client,
            bucket,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }
}

pub fn path_style_url(base: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        encode_object_path(bucket),
        encode_object_path(path)
    )
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn upload_new(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        let res = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .cache_control(CACHE_CONTROL)
            .if_none_match("*")
            .send()
            .await;

        if let Err(e) = res {
            let service_error = e.into_service_error();
            if service_error.code() == Some("PreconditionFailed") {
                return Err(anyhow!("The resource already exists: {}", path));
            }
            tracing::error!(
                "S3 put_object failed: bucket={}, key={}, error={:?}",
                self.bucket,
                path,
                service_error
            );
            return Err(anyhow!(service_error));
        }
        Ok(())
    }

    async fn public_url(&self, path: &str) -> Result<String> {
        Ok(path_style_url(&self.public_base, &self.bucket, path))
    }
}

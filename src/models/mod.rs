use std::path::PathBuf;

/// An uploaded file that has already been written to a temp path
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub path: PathBuf,
    pub original_name: String,
    pub size: u64,
}

/// Optional form fields accompanying an upload
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub storage_path: Option<String>,
    pub user_id: Option<String>,
}

/// A single invocation of the external optimizer
#[derive(Debug, Clone)]
pub struct CompressionJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub preset: String,
}

/// Outcome of a successful compress-and-store run
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub path: String,
    pub url: String,
    pub original_size_mb: f64,
    pub compressed_size_mb: f64,
}

use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Keys that must be present (and non-empty) before the service may start.
pub const REQUIRED_KEYS: [&str; 3] = ["STORAGE_URL", "STORAGE_SERVICE_KEY", "STORAGE_BUCKET"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Unknown STORAGE_BACKEND '{0}' (expected 'supabase' or 's3')")]
    InvalidBackend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Supabase,
    S3,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "supabase" => Ok(StorageBackend::Supabase),
            "s3" => Ok(StorageBackend::S3),
            other => Err(ConfigError::InvalidBackend(other.to_string())),
        }
    }
}

/// Remote object storage settings
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Storage endpoint URL
    pub url: String,

    /// Service credential. For S3 this is `ACCESS_KEY_ID:SECRET_ACCESS_KEY`.
    pub service_key: String,

    pub bucket: String,

    /// Region used by the S3 backend (default: "us-east-1")
    pub region: String,

    /// Base for public object URLs, when it differs from `url`
    pub public_url: Option<String>,
}

impl StorageConfig {
    pub fn public_base(&self) -> &str {
        self.public_url
            .as_deref()
            .unwrap_or(&self.url)
            .trim_end_matches('/')
    }
}

/// Process-wide service configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Listen port (default: 4000)
    pub port: u16,

    pub storage: StorageConfig,

    /// Largest compressed output accepted for upload, in MB (default: 95)
    pub max_output_mb: u64,

    /// Largest accepted upload, in MB (default: 600)
    pub max_input_mb: u64,

    /// Ghostscript `-dPDFSETTINGS` preset (default: "/printer")
    pub compression_preset: String,

    /// Ghostscript executable (default: "gs")
    pub ghostscript_bin: String,

    /// Scratch directory for uploads and compressed output
    pub tmp_dir: PathBuf,
}

impl ServiceConfig {
    pub const DEFAULT_PORT: u16 = 4000;
    pub const DEFAULT_MAX_OUTPUT_MB: u64 = 95;
    pub const DEFAULT_MAX_INPUT_MB: u64 = 600;
    pub const DEFAULT_PRESET: &'static str = "/printer";

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset. All missing required keys are
    /// collected before failing so the operator sees them in one go.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|&key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let backend = match get("STORAGE_BACKEND") {
            Some(v) => v.parse()?,
            None => StorageBackend::Supabase,
        };

        let storage = StorageConfig {
            backend,
            url: get("STORAGE_URL").unwrap_or_default(),
            service_key: get("STORAGE_SERVICE_KEY").unwrap_or_default(),
            bucket: get("STORAGE_BUCKET").unwrap_or_default(),
            region: get("STORAGE_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            public_url: get("STORAGE_PUBLIC_URL"),
        };

        Ok(Self {
            port: parse_or_default("PORT", get("PORT"), Self::DEFAULT_PORT),
            storage,
            max_output_mb: parse_or_default(
                "MAX_OUTPUT_MB",
                get("MAX_OUTPUT_MB"),
                Self::DEFAULT_MAX_OUTPUT_MB,
            ),
            max_input_mb: parse_or_default(
                "MAX_INPUT_MB",
                get("MAX_INPUT_MB"),
                Self::DEFAULT_MAX_INPUT_MB,
            ),
            compression_preset: get("COMPRESSION_PRESET")
                .unwrap_or_else(|| Self::DEFAULT_PRESET.to_string()),
            ghostscript_bin: get("GHOSTSCRIPT_BIN").unwrap_or_else(|| "gs".to_string()),
            tmp_dir: get("TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join("pdf-compressor")),
        })
    }

    pub fn max_input_bytes(&self) -> usize {
        (self.max_input_mb as usize).saturating_mul(1024 * 1024)
    }

    /// Creates the temp directory if needed. Safe to call repeatedly.
    pub async fn ensure_tmp_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.tmp_dir).await
    }
}

fn parse_or_default<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match value {
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}='{}', using default {}", key, v, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("STORAGE_URL", "https://project.supabase.co"),
        ("STORAGE_SERVICE_KEY", "service-role-key"),
        ("STORAGE_BUCKET", "pdfs"),
    ];

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.max_output_mb, 95);
        assert_eq!(config.max_input_mb, 600);
        assert_eq!(config.compression_preset, "/printer");
        assert_eq!(config.ghostscript_bin, "gs");
        assert_eq!(config.tmp_dir, env::temp_dir().join("pdf-compressor"));
        assert_eq!(config.storage.backend, StorageBackend::Supabase);
        assert_eq!(config.storage.region, "us-east-1");
        assert_eq!(config.storage.public_base(), "https://project.supabase.co");
        assert_eq!(config.max_input_bytes(), 600 * 1024 * 1024);
    }

    #[test]
    fn test_missing_keys_are_all_reported() {
        let err = ServiceConfig::from_lookup(lookup(&[("STORAGE_URL", "http://x")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec!["STORAGE_SERVICE_KEY", "STORAGE_BUCKET"])
        );
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: STORAGE_SERVICE_KEY, STORAGE_BUCKET"
        );
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let err = ServiceConfig::from_lookup(lookup(&[
            ("STORAGE_URL", "http://x"),
            ("STORAGE_SERVICE_KEY", "  "),
            ("STORAGE_BUCKET", "pdfs"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing(vec!["STORAGE_SERVICE_KEY"]));
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("MAX_OUTPUT_MB", "10"),
            ("MAX_INPUT_MB", "50"),
            ("COMPRESSION_PRESET", "/ebook"),
            ("TMP_DIR", "/var/tmp/pdf"),
            ("STORAGE_BACKEND", "S3"),
            ("STORAGE_PUBLIC_URL", "https://cdn.example.com/"),
        ]);
        let config = ServiceConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_output_mb, 10);
        assert_eq!(config.max_input_mb, 50);
        assert_eq!(config.compression_preset, "/ebook");
        assert_eq!(config.tmp_dir, PathBuf::from("/var/tmp/pdf"));
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.public_base(), "https://cdn.example.com");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("PORT", "not-a-port"), ("MAX_OUTPUT_MB", "-3")]);
        let config = ServiceConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.max_output_mb, 95);
    }

    #[test]
    fn test_unknown_backend() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("STORAGE_BACKEND", "ftp"));
        let err = ServiceConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::InvalidBackend("ftp".to_string()));
    }

    #[tokio::test]
    async fn test_ensure_tmp_dir_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b/c");
        let nested_str = nested.to_string_lossy().to_string();
        let mut pairs: Vec<(&str, &str)> = REQUIRED.to_vec();
        pairs.push(("TMP_DIR", nested_str.as_str()));
        let config = ServiceConfig::from_lookup(lookup(&pairs)).unwrap();

        config.ensure_tmp_dir().await.unwrap();
        config.ensure_tmp_dir().await.unwrap();
        assert!(nested.is_dir());
    }
}

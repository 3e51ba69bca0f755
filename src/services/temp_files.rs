use crate::utils::validation::sanitize_filename;
use chrono::Utc;
use std::io;
use std::path::PathBuf;
use tempfile::TempPath;
use tracing::warn;

/// Hands out scratch paths inside the configured temp directory
#[derive(Debug, Clone)]
pub struct TempFileManager {
    dir: PathBuf,
}

impl TempFileManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path for a raw upload: `{millis}-{sanitized original name}`.
    ///
    /// Two uploads with the same name in the same millisecond share a path.
    pub fn upload_path(&self, original_name: &str) -> PathBuf {
        self.dir.join(format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_filename(original_name)
        ))
    }

    /// Reserves a unique `compressed-*.pdf` path for optimizer output
    pub fn output_path(&self) -> io::Result<TempPath> {
        Ok(tempfile::Builder::new()
            .prefix("compressed-")
            .suffix(".pdf")
            .tempfile_in(&self.dir)?
            .into_temp_path())
    }
}

/// Temp files owned by one request.
///
/// `cleanup` removes them and reports failures as warnings. Anything still
/// registered when the value is dropped is removed silently.
#[derive(Debug, Default)]
pub struct TempArtifacts {
    paths: Vec<TempPath>,
}

impl TempArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: TempPath) -> PathBuf {
        let owned = path.to_path_buf();
        self.paths.push(path);
        owned
    }

    /// Takes ownership of a path that may not exist yet
    pub fn track(&mut self, path: impl Into<PathBuf>) -> io::Result<PathBuf> {
        Ok(self.register(TempPath::try_from_path(path.into())?))
    }

    /// Removes every registered file and returns how many removals failed.
    pub fn cleanup(mut self) -> usize {
        let mut failures = 0;
        for path in self.paths.drain(..) {
            let shown = path.to_path_buf();
            match path.close() {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    failures += 1;
                    warn!("⚠️  Could not remove temp file {}: {}", shown.display(), e);
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_path_is_sanitized_and_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());
        let path = manager.upload_path("my report (final).pdf");

        assert_eq!(path.parent().unwrap(), dir.path());
        let name = path.file_name().unwrap().to_str().unwrap();
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(rest, "my_report__final_.pdf");
    }

    #[test]
    fn test_output_paths_are_unique_pdf_paths() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());
        let a = manager.output_path().unwrap();
        let b = manager.output_path().unwrap();

        assert_ne!(a.to_path_buf(), b.to_path_buf());
        assert_eq!(a.extension().unwrap(), "pdf");
        assert!(a.starts_with(dir.path()));
    }

    #[test]
    fn test_cleanup_removes_files_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::new(dir.path());
        let mut artifacts = TempArtifacts::new();

        let upload = artifacts.track(manager.upload_path("in.pdf")).unwrap();
        std::fs::write(&upload, b"%PDF-1.4").unwrap();
        let output = artifacts.register(manager.output_path().unwrap());
        let never_written = artifacts.track(dir.path().join("ghost.pdf")).unwrap();

        assert_eq!(artifacts.cleanup(), 0);
        assert!(!upload.exists());
        assert!(!output.exists());
        assert!(!never_written.exists());
    }

    #[test]
    fn test_cleanup_failure_is_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-file");
        std::fs::create_dir(&blocker).unwrap();

        let mut artifacts = TempArtifacts::new();
        artifacts.track(&blocker).unwrap();
        let file = artifacts.track(dir.path().join("real.pdf")).unwrap();
        std::fs::write(&file, b"data").unwrap();

        assert_eq!(artifacts.cleanup(), 1);
        assert!(!file.exists());
        assert!(blocker.is_dir());
    }

    #[test]
    fn test_drop_removes_registered_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dropped.pdf");
        std::fs::write(&path, b"data").unwrap();
        {
            let mut artifacts = TempArtifacts::new();
            artifacts.track(&path).unwrap();
        }
        assert!(!path.exists());
    }
}

use crate::models::CompressionJob;
use async_trait::async_trait;
use std::ffi::OsString;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Converts one PDF into a smaller one
#[async_trait]
pub trait PdfCompressor: Send + Sync {
    async fn compress(&self, job: &CompressionJob) -> Result<(), CompressionError>;
}

/// Ghostscript `pdfwrite` invocation.
///
/// Runs to completion with no timeout. The output file is whatever
/// Ghostscript leaves behind.
pub struct GhostscriptCompressor {
    program: String,
}

impl GhostscriptCompressor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(job: &CompressionJob) -> Vec<OsString> {
        let mut output_file = OsString::from("-sOutputFile=");
        output_file.push(&job.destination);

        vec![
            "-sDEVICE=pdfwrite".into(),
            "-dCompatibilityLevel=1.5".into(),
            format!("-dPDFSETTINGS={}", job.preset).into(),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
            output_file,
            job.source.clone().into_os_string(),
        ]
    }
}

#[async_trait]
impl PdfCompressor for GhostscriptCompressor {
    async fn compress(&self, job: &CompressionJob) -> Result<(), CompressionError> {
        debug!(
            "Compressing {} -> {} (preset {})",
            job.source.display(),
            job.destination.display(),
            job.preset
        );

        let output = Command::new(&self.program)
            .args(Self::args(job))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CompressionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("{} failed: {}", self.program, stderr);
            return Err(CompressionError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job() -> CompressionJob {
        CompressionJob {
            source: PathBuf::from("/tmp/in.pdf"),
            destination: PathBuf::from("/tmp/out.pdf"),
            preset: "/printer".to_string(),
        }
    }

    #[test]
    fn test_ghostscript_args() {
        let args: Vec<String> = GhostscriptCompressor::args(&job())
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(
            args,
            vec![
                "-sDEVICE=pdfwrite",
                "-dCompatibilityLevel=1.5",
                "-dPDFSETTINGS=/printer",
                "-dNOPAUSE",
                "-dQUIET",
                "-dBATCH",
                "-sOutputFile=/tmp/out.pdf",
                "/tmp/in.pdf",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let compressor = GhostscriptCompressor::new("definitely-not-a-real-ghostscript-binary");
        let err = compressor.compress(&job()).await.unwrap_err();
        assert!(matches!(err, CompressionError::Spawn { .. }));
        assert!(err.to_string().starts_with("Failed to start definitely-not-a-real"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        // `false` ignores its arguments and exits with status 1
        let compressor = GhostscriptCompressor::new("false");
        let err = compressor.compress(&job()).await.unwrap_err();
        match err {
            CompressionError::Failed { status, .. } => assert!(!status.success()),
            other => panic!("unexpected error: {other}"),
        }
    }
}

use crate::models::DocumentName;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STAGING_PREFIX: &str = "word2pdf";

/// Where per-request staging directories are created.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: Option<PathBuf>,
}

impl StagingArea {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Creates a fresh, uniquely named directory owned by one request.
    ///
    /// `tempfile` is synchronous, so creation runs on the blocking pool.
    pub async fn create(&self) -> Result<StagingDir, AppError> {
        let root = self.root.clone();
        let dir = tokio::task::spawn_blocking(move || {
            let mut builder = tempfile::Builder::new();
            builder.prefix(STAGING_PREFIX);
            match &root {
                Some(root) => builder.tempdir_in(root),
                None => builder.tempdir(),
            }
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Staging directory task failed");
            AppError::StagingError(anyhow::Error::new(e))
        })?
        .map_err(|e| {
            tracing::error!(root = ?self.root, error = %e, "Failed to create staging directory");
            AppError::StagingError(anyhow::Error::new(e))
        })?;

        tracing::debug!(path = %dir.path().display(), "Created staging directory");
        Ok(StagingDir { dir })
    }
}

/// Exclusively owned staging directory. Removed with everything in it when
/// dropped; the happy path calls [`StagingDir::close`] instead so the removal
/// stays off the async workers.
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Streams an uploaded multipart field into `<dir>/<file name>`.
    pub async fn persist(
        &self,
        name: &DocumentName,
        field: &mut Field<'_>,
    ) -> Result<(PathBuf, u64), AppError> {
        let input_path = self.path().join(name.file_name());

        let mut file = fs::File::create(&input_path).await.map_err(|e| {
            tracing::error!(path = %input_path.display(), error = %e, "Failed to create staged file");
            AppError::io("Failed to create staged file", e)
        })?;

        let mut written = 0u64;
        while let Some(chunk) = field.chunk().await.map_err(upload_error)? {
            file.write_all(&chunk).await.map_err(|e| {
                tracing::error!(path = %input_path.display(), error = %e, "Failed to save uploaded file");
                AppError::io("Failed to save uploaded file", e)
            })?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| AppError::io("Failed to save uploaded file", e))?;

        Ok((input_path, written))
    }

    /// Finds the converter's output, trying `<stem>_output.pdf` before
    /// `<stem>.pdf`.
    pub async fn locate_output(&self, name: &DocumentName) -> Result<PathBuf, AppError> {
        for candidate in name.output_candidates() {
            let path = self.path().join(&candidate);
            if fs::try_exists(&path).await.unwrap_or(false) {
                tracing::debug!(path = %path.display(), "Found converted PDF");
                return Ok(path);
            }
            tracing::debug!(path = %path.display(), "Converted PDF not at candidate path");
        }

        tracing::error!(
            dir = %self.path().display(),
            stem = %name.stem(),
            "Converter produced no PDF at any candidate path"
        );
        Err(AppError::OutputNotFound)
    }

    /// Removes the directory now, logging instead of failing if that is not possible.
    pub async fn close(self) {
        let path = self.path().to_path_buf();
        let result = tokio::task::spawn_blocking(move || self.dir.close())
            .await
            .map_err(std::io::Error::other)
            .and_then(|closed| closed);
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staging directory");
        }
    }
}

/// Maps a multipart read failure: a body over the upload limit is 413,
/// anything else is a malformed request.
pub(crate) fn upload_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!("Uploaded file exceeds the size limit"))
    } else {
        AppError::BadRequest(anyhow::anyhow!("Failed to read uploaded file: {}", err.body_text()))
    }
}

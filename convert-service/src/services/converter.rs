use service_core::error::AppError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Runs the external office-to-PDF converter (LibreOffice's CLI contract).
#[derive(Debug, Clone)]
pub struct Converter {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Converter {
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Argument list for converting `input` into `out_dir`. Only the two
    /// server-generated paths vary.
    pub fn command_args(input: &Path, out_dir: &Path) -> Vec<OsString> {
        vec![
            "--headless".into(),
            "--convert-to".into(),
            "pdf".into(),
            "--outdir".into(),
            out_dir.as_os_str().to_owned(),
            input.as_os_str().to_owned(),
        ]
    }

    /// Converts `input` to PDF inside `out_dir`.
    ///
    /// Returns the converter's combined output on success. Spawn failures,
    /// non-zero exits and timeouts all become `ConversionFailed`.
    pub async fn convert(&self, input: &Path, out_dir: &Path) -> Result<String, AppError> {
        let args = Self::command_args(input, out_dir);

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(
            program = %self.program.display(),
            args = ?args,
            timeout_secs = ?self.timeout.map(|t| t.as_secs()),
            "Executing converter"
        );

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| {
                    tracing::error!(
                        program = %self.program.display(),
                        timeout_secs = limit.as_secs(),
                        "Converter timed out"
                    );
                    AppError::ConversionFailed {
                        details: format!("converter timed out after {} seconds", limit.as_secs()),
                    }
                })?,
            None => cmd.output().await,
        }
        .map_err(|e| {
            tracing::error!(program = %self.program.display(), error = %e, "Failed to start converter");
            AppError::ConversionFailed {
                details: format!("failed to start {}: {}", self.program.display(), e),
            }
        })?;

        let combined = combined_output(&output);

        if !output.status.success() {
            tracing::error!(
                program = %self.program.display(),
                status = %output.status,
                output = %combined,
                "Converter failed"
            );
            return Err(AppError::ConversionFailed { details: combined });
        }

        if !combined.is_empty() {
            tracing::debug!(output = %combined, "Converter output");
        }

        Ok(combined)
    }
}

/// Stdout followed by stderr, lossily decoded.
fn combined_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

//! Metrics collection and Prometheus export.
//!
//! Initializes the metrics exporter and provides the /metrics endpoint handler.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the metrics recorder.
///
/// This must be called once at startup before any metrics are recorded.
pub fn init_metrics() -> Result<(), AppError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("failed to install Prometheus recorder: {}", e))
    })?;

    METRICS_HANDLE.set(handle).map_err(|_| {
        AppError::InternalError(anyhow::anyhow!("metrics handle already initialized"))
    })
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    Succeeded,
    ConverterFailed,
    OutputMissing,
}

impl ConversionOutcome {
    fn as_str(self) -> &'static str {
        match self {
            ConversionOutcome::Succeeded => "succeeded",
            ConversionOutcome::ConverterFailed => "converter_failed",
            ConversionOutcome::OutputMissing => "output_missing",
        }
    }
}

/// Records one converter run, labelled by outcome and input extension.
pub fn record_conversion(outcome: ConversionOutcome, extension: &str, elapsed: Duration) {
    let labels = [
        ("outcome", outcome.as_str().to_string()),
        ("extension", extension.to_string()),
    ];
    counter!("conversions_total", &labels).increment(1);
    histogram!("conversion_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

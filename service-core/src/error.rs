use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Staging error: {0}")]
    StagingError(anyhow::Error),

    #[error("IO error: {context}: {source}")]
    IoError {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion failed: {details}")]
    ConversionFailed { details: String },

    #[error("Converted PDF not found")]
    OutputNotFound,

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    /// Wraps an I/O failure with a client-facing description of the step that failed.
    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        AppError::IoError { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::UnsupportedFileType(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StagingError(_)
            | AppError::IoError { .. }
            | AppError::ConversionFailed { .. }
            | AppError::OutputNotFound
            | AppError::InternalError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status.as_u16(), error = %self, "Request rejected");
        }

        let (error_message, details) = match self {
            AppError::BadRequest(err) => (err.to_string(), None),
            AppError::UnsupportedFileType(_) => (
                "Unsupported file type. Please upload a Word, Excel or PowerPoint file."
                    .to_string(),
                None,
            ),
            AppError::PayloadTooLarge(err) => (err.to_string(), None),
            AppError::NotFound(err) => (err.to_string(), None),
            AppError::StagingError(_) => ("Failed to create staging directory".to_string(), None),
            AppError::IoError { context, .. } => (context.to_string(), None),
            AppError::ConversionFailed { details } => {
                ("Failed to convert file to PDF".to_string(), Some(details))
            }
            AppError::OutputNotFound => ("Converted PDF file not found".to_string(), None),
            AppError::InternalError(err) => (
                "Internal server error".to_string(),
                Some(format!("{:#}", err)),
            ),
            AppError::ConfigError(err) => {
                ("Configuration error".to_string(), Some(err.to_string()))
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response()
    }
}

pub mod convert;
pub mod health;

pub use convert::convert_document;
pub use health::{health_check, metrics_endpoint};

use axum::http::Uri;
use service_core::error::AppError;

pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(anyhow::anyhow!("No route for {}", uri.path()))
}

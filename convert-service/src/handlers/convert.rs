use crate::models::DocumentName;
use crate::services::staging::upload_error;
use crate::services::{record_conversion, ConversionOutcome};
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use service_core::error::AppError;
use std::time::Instant;

/// Multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

const CONTENT_DESCRIPTION: HeaderName = HeaderName::from_static("content-description");

/// `POST /convert`: office document in, PDF attachment out.
///
/// The staging directory lives exactly as long as this call; every return
/// path, including `?`, drops it.
pub async fn convert_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart = multipart.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("No file uploaded: {}", e.body_text()))
    })?;

    let mut field = loop {
        let next = multipart.next_field().await.map_err(upload_error)?;
        match next {
            Some(field) if field.name() == Some(FILE_FIELD) => break field,
            Some(field) => {
                tracing::debug!(field = ?field.name(), "Skipping multipart field");
            }
            None => return Err(AppError::BadRequest(anyhow::anyhow!("No file uploaded"))),
        }
    };

    let declared = field
        .file_name()
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    tracing::info!(declared_name = %declared, "Received conversion request");

    // Validate before anything touches the disk.
    let name = DocumentName::parse(&declared)?;

    let staging = state.staging.create().await?;
    let (input_path, size) = staging.persist(&name, &mut field).await?;

    tracing::info!(
        path = %input_path.display(),
        size = size,
        extension = %name.extension(),
        "Upload staged"
    );

    let started = Instant::now();
    if let Err(e) = state.converter.convert(&input_path, staging.path()).await {
        record_conversion(ConversionOutcome::ConverterFailed, name.extension(), started.elapsed());
        return Err(e);
    }

    let output_path = match staging.locate_output(&name).await {
        Ok(path) => path,
        Err(e) => {
            record_conversion(ConversionOutcome::OutputMissing, name.extension(), started.elapsed());
            return Err(e);
        }
    };
    record_conversion(ConversionOutcome::Succeeded, name.extension(), started.elapsed());

    let pdf = tokio::fs::read(&output_path).await.map_err(|e| {
        tracing::error!(path = %output_path.display(), error = %e, "Failed to read converted PDF");
        AppError::io("Failed to open converted PDF file", e)
    })?;

    staging.close().await;

    let disposition = HeaderValue::from_str(&content_disposition(&name.pdf_name()))
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Invalid Content-Disposition: {}", e)))?;

    tracing::info!(
        file_name = %name.pdf_name(),
        size = pdf.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Sending converted PDF"
    );

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
            (CONTENT_DESCRIPTION, HeaderValue::from_static("File Transfer")),
        ],
        pdf,
    )
        .into_response())
}

/// `attachment; filename=<name>` for plain ASCII names. Anything else gets a
/// quoted ASCII fallback plus an RFC 5987 `filename*` parameter.
fn content_disposition(file_name: &str) -> String {
    let plain = file_name
        .bytes()
        .all(|b| b.is_ascii_graphic() && !matches!(b, b'"' | b'\\' | b';' | b','));

    if plain {
        return format!("attachment; filename={}", file_name);
    }

    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && !matches!(c, '"' | '\\')) {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_unquoted() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=report.pdf"
        );
    }

    #[test]
    fn names_with_spaces_are_quoted() {
        assert_eq!(
            content_disposition("Q3 Budget.pdf"),
            "attachment; filename=\"Q3 Budget.pdf\"; filename*=UTF-8''Q3%20Budget.pdf"
        );
    }

    #[test]
    fn non_ascii_names_get_encoded_variant() {
        let value = content_disposition("报告.pdf");
        assert!(value.starts_with("attachment; filename=\"__.pdf\""), "{}", value);
        assert!(value.ends_with("filename*=UTF-8''%E6%8A%A5%E5%91%8A.pdf"), "{}", value);
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}

//! Validated name of an uploaded office document.
//!
//! The declared multipart filename is client input; everything the service
//! writes to disk or passes to the converter is derived from the final path
//! segment only.

use service_core::error::AppError;

/// Accepted input extensions, lower-case and without the leading dot.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["doc", "docx", "xls", "xlsx", "ppt", "pptx"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentName {
    file_name: String,
    stem: String,
    extension: String,
}

impl DocumentName {
    /// Parses a declared upload filename.
    ///
    /// Fails with `BadRequest` when no usable file name remains after
    /// stripping directories, and with `UnsupportedFileType` when the
    /// extension is missing or outside [`SUPPORTED_EXTENSIONS`]. The name is
    /// taken verbatim: surrounding whitespace is part of it, and the stem may
    /// be empty (`.docx`).
    pub fn parse(declared: &str) -> Result<Self, AppError> {
        let file_name = declared
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();

        if file_name.is_empty() || file_name == "." || file_name == ".." {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid file name: {:?}",
                declared
            )));
        }

        let (stem, extension) = match file_name.rsplit_once('.') {
            Some((stem, ext)) => (stem, ext.to_ascii_lowercase()),
            None => {
                return Err(AppError::UnsupportedFileType(format!(
                    "{} has no extension",
                    file_name
                )));
            }
        };

        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::UnsupportedFileType(format!(".{}", extension)));
        }

        Ok(Self {
            file_name: file_name.to_string(),
            stem: stem.to_string(),
            extension,
        })
    }

    /// Name the upload is staged under.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name offered to the client for the converted document.
    pub fn pdf_name(&self) -> String {
        format!("{}.pdf", self.stem)
    }

    /// Converter output names, most specific first.
    pub fn output_candidates(&self) -> [String; 2] {
        [format!("{}_output.pdf", self.stem), self.pdf_name()]
    }
}

pub mod document;

pub use document::{DocumentName, SUPPORTED_EXTENSIONS};

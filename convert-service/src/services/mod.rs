pub mod converter;
pub mod metrics;
pub mod staging;

pub use converter::Converter;
pub use self::metrics::{get_metrics, init_metrics, record_conversion, ConversionOutcome};
pub use staging::StagingArea;

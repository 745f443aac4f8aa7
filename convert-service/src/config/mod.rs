use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Executable invoked when `CONVERTER_PROGRAM` is not set.
pub const DEFAULT_CONVERTER_PROGRAM: &str = "libreoffice";

/// 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub common: core_config::Config,
    pub converter: ConverterConfig,
    pub staging: StagingConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Path or name of the converter executable. Server-side only.
    pub program: String,
    /// Upper bound on a single conversion. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct StagingConfig {
    /// Parent of the per-request staging directories; the OS temp dir when unset.
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl ConverterConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            common: core_config::Config::default(),
            converter: ConverterConfig {
                program: DEFAULT_CONVERTER_PROGRAM.to_string(),
                timeout_secs: None,
            },
            staging: StagingConfig { root: None },
            upload: UploadConfig {
                max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
        }
    }
}

impl ConvertConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env, APP__ prefix and PORT)
        let common = core_config::Config::load()?;

        Ok(ConvertConfig {
            common,
            converter: ConverterConfig {
                program: get_env("CONVERTER_PROGRAM")
                    .unwrap_or_else(|| DEFAULT_CONVERTER_PROGRAM.to_string()),
                timeout_secs: parse_env("CONVERTER_TIMEOUT_SECS")?,
            },
            staging: StagingConfig {
                root: get_env("STAGING_ROOT").map(PathBuf::from),
            },
            upload: UploadConfig {
                max_bytes: parse_env("MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            },
        })
    }
}

fn get_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
            })
        })
        .transpose()
}

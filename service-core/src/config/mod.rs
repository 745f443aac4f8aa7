use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Name of the plain environment variable that selects the listening port.
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Config {
    /// Loads the common configuration once at startup.
    ///
    /// Sources, lowest precedence first: an optional `configuration` file,
    /// `APP__*` environment variables, then `PORT`.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let port = std::env::var(PORT_ENV).ok().filter(|p| !p.trim().is_empty());
        if port.is_none() {
            tracing::info!("{} not set, using default port {}", PORT_ENV, default_port());
        }

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .set_override_option("port", port)?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

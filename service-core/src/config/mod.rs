use crate::error::AppError;
use config::{Config as Cfg, ConfigBuilder, File, builder::DefaultState};
use serde::Deserialize;

/// Settings shared by every service: environment, log level, tracing export.
///
/// Read from an optional `configuration` file, overridden by `APP__*`
/// environment variables (e.g. `APP__LOG_LEVEL=debug`).
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let builder = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, AppError> {
        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn is_prod(&self) -> bool {
        self.environment == Environment::Prod
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

//! Shared domain types and configuration for the POS analytics service.

pub mod app_config;
pub mod config;
pub mod records;

use thiserror::Error;

pub use app_config::{
    AppConfig, DashboardConfig, DatabaseConfig, DatabaseTarget, Environment, GenieConfig,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{
    BusinessType, NormalizedPosRecord, ProductFamily, RawBusinessRecord, SubmissionData,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

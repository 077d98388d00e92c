pub mod app_config;
pub mod config;
pub mod geo;
pub mod notifications;
pub mod providers;
pub mod relation;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{Coordinate, LocationSpec};
pub use notifications::{
    Notification, NotificationKind, NotificationPage, NotificationStatus, PageRequest,
    RemoteEvent, RemoteEventKind, StatusFilter,
};
pub use providers::{load_provider_seed, ProviderCandidate, ProviderSeed, ProviderSeedFile};
pub use relation::OneOrMany;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read provider seed file {path}: {source}")]
    SeedFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse provider seed file: {0}")]
    SeedFileParse(#[from] serde_yaml::Error),

    #[error("provider seed validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("invalid notification status: {0}")]
    InvalidStatus(String),
}

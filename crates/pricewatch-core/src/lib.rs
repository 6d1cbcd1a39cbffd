pub mod app_config;
pub mod config;
pub mod jobs;
pub mod products;
pub mod store;
pub mod tracked;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use jobs::{JobStatus, ScrapingJob};
pub use products::{ScrapedProduct, SourceSite, StockStatus, UnknownSite};
pub use store::{JobStore, MemoryJobStore, MemoryProductStore, ProductStore, StoreError};
pub use tracked::{
    append_tracked_product, load_tracked_products, TrackedProductEntry, TrackedProductsFile,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("configuration validation failed: {0}")]
    Validation(String),

    #[error("failed to read tracked products file {path}: {source}")]
    TrackedProductsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tracked products file: {0}")]
    TrackedProductsParse(#[from] serde_yaml::Error),
}

pub mod app;
pub mod config;
pub mod error;

pub use app::App;
pub use config::{Config, ExportConfig, StorageConfig, ValidationResult, WeatherConfig};
pub use error::{
    AppError, ConfigError, DatabaseError, ExportError, RusqliteErrorExt, WeatherError,
};

use anyhow::Result;

/// Initialize the core application
pub fn init() -> Result<()> {
    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        // stdout belongs to the console front end
        .with_writer(std::io::stderr)
        .try_init();

    tracing::info!("Skylog core initialized");
    Ok(())
}

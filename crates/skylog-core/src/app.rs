use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::Config;

/// Main application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    initialized: bool,
}

impl App {
    /// Create a new application instance from the on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, _warnings) = Config::load_validated()?;
        Ok(Self::with_config(config))
    }

    /// Create an application instance from an already-loaded configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            initialized: false,
        }
    }

    /// Prepare the directories the application writes to
    pub fn initialize(&mut self) -> Result<()> {
        tracing::info!("Initializing application");

        if let Some(parent) = self.config.storage.database_path.parent() {
            ensure_dir(parent).context("Failed to create data directory")?;
        }

        self.initialized = true;
        tracing::info!("Application initialized successfully");
        Ok(())
    }

    /// Shutdown the application
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");
        self.initialized = false;
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the application config
    pub fn config_arc(&self) -> Arc<Config> {
        self.config.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(path)
}

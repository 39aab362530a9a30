//! Shared application services: the tokio runtime, the record store and the
//! weather clients, built once at startup from the configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skylog_core::Config;
use skylog_records::RecordStore;
use skylog_weather::{HttpGeocoder, WeatherProvider};

pub struct AppServices {
    /// Tokio runtime for lookups; the interaction thread stays synchronous
    runtime: tokio::runtime::Runtime,

    store: Arc<RecordStore>,
    geocoder: Arc<HttpGeocoder>,
    provider: Arc<WeatherProvider>,
}

impl AppServices {
    /// Build every service. A store that fails to initialize is kept in its
    /// unusable state rather than aborting startup.
    pub fn init(config: &Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("skylog-tokio")
            .build()
            .context("Failed to create tokio runtime")?;

        let store = Arc::new(RecordStore::open(&config.storage.database_path));
        if !store.is_ready() {
            tracing::warn!("Record store unavailable; saved records are disabled");
        }

        let weather = &config.weather;
        let timeout = Duration::from_secs(weather.timeout_secs);

        let geocoder = HttpGeocoder::new(
            weather.zip_base_url.clone(),
            weather.geocoder_base_url.clone(),
            weather.country.clone(),
            &weather.user_agent,
            timeout,
        )
        .context("Failed to create geocoder")?;

        let provider = WeatherProvider::new(weather.nws_base_url.clone(), &weather.user_agent, timeout)
            .context("Failed to create weather provider")?;

        tracing::info!("Weather services initialized");

        Ok(Self {
            runtime,
            store,
            geocoder: Arc::new(geocoder),
            provider: Arc::new(provider),
        })
    }

    /// Get the tokio runtime handle.
    pub fn runtime(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    pub fn store(&self) -> Arc<RecordStore> {
        self.store.clone()
    }

    pub fn geocoder(&self) -> Arc<HttpGeocoder> {
        self.geocoder.clone()
    }

    pub fn provider(&self) -> Arc<WeatherProvider> {
        self.provider.clone()
    }

    /// Stop the runtime without waiting on stragglers. In-flight lookups
    /// are dropped and never report back.
    pub fn shutdown(self) {
        tracing::info!("AppServices shutdown initiated");
        self.runtime.shutdown_background();
        tracing::info!("AppServices shutdown complete");
    }
}

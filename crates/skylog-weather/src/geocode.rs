//! Forward geocoding: turn a ZIP code or "City, ST" into coordinates.
//!
//! ZIP codes go through Zippopotam, city/state pairs through Nominatim
//! (OpenStreetMap). Both are free and need no API key.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::location::LocationQuery;
use crate::types::{Coordinates, LookupError};

/// Resolves a location query to coordinates.
pub trait Geocoder: Send + Sync {
    /// Returns `LookupError::NotFound` when the service knows nothing about the query.
    fn resolve(
        &self,
        query: &LocationQuery,
    ) -> impl Future<Output = Result<Coordinates, LookupError>> + Send;
}

#[derive(Debug, Deserialize)]
struct ZipResponse {
    places: Option<Vec<ZipPlace>>,
}

#[derive(Debug, Deserialize)]
struct ZipPlace {
    latitude: Option<String>,
    longitude: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: Option<String>,
    lon: Option<String>,
}

/// HTTP geocoder backed by Zippopotam and Nominatim
#[derive(Debug, Clone)]
pub struct HttpGeocoder {
    client: Client,
    zip_base_url: String,
    search_base_url: String,
    country: String,
}

impl HttpGeocoder {
    pub fn new(
        zip_base_url: impl Into<String>,
        search_base_url: impl Into<String>,
        country: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            zip_base_url: zip_base_url.into(),
            search_base_url: search_base_url.into(),
            country: country.into(),
        })
    }

    async fn resolve_zip(&self, zip: &str) -> Result<Coordinates, LookupError> {
        let url = format!(
            "{}/{}/{}",
            self.zip_base_url.trim_end_matches('/'),
            self.country.to_lowercase(),
            zip
        );
        tracing::debug!("Geocoding ZIP code {}", zip);

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(zip.to_string()));
        }
        if !response.status().is_success() {
            return Err(LookupError::unavailable(format!(
                "ZIP lookup returned status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let parsed: ZipResponse = serde_json::from_str(&body)
            .map_err(|e| LookupError::malformed(format!("ZIP lookup body: {}", e)))?;

        let place = parsed
            .places
            .and_then(|places| places.into_iter().next())
            .ok_or_else(|| LookupError::NotFound(zip.to_string()))?;

        let latitude = parse_degrees(place.latitude.as_deref(), "latitude")?;
        let longitude = parse_degrees(place.longitude.as_deref(), "longitude")?;
        Ok(Coordinates::new(latitude, longitude))
    }

    async fn resolve_city(&self, city: &str, state: &str) -> Result<Coordinates, LookupError> {
        let base = format!("{}/search", self.search_base_url.trim_end_matches('/'));
        let q = format!("{}, {}, {}", city, state, self.country);
        let url = Url::parse_with_params(
            &base,
            &[("q", q.as_str()), ("format", "json"), ("limit", "1")],
        )
        .map_err(|e| LookupError::unavailable(format!("Invalid geocoder URL: {}", e)))?;
        tracing::debug!("Geocoding {}", q);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::unavailable(format!(
                "Geocoder returned status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let places: Vec<NominatimPlace> = serde_json::from_str(&body)
            .map_err(|e| LookupError::malformed(format!("Geocoder body: {}", e)))?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound(format!("{}, {}", city, state)))?;

        let latitude = parse_degrees(place.lat.as_deref(), "lat")?;
        let longitude = parse_degrees(place.lon.as_deref(), "lon")?;
        Ok(Coordinates::new(latitude, longitude))
    }
}

impl Geocoder for HttpGeocoder {
    async fn resolve(&self, query: &LocationQuery) -> Result<Coordinates, LookupError> {
        let coords = match query {
            LocationQuery::Zip(zip) => self.resolve_zip(zip).await?,
            LocationQuery::CityState { city, state } => self.resolve_city(city, state).await?,
        };

        if !coords.is_valid() {
            return Err(LookupError::malformed(format!(
                "Coordinates out of range: {}",
                coords
            )));
        }

        tracing::info!("Resolved {} to {}", query, coords);
        Ok(coords)
    }
}

fn parse_degrees(value: Option<&str>, field: &str) -> Result<f64, LookupError> {
    let raw = value.ok_or_else(|| LookupError::malformed(format!("missing {}", field)))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| LookupError::malformed(format!("{} is not a number: {}", field, raw)))
}

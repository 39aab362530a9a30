//! Forecast retrieval from the National Weather Service API.
//!
//! A lookup is three requests: the `points` document for the coordinates
//! (which names the forecast URLs and the nearest city), the daily forecast,
//! and the hourly forecast. Every field is optional on the wire; anything the
//! lookup cannot do without is reported as `LookupError::Malformed`.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::types::{Coordinates, ForecastPeriod, ForecastReport, LocationLabel, LookupError};

/// Produces forecasts for coordinates.
pub trait ForecastSource: Send + Sync {
    fn fetch_forecast(
        &self,
        coordinates: Coordinates,
    ) -> impl Future<Output = Result<ForecastReport, LookupError>> + Send;
}

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: Option<PointsProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointsProperties {
    forecast: Option<String>,
    forecast_hourly: Option<String>,
    relative_location: Option<RelativeLocation>,
}

#[derive(Debug, Deserialize)]
struct RelativeLocation {
    properties: Option<RelativeLocationProperties>,
}

#[derive(Debug, Deserialize)]
struct RelativeLocationProperties {
    city: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: Option<ForecastProperties>,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    periods: Option<Vec<RawPeriod>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPeriod {
    name: Option<String>,
    start_time: Option<String>,
    temperature: Option<f64>,
    is_daytime: Option<bool>,
    wind_speed: Option<String>,
    wind_direction: Option<String>,
    probability_of_precipitation: Option<QuantitativeValue>,
    short_forecast: Option<String>,
    detailed_forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuantitativeValue {
    value: Option<f64>,
}

impl RawPeriod {
    fn into_period(self, index: usize) -> Result<ForecastPeriod, LookupError> {
        let temperature = self
            .temperature
            .filter(|t| t.is_finite())
            .ok_or_else(|| LookupError::malformed(format!("period {} has no temperature", index)))?;

        let precipitation_probability = self
            .probability_of_precipitation
            .and_then(|p| p.value)
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 100.0).round() as u8);

        let start_date = self.start_time.as_deref().and_then(parse_start_date);

        Ok(ForecastPeriod {
            name: self.name.unwrap_or_default(),
            temperature: temperature.round() as i32,
            daytime: self.is_daytime.unwrap_or(true),
            wind_speed: self.wind_speed.unwrap_or_default(),
            wind_direction: self.wind_direction.unwrap_or_default(),
            precipitation_probability,
            forecast: self.short_forecast.unwrap_or_default(),
            start_date,
        })
    }
}

/// The local calendar date of an RFC 3339 start time ("2024-03-01T18:00:00-06:00")
fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}

/// NWS-backed forecast source
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Client,
    base_url: String,
}

impl WeatherProvider {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, LookupError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/geo+json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(LookupError::unavailable(format!(
                "{} returned status {}",
                url, status
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| LookupError::malformed(format!("{}: {}", url, e)))
    }

    async fn fetch_periods(&self, url: &str) -> Result<Vec<ForecastPeriod>, LookupError> {
        let response: ForecastResponse = self.get_json(url).await?;
        let raw = response
            .properties
            .and_then(|p| p.periods)
            .ok_or_else(|| LookupError::malformed(format!("{} has no periods", url)))?;

        raw.into_iter()
            .enumerate()
            .map(|(i, p)| p.into_period(i))
            .collect()
    }

    async fn fetch_detailed_headline(&self, url: &str) -> Result<(Vec<RawPeriod>, String), LookupError> {
        let response: ForecastResponse = self.get_json(url).await?;
        let mut raw = response
            .properties
            .and_then(|p| p.periods)
            .ok_or_else(|| LookupError::malformed(format!("{} has no periods", url)))?;

        let headline = raw
            .first_mut()
            .map(|first| {
                let name = first.name.clone().unwrap_or_default();
                let detail = first
                    .detailed_forecast
                    .take()
                    .or_else(|| first.short_forecast.clone())
                    .unwrap_or_default();
                format!("{}: {}", name, detail)
            })
            .ok_or_else(|| LookupError::malformed(format!("{} has an empty period list", url)))?;

        Ok((raw, headline))
    }
}

impl ForecastSource for WeatherProvider {
    async fn fetch_forecast(&self, coordinates: Coordinates) -> Result<ForecastReport, LookupError> {
        let points_url = format!(
            "{}/points/{}",
            self.base_url.trim_end_matches('/'),
            coordinates
        );
        let points: PointsResponse = self.get_json(&points_url).await?;
        let properties = points
            .properties
            .ok_or_else(|| LookupError::malformed("points response has no properties"))?;

        let forecast_url = properties
            .forecast
            .ok_or_else(|| LookupError::malformed("points response has no forecast URL"))?;

        let location_label = properties
            .relative_location
            .and_then(|r| r.properties)
            .and_then(|p| match (p.city, p.state) {
                (Some(city), Some(state)) => Some(LocationLabel { city, state }),
                _ => None,
            });

        if let Some(label) = &location_label {
            tracing::info!("Current location: {}", label);
        }

        let (daily_raw, description) = self.fetch_detailed_headline(&forecast_url).await?;
        let mut daily = daily_raw
            .into_iter()
            .enumerate()
            .map(|(i, p)| p.into_period(i))
            .collect::<Result<Vec<_>, _>>()?;

        // Hourly data is optional; without it the first daily period stands in
        let hourly = match properties.forecast_hourly {
            Some(url) => self.fetch_periods(&url).await?,
            None => {
                tracing::debug!("No hourly forecast URL for {}", coordinates);
                Vec::new()
            }
        };

        let current = match hourly.into_iter().next() {
            Some(period) => period,
            None if !daily.is_empty() => daily[0].clone(),
            None => return Err(LookupError::malformed("forecast has no periods")),
        };

        let future = if daily.is_empty() {
            Vec::new()
        } else {
            daily.split_off(1)
        };

        Ok(ForecastReport {
            current,
            future,
            location_label,
            description,
            coordinates,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn raw(json: &str) -> RawPeriod {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_into_period_maps_fields() {
        let period = raw(
            r#"{
                "name": "Tonight",
                "startTime": "2024-03-01T18:00:00-06:00",
                "temperature": 41,
                "isDaytime": false,
                "windSpeed": "5 to 10 mph",
                "windDirection": "S",
                "probabilityOfPrecipitation": {"unitCode": "wmoUnit:percent", "value": 30},
                "shortForecast": "Chance Rain Showers"
            }"#,
        )
        .into_period(0)
        .unwrap();

        assert_eq!(period.name, "Tonight");
        assert_eq!(period.temperature, 41);
        assert!(!period.daytime);
        assert_eq!(period.wind_speed, "5 to 10 mph");
        assert_eq!(period.wind_direction, "S");
        assert_eq!(period.precipitation_probability, Some(30));
        assert_eq!(period.forecast, "Chance Rain Showers");
        assert_eq!(period.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_null_precipitation_is_none() {
        let period = raw(
            r#"{"temperature": 70, "probabilityOfPrecipitation": {"value": null}}"#,
        )
        .into_period(0)
        .unwrap();
        assert_eq!(period.precipitation_probability, None);
        assert_eq!(period.name, "");
    }

    #[test]
    fn test_missing_temperature_is_malformed() {
        let result = raw(r#"{"name": "Today"}"#).into_period(3);
        assert!(matches!(result, Err(LookupError::Malformed(m)) if m.contains("period 3")));
    }

    #[test]
    fn test_start_date_uses_local_offset() {
        // 23:00 in Chicago is already the next day in UTC
        assert_eq!(
            parse_start_date("2024-03-01T23:00:00-06:00"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_start_date("not a time"), None);
    }
}

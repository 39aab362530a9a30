use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both components are finite and within range
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    // The points endpoint redirects when given more than four decimals
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// City/state label reported by the forecast service for a grid point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationLabel {
    pub city: String,
    pub state: String,
}

impl std::fmt::Display for LocationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.city, self.state)
    }
}

/// A single forecast period as delivered by the forecast source.
///
/// Transient: only a subset of these fields is ever persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    /// Period name ("Tonight", "Tuesday"); empty for hourly periods
    pub name: String,
    /// Temperature in Fahrenheit
    pub temperature: i32,
    pub daytime: bool,
    /// Free-form wind speed ("10 mph", "5 to 10 mph")
    pub wind_speed: String,
    /// Compass direction ("NW")
    pub wind_direction: String,
    /// Chance of precipitation in percent, when reported
    pub precipitation_probability: Option<u8>,
    /// Short description ("Mostly Sunny")
    pub forecast: String,
    /// Calendar date the period starts on, in the forecast's local time
    pub start_date: Option<NaiveDate>,
}

impl ForecastPeriod {
    /// Temperature line shown next to the current conditions: `72°F/22°C`.
    ///
    /// Celsius is rounded to the nearest half degree.
    pub fn temperature_display(&self) -> String {
        let half_degrees = (f64::from(self.temperature - 32) * 10.0 / 9.0).round();
        let celsius = half_degrees / 2.0;
        format!("{}°F/{}°C", self.temperature, celsius)
    }

    pub fn wind_display(&self) -> String {
        format!("Wind: {} {}", self.wind_speed, self.wind_direction)
    }
}

/// Everything one lookup produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    /// Current conditions (first hourly period)
    pub current: ForecastPeriod,
    /// Upcoming periods, in the order the service returned them
    pub future: Vec<ForecastPeriod>,
    /// Nearest city/state, when the service knows it
    pub location_label: Option<LocationLabel>,
    /// Headline text: `"{name}: {detailed forecast}"`
    pub description: String,
    pub coordinates: Coordinates,
}

/// Errors from geocoding and forecast retrieval
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("Location not found: {0}")]
    NotFound(String),
    #[error("Invalid location query: {0}")]
    InvalidQuery(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl LookupError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}

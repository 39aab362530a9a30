//! Weather record types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Storage and export format for record dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A saved forecast. `(location, date)` is unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub location: String,
    pub date: NaiveDate,
    /// Degrees Fahrenheit
    pub temperature: i32,
    pub wind_speed: String,
    pub wind_direction: String,
    pub forecast: String,
    /// Set by the store on insert and on every replacement
    pub created_at: DateTime<Utc>,
}

impl WeatherRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.location.clone(), self.date)
    }
}

/// Unique key of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub location: String,
    pub date: NaiveDate,
}

impl RecordKey {
    pub fn new(location: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            location: location.into(),
            date,
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.location, self.date.format(DATE_FORMAT))
    }
}

/// The non-key fields a forecast period contributes to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCandidate {
    pub temperature: i32,
    pub wind_speed: String,
    pub wind_direction: String,
    pub forecast: String,
}

/// Everything needed to write a record; the store supplies `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub location: String,
    pub date: NaiveDate,
    pub temperature: i32,
    pub wind_speed: String,
    pub wind_direction: String,
    pub forecast: String,
}

impl NewRecord {
    pub fn new(
        location: impl Into<String>,
        date: NaiveDate,
        temperature: i32,
        wind_speed: impl Into<String>,
        wind_direction: impl Into<String>,
        forecast: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            date,
            temperature,
            wind_speed: wind_speed.into(),
            wind_direction: wind_direction.into(),
            forecast: forecast.into(),
        }
    }

    /// Attach a normalized forecast to a key
    pub fn from_candidate(location: impl Into<String>, date: NaiveDate, candidate: RecordCandidate) -> Self {
        Self {
            location: location.into(),
            date,
            temperature: candidate.temperature,
            wind_speed: candidate.wind_speed,
            wind_direction: candidate.wind_direction,
            forecast: candidate.forecast,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.location.clone(), self.date)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_key_display() {
        let key = RecordKey::new("Austin, TX", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(key.to_string(), "Austin, TX on 2024-03-01");
    }

    #[test]
    fn test_from_candidate_keeps_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let candidate = RecordCandidate {
            temperature: 72,
            wind_speed: "10 mph".to_string(),
            wind_direction: "NW".to_string(),
            forecast: "Sunny".to_string(),
        };

        let record = NewRecord::from_candidate("Austin, TX", date, candidate);
        assert_eq!(
            record,
            NewRecord::new("Austin, TX", date, 72, "10 mph", "NW", "Sunny")
        );
        assert_eq!(record.key(), RecordKey::new("Austin, TX", date));
    }
}

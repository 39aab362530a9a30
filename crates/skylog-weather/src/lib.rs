//! Weather lookup for Skylog
//!
//! Geocodes a ZIP code or "City, ST" and retrieves current conditions and the
//! multi-day forecast from the National Weather Service.

pub mod geocode;
pub mod location;
pub mod provider;
pub mod types;

pub use geocode::{Geocoder, HttpGeocoder};
pub use location::LocationQuery;
pub use provider::{ForecastSource, WeatherProvider};
pub use types::*;

//! Forecast period to record candidate.

use skylog_weather::ForecastPeriod;

use crate::record::RecordCandidate;

/// Keep the persisted subset of a forecast period.
///
/// Name, daytime flag and precipitation chance are display-only and dropped.
pub fn normalize(period: &ForecastPeriod) -> RecordCandidate {
    RecordCandidate {
        temperature: period.temperature,
        wind_speed: period.wind_speed.clone(),
        wind_direction: period.wind_direction.clone(),
        forecast: period.forecast.clone(),
    }
}

impl From<&ForecastPeriod> for RecordCandidate {
    fn from(period: &ForecastPeriod) -> Self {
        normalize(period)
    }
}

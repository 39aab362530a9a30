use skylog_core::{AppError, WeatherError};
use skylog_weather::LookupError;

use super::IntoAppError;

impl IntoAppError for LookupError {
    fn into_app_error(self) -> AppError {
        match self {
            LookupError::NotFound(s) => AppError::Weather(WeatherError::LocationNotFound(s)),
            LookupError::InvalidQuery(s) => AppError::Weather(WeatherError::InvalidQuery(s)),
            LookupError::Malformed(s) => AppError::Weather(WeatherError::MalformedResponse(s)),
            LookupError::Unavailable(s) => AppError::Weather(WeatherError::ServiceUnavailable(s)),
        }
    }
}

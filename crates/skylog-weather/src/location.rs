//! Parsing of the free-text location box: a 5-digit ZIP code or "City, ST".

use crate::types::LookupError;

/// What the user asked for, before geocoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationQuery {
    Zip(String),
    CityState { city: String, state: String },
}

impl LocationQuery {
    /// Parse user input.
    ///
    /// Exactly five ASCII digits is a ZIP code. Anything else must split on a
    /// single comma into a non-empty city and state.
    pub fn parse(input: &str) -> Result<Self, LookupError> {
        let input = input.trim();

        if input.len() == 5 && input.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self::Zip(input.to_string()));
        }

        let mut parts = input.split(',');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(city), Some(state), None) => {
                let city = city.trim();
                let state = state.trim();
                if city.is_empty() || state.is_empty() {
                    return Err(LookupError::InvalidQuery(input.to_string()));
                }
                Ok(Self::CityState {
                    city: city.to_string(),
                    state: state.to_string(),
                })
            }
            _ => Err(LookupError::InvalidQuery(input.to_string())),
        }
    }
}

impl std::fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zip(zip) => write!(f, "{}", zip),
            Self::CityState { city, state } => write!(f, "{}, {}", city, state),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_parse_zip() {
        assert_eq!(
            LocationQuery::parse(" 62701 ").unwrap(),
            LocationQuery::Zip("62701".to_string())
        );
    }

    #[test]
    fn test_parse_city_state() {
        assert_eq!(
            LocationQuery::parse("Springfield, IL").unwrap(),
            LocationQuery::CityState {
                city: "Springfield".to_string(),
                state: "IL".to_string(),
            }
        );
    }

    #[test]
    fn test_short_or_long_digit_strings_are_not_zips() {
        assert!(matches!(
            LocationQuery::parse("6270"),
            Err(LookupError::InvalidQuery(_))
        ));
        assert!(matches!(
            LocationQuery::parse("627011"),
            Err(LookupError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_missing_state_is_invalid() {
        assert!(matches!(
            LocationQuery::parse("Springfield"),
            Err(LookupError::InvalidQuery(_))
        ));
        assert!(matches!(
            LocationQuery::parse("Springfield, "),
            Err(LookupError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_extra_commas_are_invalid() {
        assert!(matches!(
            LocationQuery::parse("Springfield, IL, US"),
            Err(LookupError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_display() {
        let query = LocationQuery::parse("Austin,TX").unwrap();
        assert_eq!(query.to_string(), "Austin, TX");
    }
}

//! Lookup display state: what the weather panel shows right now.

use chrono::{Local, NaiveDate};
use skylog_weather::{ForecastPeriod, ForecastReport, LocationQuery};

use crate::error_mapping::IntoAppError;
use crate::services::LookupServiceMessage;

const FETCHING: &str = "Fetching...";

#[derive(Debug, Clone, Default)]
pub enum LookupState {
    #[default]
    Idle,
    Fetching {
        seq: u64,
        query: LocationQuery,
    },
    Ready {
        query: LocationQuery,
        report: ForecastReport,
    },
    Failed {
        query: LocationQuery,
        message: String,
    },
}

/// Which forecast period a save refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodSelector {
    Current,
    /// 1-based position in the upcoming list
    Future(usize),
}

impl PeriodSelector {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("current") {
            return Some(Self::Current);
        }
        raw.parse::<usize>().ok().filter(|&n| n > 0).map(Self::Future)
    }
}

#[derive(Debug, Default)]
pub struct ForecastModel {
    state: LookupState,
}

impl ForecastModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LookupState {
        &self.state
    }

    /// Enter the interim state for lookup `seq`. Any shown result is cleared.
    pub fn begin(&mut self, seq: u64, query: LocationQuery) {
        self.state = LookupState::Fetching { seq, query };
    }

    /// Apply a finished lookup. Returns `false` for a response that no longer
    /// matches the awaited request; those are discarded.
    pub fn apply(&mut self, message: LookupServiceMessage) -> bool {
        let LookupServiceMessage::LookupDone { seq, query, result } = message;

        let awaited = matches!(self.state, LookupState::Fetching { seq: s, .. } if s == seq);
        if !awaited {
            tracing::debug!("Discarding stale lookup {}", seq);
            return false;
        }

        self.state = match result {
            Ok(report) => LookupState::Ready { query, report },
            Err(e) => LookupState::Failed {
                query,
                message: e.into_app_error().user_message().to_string(),
            },
        };
        true
    }

    pub fn report(&self) -> Option<&ForecastReport> {
        match &self.state {
            LookupState::Ready { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.state, LookupState::Fetching { .. })
    }

    /// Name records are saved under: the service's nearest city when known,
    /// otherwise what the user typed.
    pub fn location_name(&self) -> Option<String> {
        match &self.state {
            LookupState::Ready { query, report } => Some(
                report
                    .location_label
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| query.to_string()),
            ),
            _ => None,
        }
    }

    pub fn period(&self, selector: PeriodSelector) -> Option<&ForecastPeriod> {
        let report = self.report()?;
        match selector {
            PeriodSelector::Current => Some(&report.current),
            PeriodSelector::Future(n) => report.future.get(n - 1),
        }
    }

    /// Date a saved period is filed under when none is given
    pub fn default_date(period: &ForecastPeriod) -> NaiveDate {
        period
            .start_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    /// Current-conditions panel: temperature, wind, description.
    pub fn summary_lines(&self) -> Vec<String> {
        match &self.state {
            LookupState::Idle => Vec::new(),
            LookupState::Fetching { .. } => vec![FETCHING.to_string()],
            LookupState::Failed { message, .. } => vec![message.clone()],
            LookupState::Ready { report, .. } => {
                let mut lines = Vec::with_capacity(3);
                if let Some(label) = &report.location_label {
                    lines.push(label.to_string());
                }
                lines.push(report.current.temperature_display());
                lines.push(report.current.wind_display());
                if !report.description.is_empty() {
                    lines.push(report.description.clone());
                }
                lines
            }
        }
    }

    /// Upcoming periods, one row each, numbered for `save <n>`.
    pub fn future_lines(&self) -> Vec<String> {
        let Some(report) = self.report() else {
            return Vec::new();
        };

        report
            .future
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let wind = format!("{} {}", p.wind_speed, p.wind_direction);
                format!(
                    "{:>2}. {:<16} {:>4}°F  {:<14} {}",
                    i + 1,
                    p.name,
                    p.temperature,
                    wind,
                    p.forecast
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use skylog_weather::{Coordinates, LocationLabel, LookupError};

    fn period(name: &str, temperature: i32) -> ForecastPeriod {
        ForecastPeriod {
            name: name.to_string(),
            temperature,
            daytime: true,
            wind_speed: "10 mph".to_string(),
            wind_direction: "NW".to_string(),
            precipitation_probability: None,
            forecast: "Sunny".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
        }
    }

    fn report(label: Option<LocationLabel>) -> ForecastReport {
        ForecastReport {
            current: period("Now", 72),
            future: vec![period("Tonight", 55), period("Saturday", 75)],
            location_label: label,
            description: "Today: Sunny, with a high near 72.".to_string(),
            coordinates: Coordinates::new(30.2672, -97.7431),
        }
    }

    fn done(seq: u64, result: Result<ForecastReport, LookupError>) -> LookupServiceMessage {
        LookupServiceMessage::LookupDone {
            seq,
            query: LocationQuery::Zip("78701".to_string()),
            result,
        }
    }

    #[test]
    fn test_fetching_shows_interim_text() {
        let mut model = ForecastModel::new();
        model.begin(1, LocationQuery::Zip("78701".to_string()));
        assert!(model.is_fetching());
        assert_eq!(model.summary_lines(), vec!["Fetching...".to_string()]);
    }

    #[test]
    fn test_ready_display() {
        let mut model = ForecastModel::new();
        model.begin(1, LocationQuery::Zip("78701".to_string()));
        assert!(model.apply(done(1, Ok(report(None)))));

        let lines = model.summary_lines();
        assert_eq!(lines[0], "72°F/22°C");
        assert_eq!(lines[1], "Wind: 10 mph NW");
        assert_eq!(lines[2], "Today: Sunny, with a high near 72.");
        assert_eq!(model.future_lines().len(), 2);
    }

    #[test]
    fn test_not_found_display() {
        let mut model = ForecastModel::new();
        model.begin(1, LocationQuery::Zip("00000".to_string()));
        model.apply(done(1, Err(LookupError::NotFound("00000".into()))));

        assert_eq!(model.summary_lines(), vec!["Not found".to_string()]);
        assert!(model.report().is_none());
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut model = ForecastModel::new();
        model.begin(1, LocationQuery::Zip("78701".to_string()));
        model.begin(2, LocationQuery::Zip("62701".to_string()));

        assert!(!model.apply(done(1, Ok(report(None)))));
        assert!(model.is_fetching());
        assert!(model.apply(done(2, Ok(report(None)))));
        assert!(!model.apply(done(2, Ok(report(None)))));
    }

    #[test]
    fn test_location_name_prefers_label() {
        let mut model = ForecastModel::new();
        model.begin(1, LocationQuery::Zip("78701".to_string()));
        model.apply(done(
            1,
            Ok(report(Some(LocationLabel {
                city: "Austin".to_string(),
                state: "TX".to_string(),
            }))),
        ));
        assert_eq!(model.location_name().unwrap(), "Austin, TX");

        model.begin(2, LocationQuery::Zip("78701".to_string()));
        model.apply(done(2, Ok(report(None))));
        assert_eq!(model.location_name().unwrap(), "78701");
    }

    #[test]
    fn test_period_selection() {
        let mut model = ForecastModel::new();
        model.begin(1, LocationQuery::Zip("78701".to_string()));
        model.apply(done(1, Ok(report(None))));

        assert_eq!(model.period(PeriodSelector::Current).unwrap().name, "Now");
        assert_eq!(model.period(PeriodSelector::Future(2)).unwrap().name, "Saturday");
        assert!(model.period(PeriodSelector::Future(3)).is_none());
    }

    #[test]
    fn test_period_selector_parse() {
        assert_eq!(PeriodSelector::parse("current"), Some(PeriodSelector::Current));
        assert_eq!(PeriodSelector::parse("2"), Some(PeriodSelector::Future(2)));
        assert_eq!(PeriodSelector::parse("0"), None);
        assert_eq!(PeriodSelector::parse("x"), None);
    }
}

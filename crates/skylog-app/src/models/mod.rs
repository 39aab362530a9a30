pub mod forecast_model;
pub mod records_model;

pub use forecast_model::{ForecastModel, LookupState, PeriodSelector};
pub use records_model::RecordsModel;

pub mod bulk;
pub mod duplicate;
pub mod export;
pub mod normalize;
pub mod record;
pub mod store;

pub use bulk::{delete_many, BulkDeleteError, BulkDeleteReport, RecordSelection};
pub use duplicate::{ConfirmationToken, Resolution, SaveOutcome, SaveWorkflow};
pub use export::{default_export_file_name, export, read_export, ExportDocument};
pub use normalize::normalize;
pub use record::{NewRecord, RecordCandidate, RecordKey, WeatherRecord, DATE_FORMAT};
pub use store::RecordStore;

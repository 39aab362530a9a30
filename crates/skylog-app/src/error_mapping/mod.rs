//! Maps service errors to skylog_core::AppError for consistent user-facing messages.
//! Each service has its own module to keep mappings small and readable.

use skylog_core::AppError;

mod weather;

/// Conversion into the application error hierarchy for error types defined
/// in sibling crates.
pub trait IntoAppError {
    fn into_app_error(self) -> AppError;
}

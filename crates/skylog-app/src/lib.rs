pub mod app_services;
pub mod console;
pub mod error_mapping;
pub mod models;
pub mod services;

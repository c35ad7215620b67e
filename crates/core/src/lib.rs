//! onboard core: configuration, record model, CSV input, validation and
//! report output for bulk directory account provisioning.

pub mod config;
pub mod error;
pub mod models;
pub mod user_csv;
pub mod validate;

//! Campus Assets client library
//!
//! Typed access to the Campus Assets backend: authentication, resource
//! listing with filters and pagination, CRUD, statistics, bulk import and
//! export, PDF reports and the AI assistant.

pub mod ai;
pub mod api;
pub mod app;
pub mod config;
pub mod resource;
pub mod transfer;

/// Version injected at compile time via CAMPUS_ASSETS_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CAMPUS_ASSETS_VERSION") {
    Some(v) => v,
    None => "dev",
};

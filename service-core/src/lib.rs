//! service-core: Shared infrastructure for the platform services.
pub mod config;
pub mod error;
pub mod observability;

pub use axum;
pub use tracing;

//! Leadbook Common Library
//!
//! Shared code for the Leadbook services including:
//! - Database models and repository patterns
//! - Error types and handling
//! - Configuration management
//! - Lead listing (filter, sort, paginate) and analytics
//! - Change events for realtime subscribers
//! - Metrics and observability

pub mod analytics;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod listing;
pub mod metrics;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use events::{EventHub, LeadEvent};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

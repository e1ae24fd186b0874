//! Core types for the delivery engine.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (TestSessionId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for delivery and observability

mod config;
mod errors;
mod ids;

pub use config::{Config, DeliveryConfig, ObservabilityConfig};
pub use errors::{AttemptErrorKind, AuthoringErrorKind, Error, Result};
pub use ids::TestSessionId;

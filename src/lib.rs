//! # QTI Delivery - Assessment Test Delivery Engine
//!
//! Runtime core for delivering QTI assessment tests:
//! - Route linearization with section selection, ordering and visibility
//! - Branch rule and precondition analysis over the linear route
//! - Item session state machine (attempts, suspension, review, solution)
//! - Time limit accounting at item, section, test part and test scope
//! - Test session navigation across test parts
//!
//! ## Architecture
//!
//! Expressions are never interpreted here; a host supplies a `RuleEvaluator`:
//! ```text
//!   AssessmentTest ──→ RouteBuilder ──→ Route ──→ analysis (possible routes)
//!                                        │
//!                     ┌──────────────────┴──────────────────┐
//!                     │       AssessmentTestSession         │
//!                     │  ┌──────────┐  ┌───────────────┐    │
//!                     │  │  Route   │  │ ItemSession   │    │
//!                     │  │  cursor  │  │    Store      │    │
//!                     │  └──────────┘  └───────────────┘    │
//!                     └──────────────────┬──────────────────┘
//!                                        │
//!                                  RuleEvaluator (host)
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

// Re-export public API
pub mod definition;
pub mod evaluator;
pub mod route;
pub mod session;
pub mod types;
pub mod variables;

// Internal utilities
pub mod observability;

#[cfg(test)]
mod testutil;

pub use types::{Config, Error, Result};

//! Utility modules for common functionality.
//!
//! - client_storage: Lazily-populated keyed storage for shared clients
//! - constants: Constants for the application
//! - http: HTTP client utilities (retryable and proxied clients)
//! - logging: Logging utilities and the traceable error context
//! - metrics: Prometheus metrics and the metrics server
//! - parsing: Parsing utilities
//! - tests: Test utilities

pub mod client_storage;
pub mod constants;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod parsing;

pub use client_storage::ClientStorage;
pub use constants::*;
pub use http::*;
pub use parsing::*;

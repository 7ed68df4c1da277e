//! Reasoning-service requests.
//!
//! This module provides the request schemas, the HTTP client that sends
//! one request per call, and the retry coordinator layered on top.

pub mod client;
pub mod retry;
pub mod schema;

pub use client::InsightClient;
pub use retry::{RetryCoordinator, RetryExhausted};
pub use schema::InsightRequest;

use thiserror::Error;

/// Failure of a single request to the reasoning service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InsightError {
    /// Transport failure or non-success HTTP status.
    #[error("Reasoning service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The reply did not match the declared schema.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

//! REST API client module for the to-do service.
//!
//! This module provides the `ApiClient` for talking to the service's
//! `/api` endpoints. Successful responses are wrapped in a `{"data": ...}`
//! envelope; failures carry a `{"message": ...}` body.
//!
//! The client holds no credentials. Callers pass the bearer token for each
//! request, so there is no shared "current token" state to go stale.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::{ApiError, FALLBACK_ERROR_MESSAGE};

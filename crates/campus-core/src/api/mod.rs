//! REST client for the campus backend.
//!
//! This module provides the `RemoteAuthService` seam the session manager
//! authenticates through, and `ApiClient`, its reqwest implementation
//! against `POST /api/auth/login`.

pub mod client;
pub mod error;

pub use client::{ApiClient, RemoteAuthService, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use error::ApiError;

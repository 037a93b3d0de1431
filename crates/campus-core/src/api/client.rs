//! HTTP client for the campus REST backend.
//!
//! Only the login endpoint lives here; it is the one the session manager
//! depends on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::models::LoginResponse;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint, relative to the configured base URL
const LOGIN_PATH: &str = "/api/auth/login";

/// HTTP request timeout in seconds.
/// 30s allows for slow campus servers while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Validates a credential pair against the backend.
///
/// An explicit rejection is `Ok` with `success == false`; `Err` is reserved
/// for the cases where no usable answer came back.
#[async_trait]
pub trait RemoteAuthService: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// API client for the campus backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client with the default request timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn login_url(&self) -> String {
        format!("{}{}", self.base_url, LOGIN_PATH)
    }
}

#[async_trait]
impl RemoteAuthService for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let url = self.login_url();
        debug!(url = %url, identifier = %credentials.identifier(), "Sending login request");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&LoginRequest {
                email: credentials.identifier(),
                password: credentials.secret(),
            })
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<LoginResponse>()
                .await
                .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)));
        }

        let body = response.text().await.unwrap_or_default();

        // Rejections usually come back as 401/403 with the same JSON body
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            if let Ok(mut parsed) = serde_json::from_str::<LoginResponse>(&body) {
                parsed.success = false;
                return Ok(parsed);
            }
        }

        warn!(status = %status, "Login request failed");
        Err(ApiError::from_status(status, &body))
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Core library for campus-session.
//!
//! Session and authentication state for the campus client: who is signed
//! in, as which role, and how that survives an app restart.
//!
//! - [`auth::SessionManager`] runs the sign-in / sign-out / hydration state machine
//! - [`storage`] holds the credential blob (OS keychain, sealed files, or memory)
//! - [`api::ApiClient`] talks to `POST /api/auth/login`
//! - [`config::Config`] carries backend URL, timeouts and policy

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storage;

pub use api::{ApiClient, ApiError, RemoteAuthService};
pub use auth::{
    resolve_home_view, Capability, Credentials, HomeView, HydrationPolicy, Session, SessionError,
    SessionManager, SessionSnapshot, SessionStatus,
};
pub use config::Config;
pub use models::{Role, UserRecord};
pub use storage::{SecurePersistence, StorageBackend, StorageError};

//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `SessionManager`: sign-in, sign-out and boot-time hydration
//! - `Session`, `SessionSnapshot`: the read-only state views observe
//! - `Credentials`: the locally validated identifier/secret pair
//! - `HomeView`: role-based selection of the faculty or student variant
//!
//! The credential blob lives in secure storage under `SESSION_KEY`.

pub mod credentials;
pub mod error;
pub mod manager;
pub mod role;
pub mod session;

pub use credentials::Credentials;
pub use error::SessionError;
pub use manager::{HydrationPolicy, SessionManager};
pub use role::{resolve_home_view, Capability, HomeView};
pub use session::{Session, SessionSnapshot, SessionStatus, StoredCredentials, SESSION_KEY};

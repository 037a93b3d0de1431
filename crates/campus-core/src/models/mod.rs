//! Data models for campus-session entities.
//!
//! - `LoginResponse`, `WireUser`: the login payload as the server sends it
//! - `UserRecord`, `Role`: the validated user the rest of the crate works with

pub mod user;

pub use user::{LoginResponse, Role, UserRecord, UserShapeError, WireId, WireUser};

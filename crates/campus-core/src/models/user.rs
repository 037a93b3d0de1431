use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role discriminant carried by every signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum Role {
    Faculty,
    Student,
}

impl Role {
    /// Parse a role string from the server. Case and surrounding whitespace
    /// are ignored; anything other than faculty/student is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "faculty" => Some(Role::Faculty),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Faculty => "faculty",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signed-in user, validated at the login response boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct UserRecord {
    pub id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
}

/// Body of `POST /api/auth/login`, both for accepted and rejected attempts.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<WireUser>,
}

/// Server-side user IDs show up both as numbers and as strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireId::Number(n) => write!(f, "{}", n),
            WireId::Text(s) => f.write_str(s),
        }
    }
}

/// User object exactly as it arrives. Profile endpoints split the name into
/// first/last while the login endpoint sends a single `name`, so both are
/// accepted here and normalized in `UserRecord::try_from`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireUser {
    #[serde(default, alias = "_id", alias = "user_id")]
    pub id: Option<WireId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserShapeError {
    #[error("user record has no role")]
    MissingRole,

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("user record has no name")]
    MissingName,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl TryFrom<WireUser> for UserRecord {
    type Error = UserShapeError;

    fn try_from(wire: WireUser) -> Result<Self, Self::Error> {
        let raw_role = non_blank(wire.role).ok_or(UserShapeError::MissingRole)?;
        let role = Role::parse(&raw_role).ok_or(UserShapeError::UnknownRole(raw_role))?;

        let name = match non_blank(wire.name) {
            Some(name) => name,
            None => {
                let parts: Vec<String> = [wire.first_name, wire.last_name]
                    .into_iter()
                    .filter_map(non_blank)
                    .collect();
                if parts.is_empty() {
                    return Err(UserShapeError::MissingName);
                }
                parts.join(" ")
            }
        };

        Ok(UserRecord {
            id: wire.id.map(|id| id.to_string()),
            name,
            email: non_blank(wire.email),
            role,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(json: serde_json::Value) -> WireUser {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("faculty"), Some(Role::Faculty));
        assert_eq!(Role::parse(" Student "), Some(Role::Student));
        assert_eq!(Role::parse("FACULTY"), Some(Role::Faculty));
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_user_record_from_login_shape() {
        let user = UserRecord::try_from(wire(serde_json::json!({
            "id": 42,
            "name": "A. Prof",
            "email": "prof@example.edu",
            "role": "faculty"
        })))
        .unwrap();

        assert_eq!(user.id.as_deref(), Some("42"));
        assert_eq!(user.name, "A. Prof");
        assert_eq!(user.role, Role::Faculty);
    }

    #[test]
    fn test_user_record_from_profile_shape() {
        let user = UserRecord::try_from(wire(serde_json::json!({
            "_id": "s-1001",
            "first_name": "Jane",
            "last_name": "Doe",
            "role": "Student"
        })))
        .unwrap();

        assert_eq!(user.id.as_deref(), Some("s-1001"));
        assert_eq!(user.name, "Jane Doe");
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.email, None);
    }

    #[test]
    fn test_user_record_rejects_bad_role() {
        let missing = UserRecord::try_from(wire(serde_json::json!({ "name": "X" })));
        assert_eq!(missing, Err(UserShapeError::MissingRole));

        let unknown = UserRecord::try_from(wire(serde_json::json!({
            "name": "X",
            "role": "admin"
        })));
        assert_eq!(unknown, Err(UserShapeError::UnknownRole("admin".to_string())));
    }

    #[test]
    fn test_user_record_requires_name() {
        let result = UserRecord::try_from(wire(serde_json::json!({
            "role": "student",
            "name": "   "
        })));
        assert_eq!(result, Err(UserShapeError::MissingName));
    }

    #[test]
    fn test_login_response_requires_success_flag() {
        let parsed: Result<LoginResponse, _> =
            serde_json::from_value(serde_json::json!({ "message": "hi" }));
        assert!(parsed.is_err());

        let parsed: LoginResponse =
            serde_json::from_value(serde_json::json!({ "success": false })).unwrap();
        assert!(!parsed.success);
        assert!(parsed.user.is_none());
    }
}

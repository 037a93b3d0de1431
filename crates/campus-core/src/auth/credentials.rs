use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{SessionError, EMPTY_FIELDS_MESSAGE, INVALID_EMAIL_MESSAGE};

/// Maximum length for the identifier.
/// 254 is the longest address SMTP allows.
const MAX_IDENTIFIER_LENGTH: usize = 254;

/// Maximum length for the secret.
/// 128 chars accommodates password managers and passphrases.
const MAX_SECRET_LENGTH: usize = 128;

/// Identifier/secret pair. The secret never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    /// Build a validated pair. The identifier is trimmed; the secret is kept
    /// verbatim.
    pub fn new(identifier: &str, secret: &str) -> Result<Self, SessionError> {
        let credentials = Self {
            identifier: identifier.trim().to_string(),
            secret: secret.to_string(),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.identifier.is_empty() || self.secret.trim().is_empty() {
            return Err(SessionError::Validation(EMPTY_FIELDS_MESSAGE.to_string()));
        }
        if self.identifier.chars().count() > MAX_IDENTIFIER_LENGTH
            || !is_email_shaped(&self.identifier)
        {
            return Err(SessionError::Validation(INVALID_EMAIL_MESSAGE.to_string()));
        }
        if self.secret.chars().count() > MAX_SECRET_LENGTH {
            return Err(SessionError::Validation(format!(
                "Password must be at most {} characters",
                MAX_SECRET_LENGTH
            )));
        }
        Ok(())
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// `local@domain` with both parts non-empty and no whitespace.
fn is_email_shaped(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_identifier() {
        let creds = Credentials::new("  prof@example.edu ", "pw").unwrap();
        assert_eq!(creds.identifier(), "prof@example.edu");
        assert_eq!(creds.secret(), "pw");
    }

    #[test]
    fn test_empty_fields_rejected() {
        for (id, pw) in [("", ""), ("a@b.c", ""), ("", "pw"), ("   ", "pw")] {
            let err = Credentials::new(id, pw).unwrap_err();
            assert_eq!(err, SessionError::Validation(EMPTY_FIELDS_MESSAGE.to_string()));
        }
    }

    #[test]
    fn test_identifier_must_be_email_shaped() {
        for id in ["prof", "@example.edu", "prof@", "a@b@c", "pr of@example.edu"] {
            let err = Credentials::new(id, "pw").unwrap_err();
            assert_eq!(err, SessionError::Validation(INVALID_EMAIL_MESSAGE.to_string()));
        }
    }

    #[test]
    fn test_length_limits() {
        let long_id = format!("{}@example.edu", "a".repeat(MAX_IDENTIFIER_LENGTH));
        assert!(Credentials::new(&long_id, "pw").is_err());

        let long_pw = "x".repeat(MAX_SECRET_LENGTH + 1);
        assert!(Credentials::new("a@b.c", &long_pw).is_err());
        assert!(Credentials::new("a@b.c", &"x".repeat(MAX_SECRET_LENGTH)).is_ok());
    }

    #[test]
    fn test_secret_limit_counts_chars() {
        // Two bytes per char, so a byte count would reject this
        let accented = "\u{e9}".repeat(MAX_SECRET_LENGTH);
        assert!(Credentials::new("a@b.c", &accented).is_ok());

        let too_long = "\u{e9}".repeat(MAX_SECRET_LENGTH + 1);
        assert!(Credentials::new("a@b.c", &too_long).is_err());

        let umlauts = format!("{}@example.edu", "\u{fc}".repeat(200));
        assert!(Credentials::new(&umlauts, "pw").is_ok());
    }

    #[test]
    fn test_blank_secret_rejected() {
        let err = Credentials::new("a@b.c", "   ").unwrap_err();
        assert_eq!(err, SessionError::Validation(EMPTY_FIELDS_MESSAGE.to_string()));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("prof@example.edu", "correct-pw").unwrap();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("prof@example.edu"));
        assert!(!debug.contains("correct-pw"));
    }
}

use crate::schema::users;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("username regex"));
// Simplified RFC-5322 shape; good enough for registration screening.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

// Represents a user in the database
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Safe representation returned by the API; never carries the hash.
#[derive(Serialize, Debug, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RegisterPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Sanitized registration data, produced only when validation passes.
#[derive(Debug, Clone)]
pub struct SanitizedRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterPayload {
    /// Validates and sanitizes the payload before any DB work. Returns
    /// every violation at once so the client can fix them in one round.
    pub fn validate(&self) -> Result<SanitizedRegistration, Vec<String>> {
        let mut errors = Vec::new();

        let username = match self.username.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("username is required".to_string());
                String::new()
            }
            Some(trimmed) => {
                if trimmed.len() < 3 || trimmed.len() > 30 {
                    errors.push("username must be between 3 and 30 characters".to_string());
                }
                if !USERNAME_RE.is_match(trimmed) {
                    errors.push(
                        "username may only contain letters, numbers, and underscores".to_string(),
                    );
                }
                trimmed.to_string()
            }
        };

        let email = match self.email.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("email is required".to_string());
                String::new()
            }
            Some(trimmed) => {
                let lowered = trimmed.to_lowercase();
                if !EMAIL_RE.is_match(&lowered) {
                    errors.push("email must be a valid email address".to_string());
                }
                lowered
            }
        };

        let password = match self.password.as_deref() {
            None | Some("") => {
                errors.push("password is required".to_string());
                String::new()
            }
            Some(password) => {
                if password.len() < 8 {
                    errors.push("password must be at least 8 characters".to_string());
                }
                // bcrypt silently truncates at 72 bytes; reject early.
                if password.len() > 72 {
                    errors.push("password must not exceed 72 characters".to_string());
                }
                if !password.chars().any(|c| c.is_ascii_uppercase()) {
                    errors.push("password must contain at least one uppercase letter".to_string());
                }
                if !password.chars().any(|c| c.is_ascii_lowercase()) {
                    errors.push("password must contain at least one lowercase letter".to_string());
                }
                if !password.chars().any(|c| c.is_ascii_digit()) {
                    errors.push("password must contain at least one number".to_string());
                }
                password.to_string()
            }
        };

        if errors.is_empty() {
            Ok(SanitizedRegistration {
                username,
                email,
                password,
            })
        } else {
            Err(errors)
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(username: &str, email: &str, password: &str) -> RegisterPayload {
        RegisterPayload {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn valid_payload_is_sanitized() {
        let sanitized = payload("  alice_1 ", "Alice@Example.COM", "Sup3rSecret")
            .validate()
            .expect("payload should validate");
        assert_eq!(sanitized.username, "alice_1");
        assert_eq!(sanitized.email, "alice@example.com");
        assert_eq!(sanitized.password, "Sup3rSecret");
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let errors = RegisterPayload {
            username: None,
            email: None,
            password: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("username is required")));
        assert!(errors.iter().any(|e| e.contains("email is required")));
        assert!(errors.iter().any(|e| e.contains("password is required")));
    }

    #[test]
    fn username_charset_and_length_enforced() {
        let errors = payload("ab", "a@b.co", "Sup3rSecret").validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("between 3 and 30")));

        let errors = payload("bad name!", "a@b.co", "Sup3rSecret")
            .validate()
            .unwrap_err();
        assert!(errors.iter().any(|e| e.contains("letters, numbers")));
    }

    #[test]
    fn email_shape_enforced() {
        for bad in ["plainaddress", "no@tld", "spa ced@example.com"] {
            let errors = payload("alice", bad, "Sup3rSecret").validate().unwrap_err();
            assert!(
                errors.iter().any(|e| e.contains("valid email address")),
                "expected email error for {bad:?}"
            );
        }
    }

    #[test]
    fn password_rules_enforced() {
        let errors = payload("alice", "a@b.co", "short1A").validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("at least 8 characters")));

        let errors = payload("alice", "a@b.co", "alllowercase1")
            .validate()
            .unwrap_err();
        assert!(errors.iter().any(|e| e.contains("uppercase")));

        let errors = payload("alice", "a@b.co", "NoDigitsHere")
            .validate()
            .unwrap_err();
        assert!(errors.iter().any(|e| e.contains("number")));

        let long = format!("Aa1{}", "x".repeat(75));
        let errors = payload("alice", "a@b.co", &long).validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("exceed 72")));
    }
}

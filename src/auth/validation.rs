//! Input validation for login and account creation.
//!
//! These are plain functions over plain structs so the same rules can back
//! request validation in the handlers and inline feedback in the dashboard.
//! An empty result means the input is valid.

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity::normalize_username;
use super::role::Role;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
const EMAIL_MAX_LEN: usize = 254;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub struct LoginInput<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

pub struct NewUserInput<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: &'a str,
}

/// Login only checks presence and upper bounds; strength rules would leak
/// policy details and are enforced at creation time instead.
#[must_use]
pub fn validate_login(input: &LoginInput<'_>) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if input.username.trim().is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    } else if input.username.len() > USERNAME_MAX_LEN * 4 {
        errors.push(FieldError::new("username", "Username is too long"));
    }

    if input.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    } else if input.password.chars().count() > PASSWORD_MAX_LEN {
        errors.push(FieldError::new("password", "Password is too long"));
    }

    errors
}

#[must_use]
pub fn validate_new_user(input: &NewUserInput<'_>) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let username = normalize_username(input.username);
    if username.is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    } else if username.len() < USERNAME_MIN_LEN || username.len() > USERNAME_MAX_LEN {
        errors.push(FieldError::new(
            "username",
            format!("Username must be between {USERNAME_MIN_LEN} and {USERNAME_MAX_LEN} characters"),
        ));
    } else if !valid_username(&username) {
        errors.push(FieldError::new(
            "username",
            "Username may only contain letters, digits, '.', '_' and '-'",
        ));
    }

    let email = input.email.trim();
    if email.is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if email.len() > EMAIL_MAX_LEN || !valid_email(email) {
        errors.push(FieldError::new("email", "Invalid email"));
    }

    errors.extend(password_errors(input.password));

    if Role::from_code(input.role.trim()).is_err() {
        errors.push(FieldError::new("role", "Unknown role"));
    }

    errors
}

fn password_errors(password: &str) -> Vec<FieldError> {
    let length = password.chars().count();
    if length < PASSWORD_MIN_LEN || length > PASSWORD_MAX_LEN {
        return vec![FieldError::new(
            "password",
            format!("Password must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN} characters"),
        )];
    }

    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return vec![FieldError::new(
            "password",
            "Password must contain at least one letter and one digit",
        )];
    }

    Vec::new()
}

/// Basic email format check.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Username charset check on already-normalized input.
pub fn valid_username(username_normalized: &str) -> bool {
    Regex::new(r"^[a-z0-9._-]+$").is_ok_and(|re| re.is_match(username_normalized))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user<'a>(username: &'a str, email: &'a str, password: &'a str, role: &'a str) -> NewUserInput<'a> {
        NewUserInput {
            username,
            email,
            password,
            role,
        }
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = validate_login(&LoginInput {
            username: "  ",
            password: "",
        });
        assert_eq!(fields(&errors), vec!["username", "password"]);
    }

    #[test]
    fn login_accepts_any_non_empty_password() {
        let errors = validate_login(&LoginInput {
            username: "alice",
            password: "x",
        });
        assert!(errors.is_empty());
    }

    #[test]
    fn login_rejects_oversized_password() {
        let long = "a".repeat(PASSWORD_MAX_LEN + 1);
        let errors = validate_login(&LoginInput {
            username: "alice",
            password: &long,
        });
        assert_eq!(fields(&errors), vec!["password"]);
    }

    #[test]
    fn password_limits_count_characters_not_bytes() {
        // 127 two-byte letters plus a digit: 128 characters, 255 bytes.
        let password = format!("{}1", "ä".repeat(PASSWORD_MAX_LEN - 1));
        let created = validate_new_user(&new_user("alice", "a@b.co", &password, "editor"));
        assert!(created.is_empty(), "{created:?}");
        let login = validate_login(&LoginInput {
            username: "alice",
            password: &password,
        });
        assert!(login.is_empty(), "{login:?}");
    }

    #[test]
    fn new_user_accepts_valid_input() {
        let errors = validate_new_user(&new_user("Alice", "alice@newsdesk.dev", "Secret123", "editor"));
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn new_user_reports_every_bad_field() {
        let errors = validate_new_user(&new_user("a!", "nope", "short", "owner"));
        assert_eq!(fields(&errors), vec!["username", "email", "password", "role"]);
    }

    #[test]
    fn new_user_rejects_bad_username_charset() {
        let errors = validate_new_user(&new_user("alice smith", "a@b.co", "Secret123", "reader"));
        assert_eq!(fields(&errors), vec!["username"]);
    }

    #[test]
    fn new_user_requires_letter_and_digit() {
        let errors = validate_new_user(&new_user("alice", "a@b.co", "onlyletters", "reader"));
        assert_eq!(fields(&errors), vec!["password"]);
        let errors = validate_new_user(&new_user("alice", "a@b.co", "12345678", "reader"));
        assert_eq!(fields(&errors), vec!["password"]);
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("a b@example.com"));
    }
}

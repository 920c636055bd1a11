//! Registration input validation

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AuthError, AuthResult};

fn username_regex() -> &'static Regex {
    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("username regex must compile"))
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email regex must compile")
    })
}

/// Validate a username: 3-50 chars, letters, digits and underscores
pub fn validate_username(username: &str) -> AuthResult<()> {
    if username.is_empty() {
        return Err(AuthError::Validation("username is required".into()));
    }
    if username.len() < 3 || username.len() > 50 {
        return Err(AuthError::Validation(
            "username must be between 3 and 50 characters".into(),
        ));
    }
    if !username_regex().is_match(username) {
        return Err(AuthError::Validation(
            "username may only contain letters, digits, and underscores".into(),
        ));
    }
    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> AuthResult<()> {
    if email.is_empty() {
        return Err(AuthError::Validation("email is required".into()));
    }
    if email.len() > 100 {
        return Err(AuthError::Validation(
            "email must be at most 100 characters".into(),
        ));
    }
    if !email_regex().is_match(email) {
        return Err(AuthError::Validation("invalid email format".into()));
    }
    Ok(())
}

/// Validate a password: 8-128 chars with at least one letter and one digit
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.is_empty() {
        return Err(AuthError::Validation("password is required".into()));
    }
    if password.len() < 8 || password.len() > 128 {
        return Err(AuthError::Validation(
            "password must be between 8 and 128 characters".into(),
        ));
    }

    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(AuthError::Validation(
            "password must contain at least one letter and one digit".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_usernames() {
        assert!(validate_username("bob").is_ok());
        assert!(validate_username("trader_42").is_ok());
    }

    #[test]
    fn rejects_bad_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn accepts_reasonable_emails() {
        assert!(validate_email("bob@example.com").is_ok());
        assert!(validate_email("a.b+c@sub.example.co").is_ok());
    }

    #[test]
    fn rejects_bad_emails() {
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("missing@tld").is_err());
    }

    #[test]
    fn password_needs_length_letter_and_digit() {
        assert!(validate_password("trade2026").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("allletters").is_err());
        assert!(validate_password("1234567890").is_err());
    }
}

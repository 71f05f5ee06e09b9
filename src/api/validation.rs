//! Input validation for API requests.
//!
//! These return a plain message per field; handlers collect them with the
//! `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Pragmatic email shape check, not full RFC 5322
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9][-a-zA-Z0-9]*(\.[a-zA-Z0-9][-a-zA-Z0-9]*)+$"
    ).unwrap();
}

/// Minimum size for a pasted error log. Anything shorter is a snippet the
/// model cannot do anything useful with.
const MIN_ERROR_LOG_CHARS: usize = 50;

const MIN_QUESTION_CHARS: usize = 10;

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }

    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }

    if name.len() > 100 {
        return Err("Name is too long (max 100 characters)".to_string());
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }

    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }

    Ok(())
}

pub fn validate_error_log(error_log: &str) -> Result<(), String> {
    if error_log.trim().len() < MIN_ERROR_LOG_CHARS {
        return Err(format!(
            "Error log must be at least {} characters",
            MIN_ERROR_LOG_CHARS
        ));
    }

    Ok(())
}

pub fn validate_minecraft_version(version: &str) -> Result<(), String> {
    if version.trim().is_empty() {
        return Err("Minecraft version is required".to_string());
    }

    if version.len() > 32 {
        return Err("Minecraft version is too long (max 32 characters)".to_string());
    }

    Ok(())
}

pub fn validate_question(question: &str) -> Result<(), String> {
    if question.trim().len() < MIN_QUESTION_CHARS {
        return Err(format!(
            "Question must be at least {} characters",
            MIN_QUESTION_CHARS
        ));
    }

    Ok(())
}

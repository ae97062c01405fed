//! Field validation shared by the signup, login and checkout forms.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// A problem with one form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Join field errors into one line for toasts and logs
pub fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$";
const PHONE_PATTERN: &str = r"^\+?[0-9][0-9 \-]{6,18}[0-9]$";

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value.trim()))
}

pub fn is_valid_email(email: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, EMAIL_PATTERN, email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    matches(&RE, PHONE_PATTERN, phone)
}

/// Push an error if `value` is blank
pub fn require(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "is required"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("amina@example.com"));
        assert!(is_valid_email(" a.b+tag@mail.co.uk "));
        assert!(!is_valid_email("amina@"));
        assert!(!is_valid_email("amina.example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_phone_pattern() {
        assert!(is_valid_phone("+92 300 1234567"));
        assert!(is_valid_phone("03001234567"));
        assert!(!is_valid_phone("12ab"));
        assert!(!is_valid_phone("123"));
    }

    #[test]
    fn test_summarize() {
        let errors = vec![
            FieldError::new("email", "is required"),
            FieldError::new("city", "is required"),
        ];
        assert_eq!(summarize(&errors), "email: is required; city: is required");
    }
}

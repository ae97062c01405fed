//! Signup and login form checks, run before anything is sent.

use crate::api::dto::{LoginRequest, SignupRequest};
use crate::validation::{is_valid_email, is_valid_phone, require, FieldError};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub phone: String,
}

impl SignupForm {
    /// All field errors at once; empty when the form is valid
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        require(&mut errors, "name", &self.name);

        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "is required"));
        } else if !is_valid_email(&self.email) {
            errors.push(FieldError::new("email", "is not a valid email address"));
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new(
                "password",
                format!("must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        } else if !self.password.chars().any(|c| c.is_ascii_alphabetic())
            || !self.password.chars().any(|c| c.is_ascii_digit())
        {
            errors.push(FieldError::new(
                "password",
                "must contain a letter and a digit",
            ));
        }

        if self.confirm_password != self.password {
            errors.push(FieldError::new("confirm_password", "does not match"));
        }

        if !self.phone.trim().is_empty() && !is_valid_phone(&self.phone) {
            errors.push(FieldError::new("phone", "is not a valid phone number"));
        }

        errors
    }

    /// Validated request body
    pub fn to_request(&self) -> Result<SignupRequest, Vec<FieldError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let phone = self.phone.trim();
        Ok(SignupRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password.clone(),
            phone: (!phone.is_empty()).then(|| phone.to_string()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn to_request(&self) -> Result<LoginRequest, Vec<FieldError>> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.email) {
            errors.push(FieldError::new("email", "is not a valid email address"));
        }
        require(&mut errors, "password", &self.password);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(LoginRequest {
            email: self.email.trim().to_lowercase(),
            password: self.password.clone(),
        })
    }
}

//! API Error Types
//!
//! Structured results for every backend call. The backend reports business
//! failures as free-form message strings, sometimes with a 2xx status; this
//! module is the only place those strings are interpreted. Callers match on
//! [`ApiError`] and [`Rejection`] variants instead.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Business-rule rejections the backend is known to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    InvalidOtp,
    OtpExpired,
    SlotAlreadyBooked,
    EmailTaken,
    InvalidCredentials,
    OutOfStock,
    /// Anything else, with the backend's message
    Other(String),
}

impl Rejection {
    /// Classify a backend message
    pub fn from_message(message: &str) -> Self {
        let m = message.to_lowercase();

        if m.contains("otp has expired")
            || m.contains("otp expired")
            || m.contains("otp is expired")
            || m.contains("expired otp")
            || m.contains("code has expired")
        {
            Self::OtpExpired
        } else if m.contains("invalid otp")
            || m.contains("incorrect otp")
            || m.contains("wrong otp")
            || m.contains("otp is invalid")
        {
            Self::InvalidOtp
        } else if m.contains("already booked") || m.contains("slot is not available") {
            Self::SlotAlreadyBooked
        } else if m.contains("already registered")
            || m.contains("already exists")
            || m.contains("email is taken")
        {
            Self::EmailTaken
        } else if m.contains("invalid credentials")
            || m.contains("invalid email or password")
            || m.contains("incorrect password")
        {
            Self::InvalidCredentials
        } else if m.contains("out of stock") || m.contains("insufficient stock") {
            Self::OutOfStock
        } else {
            Self::Other(message.to_string())
        }
    }

    /// Whether this is one of the recognized failure messages
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Text suitable for a toast
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidOtp => "The code you entered is not valid".to_string(),
            Self::OtpExpired => "The code has expired, request a new one".to_string(),
            Self::SlotAlreadyBooked => "That time slot has just been booked".to_string(),
            Self::EmailTaken => "An account with this email already exists".to_string(),
            Self::InvalidCredentials => "Email or password is incorrect".to_string(),
            Self::OutOfStock => "An item in your cart is out of stock".to_string(),
            Self::Other(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.user_message())
    }
}

/// Errors returned by the marketplace API client
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Could not reach the backend
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Missing or expired session
    #[error("Not signed in: {0}")]
    Unauthorized(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend refused the request for a business reason
    #[error("{0}")]
    Rejected(Rejection),

    /// Request was refused before being sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Backend failure
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl ApiError {
    /// Whether the user may reasonably try again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout | Self::Server { .. }
        )
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Pull a human-readable message out of a backend body
pub fn body_message(body: &Value) -> Option<String> {
    match body {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| map.get("error").and_then(Value::as_str))
            .or_else(|| {
                map.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string),
        _ => None,
    }
}

/// Turn a raw status + body into either the JSON payload or a structured error
pub fn interpret_response(status: u16, body: &str) -> ApiResult<Value> {
    let value = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
    };

    let message = body_message(&value);

    if (200..300).contains(&status) {
        if value.get("success").and_then(Value::as_bool) == Some(false) {
            let msg = message.unwrap_or_else(|| "Request was not successful".to_string());
            return Err(ApiError::Rejected(Rejection::from_message(&msg)));
        }

        if let Some(msg) = &message {
            let rejection = Rejection::from_message(msg);
            if rejection.is_known() {
                return Err(ApiError::Rejected(rejection));
            }
        }

        return Ok(value);
    }

    let message = message.unwrap_or_else(|| format!("HTTP {}", status));

    Err(match status {
        401 | 403 => ApiError::Unauthorized(message),
        404 => ApiError::NotFound(message),
        408 | 504 => ApiError::Timeout,
        400..=499 => ApiError::Rejected(Rejection::from_message(&message)),
        _ => ApiError::Server { status, message },
    })
}

/// Decode a payload that the backend may return bare, under `key`, or under `data`
pub fn decode_payload<T: DeserializeOwned>(value: Value, key: &str) -> ApiResult<T> {
    if let Some(inner) = value.get(key) {
        if let Ok(decoded) = serde_json::from_value::<T>(inner.clone()) {
            return Ok(decoded);
        }
    }

    if let Some(inner) = value.get("data") {
        if let Ok(decoded) = serde_json::from_value::<T>(inner.clone()) {
            return Ok(decoded);
        }
    }

    serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("{}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_rejection_classification() {
        assert_eq!(Rejection::from_message("Invalid OTP"), Rejection::InvalidOtp);
        assert_eq!(Rejection::from_message("OTP has expired"), Rejection::OtpExpired);
        assert_eq!(
            Rejection::from_message("This slot is already booked"),
            Rejection::SlotAlreadyBooked
        );
        assert_eq!(
            Rejection::from_message("User already exists"),
            Rejection::EmailTaken
        );
        assert_eq!(
            Rejection::from_message("Something odd"),
            Rejection::Other("Something odd".to_string())
        );
    }

    #[test]
    fn test_success_message_is_not_a_rejection() {
        let result = interpret_response(200, r#"{"message": "OTP verified successfully"}"#);
        assert!(result.is_ok());
    }

    #[test]
    fn test_otp_sent_notice_mentioning_expiry_is_success() {
        let result = interpret_response(
            200,
            r#"{"message": "OTP sent to your email. It will expire in 10 minutes"}"#,
        );
        assert!(result.is_ok());
        assert_eq!(Rejection::from_message("Expired OTP"), Rejection::OtpExpired);
        assert_eq!(
            interpret_response(200, r#"{"message": "OTP expired, request a new one"}"#),
            Err(ApiError::Rejected(Rejection::OtpExpired))
        );
    }

    #[test]
    fn test_failure_message_with_ok_status() {
        let result = interpret_response(200, r#"{"message": "Invalid OTP"}"#);
        assert_eq!(result, Err(ApiError::Rejected(Rejection::InvalidOtp)));
    }

    #[test]
    fn test_success_false_flag() {
        let result = interpret_response(200, r#"{"success": false, "message": "nope"}"#);
        assert_eq!(
            result,
            Err(ApiError::Rejected(Rejection::Other("nope".to_string())))
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            interpret_response(401, r#"{"error": "token expired"}"#),
            Err(ApiError::Unauthorized(m)) if m == "token expired"
        ));
        assert!(matches!(
            interpret_response(404, ""),
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(
            interpret_response(409, r#"{"error": {"message": "Slot already booked"}}"#),
            Err(ApiError::Rejected(Rejection::SlotAlreadyBooked))
        );
        assert!(matches!(
            interpret_response(502, "Bad Gateway"),
            Err(ApiError::Server { status: 502, message }) if message == "Bad Gateway"
        ));
    }

    #[test]
    fn test_decode_payload_shapes() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Item {
            id: u32,
        }

        let bare: Vec<Item> = decode_payload(serde_json::json!([{"id": 1}]), "items").unwrap();
        assert_eq!(bare, vec![Item { id: 1 }]);

        let keyed: Vec<Item> =
            decode_payload(serde_json::json!({"items": [{"id": 2}]}), "items").unwrap();
        assert_eq!(keyed, vec![Item { id: 2 }]);

        let data: Vec<Item> =
            decode_payload(serde_json::json!({"data": [{"id": 3}]}), "items").unwrap();
        assert_eq!(data, vec![Item { id: 3 }]);

        let bad: ApiResult<Vec<Item>> = decode_payload(serde_json::json!({"x": 1}), "items");
        assert!(matches!(bad, Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_transient_errors() {
        assert!(ApiError::Timeout.is_transient());
        assert!(!ApiError::Rejected(Rejection::InvalidOtp).is_transient());
    }
}

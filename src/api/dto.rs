//! Data Transfer Objects
//!
//! Request and response bodies exchanged with the marketplace backend.
//! Shared by the native client and the browser frontend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Address, OrderLine, PaymentMethod, ReviewTarget, User};

// ============================================
// AUTH DTOs
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct OtpRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OtpVerifyRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Credential and decoded claims forwarded after a federated sign-in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FederatedLoginRequest {
    pub credential: String,
    pub name: String,
    pub email: String,
}

/// Successful login
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

// ============================================
// CART / ORDER DTOs
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct AddToCartRequest {
    pub user_id: String,
    pub product_id: String,
    pub vendor_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateCartRequest {
    pub quantity: u32,
}

/// The single order-creation request sent at checkout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub items: Vec<OrderLine>,
    pub address: Address,
    pub payment_method: PaymentMethod,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub total: f64,
}

// ============================================
// BOOKING / REVIEW DTOs
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateBookingRequest {
    pub vendor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    pub user_id: String,
    pub date: NaiveDate,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateReviewRequest {
    pub author_id: String,
    pub target: ReviewTarget,
    pub rating: u8,
    pub comment: String,
}

// ============================================
// CHAT DTOs
// ============================================

#[derive(Debug, Clone, Serialize)]
pub struct OpenConversationRequest {
    pub customer_id: String,
    pub vendor_id: String,
}

// ============================================
// QUERY PARAMS
// ============================================

/// Server-side product search parameters
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
}

/// Vendor directory parameters
#[derive(Debug, Clone, Default, Serialize)]
pub struct VendorQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_query_skips_empty_fields() {
        let query = ProductQuery {
            q: Some("lamp".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&query).unwrap();
        assert_eq!(json, r#"{"q":"lamp"}"#);
    }

    #[test]
    fn test_auth_response_deserialize() {
        let json = r#"{"user": {"id": "u1", "name": "A", "email": "a@b.co"}, "token": "t"}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.user.id, "u1");
        assert_eq!(resp.token, "t");
    }
}

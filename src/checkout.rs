//! Checkout
//!
//! Turns the cart plus the address/payment form into the one
//! order-creation request, and makes sure only one is sent per attempt.

use thiserror::Error;

use crate::api::dto::CreateOrderRequest;
use crate::api::ApiError;
use crate::cart::{round2, Cart, FeePolicy};
use crate::models::{Address, OrderLine, PaymentMethod, SavedAddress};
use crate::validation::{is_valid_phone, require, summarize, FieldError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Address is incomplete: {}", summarize(.0))]
    InvalidAddress(Vec<FieldError>),

    #[error("Choose a payment method")]
    NoPaymentMethod,

    #[error("Order is already being placed")]
    InFlight,

    #[error("Order {0} has already been placed")]
    AlreadyPlaced(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Required fields for delivery
pub fn validate_address(address: &Address) -> Vec<FieldError> {
    let mut errors = Vec::new();

    require(&mut errors, "full_name", &address.full_name);
    if address.phone.trim().is_empty() {
        errors.push(FieldError::new("phone", "is required"));
    } else if !is_valid_phone(&address.phone) {
        errors.push(FieldError::new("phone", "is not a valid phone number"));
    }
    require(&mut errors, "line1", &address.line1);
    require(&mut errors, "city", &address.city);
    require(&mut errors, "postal_code", &address.postal_code);
    require(&mut errors, "country", &address.country);

    errors
}

/// Address and payment choices on the checkout page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutForm {
    pub address: Address,
    pub payment_method: Option<PaymentMethod>,
}

impl CheckoutForm {
    pub fn use_saved_address(&mut self, saved: &SavedAddress) {
        self.address = saved.address.clone();
    }

    pub fn is_complete(&self) -> bool {
        self.payment_method.is_some() && validate_address(&self.address).is_empty()
    }
}

/// Map each cart line to the order-line shape
pub fn order_lines(cart: &Cart) -> Vec<OrderLine> {
    cart.items()
        .iter()
        .map(|item| OrderLine {
            vendor_id: item.vendor_id.clone(),
            product_id: item.product_id.clone(),
            quantity: item.quantity,
            total: round2(item.line_total()),
        })
        .collect()
}

/// Build the order-creation request, or say what is missing
pub fn build_order(
    user_id: &str,
    cart: &Cart,
    form: &CheckoutForm,
    policy: &FeePolicy,
) -> Result<CreateOrderRequest, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let errors = validate_address(&form.address);
    if !errors.is_empty() {
        return Err(CheckoutError::InvalidAddress(errors));
    }

    let payment_method = form.payment_method.ok_or(CheckoutError::NoPaymentMethod)?;
    let totals = cart.totals(policy);

    Ok(CreateOrderRequest {
        user_id: user_id.to_string(),
        items: order_lines(cart),
        address: form.address.clone(),
        payment_method,
        subtotal: totals.subtotal,
        delivery_fee: totals.delivery_fee,
        total: totals.total,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum LatchState {
    #[default]
    Idle,
    InFlight,
    Placed(String),
}

/// Lets one order request through per checkout attempt
///
/// Repeated clicks while a request is in flight are refused; a failure
/// reopens the latch so the user can try again.
#[derive(Debug, Clone, Default)]
pub struct SubmitLatch {
    state: LatchState,
}

impl SubmitLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&mut self) -> Result<(), CheckoutError> {
        match &self.state {
            LatchState::Idle => {
                self.state = LatchState::InFlight;
                Ok(())
            }
            LatchState::InFlight => Err(CheckoutError::InFlight),
            LatchState::Placed(id) => Err(CheckoutError::AlreadyPlaced(id.clone())),
        }
    }

    pub fn succeeded(&mut self, order_id: impl Into<String>) {
        self.state = LatchState::Placed(order_id.into());
    }

    pub fn failed(&mut self) {
        self.state = LatchState::Idle;
    }

    pub fn in_flight(&self) -> bool {
        self.state == LatchState::InFlight
    }

    pub fn placed_order(&self) -> Option<&str> {
        match &self.state {
            LatchState::Placed(id) => Some(id),
            _ => None,
        }
    }
}

/// Send the order through the latch
#[cfg(feature = "native")]
pub async fn place_order(
    client: &crate::api::MarketplaceClient,
    latch: &mut SubmitLatch,
    request: &CreateOrderRequest,
) -> Result<crate::models::Order, CheckoutError> {
    latch.try_begin()?;

    match client.create_order(request).await {
        Ok(order) => {
            tracing::info!(order_id = %order.id, lines = order.items.len(), total = order.total, "Order placed");
            latch.succeeded(order.id.clone());
            Ok(order)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Order placement failed");
            latch.failed();
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::item;

    fn complete_address() -> Address {
        Address {
            full_name: "Amina Khan".to_string(),
            phone: "+92 300 1234567".to_string(),
            line1: "12 Mall Road".to_string(),
            line2: None,
            city: "Lahore".to_string(),
            state: Some("Punjab".to_string()),
            postal_code: "54000".to_string(),
            country: "Pakistan".to_string(),
        }
    }

    fn cart() -> Cart {
        Cart::from_items(vec![
            item("c1", "p1", "v1", 450.0, 2),
            item("c2", "p2", "v2", 1200.0, 1),
        ])
    }

    #[test]
    fn test_order_maps_every_line() {
        let form = CheckoutForm {
            address: complete_address(),
            payment_method: Some(PaymentMethod::CashOnDelivery),
        };

        let request = build_order("u1", &cart(), &form, &FeePolicy::default()).unwrap();

        assert_eq!(
            request.items,
            vec![
                OrderLine {
                    vendor_id: "v1".to_string(),
                    product_id: "p1".to_string(),
                    quantity: 2,
                    total: 900.0,
                },
                OrderLine {
                    vendor_id: "v2".to_string(),
                    product_id: "p2".to_string(),
                    quantity: 1,
                    total: 1200.0,
                },
            ]
        );
        assert_eq!(request.subtotal, 2100.0);
        assert_eq!(request.delivery_fee, 300.0);
        assert_eq!(request.total, 2400.0);
        assert_eq!(request.address, complete_address());
    }

    #[test]
    fn test_incomplete_address_is_rejected() {
        let mut address = complete_address();
        address.city = "  ".to_string();
        address.postal_code.clear();

        let form = CheckoutForm {
            address,
            payment_method: Some(PaymentMethod::Card),
        };

        match build_order("u1", &cart(), &form, &FeePolicy::default()) {
            Err(CheckoutError::InvalidAddress(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["city", "postal_code"]);
            }
            other => panic!("Expected InvalidAddress, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_payment_and_empty_cart() {
        let form = CheckoutForm {
            address: complete_address(),
            payment_method: None,
        };
        assert!(!form.is_complete());
        assert_eq!(
            build_order("u1", &cart(), &form, &FeePolicy::default()),
            Err(CheckoutError::NoPaymentMethod)
        );
        assert_eq!(
            build_order("u1", &Cart::new(), &form, &FeePolicy::default()),
            Err(CheckoutError::EmptyCart)
        );
    }

    #[test]
    fn test_latch_allows_one_submission() {
        let mut latch = SubmitLatch::new();
        latch.try_begin().unwrap();
        assert_eq!(latch.try_begin(), Err(CheckoutError::InFlight));

        latch.failed();
        latch.try_begin().unwrap();
        latch.succeeded("o1");
        assert_eq!(
            latch.try_begin(),
            Err(CheckoutError::AlreadyPlaced("o1".to_string()))
        );
        assert_eq!(latch.placed_order(), Some("o1"));
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn test_place_order_sends_exactly_one_request() {
        use crate::api::{ClientConfig, MarketplaceClient};
        use axum::{routing::post, Json, Router};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/orders",
            post(move |Json(mut body): Json<serde_json::Value>| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    body["id"] = serde_json::json!("o42");
                    body["created_at"] = serde_json::json!("2026-05-01T10:00:00Z");
                    Json(body)
                }
            }),
        );
        let base_url = crate::api::client_tests::spawn_backend(router).await;
        let client = MarketplaceClient::new(ClientConfig {
            base_url,
            request_timeout_ms: 2_000,
        })
        .unwrap();

        let form = CheckoutForm {
            address: complete_address(),
            payment_method: Some(PaymentMethod::Card),
        };
        let request = build_order("u1", &cart(), &form, &FeePolicy::default()).unwrap();
        let mut latch = SubmitLatch::new();

        let order = place_order(&client, &mut latch, &request).await.unwrap();
        assert_eq!(order.id, "o42");
        assert_eq!(order.items.len(), 2);

        let again = place_order(&client, &mut latch, &request).await;
        assert_eq!(again.unwrap_err(), CheckoutError::AlreadyPlaced("o42".to_string()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}

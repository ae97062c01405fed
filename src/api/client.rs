//! Marketplace REST API Client
//!
//! HTTP client for the marketplace backend. Every call funnels through
//! [`MarketplaceClient::send`], which turns transport errors and backend
//! bodies into [`ApiError`]s. Nothing is retried automatically.

use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::dto::*;
use super::error::{decode_payload, interpret_response, ApiError, ApiResult};
use crate::models::{
    BookedSlot, Booking, CartItem, Conversation, Message, Order, Product, Review, ReviewTarget,
    SavedAddress, Service, Vendor,
};

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for the backend (e.g., "http://localhost:5000/api")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout_ms: 15_000,
        }
    }
}

/// Marketplace REST API client
#[derive(Debug, Clone)]
pub struct MarketplaceClient {
    client: Client,
    config: ClientConfig,
    token: Option<String>,
}

impl MarketplaceClient {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            token: None,
        })
    }

    /// A copy of this client that sends the session token
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
            token: Some(token.into()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Send a request and interpret the backend's answer
    async fn send(&self, request: RequestBuilder) -> ApiResult<Value> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let url = response.url().path().to_string();
        let body = response.text().await.map_err(transport_error)?;

        let result = interpret_response(status, &body);
        match &result {
            Ok(_) => tracing::debug!(status, path = %url, "Backend call succeeded"),
            Err(e) => tracing::warn!(status, path = %url, error = %e, "Backend call failed"),
        }
        result
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, key: &str) -> ApiResult<T> {
        let value = self.send(self.client.get(self.url(path))).await?;
        decode_payload(value, key)
    }

    async fn get_with<T, Q>(&self, path: &str, query: &Q, key: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let value = self
            .send(self.client.get(self.url(path)).query(query))
            .await?;
        decode_payload(value, key)
    }

    async fn post<B, T>(&self, path: &str, body: &B, key: &str) -> ApiResult<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self
            .send(self.client.post(self.url(path)).json(body))
            .await?;
        decode_payload(value, key)
    }

    async fn post_unit<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        self.send(self.client.post(self.url(path)).json(body))
            .await
            .map(|_| ())
    }

    // ============ Auth ============

    /// Ask the backend to email a one-time password
    pub async fn request_otp(&self, email: &str) -> ApiResult<()> {
        self.post_unit(
            "auth/otp/send",
            &OtpRequest {
                email: email.to_string(),
            },
        )
        .await
    }

    /// Check a one-time password
    pub async fn verify_otp(&self, email: &str, otp: &str) -> ApiResult<()> {
        self.post_unit(
            "auth/otp/verify",
            &OtpVerifyRequest {
                email: email.to_string(),
                otp: otp.to_string(),
            },
        )
        .await
    }

    pub async fn signup(&self, request: &SignupRequest) -> ApiResult<AuthResponse> {
        self.post("auth/signup", request, "auth").await
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        self.post(
            "auth/login",
            &LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            },
            "auth",
        )
        .await
    }

    pub async fn federated_login(&self, request: &FederatedLoginRequest) -> ApiResult<AuthResponse> {
        self.post("auth/google", request, "auth").await
    }

    // ============ Catalog ============

    pub async fn products(&self, query: &ProductQuery) -> ApiResult<Vec<Product>> {
        self.get_with("products", query, "products").await
    }

    pub async fn product(&self, id: &str) -> ApiResult<Product> {
        self.get(&format!("products/{}", segment(id)), "product").await
    }

    /// Count a product view on the backend
    pub async fn record_product_view(&self, id: &str) -> ApiResult<()> {
        self.send(
            self.client
                .post(self.url(&format!("products/{}/views", segment(id)))),
        )
        .await
        .map(|_| ())
    }

    pub async fn reviews(&self, target: &ReviewTarget) -> ApiResult<Vec<Review>> {
        let path = match target {
            ReviewTarget::Product(id) => format!("products/{}/reviews", segment(id)),
            ReviewTarget::Vendor(id) => format!("vendors/{}/reviews", segment(id)),
        };
        self.get(&path, "reviews").await
    }

    pub async fn submit_review(&self, request: &CreateReviewRequest) -> ApiResult<Review> {
        self.post("reviews", request, "review").await
    }

    pub async fn vendors(&self, query: &VendorQuery) -> ApiResult<Vec<Vendor>> {
        self.get_with("vendors", query, "vendors").await
    }

    pub async fn vendor(&self, id: &str) -> ApiResult<Vendor> {
        self.get(&format!("vendors/{}", segment(id)), "vendor").await
    }

    pub async fn vendor_services(&self, vendor_id: &str) -> ApiResult<Vec<Service>> {
        self.get(&format!("vendors/{}/services", segment(vendor_id)), "services")
            .await
    }

    // ============ Bookings ============

    /// Slots already taken for a vendor on a date
    pub async fn booked_slots(&self, vendor_id: &str, date: NaiveDate) -> ApiResult<Vec<BookedSlot>> {
        self.get_with(
            &format!("vendors/{}/slots", segment(vendor_id)),
            &[("date", date.to_string())],
            "slots",
        )
        .await
    }

    pub async fn create_booking(&self, request: &CreateBookingRequest) -> ApiResult<Booking> {
        self.post("bookings", request, "booking").await
    }

    pub async fn bookings(&self, user_id: &str) -> ApiResult<Vec<Booking>> {
        self.get_with("bookings", &[("user_id", user_id)], "bookings")
            .await
    }

    // ============ Cart & orders ============

    pub async fn cart(&self, user_id: &str) -> ApiResult<Vec<CartItem>> {
        self.get(&format!("cart/{}", segment(user_id)), "items").await
    }

    pub async fn add_to_cart(&self, request: &AddToCartRequest) -> ApiResult<CartItem> {
        self.post("cart", request, "item").await
    }

    pub async fn update_cart_item(&self, item_id: &str, quantity: u32) -> ApiResult<()> {
        self.send(
            self.client
                .put(self.url(&format!("cart/{}", segment(item_id))))
                .json(&UpdateCartRequest { quantity }),
        )
        .await
        .map(|_| ())
    }

    pub async fn remove_cart_item(&self, item_id: &str) -> ApiResult<()> {
        self.send(
            self.client
                .delete(self.url(&format!("cart/{}", segment(item_id)))),
        )
        .await
        .map(|_| ())
    }

    pub async fn saved_addresses(&self, user_id: &str) -> ApiResult<Vec<SavedAddress>> {
        self.get(&format!("users/{}/addresses", segment(user_id)), "addresses")
            .await
    }

    pub async fn create_order(&self, request: &CreateOrderRequest) -> ApiResult<Order> {
        self.post("orders", request, "order").await
    }

    pub async fn orders(&self, user_id: &str) -> ApiResult<Vec<Order>> {
        self.get_with("orders", &[("user_id", user_id)], "orders").await
    }

    // ============ Chat ============

    /// Create or fetch the conversation between a customer and a vendor
    pub async fn open_conversation(&self, customer_id: &str, vendor_id: &str) -> ApiResult<Conversation> {
        self.post(
            "conversations",
            &OpenConversationRequest {
                customer_id: customer_id.to_string(),
                vendor_id: vendor_id.to_string(),
            },
            "conversation",
        )
        .await
    }

    pub async fn conversations(&self, participant_id: &str) -> ApiResult<Vec<Conversation>> {
        self.get_with(
            "conversations",
            &[("participant", participant_id)],
            "conversations",
        )
        .await
    }

    /// Message history, in the order the backend returns it
    pub async fn messages(&self, conversation_id: &str) -> ApiResult<Vec<Message>> {
        self.get(
            &format!("conversations/{}/messages", segment(conversation_id)),
            "messages",
        )
        .await
    }

    pub async fn persist_message(&self, message: &Message) -> ApiResult<Message> {
        self.post(
            &format!("conversations/{}/messages", segment(&message.conversation_id)),
            message,
            "message",
        )
        .await
    }
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_decode() {
        ApiError::Decode(e.to_string())
    } else {
        ApiError::Network(e.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::Rejection;
    use crate::models::{Address, OrderLine, PaymentMethod};
    use axum::{
        extract::{Path, Query},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use std::collections::HashMap;

    pub(crate) async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> MarketplaceClient {
        MarketplaceClient::new(ClientConfig {
            base_url,
            request_timeout_ms: 2_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_products_with_query() {
        let router = Router::new().route(
            "/products",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let name = params.get("q").cloned().unwrap_or_default();
                Json(serde_json::json!({
                    "products": [
                        {"id": "p1", "vendor_id": "v1", "name": name, "price": 500}
                    ]
                }))
            }),
        );
        let client = client_for(spawn_backend(router).await);

        let products = client
            .products(&ProductQuery {
                q: Some("kettle".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "kettle");
    }

    #[tokio::test]
    async fn test_invalid_otp_is_structured() {
        let router = Router::new().route(
            "/auth/otp/verify",
            post(|| async { Json(serde_json::json!({"message": "Invalid OTP"})) }),
        );
        let client = client_for(spawn_backend(router).await);

        let result = client.verify_otp("a@b.co", "000000").await;
        assert_eq!(result, Err(ApiError::Rejected(Rejection::InvalidOtp)));
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let router = Router::new().route(
            "/orders",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth == "Bearer secret" {
                    (StatusCode::OK, Json(serde_json::json!({"orders": []})))
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(serde_json::json!({"message": "missing token"})),
                    )
                }
            }),
        );
        let base = spawn_backend(router).await;

        let anonymous = client_for(base.clone());
        assert!(matches!(
            anonymous.orders("u1").await,
            Err(ApiError::Unauthorized(_))
        ));

        let signed_in = anonymous.with_token("secret");
        assert!(signed_in.is_authenticated());
        assert_eq!(signed_in.orders("u1").await.unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn test_create_order_round_trip() {
        let router = Router::new().route(
            "/orders",
            post(|Json(body): Json<serde_json::Value>| async move {
                let mut order = body.clone();
                order["id"] = serde_json::json!("o1");
                order["created_at"] = serde_json::json!("2026-01-01T00:00:00Z");
                (StatusCode::CREATED, Json(serde_json::json!({ "order": order })))
            }),
        );
        let client = client_for(spawn_backend(router).await);

        let request = CreateOrderRequest {
            user_id: "u1".to_string(),
            items: vec![OrderLine {
                vendor_id: "v1".to_string(),
                product_id: "p1".to_string(),
                quantity: 2,
                total: 1000.0,
            }],
            address: Address::default(),
            payment_method: PaymentMethod::Card,
            subtotal: 1000.0,
            delivery_fee: 300.0,
            total: 1300.0,
        };

        let order = client.create_order(&request).await.unwrap();
        assert_eq!(order.id, "o1");
        assert_eq!(order.items, request.items);
        assert_eq!(order.total, 1300.0);
    }

    #[tokio::test]
    async fn test_path_segments_are_encoded() {
        let router = Router::new().route(
            "/products/:id",
            get(|Path(id): Path<String>| async move {
                Json(serde_json::json!({
                    "product": {"id": id, "vendor_id": "v1", "name": "x", "price": 1}
                }))
            }),
        );
        let client = client_for(spawn_backend(router).await);

        let product = client.product("a b/c").await.unwrap();
        assert_eq!(product.id, "a b/c");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}", addr));
        assert!(matches!(
            client.vendors(&VendorQuery::default()).await,
            Err(ApiError::Network(_))
        ));
    }
}

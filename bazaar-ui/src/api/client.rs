//! HTTP API Client
//!
//! Functions for communicating with the marketplace REST API. Every response
//! is classified by [`interpret_response`], same as the native client.

use chrono::NaiveDate;
use gloo_net::http::{Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use bazaar::api::dto::{
    AddToCartRequest, AuthResponse, CreateBookingRequest, CreateOrderRequest, CreateReviewRequest,
    FederatedLoginRequest, LoginRequest, OpenConversationRequest, OtpRequest, OtpVerifyRequest,
    ProductQuery, SignupRequest, UpdateCartRequest, VendorQuery,
};
use bazaar::api::{decode_payload, interpret_response, ApiError, ApiResult};
use bazaar::auth::SessionStore;
use bazaar::geo::{AddressPatch, Coordinates, GeocodingConfig, ReverseGeocodeResponse};
use bazaar::models::{
    BookedSlot, Booking, CartItem, Conversation, Message, Order, Product, Review, ReviewTarget,
    SavedAddress, Vendor,
};
use bazaar::storage::StorageKey;

use crate::state::storage::typed_store;

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api";

/// API base URL from local storage, or the default
pub fn get_api_base() -> String {
    let url = typed_store()
        .and_then(|store| store.get::<String>(&StorageKey::ApiBaseUrl).ok().flatten())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    url.trim_end_matches('/').to_string()
}

/// Live channel URL derived from the API base
pub fn get_ws_url() -> String {
    ws_url_for(&get_api_base())
}

fn ws_url_for(api_base: &str) -> String {
    let base = api_base
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);
    format!("{}/ws", base.trim_end_matches('/'))
}

// ============ Plumbing ============

fn bearer_token() -> Option<String> {
    let store = typed_store()?;
    SessionStore::new(&store)
        .current()
        .ok()
        .flatten()
        .map(|s| s.token)
}

fn request(method: Method, path: &str) -> RequestBuilder {
    let url = format!("{}/{}", get_api_base(), path.trim_start_matches('/'));
    let builder = RequestBuilder::new(&url).method(method);
    match bearer_token() {
        Some(token) => builder.header("Authorization", &format!("Bearer {}", token)),
        None => builder,
    }
}

/// Serialize flat parameters as `?k=v&...`, skipping nulls
fn query_string<Q: Serialize>(query: &Q) -> String {
    let Ok(Value::Object(map)) = serde_json::to_value(query) else {
        return String::new();
    };

    let pairs: Vec<String> = map
        .iter()
        .filter_map(|(k, v)| {
            let v = match v {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some(format!("{}={}", k, urlencoding::encode(&v)))
        })
        .collect();

    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

async fn send(builder: RequestBuilder, body: Option<Value>) -> ApiResult<Value> {
    let request = match body {
        Some(body) => builder.json(&body),
        None => builder.build(),
    }
    .map_err(|e| ApiError::Validation(format!("Request build error: {}", e)))?;

    let response = request
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    interpret_response(status, &text)
}

async fn get<T: DeserializeOwned>(path: &str, key: &str) -> ApiResult<T> {
    decode_payload(send(request(Method::GET, path), None).await?, key)
}

async fn post<B: Serialize, T: DeserializeOwned>(path: &str, body: &B, key: &str) -> ApiResult<T> {
    let body = serde_json::to_value(body)?;
    decode_payload(send(request(Method::POST, path), Some(body)).await?, key)
}

async fn post_unit<B: Serialize>(path: &str, body: &B) -> ApiResult<()> {
    let body = serde_json::to_value(body)?;
    send(request(Method::POST, path), Some(body)).await.map(|_| ())
}

// ============ Auth ============

pub async fn request_otp(email: &str) -> ApiResult<()> {
    post_unit(
        "auth/otp/send",
        &OtpRequest {
            email: email.to_string(),
        },
    )
    .await
}

pub async fn verify_otp(email: &str, otp: &str) -> ApiResult<()> {
    post_unit(
        "auth/otp/verify",
        &OtpVerifyRequest {
            email: email.to_string(),
            otp: otp.to_string(),
        },
    )
    .await
}

pub async fn signup(request: &SignupRequest) -> ApiResult<AuthResponse> {
    post("auth/signup", request, "auth").await
}

pub async fn login(request: &LoginRequest) -> ApiResult<AuthResponse> {
    post("auth/login", request, "auth").await
}

pub async fn federated_login(request: &FederatedLoginRequest) -> ApiResult<AuthResponse> {
    post("auth/google", request, "auth").await
}

// ============ Catalog ============

pub async fn products(query: &ProductQuery) -> ApiResult<Vec<Product>> {
    get(&format!("products{}", query_string(query)), "products").await
}

pub async fn product(id: &str) -> ApiResult<Product> {
    get(&format!("products/{}", segment(id)), "product").await
}

/// Count a product view on the backend
pub async fn record_product_view(id: &str) -> ApiResult<()> {
    send(
        request(Method::POST, &format!("products/{}/views", segment(id))),
        None,
    )
    .await
    .map(|_| ())
}

pub async fn reviews(target: &ReviewTarget) -> ApiResult<Vec<Review>> {
    let path = match target {
        ReviewTarget::Product(id) => format!("products/{}/reviews", segment(id)),
        ReviewTarget::Vendor(id) => format!("vendors/{}/reviews", segment(id)),
    };
    get(&path, "reviews").await
}

pub async fn submit_review(request: &CreateReviewRequest) -> ApiResult<Review> {
    post("reviews", request, "review").await
}

pub async fn vendors(query: &VendorQuery) -> ApiResult<Vec<Vendor>> {
    get(&format!("vendors{}", query_string(query)), "vendors").await
}

pub async fn vendor(id: &str) -> ApiResult<Vendor> {
    get(&format!("vendors/{}", segment(id)), "vendor").await
}

// ============ Bookings ============

pub async fn booked_slots(vendor_id: &str, date: NaiveDate) -> ApiResult<Vec<BookedSlot>> {
    get(
        &format!("vendors/{}/slots?date={}", segment(vendor_id), date),
        "slots",
    )
    .await
}

pub async fn create_booking(request: &CreateBookingRequest) -> ApiResult<Booking> {
    post("bookings", request, "booking").await
}

// ============ Cart & orders ============

pub async fn cart(user_id: &str) -> ApiResult<Vec<CartItem>> {
    get(&format!("cart/{}", segment(user_id)), "items").await
}

pub async fn add_to_cart(request: &AddToCartRequest) -> ApiResult<CartItem> {
    post("cart", request, "item").await
}

pub async fn update_cart_item(item_id: &str, quantity: u32) -> ApiResult<()> {
    let body = serde_json::to_value(UpdateCartRequest { quantity })?;
    send(
        request(Method::PUT, &format!("cart/{}", segment(item_id))),
        Some(body),
    )
    .await
    .map(|_| ())
}

pub async fn remove_cart_item(item_id: &str) -> ApiResult<()> {
    send(
        request(Method::DELETE, &format!("cart/{}", segment(item_id))),
        None,
    )
    .await
    .map(|_| ())
}

pub async fn saved_addresses(user_id: &str) -> ApiResult<Vec<SavedAddress>> {
    get(&format!("users/{}/addresses", segment(user_id)), "addresses").await
}

pub async fn create_order(request: &CreateOrderRequest) -> ApiResult<Order> {
    post("orders", request, "order").await
}

// ============ Chat ============

pub async fn open_conversation(customer_id: &str, vendor_id: &str) -> ApiResult<Conversation> {
    post(
        "conversations",
        &OpenConversationRequest {
            customer_id: customer_id.to_string(),
            vendor_id: vendor_id.to_string(),
        },
        "conversation",
    )
    .await
}

pub async fn conversations(participant_id: &str) -> ApiResult<Vec<Conversation>> {
    get(
        &format!("conversations?participant={}", segment(participant_id)),
        "conversations",
    )
    .await
}

pub async fn messages(conversation_id: &str) -> ApiResult<Vec<Message>> {
    get(
        &format!("conversations/{}/messages", segment(conversation_id)),
        "messages",
    )
    .await
}

pub async fn persist_message(message: &Message) -> ApiResult<Message> {
    post(
        &format!("conversations/{}/messages", segment(&message.conversation_id)),
        message,
        "message",
    )
    .await
}

// ============ Geocoding ============

/// Address fields for a position, from the public geocoder
pub async fn reverse_geocode(at: Coordinates) -> ApiResult<AddressPatch> {
    let url = GeocodingConfig::default().reverse_url(at);

    let response = RequestBuilder::new(&url)
        .method(Method::GET)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    let value = interpret_response(status, &text)?;
    let decoded: ReverseGeocodeResponse = serde_json::from_value(value)?;
    Ok(AddressPatch::from(&decoded))
}

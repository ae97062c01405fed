//! Marketplace REST API
//!
//! Typed access to the backend the client consumes.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /auth/otp/send`, `POST /auth/otp/verify`
//! - `POST /auth/signup`, `POST /auth/login`, `POST /auth/google`
//!
//! ## Catalog
//! - `GET /products`, `GET /products/:id`, `POST /products/:id/views`
//! - `GET /products/:id/reviews`, `GET /vendors/:id/reviews`, `POST /reviews`
//! - `GET /vendors`, `GET /vendors/:id`, `GET /vendors/:id/services`
//!
//! ## Cart & orders
//! - `GET /cart/:user_id`, `POST /cart`, `PUT /cart/:item_id`, `DELETE /cart/:item_id`
//! - `POST /orders`, `GET /orders?user_id=`
//! - `GET /users/:id/addresses`
//!
//! ## Bookings
//! - `GET /vendors/:id/slots?date=`, `POST /bookings`, `GET /bookings?user_id=`
//!
//! ## Chat
//! - `POST /conversations`, `GET /conversations?participant=`
//! - `GET /conversations/:id/messages`, `POST /conversations/:id/messages`
//!
//! Every response goes through [`interpret_response`], so callers see
//! [`ApiError`] variants rather than backend message strings.

pub mod dto;
pub mod error;

#[cfg(feature = "native")]
mod client;

pub use error::{decode_payload, interpret_response, ApiError, ApiResult, Rejection};

#[cfg(feature = "native")]
pub use client::{ClientConfig, MarketplaceClient};

#[cfg(all(test, feature = "native"))]
pub(crate) use client::tests as client_tests;

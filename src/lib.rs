//! # Bazaar
//!
//! Marketplace client core: product catalog, cart and checkout, vendor
//! service booking, buyer/vendor chat and account sign-in, against a remote
//! REST backend and a live chat socket.
//!
//! ## Modules
//!
//! - [`models`]: Records exchanged with the backend
//! - [`api`]: REST client and structured error interpretation
//! - [`cart`], [`checkout`]: Totals, delivery fee, order building
//! - [`catalog`]: Product/vendor filtering, listings and reviews
//! - [`booking`]: Time-slot grid and booking requests
//! - [`auth`]: OTP flow, form validation, session, federated identity
//! - [`chat`]: Conversation panel, live channel, chat session
//! - [`storage`]: Typed, namespaced key-value persistence with TTL
//! - [`geo`]: Reverse geocoding for address auto-fill
//! - [`config`]: TOML and environment configuration (native)
//!
//! With default features off, everything except the network, SQLite and
//! config layers builds for `wasm32` and is shared with the browser UI.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bazaar::api::{ClientConfig, MarketplaceClient};
//! use bazaar::cart::{Cart, FeePolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MarketplaceClient::new(ClientConfig::default())?;
//!
//!     let cart = Cart::from_items(client.cart("u1").await?);
//!     let totals = cart.totals(&FeePolicy::default());
//!
//!     println!("{} items, total {:.2}", totals.item_count, totals.total);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod booking;
pub mod cart;
pub mod catalog;
pub mod chat;
pub mod checkout;
pub mod geo;
pub mod models;
pub mod storage;
pub mod validation;

#[cfg(feature = "native")]
pub mod config;

// Re-export top-level types for convenience
pub use api::{ApiError, ApiResult, Rejection};

pub use auth::{OtpFlow, Session, SessionStore};

pub use cart::{Cart, CartTotals, FeePolicy};

pub use chat::{ChatError, ChatPanel, ClientEvent, ServerEvent};

pub use storage::{KeyValueStore, MemoryStore, StorageError, StorageKey, TypedStore};

#[cfg(feature = "native")]
pub use api::{ClientConfig, MarketplaceClient};

#[cfg(feature = "native")]
pub use chat::{ChatSession, LiveChannel};

#[cfg(feature = "native")]
pub use config::{generate_default_config, Config, ConfigError};

//! Pages
//!
//! Top-level page components for each route.

pub mod booking;
pub mod cart;
pub mod catalog;
pub mod chat;
pub mod checkout;
pub mod login;
pub mod product;
pub mod signup;
pub mod vendors;

pub use booking::BookingPage;
pub use cart::CartPage;
pub use catalog::Shop;
pub use chat::{ChatPage, Inbox};
pub use checkout::CheckoutPage;
pub use login::Login;
pub use product::ProductPage;
pub use signup::Signup;
pub use vendors::Vendors;

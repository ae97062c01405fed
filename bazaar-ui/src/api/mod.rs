//! API Module
//!
//! HTTP client for the marketplace REST API.

mod client;

pub use client::*;

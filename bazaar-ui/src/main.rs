//! Bazaar Storefront
//!
//! Browser front end for the marketplace, built with Leptos (WASM).
//!
//! # Features
//!
//! - Product catalog with search, filters and reviews
//! - Cart, checkout with location auto-fill
//! - Vendor directory and time-slot booking
//! - OTP sign-up, password and Google sign-in
//! - Live buyer/vendor chat
//!
//! # Architecture
//!
//! Client-side rendered (CSR) Leptos application compiled to WebAssembly.
//! Business rules come from the `bazaar` crate; this crate only renders them
//! and talks to the backend over HTTP and WebSocket.

use leptos::*;

mod api;
mod app;
mod components;
mod pages;
mod state;

fn main() {
    // Panic messages to the browser console
    console_error_panic_hook::set_once();

    mount_to_body(|| view! { <app::App /> });
}

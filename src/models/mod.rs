//! Marketplace Records
//!
//! Remote-owned entities as the backend serializes them. The client never
//! holds an authoritative copy; these are fetched, rendered and sent back.

mod catalog;
mod chat;
mod commerce;
mod user;

pub use catalog::{Product, Review, ReviewTarget, Service, Vendor};
pub use chat::{Conversation, Message};
pub use commerce::{
    Address, BookedSlot, Booking, BookingStatus, CartItem, Order, OrderLine, OrderStatus,
    PaymentMethod, SavedAddress,
};
pub use user::{Role, User};

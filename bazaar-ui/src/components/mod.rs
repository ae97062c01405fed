//! UI Components
//!
//! Reusable Leptos components for the storefront.

pub mod loading;
pub mod nav;
pub mod product_card;
pub mod toast;

pub use loading::{EmptyState, ListSkeleton, Loading};
pub use nav::Nav;
pub use product_card::ProductCard;
pub use toast::Toast;

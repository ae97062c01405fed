//! Cart
//!
//! Local view of the user's cart and the totals shown at checkout.
//!
//! Delivery is charged as a flat fee while the subtotal is below the
//! free-delivery threshold. An empty cart carries no fee.

use serde::{Deserialize, Serialize};

use crate::models::CartItem;

/// Flat delivery fee charged below the free-delivery threshold
pub const DEFAULT_DELIVERY_FEE: f64 = 300.0;

/// Subtotal at or above which delivery is free
pub const DEFAULT_FREE_DELIVERY_THRESHOLD: f64 = 5000.0;

/// Delivery fee rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub delivery_fee: f64,
    pub free_delivery_threshold: f64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            delivery_fee: DEFAULT_DELIVERY_FEE,
            free_delivery_threshold: DEFAULT_FREE_DELIVERY_THRESHOLD,
        }
    }
}

impl FeePolicy {
    pub fn fee_for(&self, subtotal: f64) -> f64 {
        if subtotal > 0.0 && subtotal < self.free_delivery_threshold {
            self.delivery_fee
        } else {
            0.0
        }
    }

    /// How much more the customer must add to get free delivery
    pub fn remaining_for_free_delivery(&self, subtotal: f64) -> Option<f64> {
        if subtotal > 0.0 && subtotal < self.free_delivery_threshold {
            Some(round2(self.free_delivery_threshold - subtotal))
        } else {
            None
        }
    }
}

/// Computed cart totals
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub total: f64,
    pub item_count: u32,
}

/// The user's cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from the backend's cart listing
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            cart.add(item);
        }
        cart
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add an item, merging quantities with an existing line for the same
    /// product from the same vendor
    pub fn add(&mut self, item: CartItem) {
        if item.quantity == 0 {
            return;
        }

        match self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id && i.vendor_id == item.vendor_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
                existing.price = item.price;
            }
            None => self.items.push(item),
        }
    }

    /// Set the quantity for a cart line; zero removes it.
    /// Returns false if no line has that id.
    pub fn set_quantity(&mut self, item_id: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(item_id).is_some();
        }

        match self.items.iter_mut().find(|i| i.id == item_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, item_id: &str) -> Option<CartItem> {
        let pos = self.items.iter().position(|i| i.id == item_id)?;
        Some(self.items.remove(pos))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal(&self) -> f64 {
        round2(self.items.iter().map(CartItem::line_total).sum())
    }

    pub fn totals(&self, policy: &FeePolicy) -> CartTotals {
        let subtotal = self.subtotal();
        let delivery_fee = policy.fee_for(subtotal);

        CartTotals {
            subtotal,
            delivery_fee,
            total: round2(subtotal + delivery_fee),
            item_count: self.item_count(),
        }
    }
}

/// Round a currency amount to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) fn item(id: &str, product: &str, vendor: &str, price: f64, quantity: u32) -> CartItem {
    CartItem {
        id: id.to_string(),
        product_id: product.to_string(),
        vendor_id: vendor.to_string(),
        name: format!("Product {}", product),
        price,
        quantity,
        image: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtotal_is_sum_of_price_times_quantity() {
        let cart = Cart::from_items(vec![
            item("1", "p1", "v1", 250.0, 2),
            item("2", "p2", "v1", 99.5, 3),
            item("3", "p3", "v2", 1000.0, 1),
        ]);

        assert_eq!(cart.subtotal(), 500.0 + 298.5 + 1000.0);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_fee_applies_below_threshold() {
        let cart = Cart::from_items(vec![item("1", "p1", "v1", 1200.0, 2)]);
        let totals = cart.totals(&FeePolicy::default());

        assert_eq!(totals.subtotal, 2400.0);
        assert_eq!(totals.delivery_fee, 300.0);
        assert_eq!(totals.total, 2700.0);
    }

    #[test]
    fn test_no_fee_at_or_above_threshold() {
        let policy = FeePolicy::default();

        let cart = Cart::from_items(vec![item("1", "p1", "v1", 2500.0, 2)]);
        let totals = cart.totals(&policy);
        assert_eq!(totals.subtotal, 5000.0);
        assert_eq!(totals.delivery_fee, 0.0);
        assert_eq!(totals.total, 5000.0);

        let cart = Cart::from_items(vec![item("1", "p1", "v1", 7000.0, 1)]);
        assert_eq!(cart.totals(&policy).total, 7000.0);
    }

    #[test]
    fn test_empty_cart_has_no_fee() {
        let totals = Cart::new().totals(&FeePolicy::default());
        assert_eq!(totals, CartTotals::default());
    }

    #[test]
    fn test_add_merges_same_product_and_vendor() {
        let mut cart = Cart::new();
        cart.add(item("1", "p1", "v1", 100.0, 1));
        cart.add(item("2", "p1", "v1", 100.0, 2));
        cart.add(item("3", "p1", "v2", 100.0, 1));

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_add_caps_quantity_instead_of_wrapping() {
        let mut cart = Cart::new();
        cart.add(item("1", "p1", "v1", 1.0, u32::MAX));
        cart.add(item("2", "p1", "v1", 1.0, 5));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, u32::MAX);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::from_items(vec![item("1", "p1", "v1", 100.0, 1)]);
        assert!(cart.set_quantity("1", 4));
        assert_eq!(cart.subtotal(), 400.0);
        assert!(cart.set_quantity("1", 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity("missing", 2));
    }

    #[test]
    fn test_remaining_for_free_delivery() {
        let policy = FeePolicy::default();
        assert_eq!(policy.remaining_for_free_delivery(4200.0), Some(800.0));
        assert_eq!(policy.remaining_for_free_delivery(5000.0), None);
        assert_eq!(policy.remaining_for_free_delivery(0.0), None);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product listed by a vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub view_count: u64,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// A seller or service provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub rating: Option<f64>,
    /// Starting price shown on vendor cards
    #[serde(default)]
    pub base_price: Option<f64>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A bookable service offered by a vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// What a review is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ReviewTarget {
    Product(String),
    Vendor(String),
}

/// A published review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    pub target: ReviewTarget,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_minimal_json() {
        let json = r#"{"id": "p1", "vendor_id": "v1", "name": "Lamp", "price": 1200}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, 1200.0);
        assert!(!product.in_stock());
        assert!(product.cover_image().is_none());
    }

    #[test]
    fn test_review_target_wire_shape() {
        let target = ReviewTarget::Vendor("v9".to_string());
        let json = serde_json::to_string(&target).unwrap();
        assert_eq!(json, r#"{"kind":"vendor","id":"v9"}"#);
    }
}

//! Catalog
//!
//! Filtering and sorting over product and vendor lists the backend already
//! returned, plus review drafting.

use std::cmp::Ordering;

use thiserror::Error;

use crate::api::dto::{CreateReviewRequest, ProductQuery};
use crate::models::{Product, Review, ReviewTarget, Vendor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Backend order
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Rating,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "relevance" | "" => Some(Self::Relevance),
            "price_asc" | "price-asc" | "price" => Some(Self::PriceAsc),
            "price_desc" | "price-desc" => Some(Self::PriceDesc),
            "rating" => Some(Self::Rating),
            _ => None,
        }
    }
}

/// Client-side product filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub query: String,
    pub category: Option<String>,
    pub vendor_id: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub in_stock_only: bool,
    pub sort: SortOrder,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let query = self.query.trim().to_lowercase();
        if !query.is_empty() {
            let hit = product.name.to_lowercase().contains(&query)
                || product.description.to_lowercase().contains(&query)
                || product.category.to_lowercase().contains(&query);
            if !hit {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if !product.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(vendor_id) = &self.vendor_id {
            if &product.vendor_id != vendor_id {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }

        !self.in_stock_only || product.in_stock()
    }

    /// Filter then sort; ties keep backend order
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut hits: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();

        match self.sort {
            SortOrder::Relevance => {}
            SortOrder::PriceAsc => hits.sort_by(|a, b| cmp_f64(a.price, b.price)),
            SortOrder::PriceDesc => hits.sort_by(|a, b| cmp_f64(b.price, a.price)),
            SortOrder::Rating => hits.sort_by(|a, b| {
                cmp_f64(b.rating.unwrap_or(0.0), a.rating.unwrap_or(0.0))
            }),
        }

        hits
    }

    /// The part of the filter the backend understands
    pub fn to_query(&self) -> ProductQuery {
        let q = self.query.trim();
        ProductQuery {
            q: (!q.is_empty()).then(|| q.to_string()),
            category: self.category.clone(),
            vendor_id: self.vendor_id.clone(),
        }
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// What a product listing renders
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    /// Nothing matched; show the empty-state view
    Empty,
    Grid(Vec<T>),
}

impl<T> Listing<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            Listing::Empty
        } else {
            Listing::Grid(items)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Listing::Empty)
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Empty => 0,
            Listing::Grid(items) => items.len(),
        }
    }
}

pub fn product_listing<'a>(products: &'a [Product], filter: &ProductFilter) -> Listing<&'a Product> {
    Listing::from_items(filter.apply(products))
}

/// Distinct categories, in first-seen order
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for product in products {
        let category = product.category.trim();
        if !category.is_empty() && !seen.iter().any(|c| c.eq_ignore_ascii_case(category)) {
            seen.push(category.to_string());
        }
    }
    seen
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorFilter {
    pub query: String,
    pub category: Option<String>,
    pub city: Option<String>,
}

impl VendorFilter {
    pub fn matches(&self, vendor: &Vendor) -> bool {
        let query = self.query.trim().to_lowercase();
        if !query.is_empty()
            && !vendor.name.to_lowercase().contains(&query)
            && !vendor.category.to_lowercase().contains(&query)
        {
            return false;
        }
        if let Some(category) = &self.category {
            if !vendor.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !vendor.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, vendors: &'a [Vendor]) -> Listing<&'a Vendor> {
        Listing::from_items(vendors.iter().filter(|v| self.matches(v)).collect())
    }
}

// ============ Reviews ============

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("Rating must be between 1 and 5")]
    Rating,

    #[error("Write a comment")]
    EmptyComment,

    #[error("Sign in to leave a review")]
    NotSignedIn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDraft {
    pub target: ReviewTarget,
    pub rating: u8,
    pub comment: String,
}

impl ReviewDraft {
    pub fn new(target: ReviewTarget) -> Self {
        Self {
            target,
            rating: 0,
            comment: String::new(),
        }
    }

    pub fn to_request(&self, author_id: &str) -> Result<CreateReviewRequest, ReviewError> {
        if author_id.trim().is_empty() {
            return Err(ReviewError::NotSignedIn);
        }
        if !(1..=5).contains(&self.rating) {
            return Err(ReviewError::Rating);
        }
        let comment = self.comment.trim();
        if comment.is_empty() {
            return Err(ReviewError::EmptyComment);
        }

        Ok(CreateReviewRequest {
            author_id: author_id.to_string(),
            target: self.target.clone(),
            rating: self.rating,
            comment: comment.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    pub count: usize,
    pub average: Option<f64>,
}

pub fn rating_summary(reviews: &[Review]) -> RatingSummary {
    if reviews.is_empty() {
        return RatingSummary::default();
    }
    let sum: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    let average = f64::from(sum) / reviews.len() as f64;
    RatingSummary {
        count: reviews.len(),
        average: Some((average * 10.0).round() / 10.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, name: &str, category: &str, price: f64, stock: u32, rating: Option<f64>) -> Product {
        Product {
            id: id.to_string(),
            vendor_id: "v1".to_string(),
            name: name.to_string(),
            description: String::new(),
            category: category.to_string(),
            price,
            stock,
            images: vec![],
            rating,
            view_count: 0,
        }
    }

    fn products() -> Vec<Product> {
        vec![
            product("p1", "Brass Lamp", "Home", 2500.0, 3, Some(4.2)),
            product("p2", "Silk Scarf", "Fashion", 1800.0, 0, Some(4.8)),
            product("p3", "Desk Lamp", "Home", 900.0, 10, None),
        ]
    }

    #[test]
    fn test_query_is_case_insensitive() {
        let filter = ProductFilter {
            query: "LAMP".to_string(),
            ..Default::default()
        };
        let ids: Vec<_> = filter.apply(&products()).iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
    }

    #[test]
    fn test_price_and_stock_filters_with_sort() {
        let items = products();
        let filter = ProductFilter {
            max_price: Some(2000.0),
            in_stock_only: true,
            ..Default::default()
        };
        assert_eq!(filter.apply(&items).len(), 1);

        let sorted = ProductFilter {
            sort: SortOrder::PriceAsc,
            ..Default::default()
        };
        let prices: Vec<_> = sorted.apply(&items).iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![900.0, 1800.0, 2500.0]);

        let by_rating = ProductFilter {
            sort: SortOrder::Rating,
            ..Default::default()
        };
        assert_eq!(by_rating.apply(&items)[0].id, "p2");
    }

    #[test]
    fn test_no_results_is_empty_listing() {
        let items = products();
        let filter = ProductFilter {
            query: "teapot".to_string(),
            ..Default::default()
        };
        assert_eq!(product_listing(&items, &filter), Listing::Empty);
        assert!(product_listing(&[], &ProductFilter::default()).is_empty());
        assert_eq!(product_listing(&items, &ProductFilter::default()).len(), 3);
    }

    #[test]
    fn test_categories_and_query() {
        assert_eq!(categories(&products()), vec!["Home", "Fashion"]);

        let filter = ProductFilter {
            query: "  ".to_string(),
            category: Some("Home".to_string()),
            ..Default::default()
        };
        let query = filter.to_query();
        assert!(query.q.is_none());
        assert_eq!(query.category.as_deref(), Some("Home"));
    }

    #[test]
    fn test_vendor_filter() {
        let vendor = |id: &str, category: &str, city: &str| Vendor {
            id: id.to_string(),
            name: format!("Vendor {}", id),
            category: category.to_string(),
            city: city.to_string(),
            rating: None,
            base_price: None,
            avatar: None,
        };
        let vendors = vec![vendor("a", "Salon", "Lahore"), vendor("b", "Tailor", "Karachi")];

        let filter = VendorFilter {
            city: Some("lahore".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&vendors).len(), 1);

        let none = VendorFilter {
            category: Some("Plumber".to_string()),
            ..Default::default()
        };
        assert!(none.apply(&vendors).is_empty());
    }

    #[test]
    fn test_review_draft_validation() {
        let mut draft = ReviewDraft::new(ReviewTarget::Product("p1".to_string()));
        assert_eq!(draft.to_request("u1"), Err(ReviewError::Rating));

        draft.rating = 6;
        assert_eq!(draft.to_request("u1"), Err(ReviewError::Rating));

        draft.rating = 4;
        assert_eq!(draft.to_request("u1"), Err(ReviewError::EmptyComment));

        draft.comment = " Sturdy and bright ".to_string();
        assert_eq!(draft.to_request(""), Err(ReviewError::NotSignedIn));

        let request = draft.to_request("u1").unwrap();
        assert_eq!(request.comment, "Sturdy and bright");
        assert_eq!(request.rating, 4);
    }

    #[test]
    fn test_rating_summary() {
        let review = |rating| Review {
            id: "r".to_string(),
            author_id: "u".to_string(),
            author_name: String::new(),
            target: ReviewTarget::Vendor("v1".to_string()),
            rating,
            comment: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(rating_summary(&[]), RatingSummary::default());

        let summary = rating_summary(&[review(5), review(4), review(4)]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(4.3));
    }
}

// 👕 Product Entity - Boutique merchandise
//
// Identity: product name (the storefront shows one entry per name).
// Category is a closed set with a lenient fallback: external CSVs are not
// fully controlled, so an unknown category lands in Other instead of
// rejecting the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// PRODUCT CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCategory {
    Apparel,
    Accessories,
    Drinkware,
    Other,
}

impl ProductCategory {
    pub fn code(&self) -> &'static str {
        match self {
            ProductCategory::Apparel => "apparel",
            ProductCategory::Accessories => "accessories",
            ProductCategory::Drinkware => "drinkware",
            ProductCategory::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProductCategory::Apparel => "Apparel",
            ProductCategory::Accessories => "Accessories",
            ProductCategory::Drinkware => "Drinkware",
            ProductCategory::Other => "Other",
        }
    }

    /// Exact parse of a stored code
    pub fn parse(raw: &str) -> Option<ProductCategory> {
        match raw.trim().to_lowercase().as_str() {
            "apparel" => Some(ProductCategory::Apparel),
            "accessories" => Some(ProductCategory::Accessories),
            "drinkware" => Some(ProductCategory::Drinkware),
            "other" => Some(ProductCategory::Other),
            _ => None,
        }
    }

    /// Lenient parse for import: unrecognized or blank falls back to Other
    pub fn parse_lenient(raw: &str) -> ProductCategory {
        Self::parse(raw).unwrap_or(ProductCategory::Other)
    }
}

// ============================================================================
// PRODUCT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Stable identity (UUID) - never changes
    pub id: String,

    /// Canonical identifier shown on the storefront
    pub name: String,

    pub description: String,
    pub category: ProductCategory,
    pub price: f64,
    pub inventory: i64,

    /// Comma-separated size codes (e.g. "S,M,L,XL")
    pub sizes: String,

    /// Comma-separated color names
    pub colors: String,

    /// Stored image filename under the media dir, if one was resolved
    pub image_file: Option<String>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: String, category: ProductCategory, price: f64) -> Self {
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description: String::new(),
            category,
            price,
            inventory: 0,
            sizes: String::new(),
            colors: String::new(),
            image_file: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn in_stock(&self) -> bool {
        self.inventory > 0
    }

    pub fn sizes_list(&self) -> Vec<&str> {
        self.sizes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn colors_list(&self) -> Vec<&str> {
        self.colors
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

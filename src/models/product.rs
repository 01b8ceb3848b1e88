//! Product models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product stored in database
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Unique product ID
    pub id: Uuid,

    pub product_name: String,

    /// Unit price, always positive
    pub product_price: f64,

    pub product_description: String,

    /// Category the product is listed under
    pub category_id: Uuid,

    /// Category name, filled on reads
    pub category_name: String,

    /// Vendor that sells the product
    pub vendor_id: Uuid,

    /// Vendor name, filled on reads
    pub vendor_name: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a new product under `vendor_id`
    pub fn new(
        product_name: impl Into<String>,
        product_price: f64,
        product_description: impl Into<String>,
        category_id: Uuid,
        vendor_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            product_name: product_name.into(),
            product_price,
            product_description: product_description.into(),
            category_id,
            category_name: String::new(),
            vendor_id,
            vendor_name: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub product_name: String,
    pub product_price: f64,
    pub product_description: String,
    pub product_category_id: Uuid,
    pub product_category_name: String,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            product_name: product.product_name.clone(),
            product_price: product.product_price,
            product_description: product.product_description.clone(),
            product_category_id: product.category_id,
            product_category_name: product.category_name.clone(),
            vendor_id: product.vendor_id,
            vendor_name: product.vendor_name.clone(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Product creation request
///
/// `vendor_id` names the vendor the product is created under and must be the
/// caller's own vendor.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductRequest {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_price: f64,
    #[serde(default)]
    pub product_description: String,
    #[serde(default)]
    pub product_category_id: String,
    #[serde(default)]
    pub vendor_id: String,
}

/// Product update request; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_price: Option<f64>,
    #[serde(default)]
    pub product_description: Option<String>,
    #[serde(default)]
    pub product_category_id: Option<String>,
}

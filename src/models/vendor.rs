//! Vendor models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vendor stored in database; each user owns at most one
#[derive(Debug, Clone, PartialEq)]
pub struct Vendor {
    /// Unique vendor ID
    pub id: Uuid,

    /// Vendor display name
    pub vendor_name: String,

    /// Free-form description
    pub description: String,

    /// Owning user
    pub user_id: Uuid,

    /// Owning user's name, filled on reads
    pub user_name: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vendor {
    /// Create a new vendor owned by `user_id`
    pub fn new(
        vendor_name: impl Into<String>,
        description: impl Into<String>,
        user_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            vendor_name: vendor_name.into(),
            description: description.into(),
            user_id,
            user_name: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorResponse {
    pub id: Uuid,
    pub vendor_name: String,
    pub description: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Vendor> for VendorResponse {
    fn from(vendor: &Vendor) -> Self {
        Self {
            id: vendor.id,
            vendor_name: vendor.vendor_name.clone(),
            description: vendor.description.clone(),
            user_id: vendor.user_id,
            user_name: vendor.user_name.clone(),
            created_at: vendor.created_at,
            updated_at: vendor.updated_at,
        }
    }
}

/// Vendor creation request
///
/// `user_id` is accepted for compatibility with older clients and ignored;
/// the owner is always the authenticated caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVendorRequest {
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Vendor update request; the owner cannot be changed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVendorRequest {
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

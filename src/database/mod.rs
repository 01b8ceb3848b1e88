//! Database layer for procurement-api
//!
//! This module defines the database trait and SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DbError;
use crate::models::{Category, Product, User, Vendor};

/// Database trait for data persistence
///
/// This trait defines all database operations needed by the application.
/// It uses `async_trait` for async methods and `mockall::automock` for testing.
///
/// Inserts that hit a UNIQUE or foreign key constraint fail with
/// `DbError::ConstraintViolation`. Updates and deletes that touch no row fail
/// with `DbError::NotFound`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Insert a new user
    async fn create_user(&self, user: &User) -> Result<(), DbError>;

    /// Get a user by ID
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DbError>;

    /// Get a user by email (case-insensitive)
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Update name, email and role of an existing user
    async fn update_user(&self, user: &User) -> Result<(), DbError>;

    /// Replace a user's password hash
    async fn update_user_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError>;

    /// Delete a user and, by cascade, their vendor and its products
    async fn delete_user(&self, id: Uuid) -> Result<(), DbError>;

    // =========================================================================
    // Vendor operations
    // =========================================================================

    /// Insert a new vendor
    async fn create_vendor(&self, vendor: &Vendor) -> Result<(), DbError>;

    /// Get a vendor by ID
    async fn get_vendor(&self, id: Uuid) -> Result<Option<Vendor>, DbError>;

    /// Get the vendor owned by a user
    async fn get_vendor_by_user(&self, user_id: Uuid) -> Result<Option<Vendor>, DbError>;

    /// List vendors, newest first
    async fn list_vendors(&self, limit: u32, offset: u32) -> Result<Vec<Vendor>, DbError>;

    /// Total number of vendors
    async fn count_vendors(&self) -> Result<u64, DbError>;

    /// Update name and description of an existing vendor
    async fn update_vendor(&self, vendor: &Vendor) -> Result<(), DbError>;

    /// Delete a vendor and its products
    async fn delete_vendor(&self, id: Uuid) -> Result<(), DbError>;

    // =========================================================================
    // Category operations
    // =========================================================================

    /// Insert a new category
    async fn create_category(&self, category: &Category) -> Result<(), DbError>;

    /// Get a category by ID
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, DbError>;

    /// List categories, newest first
    async fn list_categories(&self, limit: u32, offset: u32) -> Result<Vec<Category>, DbError>;

    /// Total number of categories
    async fn count_categories(&self) -> Result<u64, DbError>;

    /// Update an existing category
    async fn update_category(&self, category: &Category) -> Result<(), DbError>;

    /// Delete a category; fails while products still reference it
    async fn delete_category(&self, id: Uuid) -> Result<(), DbError>;

    // =========================================================================
    // Product operations
    // =========================================================================

    /// Insert a new product
    async fn create_product(&self, product: &Product) -> Result<(), DbError>;

    /// Get a product by ID
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, DbError>;

    /// List products, newest first
    async fn list_products(&self, limit: u32, offset: u32) -> Result<Vec<Product>, DbError>;

    /// Total number of products
    async fn count_products(&self) -> Result<u64, DbError>;

    /// List products in a category, newest first
    async fn list_products_by_category(
        &self,
        category_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Product>, DbError>;

    /// Number of products in a category
    async fn count_products_by_category(&self, category_id: Uuid) -> Result<u64, DbError>;

    /// Update an existing product
    async fn update_product(&self, product: &Product) -> Result<(), DbError>;

    /// Delete a product
    async fn delete_product(&self, id: Uuid) -> Result<(), DbError>;
}

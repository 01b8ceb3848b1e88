//! SQLite implementation of the Database trait
//!
//! This module provides a SQLite-based implementation of the Database trait
//! using rusqlite and tokio-rusqlite for async operations.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use super::migrations::CREATE_SCHEMA;
use super::Database;
use crate::error::DbError;
use crate::models::{Category, Product, User, Vendor};

const USER_SELECT: &str = r#"
    SELECT id, user_name, email, password_hash, role, created_at, updated_at
    FROM users
"#;

const VENDOR_SELECT: &str = r#"
    SELECT v.id, v.vendor_name, v.description, v.user_id, u.user_name, v.created_at, v.updated_at
    FROM vendors v
    JOIN users u ON u.id = v.user_id
"#;

const CATEGORY_SELECT: &str = r#"
    SELECT id, name, description, created_at, updated_at
    FROM categories
"#;

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.product_name, p.product_price, p.product_description,
           p.category_id, c.name, p.vendor_id, v.vendor_name, p.created_at, p.updated_at
    FROM products p
    JOIN categories c ON c.id = p.category_id
    JOIN vendors v ON v.id = p.vendor_id
"#;

/// SQLite database implementation
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Create a new SQLite database connection
    ///
    /// Use `:memory:` for in-memory database or a file path for persistent storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        // Run migrations
        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }

    async fn execute_affecting(&self, sql: &'static str, params: Vec<String>) -> Result<(), DbError> {
        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute(sql, rusqlite::params_from_iter(params.iter()))?;
                Ok(count)
            })
            .await?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn count(&self, sql: &'static str, params: Vec<String>) -> Result<u64, DbError> {
        self.conn
            .call(move |conn| {
                let count: i64 =
                    conn.query_row(sql, rusqlite::params_from_iter(params.iter()), |row| {
                        row.get(0)
                    })?;
                Ok(count.max(0) as u64)
            })
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: &User) -> Result<(), DbError> {
        let params = vec![
            user.id.to_string(),
            user.user_name.clone(),
            user.email.clone(),
            user.password_hash.clone(),
            user.role.clone(),
            timestamp(&user.created_at),
            timestamp(&user.updated_at),
        ];

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO users
                    (id, user_name, email, password_hash, role, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    rusqlite::params_from_iter(params.iter()),
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let user = conn
                    .query_row(&format!("{} WHERE id = ?1", USER_SELECT), [&id], user_from_row)
                    .optional()?;
                Ok(user)
            })
            .await
            .map_err(Into::into)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = email.to_string();

        self.conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        &format!("{} WHERE email = ?1", USER_SELECT),
                        [&email],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await
            .map_err(Into::into)
    }

    async fn update_user(&self, user: &User) -> Result<(), DbError> {
        self.execute_affecting(
            r#"
            UPDATE users
            SET user_name = ?1, email = ?2, role = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
            vec![
                user.user_name.clone(),
                user.email.clone(),
                user.role.clone(),
                timestamp(&user.updated_at),
                user.id.to_string(),
            ],
        )
        .await
    }

    async fn update_user_password(&self, id: Uuid, password_hash: &str) -> Result<(), DbError> {
        self.execute_affecting(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            vec![
                password_hash.to_string(),
                timestamp(&Utc::now()),
                id.to_string(),
            ],
        )
        .await
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), DbError> {
        self.execute_affecting("DELETE FROM users WHERE id = ?1", vec![id.to_string()])
            .await
    }

    // =========================================================================
    // Vendor operations
    // =========================================================================

    async fn create_vendor(&self, vendor: &Vendor) -> Result<(), DbError> {
        let params = vec![
            vendor.id.to_string(),
            vendor.vendor_name.clone(),
            vendor.description.clone(),
            vendor.user_id.to_string(),
            timestamp(&vendor.created_at),
            timestamp(&vendor.updated_at),
        ];

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO vendors
                    (id, vendor_name, description, user_id, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    rusqlite::params_from_iter(params.iter()),
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn get_vendor(&self, id: Uuid) -> Result<Option<Vendor>, DbError> {
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let vendor = conn
                    .query_row(
                        &format!("{} WHERE v.id = ?1", VENDOR_SELECT),
                        [&id],
                        vendor_from_row,
                    )
                    .optional()?;
                Ok(vendor)
            })
            .await
            .map_err(Into::into)
    }

    async fn get_vendor_by_user(&self, user_id: Uuid) -> Result<Option<Vendor>, DbError> {
        let user_id = user_id.to_string();

        self.conn
            .call(move |conn| {
                let vendor = conn
                    .query_row(
                        &format!("{} WHERE v.user_id = ?1", VENDOR_SELECT),
                        [&user_id],
                        vendor_from_row,
                    )
                    .optional()?;
                Ok(vendor)
            })
            .await
            .map_err(Into::into)
    }

    async fn list_vendors(&self, limit: u32, offset: u32) -> Result<Vec<Vendor>, DbError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY v.created_at DESC, v.id LIMIT ?1 OFFSET ?2",
                    VENDOR_SELECT
                ))?;

                let vendors = stmt
                    .query_map(rusqlite::params![limit, offset], vendor_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(vendors)
            })
            .await
            .map_err(Into::into)
    }

    async fn count_vendors(&self) -> Result<u64, DbError> {
        self.count("SELECT COUNT(*) FROM vendors", vec![]).await
    }

    async fn update_vendor(&self, vendor: &Vendor) -> Result<(), DbError> {
        self.execute_affecting(
            r#"
            UPDATE vendors
            SET vendor_name = ?1, description = ?2, updated_at = ?3
            WHERE id = ?4
            "#,
            vec![
                vendor.vendor_name.clone(),
                vendor.description.clone(),
                timestamp(&vendor.updated_at),
                vendor.id.to_string(),
            ],
        )
        .await
    }

    async fn delete_vendor(&self, id: Uuid) -> Result<(), DbError> {
        self.execute_affecting("DELETE FROM vendors WHERE id = ?1", vec![id.to_string()])
            .await
    }

    // =========================================================================
    // Category operations
    // =========================================================================

    async fn create_category(&self, category: &Category) -> Result<(), DbError> {
        let params = vec![
            category.id.to_string(),
            category.name.clone(),
            category.description.clone(),
            timestamp(&category.created_at),
            timestamp(&category.updated_at),
        ];

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO categories (id, name, description, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    rusqlite::params_from_iter(params.iter()),
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, DbError> {
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let category = conn
                    .query_row(
                        &format!("{} WHERE id = ?1", CATEGORY_SELECT),
                        [&id],
                        category_from_row,
                    )
                    .optional()?;
                Ok(category)
            })
            .await
            .map_err(Into::into)
    }

    async fn list_categories(&self, limit: u32, offset: u32) -> Result<Vec<Category>, DbError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY created_at DESC, id LIMIT ?1 OFFSET ?2",
                    CATEGORY_SELECT
                ))?;

                let categories = stmt
                    .query_map(rusqlite::params![limit, offset], category_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(categories)
            })
            .await
            .map_err(Into::into)
    }

    async fn count_categories(&self) -> Result<u64, DbError> {
        self.count("SELECT COUNT(*) FROM categories", vec![]).await
    }

    async fn update_category(&self, category: &Category) -> Result<(), DbError> {
        self.execute_affecting(
            "UPDATE categories SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            vec![
                category.name.clone(),
                category.description.clone(),
                timestamp(&category.updated_at),
                category.id.to_string(),
            ],
        )
        .await
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), DbError> {
        self.execute_affecting("DELETE FROM categories WHERE id = ?1", vec![id.to_string()])
            .await
    }

    // =========================================================================
    // Product operations
    // =========================================================================

    async fn create_product(&self, product: &Product) -> Result<(), DbError> {
        let id = product.id.to_string();
        let product_name = product.product_name.clone();
        let product_price = product.product_price;
        let product_description = product.product_description.clone();
        let category_id = product.category_id.to_string();
        let vendor_id = product.vendor_id.to_string();
        let created_at = timestamp(&product.created_at);
        let updated_at = timestamp(&product.updated_at);

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO products
                    (id, product_name, product_price, product_description,
                     category_id, vendor_id, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    rusqlite::params![
                        id,
                        product_name,
                        product_price,
                        product_description,
                        category_id,
                        vendor_id,
                        created_at,
                        updated_at
                    ],
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, DbError> {
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let product = conn
                    .query_row(
                        &format!("{} WHERE p.id = ?1", PRODUCT_SELECT),
                        [&id],
                        product_from_row,
                    )
                    .optional()?;
                Ok(product)
            })
            .await
            .map_err(Into::into)
    }

    async fn list_products(&self, limit: u32, offset: u32) -> Result<Vec<Product>, DbError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY p.created_at DESC, p.id LIMIT ?1 OFFSET ?2",
                    PRODUCT_SELECT
                ))?;

                let products = stmt
                    .query_map(rusqlite::params![limit, offset], product_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(products)
            })
            .await
            .map_err(Into::into)
    }

    async fn count_products(&self) -> Result<u64, DbError> {
        self.count("SELECT COUNT(*) FROM products", vec![]).await
    }

    async fn list_products_by_category(
        &self,
        category_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Product>, DbError> {
        let category_id = category_id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE p.category_id = ?1 ORDER BY p.created_at DESC, p.id LIMIT ?2 OFFSET ?3",
                    PRODUCT_SELECT
                ))?;

                let products = stmt
                    .query_map(
                        rusqlite::params![category_id, limit, offset],
                        product_from_row,
                    )?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(products)
            })
            .await
            .map_err(Into::into)
    }

    async fn count_products_by_category(&self, category_id: Uuid) -> Result<u64, DbError> {
        self.count(
            "SELECT COUNT(*) FROM products WHERE category_id = ?1",
            vec![category_id.to_string()],
        )
        .await
    }

    async fn update_product(&self, product: &Product) -> Result<(), DbError> {
        let product_name = product.product_name.clone();
        let product_price = product.product_price;
        let product_description = product.product_description.clone();
        let category_id = product.category_id.to_string();
        let updated_at = timestamp(&product.updated_at);
        let id = product.id.to_string();

        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    r#"
                    UPDATE products
                    SET product_name = ?1, product_price = ?2, product_description = ?3,
                        category_id = ?4, updated_at = ?5
                    WHERE id = ?6
                    "#,
                    rusqlite::params![
                        product_name,
                        product_price,
                        product_description,
                        category_id,
                        updated_at,
                        id
                    ],
                )?;
                Ok(count)
            })
            .await?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), DbError> {
        self.execute_affecting("DELETE FROM products WHERE id = ?1", vec![id.to_string()])
            .await
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, 0)?,
        user_name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        created_at: datetime_at(row, 5)?,
        updated_at: datetime_at(row, 6)?,
    })
}

fn vendor_from_row(row: &Row<'_>) -> rusqlite::Result<Vendor> {
    Ok(Vendor {
        id: uuid_at(row, 0)?,
        vendor_name: row.get(1)?,
        description: row.get(2)?,
        user_id: uuid_at(row, 3)?,
        user_name: row.get(4)?,
        created_at: datetime_at(row, 5)?,
        updated_at: datetime_at(row, 6)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: datetime_at(row, 3)?,
        updated_at: datetime_at(row, 4)?,
    })
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: uuid_at(row, 0)?,
        product_name: row.get(1)?,
        product_price: row.get(2)?,
        product_description: row.get(3)?,
        category_id: uuid_at(row, 4)?,
        category_name: row.get(5)?,
        vendor_id: uuid_at(row, 6)?,
        vendor_name: row.get(7)?,
        created_at: datetime_at(row, 8)?,
        updated_at: datetime_at(row, 9)?,
    })
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

//! Product operations
//!
//! Products are created under the caller's own vendor only; see
//! [`OwnershipGuard::authorize_product_vendor`].

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{
    optional_text, parse_id, required_text, validate_price, MAX_DESCRIPTION_LENGTH,
    MAX_NAME_LENGTH,
};
use crate::auth::{Identity, OwnershipGuard};
use crate::database::Database;
use crate::error::{AppError, DbError};
use crate::models::{
    CreateProductRequest, Meta, PageQuery, Pagination, Product, ProductResponse,
    UpdateProductRequest,
};

fn not_found() -> AppError {
    AppError::NotFound("product not found".to_string())
}

fn description(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(AppError::Validation(format!(
            "product_description must be at most {} characters",
            MAX_DESCRIPTION_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

async fn ensure_category<D: Database>(database: &D, id: Uuid) -> Result<(), AppError> {
    match database.get_category(id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("category not found".to_string())),
    }
}

/// Create a product under the caller's vendor
///
/// Input is validated first, then the category must exist, then the target
/// vendor must be the caller's.
pub async fn create_product<D: Database>(
    database: &D,
    guard: &OwnershipGuard<D>,
    identity: &Identity,
    req: &CreateProductRequest,
) -> Result<ProductResponse, AppError> {
    let product_name = required_text("product_name", &req.product_name, MAX_NAME_LENGTH)?;
    let product_price = validate_price(req.product_price)?;
    let product_description = description(&req.product_description)?;
    let category_id = parse_id("product_category_id", &req.product_category_id)?;
    let vendor_id = parse_id("vendor_id", &req.vendor_id)?;

    ensure_category(database, category_id).await?;
    let vendor = guard.authorize_product_vendor(identity, vendor_id).await?;

    let mut product = Product::new(
        product_name,
        product_price,
        product_description,
        category_id,
        vendor.id,
    );
    database.create_product(&product).await?;

    if let Some(stored) = database.get_product(product.id).await? {
        product = stored;
    }

    info!(
        product_id = %product.id,
        vendor_id = %vendor.id,
        user_id = %identity.user_id,
        "Product created"
    );
    Ok(ProductResponse::from(&product))
}

/// Read a product by id
pub async fn get_product<D: Database>(database: &D, id: &str) -> Result<ProductResponse, AppError> {
    let id = parse_id("id", id)?;
    let product = database.get_product(id).await?.ok_or_else(not_found)?;
    Ok(ProductResponse::from(&product))
}

/// List all products with pagination
pub async fn list_products<D: Database>(
    database: &D,
    query: &PageQuery,
) -> Result<(Vec<ProductResponse>, Meta), AppError> {
    let page = Pagination::from_query(query)?;
    let products = database.list_products(page.limit, page.offset()).await?;
    let total = database.count_products().await?;

    Ok((
        products.iter().map(ProductResponse::from).collect(),
        page.meta(total),
    ))
}

/// List the products of one category with pagination
pub async fn list_products_by_category<D: Database>(
    database: &D,
    category_id: &str,
    query: &PageQuery,
) -> Result<(Vec<ProductResponse>, Meta), AppError> {
    let category_id = parse_id("category_id", category_id)?;
    let page = Pagination::from_query(query)?;
    ensure_category(database, category_id).await?;

    let products = database
        .list_products_by_category(category_id, page.limit, page.offset())
        .await?;
    let total = database.count_products_by_category(category_id).await?;

    Ok((
        products.iter().map(ProductResponse::from).collect(),
        page.meta(total),
    ))
}

/// Update a product; absent fields keep their current value
pub async fn update_product<D: Database>(
    database: &D,
    id: &str,
    req: &UpdateProductRequest,
) -> Result<ProductResponse, AppError> {
    let id = parse_id("id", id)?;
    let mut product = database.get_product(id).await?.ok_or_else(not_found)?;

    if let Some(name) =
        optional_text("product_name", req.product_name.as_deref(), 1, MAX_NAME_LENGTH)?
    {
        product.product_name = name;
    }
    if let Some(price) = req.product_price {
        product.product_price = validate_price(price)?;
    }
    if let Some(desc) = req.product_description.as_deref() {
        let desc = description(desc)?;
        if !desc.is_empty() {
            product.product_description = desc;
        }
    }
    if let Some(category) = req
        .product_category_id
        .as_deref()
        .filter(|c| !c.trim().is_empty())
    {
        let category_id = parse_id("product_category_id", category)?;
        ensure_category(database, category_id).await?;
        product.category_id = category_id;
    }
    product.updated_at = Utc::now();

    database.update_product(&product).await.map_err(|e| match e {
        DbError::NotFound => not_found(),
        other => other.into(),
    })?;

    if let Some(stored) = database.get_product(product.id).await? {
        product = stored;
    }

    info!(product_id = %product.id, "Product updated");
    Ok(ProductResponse::from(&product))
}

/// Delete a product
pub async fn delete_product<D: Database>(database: &D, id: &str) -> Result<(), AppError> {
    let id = parse_id("id", id)?;
    database.delete_product(id).await.map_err(|e| match e {
        DbError::NotFound => not_found(),
        other => other.into(),
    })?;

    info!(product_id = %id, "Product deleted");
    Ok(())
}

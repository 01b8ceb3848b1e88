//! HTTP router for procurement-api
//!
//! This module defines the axum router that handles all HTTP requests.
//! It provides routes for:
//! - Health checks
//! - Login and registration (public)
//! - Users, vendors, products and categories (behind the auth middleware)

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::middleware::auth_middleware;
use crate::api::{categories, products, users, vendors};
use crate::auth::{AuthManager, Identity, OwnershipGuard};
use crate::database::Database;
use crate::error::AppError;
use crate::models::{
    ApiResponse, ChangePasswordRequest, CreateCategoryRequest, CreateProductRequest,
    CreateUserRequest, CreateVendorRequest, LoginRequest, PageQuery, UpdateCategoryRequest,
    UpdateProductRequest, UpdateUserRequest, UpdateVendorRequest, UserResponse,
};

/// Shared application state
pub struct AppState<D: Database> {
    /// Authentication manager
    pub auth_manager: Arc<AuthManager<D>>,

    /// Database
    pub database: Arc<D>,

    /// Ownership checks for vendor and product creation
    pub ownership: Arc<OwnershipGuard<D>>,
}

impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            auth_manager: Arc::clone(&self.auth_manager),
            database: Arc::clone(&self.database),
            ownership: Arc::clone(&self.ownership),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// `?id=` on `GET /user`; absent means the caller
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub id: Option<String>,
}

/// Build the main application router
///
/// # Arguments
///
/// * `state` - Application state containing the database and auth services
///
/// # Returns
///
/// An axum Router configured with all endpoints
pub fn build_router<D: Database + 'static>(state: AppState<D>) -> Router {
    let protected = Router::new()
        // Users
        .route(
            "/user",
            get(get_user_handler::<D>)
                .put(update_user_handler::<D>)
                .delete(delete_user_handler::<D>),
        )
        .route("/user/password", put(change_password_handler::<D>))
        // Vendors
        .route(
            "/vendor",
            get(list_vendors_handler::<D>).post(create_vendor_handler::<D>),
        )
        .route(
            "/vendor/:id",
            get(get_vendor_handler::<D>)
                .put(update_vendor_handler::<D>)
                .delete(delete_vendor_handler::<D>),
        )
        // Products
        .route("/vendor/product", post(create_product_handler::<D>))
        .route("/vendor/products", get(list_products_handler::<D>))
        .route(
            "/vendor/products/:id",
            get(get_product_handler::<D>)
                .put(update_product_handler::<D>)
                .delete(delete_product_handler::<D>),
        )
        .route(
            "/vendor/products/category/:category_id",
            get(list_products_by_category_handler::<D>),
        )
        // Categories
        .route(
            "/vendor/product_category",
            post(create_category_handler::<D>),
        )
        .route(
            "/vendor/product_categories",
            get(list_categories_handler::<D>),
        )
        .route(
            "/vendor/product_categories/:id",
            get(get_category_handler::<D>)
                .put(update_category_handler::<D>)
                .delete(delete_category_handler::<D>),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.auth_manager),
            auth_middleware::<D>,
        ));

    let public = Router::new()
        .route("/auth/login", post(login_handler::<D>))
        .route("/auth/register", post(register_handler::<D>));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", public.merge(protected))
        .with_state(state)
}

// =============================================================================
// Health and Auth Handlers
// =============================================================================

/// Health check endpoint handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn login_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let (user, issued) = state.auth_manager.login(&req, Utc::now()).await?;

    Ok(Json(
        ApiResponse::success("Login successful", UserResponse::from(&user)).with_token(issued.token),
    ))
}

async fn register_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let user = state.auth_manager.register(&req).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "User registered",
            UserResponse::from(&user),
        )),
    ))
}

// =============================================================================
// User Handlers
// =============================================================================

async fn get_user_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    identity: Identity,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id = match query.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => identity.user_id.to_string(),
    };
    let user = users::get_user(state.database.as_ref(), &id).await?;
    Ok(Json(ApiResponse::success("User retrieved", user)))
}

async fn update_user_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    identity: Identity,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let user = users::update_user(
        state.database.as_ref(),
        &state.auth_manager,
        &identity,
        &req,
    )
    .await?;
    Ok(Json(ApiResponse::success("User updated", user)))
}

async fn delete_user_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    users::delete_user(state.database.as_ref(), &identity).await?;
    Ok(Json(ApiResponse::message("User deleted")))
}

async fn change_password_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    identity: Identity,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    users::change_password(
        state.database.as_ref(),
        &state.auth_manager,
        &identity,
        &req,
    )
    .await?;
    Ok(Json(ApiResponse::message("Password changed")))
}

// =============================================================================
// Vendor Handlers
// =============================================================================

async fn create_vendor_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    identity: Identity,
    payload: Result<Json<CreateVendorRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let vendor = vendors::create_vendor(
        state.database.as_ref(),
        &state.ownership,
        &identity,
        &req,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Vendor created", vendor)),
    ))
}

async fn list_vendors_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (items, meta) = vendors::list_vendors(state.database.as_ref(), &query).await?;
    Ok(Json(
        ApiResponse::success("Vendors retrieved", items).with_meta(meta),
    ))
}

async fn get_vendor_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let vendor = vendors::get_vendor(state.database.as_ref(), &id).await?;
    Ok(Json(ApiResponse::success("Vendor retrieved", vendor)))
}

async fn update_vendor_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateVendorRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let vendor = vendors::update_vendor(state.database.as_ref(), &id, &req).await?;
    Ok(Json(ApiResponse::success("Vendor updated", vendor)))
}

async fn delete_vendor_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    vendors::delete_vendor(state.database.as_ref(), &id).await?;
    Ok(Json(ApiResponse::message("Vendor deleted")))
}

// =============================================================================
// Product Handlers
// =============================================================================

async fn create_product_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    identity: Identity,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let product = products::create_product(
        state.database.as_ref(),
        &state.ownership,
        &identity,
        &req,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Product created", product)),
    ))
}

async fn list_products_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (items, meta) = products::list_products(state.database.as_ref(), &query).await?;
    Ok(Json(
        ApiResponse::success("Products retrieved", items).with_meta(meta),
    ))
}

async fn list_products_by_category_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(category_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (items, meta) =
        products::list_products_by_category(state.database.as_ref(), &category_id, &query)
            .await?;
    Ok(Json(
        ApiResponse::success("Products retrieved", items).with_meta(meta),
    ))
}

async fn get_product_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product = products::get_product(state.database.as_ref(), &id).await?;
    Ok(Json(ApiResponse::success("Product retrieved", product)))
}

async fn update_product_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let product = products::update_product(state.database.as_ref(), &id, &req).await?;
    Ok(Json(ApiResponse::success("Product updated", product)))
}

async fn delete_product_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    products::delete_product(state.database.as_ref(), &id).await?;
    Ok(Json(ApiResponse::message("Product deleted")))
}

// =============================================================================
// Category Handlers
// =============================================================================

async fn create_category_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let category = categories::create_category(state.database.as_ref(), &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Category created", category)),
    ))
}

async fn list_categories_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (items, meta) = categories::list_categories(state.database.as_ref(), &query).await?;
    Ok(Json(
        ApiResponse::success("Categories retrieved", items).with_meta(meta),
    ))
}

async fn get_category_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let category = categories::get_category(state.database.as_ref(), &id).await?;
    Ok(Json(ApiResponse::success("Category retrieved", category)))
}

async fn update_category_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let category = categories::update_category(state.database.as_ref(), &id, &req).await?;
    Ok(Json(ApiResponse::success("Category updated", category)))
}

async fn delete_category_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    categories::delete_category(state.database.as_ref(), &id).await?;
    Ok(Json(ApiResponse::message("Category deleted")))
}

//! Domain models for procurement-api
//!
//! This module contains the core domain models used throughout the application.

pub mod category;
pub mod product;
pub mod response;
pub mod user;
pub mod vendor;

// Re-export commonly used types
pub use category::{Category, CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest};
pub use product::{CreateProductRequest, Product, ProductResponse, UpdateProductRequest};
pub use response::{ApiResponse, Meta, PageQuery, Pagination, DEFAULT_PAGE_LIMIT, MAX_PAGE_VALUE};
pub use user::{
    ChangePasswordRequest, CreateUserRequest, LoginRequest, UpdateUserRequest, User,
    UserResponse, DEFAULT_ROLE,
};
pub use vendor::{CreateVendorRequest, UpdateVendorRequest, Vendor, VendorResponse};

//! procurement-api - Vendor and product catalogue service
//!
//! This crate provides a REST API for users, vendors, products and product
//! categories. Protected routes require a signed bearer token, and vendor and
//! product creation are restricted to what the caller owns.

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod otel;
pub mod server;

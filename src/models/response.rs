//! Response envelope and pagination
//!
//! Every JSON response uses the same envelope:
//! `{status, message, data?, token?, meta?}`.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Default page size
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest accepted page size and page number
pub const MAX_PAGE_VALUE: u32 = 100;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// JSON response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: message.into(),
            data: Some(data),
            token: None,
            meta: None,
        }
    }

    /// Attach a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attach pagination metadata
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl ApiResponse<()> {
    /// Successful response without a body
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: message.into(),
            data: None,
            token: None,
            meta: None,
        }
    }

    /// Error response
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: message.into(),
            data: None,
            token: None,
            meta: None,
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub page: u32,
    pub per_page: u32,
    pub has_more: bool,
}

/// Raw `?limit=&page=` query parameters
///
/// Kept as strings so unparseable values fall back to defaults instead of
/// rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            page: 1,
        }
    }
}

impl Pagination {
    /// Resolve query parameters
    ///
    /// Missing, non-numeric or non-positive values use the defaults. Values
    /// above [`MAX_PAGE_VALUE`] are rejected.
    pub fn from_query(query: &PageQuery) -> Result<Self, AppError> {
        let limit = parse_positive(query.limit.as_deref()).unwrap_or(DEFAULT_PAGE_LIMIT);
        let page = parse_positive(query.page.as_deref()).unwrap_or(1);

        if limit > MAX_PAGE_VALUE || page > MAX_PAGE_VALUE {
            return Err(AppError::Validation(format!(
                "limit and page must be between 1 and {}",
                MAX_PAGE_VALUE
            )));
        }

        Ok(Self { limit, page })
    }

    /// Row offset for this page
    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.limit
    }

    /// Metadata for a listing with `total` rows overall
    pub fn meta(&self, total: u64) -> Meta {
        Meta {
            page: self.page,
            per_page: self.limit,
            has_more: u64::from(self.page) * u64::from(self.limit) < total,
        }
    }
}

fn parse_positive(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}

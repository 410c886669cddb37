//! Shared response shapes

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Page size is fixed; clients only pick the page number.
pub const PAGE_SIZE: i64 = 10;

/// The `{status, message, payload}` envelope used by action endpoints and
/// every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiEnvelope {
    #[schema(example = "success")]
    pub status: String,
    pub message: String,
    #[schema(value_type = Object)]
    pub payload: Value,
}

impl ApiEnvelope {
    pub fn success(message: impl Into<String>, payload: Value) -> Self {
        Self { status: "success".to_string(), message: message.into(), payload }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, page_size: i64, total: i64) -> Self {
        let total_pages = if total == 0 { 0 } else { (total + page_size - 1) / page_size };
        Self { data, page, page_size, total, total_pages }
    }
}

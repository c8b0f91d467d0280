//! HTTP 处理器

pub mod analytics;
pub mod orders;

use axum::http::HeaderMap;

use crate::error::IntakeError;

/// 标识餐厅的请求头
pub const ORG_HEADER: &str = "x-org";

pub(crate) fn restaurant_header(headers: &HeaderMap) -> Result<String, IntakeError> {
    headers
        .get(ORG_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(IntakeError::MissingHeader(ORG_HEADER))
}

//! 下单服务错误类型定义

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_shared::error::OrderError;
use order_shared::observability::tracing::current_trace_id;
use serde_json::json;

/// 下单服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("缺少请求头: {0}")]
    MissingHeader(&'static str),

    #[error(transparent)]
    Shared(#[from] OrderError),
}

impl IntakeError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MissingHeader(_) => StatusCode::BAD_REQUEST,
            Self::Shared(OrderError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Shared(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Shared(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MissingHeader(_) => "MISSING_HEADER",
            Self::Shared(e) => e.code(),
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = if status.is_server_error() {
            tracing::error!(
                error = %self,
                code = self.error_code(),
                trace_id = ?current_trace_id(),
                "请求处理失败"
            );
            "服务内部错误，请稍后重试".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for IntakeError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;

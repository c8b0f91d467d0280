//! 订单处理服务错误类型
//!
//! 在共享库 OrderError 基础上增加本服务特有的变体，并负责到 HTTP 响应的映射。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_shared::error::OrderError;
use order_shared::observability::tracing::current_trace_id;
use serde_json::json;
use uuid::Uuid;

/// 订单处理错误
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// 消息负载无法解码为下单事件
    #[error("无法解码的订单事件: {0}")]
    MalformedEvent(String),

    #[error("缺少请求头: {0}")]
    MissingHeader(&'static str),

    #[error("订单不存在: {0}")]
    OrderNotFound(Uuid),

    #[error(transparent)]
    Shared(#[from] OrderError),
}

impl ProcessingError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedEvent(_) | Self::MissingHeader(_) => StatusCode::BAD_REQUEST,
            Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::Shared(e) if e.is_client_error() => match e {
                OrderError::NotFound { .. } => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Shared(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedEvent(_) => "MALFORMED_EVENT",
            Self::MissingHeader(_) => "MISSING_HEADER",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::Shared(e) => e.code(),
        }
    }

    /// 是否属于事件本身的问题（重放也不会成功）
    pub fn is_rejected_event(&self) -> bool {
        match self {
            Self::MalformedEvent(_) => true,
            Self::Shared(e) => e.is_client_error(),
            _ => false,
        }
    }
}

impl IntoResponse for ProcessingError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 基础设施错误只返回通用提示，详细信息仅记录日志
        let message = if status.is_server_error() {
            tracing::error!(error = %self, trace_id = ?current_trace_id(), "订单处理失败");
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

pub type Result<T> = std::result::Result<T, ProcessingError>;

//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 描述会出现在 /metrics 端点的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "orders_submitted_total",
        "Order submissions accepted or rejected by intake"
    );
    metrics::describe_counter!(
        "order_events_consumed_total",
        "Order events read from the bus, by outcome"
    );
    metrics::describe_counter!(
        "orders_materialized_total",
        "Orders priced and persisted, by source and status"
    );
    metrics::describe_histogram!(
        "order_materialize_duration_seconds",
        "Order materialization duration in seconds"
    );
    metrics::describe_counter!(
        "order_items_unresolved_total",
        "Line items whose price could not be resolved"
    );
    metrics::describe_counter!(
        "daily_aggregate_update_failures_total",
        "Daily aggregate increments that failed after the order was persisted"
    );
    metrics::describe_counter!(
        "recent_orders_cache_total",
        "Recent orders cache lookups, by result"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录下单提交结果（accepted / rejected / failed）
#[inline]
pub fn record_order_submitted(status: &str) {
    metrics::counter!("orders_submitted_total", "status" => status.to_string()).increment(1);
}

/// 记录事件消费结果（materialized / malformed / invalid / failed）
#[inline]
pub fn record_event_consumed(outcome: &str) {
    metrics::counter!("order_events_consumed_total", "outcome" => outcome.to_string())
        .increment(1);
}

/// 记录订单物化
///
/// `source` 区分订单来源：事件消费（event）或同步 API（api）。
#[inline]
pub fn record_order_materialized(source: &str, status: &str, duration_secs: f64) {
    metrics::counter!(
        "orders_materialized_total",
        "source" => source.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "order_materialize_duration_seconds",
        "source" => source.to_string()
    )
    .record(duration_secs);
}

/// 记录未能解析价格的订单行数量
#[inline]
pub fn record_unresolved_items(count: usize) {
    metrics::counter!("order_items_unresolved_total").increment(count as u64);
}

/// 记录日聚合更新失败
#[inline]
pub fn record_aggregate_failure() {
    metrics::counter!("daily_aggregate_update_failures_total").increment(1);
}

/// 记录近期订单缓存查询结果（hit / miss / error）
#[inline]
pub fn record_cache_lookup(result: &str) {
    metrics::counter!("recent_orders_cache_total", "result" => result.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 未安装 recorder 时记录操作为空操作
        record_http_request("GET", "/orders", 200, 0.1);
        record_order_submitted("accepted");
        record_event_consumed("materialized");
        record_order_materialized("event", "success", 0.02);
        record_unresolved_items(2);
        record_aggregate_failure();
        record_cache_lookup("hit");
    }
}

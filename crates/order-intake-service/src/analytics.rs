//! 经营分析查询
//!
//! 查询参数先解析为强类型请求，再交给仓储执行。
//! 日期以 MM/DD/YYYY 传入，两端都按整天包含，内部转换为半开区间。

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use order_shared::error::{OrderError, Result};
use order_shared::events::parse_restaurant_id;
use order_shared::models::{DailyAggregate, PopularItem};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::repository::AnalyticsRepositoryTrait;

const DATE_FORMAT: &str = "%m/%d/%Y";

/// 原始查询参数 `?from=MM/DD/YYYY&to=MM/DD/YYYY`
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// 闭区间日期范围 [from, to]，UTC 整天
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRangeQuery {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(OrderError::invalid("from", "起始日期不能晚于结束日期"));
        }
        Ok(Self { from, to })
    }

    pub fn parse(params: &DateRangeParams) -> Result<Self> {
        let from = parse_date("from", params.from.as_deref())?;
        let to = parse_date("to", params.to.as_deref())?;
        Self::new(from, to)
    }

    /// 结束日期的次日，作为开区间上界
    pub fn to_exclusive(&self) -> Result<NaiveDate> {
        self.to
            .checked_add_days(Days::new(1))
            .ok_or_else(|| OrderError::invalid("to", "结束日期超出范围"))
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.from.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    pub fn end_exclusive(&self) -> Result<DateTime<Utc>> {
        Ok(self.to_exclusive()?.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<NaiveDate> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OrderError::invalid(field, "缺少日期参数"))?;

    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| OrderError::invalid(field, format!("日期格式应为 MM/DD/YYYY: {raw}")))
}

/// 餐厅日聚合查询
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyAggregatesQuery {
    pub restaurant_id: Uuid,
    pub range: DateRangeQuery,
}

impl DailyAggregatesQuery {
    pub fn parse(restaurant_id: &str, params: &DateRangeParams) -> Result<Self> {
        Ok(Self {
            restaurant_id: parse_restaurant_id(restaurant_id)?,
            range: DateRangeQuery::parse(params)?,
        })
    }
}

/// 热门商品查询（全部餐厅）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopularItemsQuery {
    pub range: DateRangeQuery,
}

impl PopularItemsQuery {
    pub fn parse(params: &DateRangeParams) -> Result<Self> {
        Ok(Self {
            range: DateRangeQuery::parse(params)?,
        })
    }
}

pub struct AnalyticsService {
    repo: Arc<dyn AnalyticsRepositoryTrait>,
}

impl AnalyticsService {
    pub fn new(repo: Arc<dyn AnalyticsRepositoryTrait>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn daily_aggregates(&self, query: DailyAggregatesQuery) -> Result<Vec<DailyAggregate>> {
        self.repo
            .daily_aggregates(query.restaurant_id, query.range.from, query.range.to_exclusive()?)
            .await
    }

    #[instrument(skip(self))]
    pub async fn popular_items(&self, query: PopularItemsQuery) -> Result<Vec<PopularItem>> {
        self.repo
            .popular_items(query.range.start(), query.range.end_exclusive()?)
            .await
    }
}

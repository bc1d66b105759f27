//! # DTO (Data Transfer Object) 层
//!
//! 将内部领域模型转化为面向前端 JSON 输出的轻量结构体。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 Swagger 文档。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use sp500_core::store::entity::StockRecord;

// ============================================================
//  快照相关 DTO
// ============================================================

/// 快照行 DTO
///
/// # Invariants
/// - `current_price` 与 `change_percent` 同时为数值或同时为 `null`，字段永不省略。
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockRecordResponse {
    /// 存储层分配的自增主键
    #[schema(example = 1)]
    pub id: i64,
    /// 股票代码
    #[schema(example = "MMM")]
    pub ticker: String,
    /// 公司名称
    #[schema(example = "3M")]
    pub company_name: String,
    /// GICS 行业
    #[schema(example = "Industrials")]
    pub sector: String,
    /// 最新收盘价，无可用数据时为 null
    #[schema(example = 110.0)]
    pub current_price: Option<f64>,
    /// 相对前一交易日的涨跌幅 (百分比)，无可用数据时为 null
    #[schema(example = 10.0)]
    pub change_percent: Option<f64>,
    /// 最近一次同步写入的时间 (ISO 8601)
    #[schema(example = "2026-03-03T21:00:00Z")]
    pub last_updated: DateTime<Utc>,
}

// ============================================================
//  通用响应 DTO
// ============================================================

/// 构建失败响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误信息构建
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

// ============================================================
//  领域模型 → DTO 惯用转换 (impl From<T>)
// ============================================================

impl From<StockRecord> for StockRecordResponse {
    fn from(r: StockRecord) -> Self {
        // 非有限值无法表示为 JSON 数字，整对按缺失输出
        let price = r
            .price
            .filter(|p| p.current_price.is_finite() && p.change_percent.is_finite());
        Self {
            id: r.id,
            ticker: r.ticker,
            company_name: r.company_name,
            sector: r.sector,
            current_price: price.map(|p| p.current_price),
            change_percent: price.map(|p| p.change_percent),
            last_updated: r.last_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sp500_core::market::entity::PriceChange;

    fn record(price: Option<PriceChange>) -> StockRecord {
        StockRecord {
            id: 7,
            ticker: "BBB".to_string(),
            company_name: "Beta Co".to_string(),
            sector: "Energy".to_string(),
            price,
            last_updated: Utc.with_ymd_and_hms(2026, 3, 3, 21, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_absent_price_serialises_as_explicit_null() {
        let json = serde_json::to_value(StockRecordResponse::from(record(None))).unwrap();
        assert_eq!(json["companyName"], "Beta Co");
        assert!(json.get("currentPrice").unwrap().is_null());
        assert!(json.get("changePercent").unwrap().is_null());
        assert_eq!(json["lastUpdated"], "2026-03-03T21:00:00Z");
    }

    #[test]
    fn test_non_finite_pair_is_dropped_together() {
        let dto = StockRecordResponse::from(record(Some(PriceChange {
            current_price: 12.0,
            change_percent: f64::INFINITY,
        })));
        assert_eq!(dto.current_price, None);
        assert_eq!(dto.change_percent, None);
    }
}

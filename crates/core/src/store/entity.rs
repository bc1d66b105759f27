use crate::market::entity::PriceChange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 快照表中的一行，每个代码一行。
///
/// # Invariants
/// - `ticker` 在整张表中唯一，创建后不可变。
/// - 最新价与涨跌幅通过单一的 `Option<PriceChange>` 保证同时存在或同时缺席。
/// - 行只会被创建和更新，永不删除。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    /// 存储层分配的自增主键
    pub id: i64,
    /// 股票代码
    pub ticker: String,
    /// 公司名称，每次同步覆盖
    pub company_name: String,
    /// 行业分类，每次同步覆盖
    pub sector: String,
    /// 本周期的价格快照，无可用数据时为 None
    pub price: Option<PriceChange>,
    /// 最近一次成功写入该行的时间
    pub last_updated: DateTime<Utc>,
}

impl StockRecord {
    pub fn current_price(&self) -> Option<f64> {
        self.price.map(|p| p.current_price)
    }

    pub fn change_percent(&self) -> Option<f64> {
        self.price.map(|p| p.change_percent)
    }
}

/// # Summary
/// 一次写入请求：按代码定位已有行，不存在则新建，随后整体覆盖其余字段。
#[derive(Debug, Clone, PartialEq)]
pub struct StockUpsert {
    pub ticker: String,
    pub company_name: String,
    pub sector: String,
    /// None 表示清空价格字段
    pub price: Option<PriceChange>,
    /// 写入时刻，由注入的时钟提供
    pub updated_at: DateTime<Utc>,
}

/// # Summary
/// 写入结果，附带该行是否为本次新建。
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    pub record: StockRecord,
    pub created: bool,
}

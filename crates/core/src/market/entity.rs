use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// # Summary
/// 单个交易日的收盘价。
///
/// # Invariants
/// - `close` 可能为非有限值 (NaN)，代表上游在该日返回了空值，由涨跌幅计算器负责处理。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    /// 交易日
    pub date: NaiveDate,
    /// 收盘价
    pub close: f64,
}

/// # Summary
/// 单个代码在回看窗口内的收盘价序列，仅在一次同步周期内存在，不落库。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// 股票代码 (与名单源一致)
    pub ticker: String,
    /// 按交易日排列的收盘价
    pub closes: Vec<DailyClose>,
}

impl PriceQuote {
    pub fn new(ticker: impl Into<String>, closes: Vec<DailyClose>) -> Self {
        Self {
            ticker: ticker.into(),
            closes,
        }
    }
}

/// # Summary
/// 由两个收盘价推导出的价格快照：最新价与日涨跌幅 (百分比)。
///
/// # Invariants
/// - 两个字段同为有限值，二者作为整体存在或缺席，不允许只有其一。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    /// 最新收盘价
    pub current_price: f64,
    /// 相对前一交易日的涨跌幅，单位为百分比
    pub change_percent: f64,
}

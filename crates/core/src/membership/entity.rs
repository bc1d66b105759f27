use serde::{Deserialize, Serialize};

/// # Summary
/// 指数成分股条目，来自成分股名单源的一行。
///
/// # Invariants
/// - `ticker` 区分大小写，保持名单源原样。
/// - 同一批次内 `ticker` 唯一 (由名单源实现负责去重)。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituent {
    /// 股票代码 (例如: AAPL, BRK.B)
    pub ticker: String,
    /// 公司显示名称
    pub company_name: String,
    /// GICS 行业分类
    pub sector: String,
}

impl Constituent {
    pub fn new(
        ticker: impl Into<String>,
        company_name: impl Into<String>,
        sector: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            company_name: company_name.into(),
            sector: sector.into(),
        }
    }
}

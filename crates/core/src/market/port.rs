use crate::market::entity::PriceQuote;
use crate::market::error::PriceError;
use async_trait::async_trait;
use std::collections::HashMap;

/// 回看窗口的最小交易日数，计算日涨跌幅至少需要两个收盘价。
pub const MIN_LOOKBACK_DAYS: u32 = 2;

/// # Summary
/// 历史收盘价提供者接口 (原始数据源)。
///
/// # Invariants
/// - 批量接口：一次调用覆盖整个代码集合，实现者可在内部并发网络请求。
/// - 返回的 Map 以调用方传入的代码为键。
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// # Summary
    /// 批量获取一组代码最近若干交易日的收盘价。
    ///
    /// # Logic
    /// 1. 校验回看窗口不少于 `MIN_LOOKBACK_DAYS`。
    /// 2. 对每个代码发起请求，无数据的代码直接跳过。
    /// 3. 整个数据源不可达或批次超时返回 `PriceError`。
    ///
    /// # Arguments
    /// * `tickers`: 代码集合。
    /// * `lookback_days`: 回看的交易日数。
    ///
    /// # Returns
    /// 成功返回代码到报价序列的映射。
    async fn fetch_quotes(
        &self,
        tickers: &[String],
        lookback_days: u32,
    ) -> Result<HashMap<String, PriceQuote>, PriceError>;
}

//! # 测试替身
//!
//! 供各实现 crate 的集成测试使用的内存版名单源与价格源，
//! 仅在开启 `test-utils` feature 时编译。

use crate::market::entity::{DailyClose, PriceQuote};
use crate::market::error::PriceError;
use crate::market::port::PriceProvider;
use crate::membership::entity::Constituent;
use crate::membership::error::SourceError;
use crate::membership::port::MembershipSource;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 返回固定名单的名单源，`rows` 为 None 时模拟名单源不可用。
pub struct StaticMembershipSource {
    rows: Mutex<Option<Vec<Constituent>>>,
    calls: AtomicUsize,
}

impl StaticMembershipSource {
    pub fn new(rows: Vec<Constituent>) -> Self {
        Self {
            rows: Mutex::new(Some(rows)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            rows: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// 替换后续调用返回的名单
    pub fn set_rows(&self, rows: Option<Vec<Constituent>>) {
        *self.rows.lock().unwrap_or_else(|p| p.into_inner()) = rows;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MembershipSource for StaticMembershipSource {
    async fn fetch_constituents(&self) -> Result<Vec<Constituent>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .ok_or_else(|| SourceError::Network("membership source offline".to_string()))
    }
}

/// 返回固定收盘价的价格源，`quotes` 为 None 时模拟整个价格源不可达。
pub struct StaticPriceProvider {
    quotes: Option<HashMap<String, PriceQuote>>,
    requests: Mutex<Vec<Vec<String>>>,
}

impl StaticPriceProvider {
    pub fn new() -> Self {
        Self {
            quotes: Some(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            quotes: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// # Summary
    /// 为代码登记一组收盘价，日期从 2026-03-02 起逐日递增。
    pub fn with_closes(self, ticker: &str, closes: &[f64]) -> Self {
        let base = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap_or_default();
        let closes = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| DailyClose {
                date: base
                    .checked_add_days(Days::new(u64::try_from(i).unwrap_or_default()))
                    .unwrap_or(base),
                close,
            })
            .collect();
        self.with_quote(PriceQuote::new(ticker, closes))
    }

    /// 直接登记一份报价，可用于构造日期异常的数据
    pub fn with_quote(self, quote: PriceQuote) -> Self {
        let ticker = quote.ticker.clone();
        self.with_quote_for(&ticker, quote)
    }

    /// 把报价登记在指定代码下，报价自身的代码可以与之不同
    pub fn with_quote_for(mut self, ticker: &str, quote: PriceQuote) -> Self {
        if let Some(quotes) = self.quotes.as_mut() {
            quotes.insert(ticker.to_string(), quote);
        }
        self
    }

    /// 历次调用收到的代码集合
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Default for StaticPriceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceProvider for StaticPriceProvider {
    async fn fetch_quotes(
        &self,
        tickers: &[String],
        _lookback_days: u32,
    ) -> Result<HashMap<String, PriceQuote>, PriceError> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(tickers.to_vec());

        let quotes = self
            .quotes
            .as_ref()
            .ok_or_else(|| PriceError::Network("price source offline".to_string()))?;

        Ok(tickers
            .iter()
            .filter_map(|t| quotes.get(t).map(|q| (t.clone(), q.clone())))
            .collect())
    }
}

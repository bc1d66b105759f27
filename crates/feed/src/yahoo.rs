use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sp500_core::config::PriceConfig;
use sp500_core::market::entity::{DailyClose, PriceQuote};
use sp500_core::market::error::PriceError;
use sp500_core::market::port::{MIN_LOOKBACK_DAYS, PriceProvider};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// # Summary
/// Yahoo Finance 日线收盘价提供者实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，单请求超时与批次超时均由配置决定。
/// - 同时在途的请求数不超过 `concurrency`。
#[derive(Clone)]
pub struct YahooProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 接口根地址，测试时指向本地模拟服务
    base_url: String,
    /// 并发请求上限
    concurrency: usize,
    /// 整个批次的时限
    batch_timeout: Duration,
}

/// 单个代码的抓取结果
enum TickerFetch {
    Quote(PriceQuote),
    // 数据源有响应，但该代码没有可用数据
    NoData,
    // 没有拿到可用的响应：连接失败、超时，或服务端拒绝服务 (5xx、429、401/403)
    Unavailable(String),
}

impl YahooProvider {
    /// # Summary
    /// 创建一个新的 YahooProvider 实例。
    ///
    /// # Logic
    /// 1. 按配置设置单请求超时。
    /// 2. 设置伪装浏览器 Header (User-Agent) 以减少被拦截风险。
    /// 3. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `config`: 价格源配置。
    ///
    /// # Returns
    /// 返回初始化后的 YahooProvider，客户端构建失败时返回 `PriceError::Network`。
    pub fn new(config: &PriceConfig) -> Result<Self, PriceError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PriceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            concurrency: config.concurrency.max(1),
            batch_timeout: config.batch_timeout(),
        })
    }

    /// # Summary
    /// 抓取单个代码的日线收盘价。
    ///
    /// # Logic
    /// 1. 以自然日估算回看区间 (覆盖周末与节假日)，构建 period1/period2。
    /// 2. 404、JSON 不匹配或结果为空视为该代码无数据；其余非 2xx 状态视为价格源不可用。
    /// 3. 空收盘价以 NaN 保留，交给涨跌幅计算器判定。
    /// 4. 按日期排序后只保留最后 `lookback_days` 个交易日。
    async fn fetch_one(&self, ticker: &str, lookback_days: u32) -> TickerFetch {
        let symbol = yahoo_symbol(ticker);
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let end = Utc::now();
        let start = end - chrono::Duration::days(i64::from(lookback_days) * 2 + 5);

        let resp = match self
            .client
            .get(&url)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return TickerFetch::Unavailable(e.to_string()),
        };

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(ticker, "No price data");
            return TickerFetch::NoData;
        }
        if !status.is_success() {
            return TickerFetch::Unavailable(format!("HTTP {status}"));
        }

        let json: YahooResponse = match resp.json().await {
            Ok(json) => json,
            Err(e) if e.is_timeout() => return TickerFetch::Unavailable(e.to_string()),
            Err(e) => {
                debug!(ticker, error = %e, "Unparsable chart response");
                return TickerFetch::NoData;
            }
        };

        match quote_from_chart(ticker, json.chart, lookback_days) {
            Some(quote) => TickerFetch::Quote(quote),
            None => TickerFetch::NoData,
        }
    }
}

/// # Summary
/// 名单源代码到 Yahoo 代码的映射。
/// 类别股在名单中使用点号 (BRK.B)，Yahoo 使用连字符 (BRK-B)。
pub fn yahoo_symbol(ticker: &str) -> String {
    ticker.replace('.', "-")
}

fn quote_from_chart(ticker: &str, chart: YahooChart, lookback_days: u32) -> Option<PriceQuote> {
    if let Some(err) = chart.error {
        debug!(ticker, error = %err.description, "Chart error");
        return None;
    }
    let result = chart.result?.pop()?;
    let quote = result.indicators.quote.first()?;

    let mut closes: Vec<DailyClose> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date = DateTime::from_timestamp(ts, 0)?.date_naive();
            let close = quote.close.get(i).copied().flatten().unwrap_or(f64::NAN);
            Some(DailyClose { date, close })
        })
        .collect();

    if closes.is_empty() {
        return None;
    }
    closes.sort_by_key(|c| c.date);
    let keep = usize::try_from(lookback_days).unwrap_or(usize::MAX);
    if closes.len() > keep {
        closes.drain(..closes.len() - keep);
    }
    Some(PriceQuote::new(ticker, closes))
}

/// # Summary
/// Yahoo API 响应顶层结构。
///
/// # Invariants
/// - 映射自 Yahoo v8 chart 接口。
#[derive(Deserialize, Debug)]
struct YahooResponse {
    chart: YahooChart,
}

/// Yahoo API 图表数据部分。
#[derive(Deserialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

/// Yahoo API 错误详情。
#[derive(Deserialize, Debug)]
struct YahooError {
    description: String,
}

/// Yahoo API 单个时间序列结果，无交易数据时不含 `timestamp`。
#[derive(Deserialize, Debug)]
struct YahooResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

/// Yahoo API 原始报价数据，只取收盘价。
#[derive(Deserialize, Debug)]
struct YahooQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[async_trait]
impl PriceProvider for YahooProvider {
    /// # Summary
    /// 并发抓取一批代码的日线收盘价。
    ///
    /// # Logic
    /// 1. 校验回看窗口。
    /// 2. 以 `buffer_unordered` 限制并发，整个批次受 `batch_timeout` 约束。
    /// 3. 所有请求都没有拿到可用响应时，判定价格源整体不可用。
    ///
    /// # Returns
    /// 代码到报价的映射，没有数据的代码不出现在结果中。
    async fn fetch_quotes(
        &self,
        tickers: &[String],
        lookback_days: u32,
    ) -> Result<HashMap<String, PriceQuote>, PriceError> {
        if lookback_days < MIN_LOOKBACK_DAYS {
            return Err(PriceError::InvalidRequest(format!(
                "lookback window must cover at least {MIN_LOOKBACK_DAYS} trading days, got {lookback_days}"
            )));
        }
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }

        info!(count = tickers.len(), lookback_days, "Fetching price data");

        let fetches = futures::stream::iter(tickers.iter().cloned())
            .map(|ticker| async move {
                let fetch = self.fetch_one(&ticker, lookback_days).await;
                (ticker, fetch)
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>();

        let results = tokio::time::timeout(self.batch_timeout, fetches)
            .await
            .map_err(|_| PriceError::Timeout(self.batch_timeout))?;

        let mut quotes = HashMap::with_capacity(results.len());
        let mut last_failure = None;
        let mut failures = 0usize;
        for (ticker, fetch) in results {
            match fetch {
                TickerFetch::Quote(quote) => {
                    quotes.insert(ticker, quote);
                }
                TickerFetch::NoData => {}
                TickerFetch::Unavailable(err) => {
                    failures += 1;
                    debug!(ticker = %ticker, error = %err, "Price request failed");
                    last_failure = Some(err);
                }
            }
        }

        if failures == tickers.len() {
            return Err(PriceError::Network(
                last_failure.unwrap_or_else(|| "no response".to_string()),
            ));
        }
        if failures > 0 {
            warn!(failed = failures, "Some price requests got no usable response");
        }

        info!(priced = quotes.len(), requested = tickers.len(), "Fetched price data");
        Ok(quotes)
    }
}

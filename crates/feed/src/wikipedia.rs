use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use sp500_core::config::SourceConfig;
use sp500_core::membership::entity::Constituent;
use sp500_core::membership::error::SourceError;
use sp500_core::membership::port::MembershipSource;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// 代码列的表头
pub const SYMBOL_COLUMN: &str = "Symbol";
/// 公司名称列的表头
pub const SECURITY_COLUMN: &str = "Security";
/// 行业列的表头
pub const SECTOR_COLUMN: &str = "GICS Sector";

/// # Summary
/// Wikipedia "List of S&P 500 companies" 页面的成分股名单源实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，超时由配置决定。
/// - 表格结构按列名校验，不依赖列的位置。
#[derive(Clone)]
pub struct WikipediaSource {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 名单页面地址
    url: String,
    /// 请求超时，用于生成超时错误信息
    timeout: Duration,
}

impl WikipediaSource {
    /// # Summary
    /// 创建一个新的 WikipediaSource 实例。
    ///
    /// # Logic
    /// 1. 按配置设置请求超时。
    /// 2. 设置伪装浏览器 Header (User-Agent)，Wikipedia 会拒绝默认客户端标识。
    ///
    /// # Arguments
    /// * `config`: 名单源配置。
    ///
    /// # Returns
    /// 返回初始化后的 WikipediaSource，HTTP 客户端构建失败时返回 `SourceError::Network`。
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            timeout: config.timeout(),
        })
    }

    fn map_request_error(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.timeout)
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl MembershipSource for WikipediaSource {
    /// # Summary
    /// 下载名单页面并解析成分股表格。
    ///
    /// # Logic
    /// 1. GET 名单页面，非 2xx 状态视为不可用。
    /// 2. 读取完整文本后交给 `parse_constituents` 做结构化解析。
    async fn fetch_constituents(&self) -> Result<Vec<Constituent>, SourceError> {
        info!(url = %self.url, "Fetching S&P 500 constituents");

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if !resp.status().is_success() {
            return Err(SourceError::Network(format!("HTTP {}", resp.status())));
        }

        let body = resp.text().await.map_err(|e| self.map_request_error(e))?;
        let constituents = parse_constituents(&body)?;

        info!(count = constituents.len(), "Fetched S&P 500 constituents");
        Ok(constituents)
    }
}

/// # Summary
/// 从名单页面 HTML 中解析成分股列表。
///
/// # Logic
/// 1. 优先选取 `id="constituents"` 的表格，否则取第一个 `wikitable`。
/// 2. 在表头行中按列名定位代码、名称、行业三列，任何一列缺失即报错。
/// 3. 逐行提取单元格文本，跳过空代码行，按代码去重并保留首次出现的行。
///
/// # Arguments
/// * `html`: 页面 HTML 文本。
///
/// # Returns
/// 有序成分股列表；结构不符或没有任何数据行时返回 `SourceError`。
pub fn parse_constituents(html: &str) -> Result<Vec<Constituent>, SourceError> {
    let document = Html::parse_document(html);
    let by_id = selector("table#constituents")?;
    let wikitable = selector("table.wikitable")?;
    let row_sel = selector("tr")?;
    let header_sel = selector("th")?;
    let cell_sel = selector("td")?;

    let table = document
        .select(&by_id)
        .next()
        .or_else(|| document.select(&wikitable).next())
        .ok_or(SourceError::TableNotFound)?;

    let mut rows = table.select(&row_sel);
    let headers: Vec<String> = rows
        .by_ref()
        .map(|row| row.select(&header_sel).map(header_text).collect::<Vec<_>>())
        .find(|cells| !cells.is_empty())
        .ok_or_else(|| SourceError::MissingColumns(required_columns()))?;

    let position = |name: &str| headers.iter().position(|h| h == name);
    let (symbol_idx, security_idx, sector_idx) = match (
        position(SYMBOL_COLUMN),
        position(SECURITY_COLUMN),
        position(SECTOR_COLUMN),
    ) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => {
            let missing = required_columns()
                .into_iter()
                .filter(|name| position(name).is_none())
                .collect();
            return Err(SourceError::MissingColumns(missing));
        }
    };

    let mut seen = HashSet::new();
    let mut constituents = Vec::new();
    for row in rows {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        let (Some(ticker), Some(company_name), Some(sector)) = (
            cells.get(symbol_idx),
            cells.get(security_idx),
            cells.get(sector_idx),
        ) else {
            continue;
        };
        if ticker.is_empty() {
            continue;
        }
        if !seen.insert(ticker.clone()) {
            debug!(ticker = %ticker, "Duplicate ticker in constituents table, keeping first row");
            continue;
        }
        constituents.push(Constituent::new(ticker, company_name, sector));
    }

    if constituents.is_empty() {
        return Err(SourceError::Empty);
    }
    Ok(constituents)
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("invalid selector {css}: {e}")))
}

fn required_columns() -> Vec<String> {
    vec![
        SYMBOL_COLUMN.to_string(),
        SECURITY_COLUMN.to_string(),
        SECTOR_COLUMN.to_string(),
    ]
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

// 表头可能带脚注，如 "Date added[3]"
fn header_text(cell: ElementRef<'_>) -> String {
    let text = cell_text(cell);
    match text.find('[') {
        Some(idx) => text[..idx].trim().to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table class="wikitable sortable" id="constituents">
          <tbody>
            <tr><th>Symbol</th><th>Security</th><th>GICS Sector</th><th>Date added[2]</th></tr>
            <tr><td><a href="/q/MMM">MMM</a></td><td><a>3M</a></td><td>Industrials</td><td>1957-03-04</td></tr>
            <tr><td>BRK.B</td><td>Berkshire Hathaway</td><td>Financials</td><td>2010-02-16</td></tr>
            <tr><td>MMM</td><td>3M duplicate</td><td>Industrials</td><td>1957-03-04</td></tr>
          </tbody>
        </table>
        <table class="wikitable"><tr><th>Date</th><th>Added</th></tr></table>
        </body></html>
    "#;

    #[test]
    fn test_parses_rows_in_order_and_dedupes() {
        let rows = parse_constituents(PAGE).unwrap();
        assert_eq!(
            rows,
            vec![
                Constituent::new("MMM", "3M", "Industrials"),
                Constituent::new("BRK.B", "Berkshire Hathaway", "Financials"),
            ]
        );
    }

    #[test]
    fn test_columns_are_located_by_name() {
        let page = r#"<table class="wikitable">
            <tr><th>GICS Sector</th><th>Symbol</th><th>Security</th></tr>
            <tr><td>Energy</td><td>XOM</td><td>ExxonMobil</td></tr>
        </table>"#;
        let rows = parse_constituents(page).unwrap();
        assert_eq!(rows, vec![Constituent::new("XOM", "ExxonMobil", "Energy")]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let page = r#"<table class="wikitable">
            <tr><th>Symbol</th><th>Security</th></tr>
            <tr><td>XOM</td><td>ExxonMobil</td></tr>
        </table>"#;
        match parse_constituents(page) {
            Err(SourceError::MissingColumns(cols)) => assert_eq!(cols, vec!["GICS Sector"]),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_no_table_and_empty_table() {
        assert!(matches!(
            parse_constituents("<html><p>maintenance</p></html>"),
            Err(SourceError::TableNotFound)
        ));

        let empty = r#"<table id="constituents">
            <tr><th>Symbol</th><th>Security</th><th>GICS Sector</th></tr>
        </table>"#;
        assert!(matches!(parse_constituents(empty), Err(SourceError::Empty)));
    }
}

use std::time::Duration;
use thiserror::Error;

/// # Summary
/// 成分股名单源错误枚举。
/// 所有变体在同步周期中统一视为 `SourceUnavailable`，周期在任何写入发生前中止。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum SourceError {
    /// 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    /// 请求超时
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// 文档内容无法解析
    #[error("Parse error: {0}")]
    Parse(String),
    /// 文档中找不到成分股表格
    #[error("Constituents table not found")]
    TableNotFound,
    /// 表头缺少必需的列
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// 表格存在但没有任何有效数据行
    #[error("No constituents found")]
    Empty,
}

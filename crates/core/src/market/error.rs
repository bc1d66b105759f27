use std::time::Duration;
use thiserror::Error;

/// # Summary
/// 价格源批次级错误枚举。
/// 只在整个批次都无法获取时返回，同步周期将其降级为 `PriceSourceUnavailable` 警告。
///
/// # Invariants
/// - 单个代码无数据不是错误，该代码只会从结果中缺席。
#[derive(Error, Debug)]
pub enum PriceError {
    /// 价格源不可用：所有请求都没有拿到可用响应 (传输失败或 5xx/429/401/403)
    #[error("Network error: {0}")]
    Network(String),
    /// 整个批次超出时限
    #[error("Batch timed out after {0:?}")]
    Timeout(Duration),
    /// 请求参数不合法，例如回看窗口不足两个交易日
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

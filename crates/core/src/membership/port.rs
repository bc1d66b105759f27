use crate::membership::entity::Constituent;
use crate::membership::error::SourceError;
use async_trait::async_trait;

/// # Summary
/// 指数成分股名单源接口。
///
/// # Invariants
/// - 只读：除网络请求外不得产生任何副作用。
/// - 返回顺序即名单源中的顺序，`ticker` 在批次内唯一。
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// # Summary
    /// 拉取当前的指数成分股名单。
    ///
    /// # Logic
    /// 1. 请求外部名单文档 (受调用方配置的超时约束)。
    /// 2. 校验表格结构，按列名定位代码、名称、行业列。
    /// 3. 逐行提取并按代码去重，保留首次出现的行。
    ///
    /// # Returns
    /// 成功返回有序成分股列表；网络失败、超时或结构不符时返回 `SourceError`。
    async fn fetch_constituents(&self) -> Result<Vec<Constituent>, SourceError>;
}

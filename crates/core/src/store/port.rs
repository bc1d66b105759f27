use super::entity::{StockRecord, StockUpsert, Upserted};
use super::error::StoreError;
use async_trait::async_trait;

/// # Summary
/// 快照存储接口，负责 `StockRecord` 表的持久化与读取。
///
/// # Invariants
/// - 所有写操作必须经由 `begin` 打开的事务进行，保证整批写入的原子性。
/// - 读接口只返回已提交的数据。
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// # Summary
    /// 开启一个写事务。
    ///
    /// # Logic
    /// 1. 从连接池取出一条连接并执行 `BEGIN`。
    /// 2. 返回的事务句柄在 `commit` 前被丢弃时自动回滚。
    ///
    /// # Returns
    /// 成功返回事务句柄。
    async fn begin(&self) -> Result<Box<dyn SnapshotTransaction>, StoreError>;

    /// # Summary
    /// 读取完整快照。
    ///
    /// # Logic
    /// 按 `id` 升序返回全部行。
    ///
    /// # Returns
    /// 快照行列表。
    async fn list_records(&self) -> Result<Vec<StockRecord>, StoreError>;

    /// # Summary
    /// 按代码读取单行。
    ///
    /// # Arguments
    /// * `ticker`: 股票代码 (区分大小写)。
    ///
    /// # Returns
    /// 存在返回 `Some(StockRecord)`，否则返回 `None`。
    async fn get_record(&self, ticker: &str) -> Result<Option<StockRecord>, StoreError>;
}

/// # Summary
/// 快照写事务 (Unit of Work)。
///
/// # Invariants
/// - 事务内的写入在 `commit` 之前对外不可见。
/// - 未提交即被丢弃的事务等同于 `rollback`。
#[async_trait]
pub trait SnapshotTransaction: Send {
    /// # Summary
    /// 按代码定位或新建一行，并整体覆盖名称、行业、价格与更新时间。
    ///
    /// # Logic
    /// 1. 按 `ticker` 查找已有行。
    /// 2. 存在则覆盖除 `id`/`ticker` 外的字段，否则插入新行。
    ///
    /// # Arguments
    /// * `upsert`: 写入请求。
    ///
    /// # Returns
    /// 写入后的行以及是否为新建。
    async fn upsert(&mut self, upsert: &StockUpsert) -> Result<Upserted, StoreError>;

    /// 提交事务
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// 回滚事务
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sp500_core::market::entity::PriceChange;
use sp500_core::store::entity::{StockRecord, StockUpsert, Upserted};
use sp500_core::store::error::StoreError;
use sp500_core::store::port::{SnapshotStore, SnapshotTransaction};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 快照数据库文件名
pub const SNAPSHOT_DB: &str = "snapshot.db";

/// 查询快照行时的列顺序，与 `StockRow` 对应
const SELECT_COLUMNS: &str =
    "id, ticker, company_name, sector, current_price, change_percent, last_updated";

type StockRow = (
    i64,
    String,
    String,
    String,
    Option<f64>,
    Option<f64>,
    DateTime<Utc>,
);

/// SnapshotStore 的 SQLite 实现。
///
/// # Summary
/// 在 `data_dir/snapshot.db` 中维护 `stocks` 表，每个代码一行。
///
/// # Invariants
/// * `ticker` 列带唯一约束，价格两列由 CHECK 约束保证同空同有。
/// * 使用 WAL 日志模式，读 API 在同步事务进行时仍可读取已提交快照。
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    /// 打开 (或创建) 快照数据库并初始化表结构。
    ///
    /// # Logic
    /// 1. 确保数据目录存在。
    /// 2. 配置 SQLite 连接选项，开启 `create_if_missing` 与 WAL。
    /// 3. 执行 DDL 初始化 `stocks` 表。
    ///
    /// # Arguments
    /// * `data_dir` - 数据根目录。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或初始化错误。
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = data_dir.as_ref();
        fs::create_dir_all(root).map_err(|e| StoreError::InitError(e.to_string()))?;

        let options = SqliteConnectOptions::new()
            .filename(root.join(SNAPSHOT_DB))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stocks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL UNIQUE,
                company_name TEXT NOT NULL,
                sector TEXT NOT NULL,
                current_price REAL,
                change_percent REAL,
                last_updated DATETIME NOT NULL,
                CHECK ((current_price IS NULL) = (change_percent IS NULL))
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

        Ok(Self { pool })
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn into_record(row: StockRow) -> StockRecord {
    let price = match (row.4, row.5) {
        (Some(current_price), Some(change_percent)) => Some(PriceChange {
            current_price,
            change_percent,
        }),
        _ => None,
    };
    StockRecord {
        id: row.0,
        ticker: row.1,
        company_name: row.2,
        sector: row.3,
        price,
        last_updated: row.6,
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn begin(&self) -> Result<Box<dyn SnapshotTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;
        Ok(Box::new(SqliteSnapshotTransaction { tx }))
    }

    /// # Summary
    /// 读取完整快照。
    ///
    /// # Logic
    /// 查询 `stocks` 表并按 `id` 升序返回。
    async fn list_records(&self) -> Result<Vec<StockRecord>, StoreError> {
        let rows = sqlx::query_as::<_, StockRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM stocks ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(into_record).collect())
    }

    async fn get_record(&self, ticker: &str) -> Result<Option<StockRecord>, StoreError> {
        let row = sqlx::query_as::<_, StockRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM stocks WHERE ticker = ?"
        ))
        .bind(ticker)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(into_record))
    }
}

/// # Summary
/// 基于 `sqlx::Transaction` 的快照写事务。
///
/// # Invariants
/// * 句柄被丢弃而未提交时，`sqlx` 会在连接归还连接池前回滚。
pub struct SqliteSnapshotTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl SnapshotTransaction for SqliteSnapshotTransaction {
    /// # Summary
    /// 按代码定位或新建一行并整体覆盖。
    ///
    /// # Logic
    /// 1. 在事务内按 `ticker` 查询已有行的 `id`。
    /// 2. 命中则 `UPDATE` 名称、行业、价格与更新时间；否则 `INSERT` 新行。
    /// 3. 回读写入后的行。
    async fn upsert(&mut self, upsert: &StockUpsert) -> Result<Upserted, StoreError> {
        let current_price = upsert.price.map(|p| p.current_price);
        let change_percent = upsert.price.map(|p| p.change_percent);

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM stocks WHERE ticker = ?")
            .bind(&upsert.ticker)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?;

        let (id, created) = match existing {
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE stocks
                    SET company_name = ?, sector = ?, current_price = ?, change_percent = ?, last_updated = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&upsert.company_name)
                .bind(&upsert.sector)
                .bind(current_price)
                .bind(change_percent)
                .bind(upsert.updated_at)
                .bind(id)
                .execute(&mut *self.tx)
                .await
                .map_err(db_err)?;
                (id, false)
            }
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO stocks (ticker, company_name, sector, current_price, change_percent, last_updated)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&upsert.ticker)
                .bind(&upsert.company_name)
                .bind(&upsert.sector)
                .bind(current_price)
                .bind(change_percent)
                .bind(upsert.updated_at)
                .execute(&mut *self.tx)
                .await
                .map_err(db_err)?;
                (result.last_insert_rowid(), true)
            }
        };

        let row = sqlx::query_as::<_, StockRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM stocks WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;

        debug!(ticker = %upsert.ticker, id, created, "Upserted stock record");
        Ok(Upserted {
            record: into_record(row),
            created,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.tx
            .commit()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.tx
            .rollback()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))
    }
}

use crate::change::{PriceFault, compute_change};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sp500_core::common::clock::Clock;
use sp500_core::market::entity::{PriceChange, PriceQuote};
use sp500_core::market::port::PriceProvider;
use sp500_core::membership::entity::Constituent;
use sp500_core::membership::error::SourceError;
use sp500_core::membership::port::MembershipSource;
use sp500_core::store::entity::StockUpsert;
use sp500_core::store::error::StoreError;
use sp500_core::store::port::{SnapshotStore, SnapshotTransaction};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// # Summary
/// 同步周期的致命错误。出现任一错误时，本周期不会留下任何已提交的写入。
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Membership source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Sync cycle cancelled")]
    Cancelled,
}

/// # Summary
/// 同步周期状态机。
///
/// # Invariants
/// - 正常路径：`FetchingMembership → FetchingPrices → Upserting → Done`。
/// - `Aborted` 为终态，进入时数据库中没有本周期的任何已提交写入。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    FetchingMembership,
    FetchingPrices,
    Upserting,
    Done,
    Aborted,
}

/// # Summary
/// 非致命问题，随周期摘要一并返回给调用方。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncWarning {
    /// 整个价格源不可用，本周期所有代码的价格字段均为空
    PriceSourceUnavailable { reason: String },
    /// 单个代码的价格数据故障
    PriceFault { ticker: String, fault: PriceFault },
}

/// 周期结果分类，决定调用方的退出码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    PartialSuccess,
}

/// # Summary
/// 一次成功提交的同步周期摘要。
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// 写入的代码数 (名单行数)
    pub processed: usize,
    /// 其中新建的行数
    pub created: usize,
    /// 写入了价格的代码数
    pub priced: usize,
    /// 价格字段为空的代码数
    pub price_skipped: usize,
    pub warnings: Vec<SyncWarning>,
}

impl SyncSummary {
    pub fn outcome(&self) -> SyncOutcome {
        if self.warnings.is_empty() {
            SyncOutcome::Success
        } else {
            SyncOutcome::PartialSuccess
        }
    }
}

/// # Summary
/// 快照对账器：同步周期的应用服务。
/// 编译期仅依赖 `sp500-core` 中的 Trait 定义，所有具体实现通过构造函数注入。
///
/// # Invariants
/// - 同一实例上的周期互斥执行，重叠的调用按到达顺序排队。
/// - Upserting 阶段的全部写入位于同一事务，要么全部提交，要么全部回滚。
pub struct Reconciler {
    membership: Arc<dyn MembershipSource>,
    prices: Arc<dyn PriceProvider>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    // 价格回看的交易日数
    lookback_days: u32,
    // 单写者锁
    cycle_lock: Mutex<()>,
    state: watch::Sender<SyncState>,
}

impl Reconciler {
    /// # Summary
    /// 创建 Reconciler 实例。
    ///
    /// # Arguments
    /// * `membership` - 成分股名单源。
    /// * `prices` - 价格源。
    /// * `store` - 快照存储。
    /// * `clock` - 提供 `last_updated` 的时钟。
    /// * `lookback_days` - 价格回看的交易日数。
    pub fn new(
        membership: Arc<dyn MembershipSource>,
        prices: Arc<dyn PriceProvider>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        lookback_days: u32,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            membership,
            prices,
            store,
            clock,
            lookback_days,
            cycle_lock: Mutex::new(()),
            state,
        }
    }

    /// 订阅状态机的当前状态
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// 不可取消地执行一次同步周期
    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        self.run_cycle(&CancellationToken::new()).await
    }

    /// # Summary
    /// 执行一次完整的同步周期。
    ///
    /// # Logic
    /// 1. 获取单写者锁，已有周期在跑时排队等待。
    /// 2. FetchingMembership：名单源失败即中止，不产生任何写入。
    /// 3. FetchingPrices：价格源整体不可用时降级为警告，继续以空价格写入名单。
    /// 4. 开启事务前检查取消信号，已取消则中止且不写入。
    /// 5. Upserting：在单一事务中按名单顺序逐个写入，单个代码的价格故障只记警告。
    /// 6. Done：提交事务并返回摘要。
    ///
    /// # Arguments
    /// * `cancel` - 取消令牌；Upserting 期间取消会整体回滚。
    ///
    /// # Returns
    /// 成功返回周期摘要，致命错误返回 `SyncError`。
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<SyncSummary, SyncError> {
        let _guard = match self.cycle_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                info!("Another sync cycle is running, waiting for it to finish");
                self.cycle_lock.lock().await
            }
        };

        let result = self.run_locked(cancel).await;
        match &result {
            Ok(summary) => {
                self.state.send_replace(SyncState::Done);
                info!(
                    processed = summary.processed,
                    created = summary.created,
                    priced = summary.priced,
                    price_skipped = summary.price_skipped,
                    warnings = summary.warnings.len(),
                    "Sync cycle committed"
                );
            }
            Err(e) => {
                self.state.send_replace(SyncState::Aborted);
                error!(error = %e, "Sync cycle aborted");
            }
        }
        result
    }

    async fn run_locked(&self, cancel: &CancellationToken) -> Result<SyncSummary, SyncError> {
        let started_at = self.clock.now();

        self.enter(SyncState::FetchingMembership);
        let constituents = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            fetched = self.membership.fetch_constituents() => {
                fetched.map_err(SyncError::SourceUnavailable)?
            }
        };

        self.enter(SyncState::FetchingPrices);
        let tickers: Vec<String> = constituents.iter().map(|c| c.ticker.clone()).collect();
        let mut warnings = Vec::new();
        let quotes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SyncError::Cancelled),
            fetched = self.prices.fetch_quotes(&tickers, self.lookback_days) => match fetched {
                Ok(quotes) => Some(quotes),
                Err(e) => {
                    warn!(error = %e, "Price source unavailable, continuing without prices");
                    warnings.push(SyncWarning::PriceSourceUnavailable {
                        reason: e.to_string(),
                    });
                    None
                }
            },
        };

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        self.enter(SyncState::Upserting);
        let mut tx = self.store.begin().await?;
        let written = self
            .upsert_all(tx.as_mut(), &constituents, quotes.as_ref(), &mut warnings, cancel)
            .await;
        match written {
            Ok((created, priced)) => {
                tx.commit().await?;
                Ok(SyncSummary {
                    started_at,
                    finished_at: self.clock.now(),
                    processed: constituents.len(),
                    created,
                    priced,
                    price_skipped: constituents.len() - priced,
                    warnings,
                })
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed, relying on connection drop");
                }
                Err(e)
            }
        }
    }

    /// # Summary
    /// 在事务内逐个写入名单行。
    ///
    /// # Returns
    /// (新建行数, 写入价格的行数)
    async fn upsert_all(
        &self,
        tx: &mut dyn SnapshotTransaction,
        constituents: &[Constituent],
        quotes: Option<&HashMap<String, PriceQuote>>,
        warnings: &mut Vec<SyncWarning>,
        cancel: &CancellationToken,
    ) -> Result<(usize, usize), SyncError> {
        let mut created = 0;
        let mut priced = 0;

        for constituent in constituents {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let price = match quotes {
                Some(quotes) => match price_for(&constituent.ticker, quotes) {
                    Ok(change) => Some(change),
                    Err(fault) => {
                        warn!(ticker = %constituent.ticker, %fault, "Skipping price update");
                        warnings.push(SyncWarning::PriceFault {
                            ticker: constituent.ticker.clone(),
                            fault,
                        });
                        None
                    }
                },
                None => None,
            };

            let upserted = tx
                .upsert(&StockUpsert {
                    ticker: constituent.ticker.clone(),
                    company_name: constituent.company_name.clone(),
                    sector: constituent.sector.clone(),
                    price,
                    updated_at: self.clock.now(),
                })
                .await?;

            if upserted.created {
                created += 1;
            }
            if price.is_some() {
                priced += 1;
            }
        }

        Ok((created, priced))
    }

    fn enter(&self, state: SyncState) {
        info!(?state, "Sync cycle state");
        self.state.send_replace(state);
    }
}

fn price_for(ticker: &str, quotes: &HashMap<String, PriceQuote>) -> Result<PriceChange, PriceFault> {
    let quote = quotes.get(ticker).ok_or(PriceFault::Missing)?;
    if quote.ticker != ticker {
        return Err(PriceFault::Malformed {
            reason: format!("quote belongs to {}", quote.ticker),
        });
    }
    compute_change(quote)
}

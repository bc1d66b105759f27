//! # `sp500-store` - 持久化层
//!
//! 基于 `sqlx` + SQLite 的快照表实现，对外只暴露 `sp500-core` 中的 `SnapshotStore` 契约。

pub mod snapshot;

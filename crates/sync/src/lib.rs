//! # `sp500-sync` - 同步周期
//!
//! - [`change`]：由两个收盘价计算最新价与日涨跌幅
//! - [`reconciler`]：拉取名单与价格，在单个事务内对账写入快照表

pub mod change;
pub mod reconciler;

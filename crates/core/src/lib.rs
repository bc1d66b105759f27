//! # `sp500-core` - 领域核心
//!
//! 定义 S&P 500 快照服务的实体、错误类型与端口 (Port) 契约。
//! 本 crate 不依赖任何具体实现，抓取、存储、同步等实现 crate 均只依赖这里的 Trait。

pub mod config;

pub mod common {
    pub mod clock;
}

pub mod membership {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod store {
    pub mod entity;
    pub mod error;
    pub mod port;
}

#[cfg(feature = "test-utils")]
pub mod testing;

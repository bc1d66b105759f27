//! # `sp500-feed` - 上游数据源客户端
//!
//! - [`wikipedia::WikipediaSource`]：成分股名单源 (`MembershipSource`)
//! - [`yahoo::YahooProvider`]：日线收盘价源 (`PriceProvider`)

pub mod wikipedia;
pub mod yahoo;

//! # `sp500-api` - 快照只读 HTTP API
//!
//! 使用 `axum` 构建路由与控制器，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - 接收来自前端或浏览器的 HTTP 请求
//! - 通过 `SnapshotStore` 端口只读地查询快照表
//! - 将领域模型转换为 DTO 返回给前端，缺失的价格字段输出为显式的 `null`

pub mod types;
pub mod error;
pub mod routes;
pub mod server;

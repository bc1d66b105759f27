//! # 快照路由控制器
//!
//! 实现 `/api/stocks/` 路径下的只读 REST 接口，数据完全来自最近一次提交的同步周期。

use axum::extract::{Path, State};
use axum::Json;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ApiErrorResponse, StockRecordResponse};

/// 获取完整快照
///
/// 按 `id` 升序返回全部行；没有价格的行 `currentPrice` 与 `changePercent` 为 `null`。
#[utoipa::path(
    get,
    path = "/api/stocks/",
    tag = "快照 (Stocks)",
    responses(
        (status = 200, description = "成功获取快照", body = Vec<StockRecordResponse>),
        (status = 500, description = "存储不可用", body = ApiErrorResponse)
    )
)]
pub async fn list_stocks(
    State(state): State<AppState>,
) -> Result<Json<Vec<StockRecordResponse>>, ApiError> {
    let records = state.store.list_records().await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// 按代码获取单行快照
#[utoipa::path(
    get,
    path = "/api/stocks/{ticker}",
    tag = "快照 (Stocks)",
    params(
        ("ticker" = String, Path, description = "股票代码，大小写敏感")
    ),
    responses(
        (status = 200, description = "成功获取该代码的快照", body = StockRecordResponse),
        (status = 404, description = "快照中没有该代码", body = ApiErrorResponse),
        (status = 500, description = "存储不可用", body = ApiErrorResponse)
    )
)]
pub async fn get_stock(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<StockRecordResponse>, ApiError> {
    let record = state
        .store
        .get_record(&ticker)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Ticker {ticker} is not in the snapshot")))?;
    Ok(Json(record.into()))
}

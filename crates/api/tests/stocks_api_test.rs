use chrono::{TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::Value;
use sp500_api::server::{AppState, build_router};
use sp500_api::types::StockRecordResponse;
use sp500_core::market::entity::PriceChange;
use sp500_core::store::entity::StockUpsert;
use sp500_core::store::port::{SnapshotStore, SnapshotTransaction};
use sp500_store::snapshot::SqliteSnapshotStore;
use std::sync::Arc;
use tokio::net::TcpListener;

fn init_tls() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {}
}

// 帮助函数：写入一批快照行后在随机端口启动测试服务器
async fn spawn_test_server(rows: &[StockUpsert]) -> (String, tempfile::TempDir) {
    init_tls();
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Arc::new(SqliteSnapshotStore::new(tmp_dir.path()).await.unwrap());

    let mut tx = store.begin().await.unwrap();
    for row in rows {
        tx.upsert(row).await.unwrap();
    }
    tx.commit().await.unwrap();

    let router = build_router(AppState { store });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://127.0.0.1:{}", port), tmp_dir)
}

fn upsert(ticker: &str, name: &str, sector: &str, price: Option<(f64, f64)>) -> StockUpsert {
    StockUpsert {
        ticker: ticker.to_string(),
        company_name: name.to_string(),
        sector: sector.to_string(),
        price: price.map(|(current_price, change_percent)| PriceChange {
            current_price,
            change_percent,
        }),
        updated_at: Utc.with_ymd_and_hms(2026, 3, 3, 21, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_list_returns_snapshot_with_explicit_nulls() {
    let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();

    let (base_url, _tmp) = spawn_test_server(&[
        upsert("AAA", "Alpha Co", "Tech", Some((110.0, 10.0))),
        upsert("BBB", "Beta Co", "Energy", None),
    ])
    .await;

    let res = reqwest::get(format!("{}/api/stocks/", base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);

    // 按 id 升序
    assert_eq!(rows[0]["ticker"], "AAA");
    assert_eq!(rows[0]["companyName"], "Alpha Co");
    assert_eq!(rows[0]["currentPrice"], 110.0);
    assert_eq!(rows[0]["changePercent"], 10.0);
    assert!(rows[0]["id"].as_i64().unwrap() < rows[1]["id"].as_i64().unwrap());

    let bbb = rows[1].as_object().unwrap();
    assert_eq!(bbb["sector"], "Energy");
    assert!(bbb.contains_key("currentPrice") && bbb["currentPrice"].is_null());
    assert!(bbb.contains_key("changePercent") && bbb["changePercent"].is_null());
    assert_eq!(bbb["lastUpdated"], "2026-03-03T21:00:00Z");
}

#[tokio::test]
async fn test_empty_snapshot_is_empty_array() {
    let (base_url, _tmp) = spawn_test_server(&[]).await;

    let res = reqwest::get(format!("{}/api/stocks/", base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rows: Vec<StockRecordResponse> = res.json().await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_single_ticker_lookup() {
    let (base_url, _tmp) =
        spawn_test_server(&[upsert("BRK.B", "Berkshire Hathaway", "Financials", Some((500.0, -1.5)))])
            .await;

    let res = reqwest::get(format!("{}/api/stocks/BRK.B", base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let row: StockRecordResponse = res.json().await.unwrap();
    assert_eq!(row.company_name, "Berkshire Hathaway");
    assert_eq!(row.change_percent, Some(-1.5));

    let res = reqwest::get(format!("{}/api/stocks/brk.b", base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_openapi_document_lists_read_endpoint() {
    let (base_url, _tmp) = spawn_test_server(&[]).await;

    let res = reqwest::get(format!("{}/api-docs/openapi.json", base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let doc: Value = res.json().await.unwrap();
    assert!(doc["paths"].get("/api/stocks/").is_some());
    assert!(doc["paths"].get("/api/stocks/{ticker}").is_some());
}

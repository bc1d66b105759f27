use chrono::{TimeZone, Utc};
use sp500_core::market::entity::PriceChange;
use sp500_core::store::entity::StockUpsert;
use sp500_core::store::port::{SnapshotStore, SnapshotTransaction};
use sp500_store::snapshot::{SNAPSHOT_DB, SqliteSnapshotStore};
use tempfile::tempdir;

fn upsert(ticker: &str, name: &str, price: Option<PriceChange>, day: u32) -> StockUpsert {
    StockUpsert {
        ticker: ticker.to_string(),
        company_name: name.to_string(),
        sector: "Tech".to_string(),
        price,
        updated_at: Utc.with_ymd_and_hms(2026, 3, day, 21, 0, 0).unwrap(),
    }
}

fn price(current_price: f64, change_percent: f64) -> Option<PriceChange> {
    Some(PriceChange {
        current_price,
        change_percent,
    })
}

#[tokio::test]
async fn test_upsert_creates_then_updates_in_place() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let store = SqliteSnapshotStore::new(tmp_dir.path()).await?;
    assert!(tmp_dir.path().join(SNAPSHOT_DB).exists());

    let mut tx = store.begin().await?;
    let first = tx.upsert(&upsert("AAA", "Alpha Co", price(110.0, 10.0), 2)).await?;
    let second = tx.upsert(&upsert("BBB", "Beta Co", None, 2)).await?;
    tx.commit().await?;
    assert!(first.created && second.created);

    let mut tx = store.begin().await?;
    let again = tx.upsert(&upsert("AAA", "Alpha Corp", None, 3)).await?;
    tx.commit().await?;
    assert!(!again.created);
    assert_eq!(again.record.id, first.record.id);

    let records = store.list_records().await?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].ticker, "AAA");
    assert_eq!(records[0].company_name, "Alpha Corp");
    assert_eq!(records[0].current_price(), None);
    assert_eq!(records[0].change_percent(), None);
    assert_eq!(
        records[0].last_updated,
        Utc.with_ymd_and_hms(2026, 3, 3, 21, 0, 0).unwrap()
    );
    assert_eq!(records[1].ticker, "BBB");
    Ok(())
}

#[tokio::test]
async fn test_price_pair_round_trips() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let store = SqliteSnapshotStore::new(tmp_dir.path()).await?;

    let mut tx = store.begin().await?;
    tx.upsert(&upsert("AAA", "Alpha Co", price(110.0, 10.0), 2)).await?;
    tx.commit().await?;

    let record = store.get_record("AAA").await?.expect("record should exist");
    assert_eq!(record.current_price(), Some(110.0));
    assert_eq!(record.change_percent(), Some(10.0));
    assert!(store.get_record("aaa").await?.is_none(), "tickers are case-sensitive");
    Ok(())
}

#[tokio::test]
async fn test_rollback_and_drop_discard_writes() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let store = SqliteSnapshotStore::new(tmp_dir.path()).await?;

    let mut tx = store.begin().await?;
    tx.upsert(&upsert("AAA", "Alpha Co", None, 2)).await?;
    tx.commit().await?;

    let mut tx = store.begin().await?;
    tx.upsert(&upsert("AAA", "Changed", None, 3)).await?;
    tx.upsert(&upsert("CCC", "Gamma Co", None, 3)).await?;
    tx.rollback().await?;

    {
        let mut tx = store.begin().await?;
        tx.upsert(&upsert("DDD", "Delta Co", None, 3)).await?;
        // 未提交即丢弃
    }

    let records = store.list_records().await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].company_name, "Alpha Co");
    Ok(())
}

#[tokio::test]
async fn test_snapshot_survives_reopen() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    {
        let store = SqliteSnapshotStore::new(tmp_dir.path()).await?;
        let mut tx = store.begin().await?;
        tx.upsert(&upsert("AAA", "Alpha Co", price(50.0, -2.5), 2)).await?;
        tx.commit().await?;
    }

    let store = SqliteSnapshotStore::new(tmp_dir.path()).await?;
    let records = store.list_records().await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].change_percent(), Some(-2.5));
    Ok(())
}

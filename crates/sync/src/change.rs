use serde::Serialize;
use sp500_core::market::entity::{DailyClose, PriceChange, PriceQuote};
use thiserror::Error;

/// # Summary
/// 单个代码的价格数据故障。
/// 故障只影响该代码的价格字段，不影响名单字段写入，也不中断整批事务。
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriceFault {
    /// 价格源有响应，但结果中没有这个代码
    #[error("no price data returned")]
    Missing,
    /// 收盘价不足两个
    #[error("insufficient data: {closes} close(s), need 2")]
    InsufficientData { closes: usize },
    /// 收盘价或计算结果不是有限值
    #[error("non-finite price (previous={previous}, current={current})")]
    NonFinite { previous: f64, current: f64 },
    /// 报价结构异常，例如报价归属的代码与请求的代码不符
    #[error("malformed quote: {reason}")]
    Malformed { reason: String },
}

/// # Summary
/// 由报价计算最新价与日涨跌幅。
///
/// # Logic
/// 1. 少于两个收盘价返回 `InsufficientData`。
/// 2. 按日期排序，同日多条只保留最后一条，再取最后两个交易日作为 `previous` 与 `current`。
/// 3. 任一为非有限值返回 `NonFinite`，绝不以 0 或 NaN 代替。
/// 4. `previous > 0` 时按 `(current - previous) / previous * 100` 计算，否则涨跌幅记为 0。
///
/// # Arguments
/// * `quote`: 单个代码的报价序列。
///
/// # Returns
/// 成功返回价格快照，否则返回对应的 `PriceFault`。
pub fn compute_change(quote: &PriceQuote) -> Result<PriceChange, PriceFault> {
    if quote.closes.len() < 2 {
        return Err(PriceFault::InsufficientData {
            closes: quote.closes.len(),
        });
    }

    let mut closes = quote.closes.clone();
    closes.sort_by_key(|c| c.date);
    // 同一交易日重复出现时以最后一条为准
    let mut daily: Vec<DailyClose> = Vec::with_capacity(closes.len());
    for close in closes {
        match daily.last_mut() {
            Some(last) if last.date == close.date => *last = close,
            _ => daily.push(close),
        }
    }

    let (previous, current) = match daily.as_slice() {
        [.., previous, current] => (*previous, *current),
        _ => {
            return Err(PriceFault::InsufficientData {
                closes: daily.len(),
            });
        }
    };

    let non_finite = PriceFault::NonFinite {
        previous: previous.close,
        current: current.close,
    };
    if !previous.close.is_finite() || !current.close.is_finite() {
        return Err(non_finite);
    }

    // previous <= 0 时不做除法，按约定记为 0
    let change_percent = if previous.close > 0.0 {
        (current.close - previous.close) / previous.close * 100.0
    } else {
        0.0
    };
    if !change_percent.is_finite() {
        return Err(non_finite);
    }

    Ok(PriceChange {
        current_price: current.close,
        change_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn quote(closes: &[(u32, f64)]) -> PriceQuote {
        PriceQuote::new(
            "AAA",
            closes
                .iter()
                .map(|&(d, close)| DailyClose { date: day(d), close })
                .collect(),
        )
    }

    #[test]
    fn test_positive_previous_uses_percent_formula() {
        let change = compute_change(&quote(&[(2, 100.0), (3, 110.0)])).unwrap();
        assert_eq!(change.current_price, 110.0);
        assert!((change.change_percent - 10.0).abs() < 1e-9);

        let change = compute_change(&quote(&[(2, 80.0), (3, 60.0)])).unwrap();
        assert!((change.change_percent - -25.0).abs() < 1e-9);
    }

    #[test]
    fn test_uses_two_most_recent_closes_by_date() {
        let change = compute_change(&quote(&[(5, 120.0), (2, 50.0), (4, 100.0)])).unwrap();
        assert_eq!(change.current_price, 120.0);
        assert!((change.change_percent - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_previous_yields_zero_change() {
        let change = compute_change(&quote(&[(2, 0.0), (3, 12.0)])).unwrap();
        assert_eq!(change.change_percent, 0.0);
        assert_eq!(change.current_price, 12.0);

        let change = compute_change(&quote(&[(2, -3.0), (3, 12.0)])).unwrap();
        assert_eq!(change.change_percent, 0.0);
    }

    #[test]
    fn test_non_finite_closes_are_faults() {
        for (prev, cur) in [
            (f64::NAN, 10.0),
            (10.0, f64::NAN),
            (f64::INFINITY, 10.0),
            (10.0, f64::NEG_INFINITY),
        ] {
            let result = compute_change(&quote(&[(2, prev), (3, cur)]));
            assert!(matches!(result, Err(PriceFault::NonFinite { .. })), "{prev} {cur}");
        }
    }

    #[test]
    fn test_overflowing_change_is_a_fault() {
        let result = compute_change(&quote(&[(2, f64::MIN_POSITIVE), (3, f64::MAX)]));
        assert!(matches!(result, Err(PriceFault::NonFinite { .. })));
    }

    #[test]
    fn test_repeated_last_bar_keeps_latest_close_for_the_day() {
        let change = compute_change(&quote(&[(2, 100.0), (3, 104.0), (3, 105.0)])).unwrap();
        assert_eq!(change.current_price, 105.0);
        assert!((change.change_percent - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_data() {
        assert_eq!(
            compute_change(&quote(&[])),
            Err(PriceFault::InsufficientData { closes: 0 })
        );
        assert_eq!(
            compute_change(&quote(&[(3, 10.0)])),
            Err(PriceFault::InsufficientData { closes: 1 })
        );
        assert_eq!(
            compute_change(&quote(&[(3, 10.0), (3, 11.0)])),
            Err(PriceFault::InsufficientData { closes: 1 })
        );
    }
}

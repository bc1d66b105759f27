use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::market::port::MIN_LOOKBACK_DAYS;

/// 成分股名单的默认来源
pub const DEFAULT_SOURCE_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";

/// Yahoo 行情接口的默认根地址
pub const DEFAULT_PRICE_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// 伪装浏览器的 User-Agent，两个上游都会拦截默认的客户端标识
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub price: PriceConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub data_dir: String,
}

/// 成分股名单源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// 价格源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    pub base_url: String,
    /// 回看的交易日数，至少为 2
    pub lookback_days: u32,
    /// 单个请求的超时
    pub timeout_secs: u64,
    /// 整个批次的超时
    pub batch_timeout_secs: u64,
    /// 同时在途的请求数上限
    pub concurrency: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 默认日志过滤级别，RUST_LOG 优先
    pub level: String,
    /// 若设置则额外按天滚动写入该目录
    pub dir: Option<String>,
}

/// 配置校验错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid config `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PriceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }
}

impl AppConfig {
    /// # Summary
    /// 校验配置中的数值约束。
    ///
    /// # Logic
    /// 1. 回看窗口不少于两个交易日。
    /// 2. 所有超时与并发数必须为正。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.price.lookback_days < MIN_LOOKBACK_DAYS {
            return Err(ConfigError::Invalid {
                field: "price.lookback_days",
                reason: format!(
                    "must be at least {MIN_LOOKBACK_DAYS}, got {}",
                    self.price.lookback_days
                ),
            });
        }
        let positives = [
            ("source.timeout_secs", self.source.timeout_secs),
            ("price.timeout_secs", self.price.timeout_secs),
            ("price.batch_timeout_secs", self.price.batch_timeout_secs),
        ];
        for (field, value) in positives {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if self.price.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "price.concurrency",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                data_dir: "data".to_string(),
            },
            source: SourceConfig {
                url: DEFAULT_SOURCE_URL.to_string(),
                timeout_secs: 30,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            price: PriceConfig {
                base_url: DEFAULT_PRICE_BASE_URL.to_string(),
                lookback_days: 5,
                timeout_secs: 10,
                batch_timeout_secs: 300,
                concurrency: 16,
                user_agent: DEFAULT_USER_AGENT.to_string(),
            },
            log: LogConfig {
                level: "info".to_string(),
                dir: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.data_dir, "data");
        assert_eq!(config.price.lookback_days, 5);
        assert!(config.log.dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_short_lookback() {
        let mut config = AppConfig::default();
        config.price.lookback_days = 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { field: "price.lookback_days", .. }
        ));
    }

    #[test]
    fn test_rejects_zero_timeout_and_concurrency() {
        let mut config = AppConfig::default();
        config.source.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.price.concurrency = 0;
        assert!(config.validate().is_err());
    }
}

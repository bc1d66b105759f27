use anyhow::Context;
use config::{Config, Environment, File};
use sp500_core::config::AppConfig;
use std::path::Path;

/// 环境变量前缀，例如 `SP500__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "SP500";

/// # Summary
/// 加载并校验应用配置。
///
/// # Logic
/// 1. 以 `AppConfig::default()` 作为最底层的默认值。
/// 2. 叠加配置文件 (不存在时跳过)。
/// 3. 叠加 `SP500__` 前缀的环境变量，`__` 分隔层级。
/// 4. 反序列化后执行数值校验。
///
/// # Arguments
/// * `path`: 配置文件路径，格式按扩展名推断。
///
/// # Returns
/// 校验通过的配置；任何一层解析失败或校验失败时返回错误。
pub fn load(path: &Path) -> anyhow::Result<AppConfig> {
    let defaults = Config::try_from(&AppConfig::default()).context("serialising default config")?;

    let config: AppConfig = Config::builder()
        .add_source(defaults)
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("loading config from {}", path.display()))?
        .try_deserialize()
        .context("deserialising config")?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.price.lookback_days, 5);
        assert_eq!(config.database.data_dir, "data");
    }

    #[test]
    fn test_file_overrides_defaults_and_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nport = 9100\n\n[price]\nconcurrency = 4").unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.price.concurrency, 4);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[price]\nlookback_days = 1\n").unwrap();
        assert!(load(&bad).is_err());
    }
}

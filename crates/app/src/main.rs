mod logging;
mod settings;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sp500_api::server::{AppState, start_server};
use sp500_core::common::clock::SystemClock;
use sp500_core::config::AppConfig;
use sp500_feed::wikipedia::WikipediaSource;
use sp500_feed::yahoo::YahooProvider;
use sp500_store::snapshot::SqliteSnapshotStore;
use sp500_sync::reconciler::{Reconciler, SyncOutcome};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 成功但带警告的退出码
const EXIT_PARTIAL_SUCCESS: u8 = 2;

#[derive(Parser)]
#[command(
    name = "sp500",
    about = "S&P 500 snapshot: sync constituents and prices, serve the snapshot over HTTP"
)]
struct Cli {
    /// Path to a TOML config file. Missing files fall back to defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the read-only snapshot API until Ctrl-C.
    Serve,
    /// Run one sync cycle and print a JSON summary.
    /// Exit status: 0 success, 2 success with warnings, 1 aborted.
    Sync,
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责加载配置、初始化日志，并按子命令实例化具体实现组件。
///
/// # Logic
/// 1. 解析命令行并加载配置。
/// 2. 初始化全局日志，持有文件写入 guard 至退出。
/// 3. 安装 TLS 加密后端。
/// 4. 分派到 `serve` 或 `sync`。
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("sp500: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = settings::load(&cli.config)?;
    let _log_guard = logging::init(&config.log)?;
    install_crypto_provider();

    match cli.command {
        Commands::Serve => serve(&config).await,
        Commands::Sync => sync(&config).await,
    }
}

// reqwest 与 sqlx 共用进程级的 rustls 后端
fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("TLS crypto provider already installed");
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<SqliteSnapshotStore>> {
    let store = SqliteSnapshotStore::new(&config.database.data_dir)
        .await
        .with_context(|| format!("opening snapshot store in {}", config.database.data_dir))?;
    Ok(Arc::new(store))
}

async fn serve(config: &AppConfig) -> anyhow::Result<ExitCode> {
    let store = open_store(config).await?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    start_server(AppState { store }, &bind_addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received. Exiting...");
    })
    .await
    .with_context(|| format!("serving on {bind_addr}"))?;

    Ok(ExitCode::SUCCESS)
}

/// # Summary
/// 执行一次同步周期并把摘要以 JSON 打印到 stdout。
///
/// # Logic
/// 1. 实例化名单源、价格源、快照存储与系统时钟，注入 Reconciler。
/// 2. Ctrl-C 触发取消令牌，进行中的周期中止或整体回滚。
/// 3. 根据周期结果映射退出码。
async fn sync(config: &AppConfig) -> anyhow::Result<ExitCode> {
    let membership = Arc::new(WikipediaSource::new(&config.source)?);
    let prices = Arc::new(YahooProvider::new(&config.price)?);
    let store = open_store(config).await?;
    let reconciler = Reconciler::new(
        membership,
        prices,
        store,
        Arc::new(SystemClock),
        config.price.lookback_days,
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling sync cycle");
            interrupt.cancel();
        }
    });

    let (report, code) = match reconciler.run_cycle(&cancel).await {
        Ok(summary) => {
            let outcome = summary.outcome();
            let report = serde_json::json!({
                "outcome": match outcome {
                    SyncOutcome::Success => "success",
                    SyncOutcome::PartialSuccess => "partial_success",
                },
                "summary": summary,
            });
            let code = match outcome {
                SyncOutcome::Success => ExitCode::SUCCESS,
                SyncOutcome::PartialSuccess => ExitCode::from(EXIT_PARTIAL_SUCCESS),
            };
            (report, code)
        }
        Err(e) => (
            serde_json::json!({ "outcome": "aborted", "error": e.to_string() }),
            ExitCode::FAILURE,
        ),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(code)
}

//! CLI Interface Module
//!
//! 回放工具：把快照和增量事件流灌入选定的订单簿实现，报告耗时和盘口。
//! 事件可以来自合成数据生成器，也可以来自文件（快照为 JSON，增量为 JSON Lines）。
//!
//! ## Responsibilities
//! - Parse command-line arguments
//! - Load or generate events
//! - Replay them through the selected variant and print a summary

use crate::domain::error::BookError;
use crate::domain::events::{SnapshotEvent, UpdateEvent};
use crate::domain::orderbook::{
    HeapOrderBook, OrderBook, PackedOrderBook, ReferenceOrderBook, ThreadSafeOrderBook,
};
use crate::domain::scale::TickScale;
use crate::interfaces::tools::DataGenerator;
use crate::shared::metrics::METRICS;
use clap::Parser;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// 订单簿回放命令行配置
#[derive(Parser, Debug, Clone)]
#[command(name = "price-point-book")]
#[command(version = "0.1.0")]
#[command(about = "价格档位订单簿回放与基准工具", long_about = None)]
pub struct CliConfig {
    /// 订单簿实现
    #[arg(short = 'v', long, default_value = "tree", value_parser = ["tree", "heap", "map", "concurrent"])]
    pub variant: String,

    /// 交易对
    #[arg(short = 's', long, default_value = "BNBBTC")]
    pub symbol: String,

    /// 合成快照的价位数
    #[arg(short = 'n', long, default_value_t = 1024)]
    pub levels: usize,

    /// 合成增量事件数
    #[arg(short = 'u', long, default_value_t = 10_000)]
    pub updates: usize,

    /// 每个事件重新报价的价位比例
    #[arg(long, default_value_t = 0.25)]
    pub update_ratio: f64,

    /// 每个事件删除的价位比例
    #[arg(long, default_value_t = 0.0625)]
    pub remove_ratio: f64,

    /// 随机种子
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// 价格/数量的比例因子。合成数据的价格步长是 1e-5，默认取 1e5 使每个价位各占一个tick
    #[arg(long, default_value_t = 100_000)]
    pub scale_factor: u32,

    /// 并发实现的读线程数（0表示自动检测CPU核心数）
    #[arg(short = 'r', long, default_value_t = 0)]
    pub readers: usize,

    /// 快照文件 (JSON)
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// 增量事件文件 (JSON Lines)
    #[arg(long)]
    pub updates_file: Option<PathBuf>,

    /// 日志级别
    #[arg(short = 'l', long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,

    /// 结束时打印 Prometheus 指标
    #[arg(long, default_value_t = false)]
    pub metrics: bool,

    /// 仅显示配置不回放（用于调试）
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path} (line {line}): {source}")]
    Json {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Book(#[from] BookError),

    #[error("scale factor must be positive")]
    InvalidScale,
}

/// 回放结果
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub variant: String,
    pub initialize: Duration,
    pub replay: Duration,
    pub applied: usize,
    pub ignored: usize,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub bid_levels: usize,
    pub ask_levels: usize,
    /// 并发实现中读线程完成的读取次数
    pub reads: u64,
}

impl ReplayReport {
    pub fn updates_per_second(&self) -> f64 {
        let secs = self.replay.as_secs_f64();
        if secs > 0.0 {
            self.applied as f64 / secs
        } else {
            0.0
        }
    }
}

/// Runs the CLI application
pub fn run() -> ExitCode {
    let config = CliConfig::parse();

    init_logging(&config.log_level);

    tracing::info!("订单簿回放启动");
    tracing::debug!("配置: {:?}", config);

    print_config(&config);
    if config.dry_run {
        println!("\nDry-run 模式 - 不回放");
        return ExitCode::SUCCESS;
    }

    match run_with(&config) {
        Ok(report) => {
            print_report(&report);
            if config.metrics {
                println!("\n{}", METRICS.export());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("回放失败: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// 加载/生成事件并回放，不初始化日志
pub fn run_with(config: &CliConfig) -> Result<ReplayReport, CliError> {
    if config.scale_factor == 0 {
        return Err(CliError::InvalidScale);
    }
    let scale = TickScale::new(config.scale_factor);
    let generator = DataGenerator::new(config.levels, config.seed);

    let snapshot = match &config.snapshot {
        Some(path) => load_snapshot(path)?,
        None => generator.snapshot(),
    };
    let updates = match &config.updates_file {
        Some(path) => load_updates(path)?,
        None => generator.updates(
            &config.symbol,
            config.updates,
            generator.count_for_ratio(config.update_ratio),
            generator.count_for_ratio(config.remove_ratio),
        ),
    };
    tracing::info!(
        symbol = %config.symbol,
        bids = snapshot.bids.len(),
        asks = snapshot.asks.len(),
        updates = updates.len(),
        "events ready"
    );

    let report = match config.variant.as_str() {
        "heap" => replay(
            "heap",
            &mut HeapOrderBook::with_scale(scale),
            &config.symbol,
            &snapshot,
            &updates,
        )?,
        "map" => replay(
            "map",
            &mut ReferenceOrderBook::with_scale(scale),
            &config.symbol,
            &snapshot,
            &updates,
        )?,
        "concurrent" => {
            let readers = if config.readers == 0 {
                let cpus = num_cpus::get();
                tracing::info!("自动检测到 {} 个CPU核心", cpus);
                cpus
            } else {
                config.readers
            };
            replay_concurrent(scale, readers, &config.symbol, &snapshot, &updates)?
        }
        _ => replay(
            "tree",
            &mut PackedOrderBook::with_scale(scale),
            &config.symbol,
            &snapshot,
            &updates,
        )?,
    };
    Ok(report)
}

/// 单线程回放
pub fn replay<B: OrderBook>(
    variant: &str,
    book: &mut B,
    symbol: &str,
    snapshot: &SnapshotEvent,
    updates: &[UpdateEvent],
) -> Result<ReplayReport, BookError> {
    let start = Instant::now();
    book.initialize(symbol, snapshot)?;
    let initialize = start.elapsed();

    let start = Instant::now();
    let mut applied = 0;
    for event in updates {
        if book.update(event)? {
            applied += 1;
        }
    }
    let replay = start.elapsed();

    Ok(ReplayReport {
        variant: variant.to_owned(),
        initialize,
        replay,
        applied,
        ignored: updates.len() - applied,
        best_bid: book.best_bid_price(symbol)?,
        best_ask: book.best_ask_price(symbol)?,
        bid_levels: book.ordered_bids(symbol).len(),
        ask_levels: book.ordered_asks(symbol).len(),
        reads: 0,
    })
}

/// 一个写线程回放，`readers` 个读线程持续查询盘口直到写完
pub fn replay_concurrent(
    scale: TickScale,
    readers: usize,
    symbol: &str,
    snapshot: &SnapshotEvent,
    updates: &[UpdateEvent],
) -> Result<ReplayReport, BookError> {
    let book: ThreadSafeOrderBook = ThreadSafeOrderBook::with_scale(scale);

    let start = Instant::now();
    book.initialize(symbol, snapshot)?;
    let initialize = start.elapsed();

    let done = AtomicBool::new(false);
    let reads = AtomicU64::new(0);

    let (applied, replay) = thread::scope(|s| {
        for _ in 0..readers {
            s.spawn(|| {
                let mut local = 0u64;
                while !done.load(Ordering::Acquire) {
                    // 读者只关心盘口，结果丢弃
                    let _ = book.best_bid_price(symbol);
                    let _ = book.best_ask_price(symbol);
                    local += 1;
                }
                reads.fetch_add(local, Ordering::Relaxed);
            });
        }

        let start = Instant::now();
        let result = updates.iter().try_fold(0usize, |applied, event| {
            book.update(event).map(|ok| applied + usize::from(ok))
        });
        let elapsed = start.elapsed();
        done.store(true, Ordering::Release);
        result.map(|applied| (applied, elapsed))
    })?;

    Ok(ReplayReport {
        variant: "concurrent".to_owned(),
        initialize,
        replay,
        applied,
        ignored: updates.len() - applied,
        best_bid: book.best_bid_price(symbol)?,
        best_ask: book.best_ask_price(symbol)?,
        bid_levels: book.ordered_bids(symbol).len(),
        ask_levels: book.ordered_asks(symbol).len(),
        reads: reads.load(Ordering::Relaxed),
    })
}

fn open(path: &Path) -> Result<BufReader<File>, CliError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| CliError::Io {
            path: path.to_owned(),
            source,
        })
}

pub fn load_snapshot(path: &Path) -> Result<SnapshotEvent, CliError> {
    serde_json::from_reader(open(path)?).map_err(|source| CliError::Json {
        path: path.to_owned(),
        line: source.line(),
        source,
    })
}

/// 每行一个事件，空行跳过
pub fn load_updates(path: &Path) -> Result<Vec<UpdateEvent>, CliError> {
    let mut events = Vec::new();
    for (index, line) in open(path)?.lines().enumerate() {
        let line = line.map_err(|source| CliError::Io {
            path: path.to_owned(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| CliError::Json {
            path: path.to_owned(),
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

fn print_config(config: &CliConfig) {
    println!("========================================");
    println!("  价格档位订单簿 v0.1.0");
    println!("========================================");
    println!("实现:         {}", config.variant);
    println!("交易对:       {}", config.symbol);
    match &config.snapshot {
        Some(path) => println!("快照文件:     {}", path.display()),
        None => println!("价位数:       {}", config.levels),
    }
    match &config.updates_file {
        Some(path) => println!("增量文件:     {}", path.display()),
        None => println!(
            "增量事件:     {} (更新 {:.2}, 删除 {:.4})",
            config.updates, config.update_ratio, config.remove_ratio
        ),
    }
    println!("比例因子:     {}", config.scale_factor);
    println!("随机种子:     {}", config.seed);
    println!("日志级别:     {}", config.log_level);
    println!("========================================");
}

fn print_report(report: &ReplayReport) {
    let show = |price: Option<Decimal>| price.map_or_else(|| "-".to_owned(), |p| p.to_string());
    println!("\n--- 回放结果 ({}) ---", report.variant);
    println!("初始化耗时:   {:?}", report.initialize);
    println!("回放耗时:     {:?}", report.replay);
    println!("已应用/忽略:  {}/{}", report.applied, report.ignored);
    println!("吞吐量:       {:.0} updates/s", report.updates_per_second());
    println!("最优买价:     {} ({} 档)", show(report.best_bid), report.bid_levels);
    println!("最优卖价:     {} ({} 档)", show(report.best_ask), report.ask_levels);
    if report.variant == "concurrent" {
        println!("读取次数:     {}", report.reads);
    }
}

/// 初始化日志系统
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

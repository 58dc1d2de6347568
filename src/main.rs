//! motion-gauge - movement task evaluation service
//!
//! Reads landmark frames, runs the evaluation engine on a fixed tick (or per
//! frame) and serves snapshots and results over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Live frames from a pose detector (JSON lines on stdin)
//! ./simulation --scenario arm-raise | ./motion-gauge --stdin --task arm_raise_right
//!
//! # Replay a recorded session and exit when it ends
//! ./motion-gauge --replay session.jsonl --task one_leg_left --no-server
//!
//! # Ledger maintenance
//! ./motion-gauge export --format csv --output results.csv
//! ./motion-gauge results
//! ./motion-gauge clear
//! ```
//!
//! # Environment Variables
//!
//! - `MOTION_GAUGE_CONFIG`: Path to the TOML config (default: ./motion_gauge.toml)
//! - `MOTION_GAUGE_SERVER_ADDR`: HTTP bind address (default: 0.0.0.0:8080)
//! - `MOTION_GAUGE_CORS_ORIGINS`: Comma-separated origins allowed cross-origin
//! - `RUST_LOG`: Logging level (default: info)
//! - `RESET_DB`: Set to "true" to wipe the result database on startup

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use motion_gauge::api::{create_app, ApiState};
use motion_gauge::config::{self, defaults, EngineConfig, TickMode};
use motion_gauge::engine::Engine;
use motion_gauge::pipeline::{ChannelSource, FrameSource, ProcessingLoop, ReplaySource, StdinSource};
use motion_gauge::storage::{
    export_file_name, BlobStore, DeferredBlobStore, ExportFormat, ProcessLock, ResultLedger,
    SledBlobStore,
};
use motion_gauge::types::Task;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "motion-gauge")]
#[command(about = "Real-time movement task evaluation from 2-D pose landmarks")]
#[command(version)]
struct CliArgs {
    /// Read JSON-line frames from stdin
    #[arg(long, conflicts_with = "replay")]
    stdin: bool,

    /// Replay JSON-line frames from a file
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Replay speed multiplier (1 = recorded pace, 0 = no delay)
    #[arg(long, default_value = "1")]
    speed: f64,

    /// Explicit config file (overrides MOTION_GAUGE_CONFIG and ./motion_gauge.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP bind address
    #[arg(short, long, env = "MOTION_GAUGE_SERVER_ADDR")]
    addr: Option<String>,

    /// Tick source: interval or per_frame
    #[arg(long)]
    tick_mode: Option<TickMode>,

    /// Task to activate on startup (e.g. arm_raise_right)
    #[arg(long)]
    task: Option<Task>,

    /// Do not start the HTTP server; with --replay, exit when the replay ends
    #[arg(long)]
    no_server: bool,

    /// Wipe the result database on startup. Destructive.
    /// Can also be set via RESET_DB=true.
    #[arg(long)]
    reset_db: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Write the ledger as JSON or CSV
    Export {
        /// json or csv
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Output file; a directory gets a session_<timestamp> file name; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the ledger as a table
    Results,
    /// Remove every recorded result
    Clear,
    /// Print the effective configuration as TOML
    Config,
}

/// Whether to reset the database (CLI flag or RESET_DB env var).
fn should_reset_db(cli_flag: bool) -> bool {
    if cli_flag {
        return true;
    }
    std::env::var("RESET_DB")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn db_path(cfg: &EngineConfig) -> PathBuf {
    Path::new(&cfg.ledger.data_dir).join(defaults::DB_DIR_NAME)
}

/// Remove the sled database directory. Caller must hold the process lock.
fn reset_database(cfg: &EngineConfig) -> Result<()> {
    let path = db_path(cfg);
    if !path.exists() {
        info!(path = %path.display(), "Database does not exist, nothing to reset");
        return Ok(());
    }
    warn!(path = %path.display(), "RESET_DB: removing result database");
    std::fs::remove_dir_all(&path)
        .with_context(|| format!("Failed to remove {}", path.display()))?;
    Ok(())
}

fn load_config(args: &CliArgs) -> Result<EngineConfig> {
    let mut cfg = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::load(),
    };
    if let Some(mode) = args.tick_mode {
        cfg.engine.tick_mode = mode;
    }
    if let Some(ref addr) = args.addr {
        cfg.server.addr = addr.clone();
    }
    Ok(cfg)
}

// ============================================================================
// Storage
// ============================================================================

/// Process lock plus the sled-backed blob store.
struct Storage {
    _lock: ProcessLock,
    sled: Arc<SledBlobStore>,
}

fn open_storage(cfg: &EngineConfig, reset: bool) -> Result<Storage> {
    let lock = ProcessLock::acquire(&cfg.ledger.data_dir).context("Failed to acquire process lock")?;
    if reset {
        reset_database(cfg)?;
    }
    let sled = SledBlobStore::open(db_path(cfg), defaults::LEDGER_TREE)
        .context("Failed to open result database")?;
    Ok(Storage {
        _lock: lock,
        sled: Arc::new(sled),
    })
}

// ============================================================================
// Subcommands
// ============================================================================

fn run_subcommand(command: &SubCommand, cfg: &EngineConfig, reset: bool) -> Result<()> {
    if let SubCommand::Config = command {
        print!("{}", cfg.to_toml()?);
        return Ok(());
    }

    let storage = open_storage(cfg, reset)?;
    let mut ledger = ResultLedger::load(storage.sled.clone(), cfg.ledger.capacity);

    match command {
        SubCommand::Export { format, output } => {
            let body = format.render(ledger.all())?;
            match output {
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(export_file_name(Utc::now(), *format))
                    } else {
                        path.clone()
                    };
                    std::fs::write(&path, body)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), count = ledger.len(), "Results exported");
                }
                None => print!("{body}"),
            }
        }
        SubCommand::Results => print_results(&ledger),
        SubCommand::Clear => {
            let count = ledger.len();
            ledger.clear();
            info!(count, "Results cleared");
        }
        SubCommand::Config => {}
    }
    Ok(())
}

fn print_results(ledger: &ResultLedger) {
    if ledger.is_empty() {
        println!("No results recorded.");
        return;
    }
    println!(
        "{:<20} {:<16} {:>7} {:<5} {:<6} NOTE",
        "TIME", "TASK", "VALUE", "UNITS", "STATUS"
    );
    for r in ledger.all() {
        println!(
            "{:<20} {:<16} {:>7} {:<5} {:<6} {}",
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.task.code(),
            r.value,
            r.units,
            r.status.to_string(),
            r.note.as_deref().unwrap_or("")
        );
    }
    println!("{} result(s), capacity {}", ledger.len(), ledger.capacity());
}

// ============================================================================
// Service
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    ProcessingLoop,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::ProcessingLoop => write!(f, "ProcessingLoop"),
        }
    }
}

async fn run_service<S: FrameSource>(
    source: S,
    cfg: EngineConfig,
    args: &CliArgs,
    storage: Storage,
    cancel_token: CancellationToken,
) -> Result<()> {
    let deferred = Arc::new(DeferredBlobStore::spawn(storage.sled.clone()));
    let ledger = ResultLedger::load(deferred.clone() as Arc<dyn BlobStore>, cfg.ledger.capacity);

    let mut engine = Engine::new(&cfg, ledger);
    if let Some(task) = args.task {
        engine.select_task(Some(task));
    }

    let (processing_loop, handle) = ProcessingLoop::new(engine, &cfg, cancel_token.clone());
    let processing_loop = processing_loop.exit_on_eof(args.no_server);

    let mut tasks: JoinSet<Result<TaskName>> = JoinSet::new();

    if !args.no_server {
        let listener = tokio::net::TcpListener::bind(cfg.server.addr.as_str())
            .await
            .with_context(|| format!("Failed to bind to {}", cfg.server.addr))?;
        info!(addr = %cfg.server.addr, "HTTP server listening");
        let app = create_app(ApiState::new(handle.clone(), cfg.clone()));
        let server_cancel = cancel_token.clone();
        tasks.spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_cancel.cancelled().await })
                .await
                .context("HTTP server error")?;
            Ok(TaskName::HttpServer)
        });
    }

    let loop_cancel = cancel_token.clone();
    tasks.spawn(async move {
        let (_engine, stats) = processing_loop.run(source).await;
        info!(
            ticks = stats.ticks,
            results = stats.results_recorded,
            "Processing loop finished"
        );
        // a finished loop takes the server down with it
        loop_cancel.cancel();
        Ok(TaskName::ProcessingLoop)
    });

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(name)) => info!(task = %name, "Task completed"),
            Ok(Err(e)) => {
                error!(error = %e, "Task failed");
                cancel_token.cancel();
            }
            Err(e) => {
                error!(error = %e, "Task panicked");
                cancel_token.cancel();
            }
        }
    }

    if let Err(e) = deferred.flush().await {
        warn!(error = %e, "Failed to flush pending ledger writes");
    }
    drop(handle);
    info!("Shutdown complete");
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    config::init(load_config(&args)?);
    let cfg = config::get().clone();
    let reset = should_reset_db(args.reset_db);

    if let Some(ref command) = args.command {
        return run_subcommand(command, &cfg, reset);
    }

    info!(
        tick_mode = ?cfg.engine.tick_mode,
        tick_interval_ms = cfg.engine.tick_interval_ms,
        margin = cfg.classifier.margin,
        hold_cap_ms = cfg.hold.cap_ms,
        decay = ?cfg.hold.decay,
        "motion-gauge starting"
    );

    let storage = open_storage(&cfg, reset)?;

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown");
        shutdown_token.cancel();
    });

    if args.stdin {
        info!("Input: stdin (JSON-line frames)");
        run_service(StdinSource::stdin(), cfg, &args, storage, cancel_token).await
    } else if let Some(ref path) = args.replay {
        let source = ReplaySource::from_file(path, args.speed)?;
        info!(path = %path.display(), speed = args.speed, "Input: replay");
        run_service(source, cfg, &args, storage, cancel_token).await
    } else {
        info!("Input: none (serving ledger and commands only)");
        let (_frames_tx, source) = ChannelSource::channel(1);
        run_service(source, cfg, &args, storage, cancel_token).await
    }
}

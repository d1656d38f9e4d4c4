//! TrendWatch CLI: run the monitor, evaluate once, inspect configuration.
//!
//! Commands:
//! - `run`: scheduler plus status endpoint until Ctrl-C / SIGTERM
//! - `once`: a single evaluation cycle, printed to stdout
//! - `config`: the effective configuration as TOML

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use trendwatch_core::data::BinanceProvider;
use trendwatch_core::TrendClassifier;
use trendwatch_runner::{
    init_tracing, serve, ConsoleSink, EvaluationCycle, LatestResults, MonitorConfig, Scheduler,
    SchedulerConfig, SnapshotSink, StatusState, TrendLogSink,
};

#[derive(Parser)]
#[command(
    name = "trendwatch",
    version,
    about = "TrendWatch: scheduled MACD trend classification for exchange pairs"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG overrides.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler and status endpoint until interrupted.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Evaluate every configured pair once and print the results.
    Once {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print results as JSON instead of summary lines.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the effective configuration as TOML.
    Config {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    match cli.command {
        Commands::Run { config } => run_monitor(load_config(config.as_deref())?).await,
        Commands::Once { config, json } => run_once(load_config(config.as_deref())?, json).await,
        Commands::Config { config } => {
            print!("{}", load_config(config.as_deref())?.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => {
            let config = MonitorConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Build the scheduler with every configured sink. Sink setup failures are fatal.
fn build_scheduler(config: &MonitorConfig, store: LatestResults) -> Result<Scheduler> {
    let provider = BinanceProvider::new(&config.data.binance_config())
        .context("building exchange client")?;
    let classifier = TrendClassifier::new(config.classifier_config())?;

    let mut scheduler = Scheduler::new(
        SchedulerConfig::from_monitor(config),
        Arc::new(provider),
        classifier,
        store,
    );

    if config.output.file {
        let sink = TrendLogSink::new(&config.output.log_dir).with_context(|| {
            format!(
                "creating log directory {}",
                config.output.log_dir.display()
            )
        })?;
        scheduler = scheduler.with_sink(Arc::new(sink));
    }
    if let Some(path) = &config.output.snapshot {
        let sink = SnapshotSink::new(path)
            .with_context(|| format!("preparing snapshot file {}", path.display()))?;
        scheduler = scheduler.with_sink(Arc::new(sink));
    }
    if config.output.console {
        scheduler = scheduler.with_sink(Arc::new(ConsoleSink));
    }
    Ok(scheduler)
}

async fn run_monitor(config: MonitorConfig) -> Result<()> {
    let config = Arc::new(config);
    let store = LatestResults::new();
    let scheduler = build_scheduler(&config, store.clone())?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = if config.status.enabled {
        let addr = config.status.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding status endpoint on {addr}"))?;
        let state = StatusState {
            store: store.clone(),
            default_symbol: config.status.default_symbol.clone(),
            default_interval: config.status.default_interval,
        };
        Some(tokio::spawn(serve(listener, state, shutdown_rx.clone())))
    } else {
        None
    };

    let driver = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    wait_for_signal().await;
    info!("shutdown requested; finishing in-flight cycle");
    let _ = shutdown_tx.send(true);

    let cycles = driver.await.context("scheduler task panicked")?;
    if let Some(server) = server {
        if let Err(e) = server.await.context("status task panicked")? {
            error!(error = %e, "status endpoint stopped with an error");
        }
    }
    info!(cycles, "trendwatch stopped");
    Ok(())
}

async fn run_once(config: MonitorConfig, json: bool) -> Result<()> {
    let mut config = config;
    config.output.console = false;
    let scheduler = build_scheduler(&config, LatestResults::new())?;
    let cycle = scheduler.run_cycle().await;
    print_cycle(&cycle, json)?;
    Ok(())
}

fn print_cycle(cycle: &EvaluationCycle, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&cycle.results)?);
    } else {
        for result in &cycle.results {
            println!("{}", result.summary_line());
        }
    }
    for failure in &cycle.failures {
        eprintln!("FAIL {}: {}", failure.pair, failure.error);
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            error!(error = %e, "cannot install SIGTERM handler; waiting for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

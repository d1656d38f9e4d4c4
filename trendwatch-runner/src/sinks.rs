//! Result sinks: where a finished evaluation cycle is written.
//!
//! - [`TrendLogSink`]: daily text log, daily JSONL, daily error log
//! - [`SnapshotSink`]: JSON file upserted per `SYMBOL_interval`
//! - [`ConsoleSink`]: one tracing event per result
//!
//! Sinks receive the whole cycle at once. A failing sink is logged by the
//! scheduler and never blocks the other sinks or the latest-results store.
//! They do blocking file I/O; the scheduler calls them via `spawn_blocking`.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use trendwatch_core::domain::TrendResult;

use crate::scheduler::EvaluationCycle;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_err<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> SinkError + 'a {
    move |source| SinkError::Io {
        op,
        path: path.to_path_buf(),
        source,
    }
}

pub trait ResultSink: Send + Sync {
    fn name(&self) -> &str;

    fn publish(&self, cycle: &EvaluationCycle) -> Result<(), SinkError>;

    /// Record a failure raised outside this sink. No-op unless the sink keeps
    /// an error channel.
    fn record_error(&self, _at: DateTime<Utc>, _message: &str) -> Result<(), SinkError> {
        Ok(())
    }
}

// ── Daily log files ──────────────────────────────────────────────────

/// Appends to `trend_analysis_YYYYMMDD.{log,jsonl}` and `error_YYYYMMDD.log`.
///
/// File dates come from the cycle's start time in UTC.
pub struct TrendLogSink {
    dir: PathBuf,
    // Serializes appends so blocks from concurrent callers never interleave.
    lock: Mutex<()>,
}

impl TrendLogSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_err("create log dir", &dir))?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn trend_log_path(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("trend_analysis_{}.log", at.format("%Y%m%d")))
    }

    pub fn trend_jsonl_path(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("trend_analysis_{}.jsonl", at.format("%Y%m%d")))
    }

    pub fn error_log_path(&self, at: DateTime<Utc>) -> PathBuf {
        self.dir.join(format!("error_{}.log", at.format("%Y%m%d")))
    }

    fn append(path: &Path, text: &str) -> Result<(), SinkError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err("open", path))?;
        file.write_all(text.as_bytes())
            .and_then(|_| file.flush())
            .map_err(io_err("append", path))
    }
}

impl ResultSink for TrendLogSink {
    fn name(&self) -> &str {
        "trend_log"
    }

    fn publish(&self, cycle: &EvaluationCycle) -> Result<(), SinkError> {
        let _guard = self.lock.lock();
        let at = cycle.started_at;

        if !cycle.results.is_empty() {
            let mut block = format!(
                "==== Trend analysis {} ({} ok, {} failed) ====\n",
                at.format(TIME_FORMAT),
                cycle.results.len(),
                cycle.failures.len()
            );
            let mut lines = String::new();
            for result in &cycle.results {
                block.push_str(&result.summary_line());
                block.push('\n');
                lines.push_str(&serde_json::to_string(result)?);
                lines.push('\n');
            }
            block.push('\n');
            Self::append(&self.trend_log_path(at), &block)?;
            Self::append(&self.trend_jsonl_path(at), &lines)?;
        }

        if !cycle.failures.is_empty() {
            let mut block = String::new();
            for failure in &cycle.failures {
                block.push_str(&format!(
                    "[{}] {}: {}\n",
                    at.format(TIME_FORMAT),
                    failure.pair,
                    failure.error
                ));
            }
            Self::append(&self.error_log_path(at), &block)?;
        }

        Ok(())
    }

    fn record_error(&self, at: DateTime<Utc>, message: &str) -> Result<(), SinkError> {
        let _guard = self.lock.lock();
        Self::append(
            &self.error_log_path(at),
            &format!("[{}] {message}\n", at.format(TIME_FORMAT)),
        )
    }
}

// ── Snapshot upsert ──────────────────────────────────────────────────

/// Keeps one JSON object of `SYMBOL_interval -> TrendResult`, upserted per cycle.
///
/// The file is rewritten through a sibling temp file and a rename.
pub struct SnapshotSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SnapshotSink {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err("create snapshot dir", parent))?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents, empty when the file does not exist yet.
    pub fn load(&self) -> Result<BTreeMap<String, TrendResult>, SinkError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(io_err("read", &self.path)(e)),
        }
    }
}

impl ResultSink for SnapshotSink {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn publish(&self, cycle: &EvaluationCycle) -> Result<(), SinkError> {
        if cycle.results.is_empty() {
            return Ok(());
        }
        let _guard = self.lock.lock();

        let mut table = self.load()?;
        for result in &cycle.results {
            table.insert(result.pair().to_string(), result.clone());
        }

        let json = serde_json::to_string_pretty(&table)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err("write", &tmp))?;
        fs::rename(&tmp, &self.path).map_err(io_err("rename", &self.path))
    }
}

// ── Console ──────────────────────────────────────────────────────────

pub struct ConsoleSink;

impl ResultSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn publish(&self, cycle: &EvaluationCycle) -> Result<(), SinkError> {
        for r in &cycle.results {
            info!(
                symbol = %r.symbol,
                interval = %r.interval,
                label = %r.label,
                price = r.indicators.price,
                ema_short = r.indicators.ema_short,
                ema_long = r.indicators.ema_long,
                ma = r.indicators.ma,
                "trend"
            );
        }
        Ok(())
    }
}

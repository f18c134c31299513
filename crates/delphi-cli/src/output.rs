//! Run directory persistence: `events.jsonl` and `summary.json`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use delphi_core::{DelphiEvent, DelphiRun, ItemResult};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const EVENTS_FILE: &str = "events.jsonl";
pub const SUMMARY_FILE: &str = "summary.json";

/// Create `<base>/run-<UTC timestamp>/`.
pub fn create_run_dir(base: &Path, started_at: DateTime<Utc>) -> Result<PathBuf> {
    let dir = base.join(format!("run-{}", started_at.format("%Y%m%dT%H%M%SZ")));
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create run directory: {}", dir.display()))?;
    Ok(dir)
}

/// One JSON event per line, in log order.
pub fn write_events(dir: &Path, events: &[DelphiEvent]) -> Result<PathBuf> {
    let path = dir.join(EVENTS_FILE);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for event in events {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(path)
}

pub fn write_summary(dir: &Path, results: &[ItemResult]) -> Result<PathBuf> {
    let path = dir.join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(results)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Write a finished run and return its directory.
pub fn persist_run(base: &Path, run: &DelphiRun, started_at: DateTime<Utc>) -> Result<PathBuf> {
    let dir = create_run_dir(base, started_at)?;
    write_events(&dir, &run.event_log)?;
    write_summary(&dir, &run.item_results)?;
    Ok(dir)
}

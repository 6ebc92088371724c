//! Persistence layer.
//!
//! Writes the stats table to a CSV file, one row per analysed coin,
//! columns in `CoinStats` field order. The file is overwritten on every
//! run; nothing else is persisted.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::types::{CoinRankError, CoinStats};

/// Default stats table path, relative to the working directory.
pub const DEFAULT_STATS_FILE: &str = "data/top20_stats.csv";

/// Save the stats table as CSV, creating the parent directory if needed.
pub fn save_stats(stats: &[CoinStats], path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_STATS_FILE);

    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    // Header written by hand so an empty table still has its columns.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to open {path} for writing"))?;

    writer
        .write_record(CoinStats::COLUMNS)
        .context("Failed to write stats header")?;
    for row in stats {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write stats row for {}", row.symbol))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush stats to {path}"))?;

    info!(path, rows = stats.len(), "Stats table saved");
    Ok(())
}

/// Load a previously saved stats table.
/// Returns None if the file doesn't exist.
pub fn load_stats(path: Option<&str>) -> Result<Option<Vec<CoinStats>>> {
    let path = path.unwrap_or(DEFAULT_STATS_FILE);

    if !Path::new(path).exists() {
        debug!(path, "No saved stats table found");
        return Ok(None);
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open stats table {path}"))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read stats header from {path}"))?;
    if !headers.iter().eq(CoinStats::COLUMNS.iter().copied()) {
        return Err(CoinRankError::Storage(format!(
            "{path} has unexpected columns: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        ))
        .into());
    }

    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<CoinStats>, _>>()
        .with_context(|| format!("Failed to parse stats table {path}"))?;

    debug!(path, rows = rows.len(), "Stats table loaded");
    Ok(Some(rows))
}

/// Delete the stats file (for testing or reset).
pub fn delete_stats(path: Option<&str>) -> Result<()> {
    let path = path.unwrap_or(DEFAULT_STATS_FILE);
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to delete stats file {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

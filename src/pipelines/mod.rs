// src/pipelines/mod.rs
pub mod contacts;
pub mod flights;
pub mod mentions;

use anyhow::{bail, Context, Result};
use log::info;

use crate::db::readers::count_rows;
use crate::utils::db_connect::PgPool;

/// Re-reads committed row counts and fails on any difference from what the
/// pipeline computed in memory.
pub(crate) async fn verify_written_counts(pool: &PgPool, expected: &[(&str, usize)]) -> Result<()> {
    let conn = pool
        .get()
        .await
        .context("Failed to get DB connection for post-commit count check")?;
    let mut mismatches = Vec::new();
    for (table, want) in expected {
        let got = count_rows(&*conn, table).await?;
        if got != *want as i64 {
            mismatches.push(format!("{}: expected {}, found {}", table, want, got));
        } else {
            info!("✓ {} holds {} rows", table, got);
        }
    }
    if !mismatches.is_empty() {
        bail!("Row count mismatch after commit: {}", mismatches.join("; "));
    }
    Ok(())
}

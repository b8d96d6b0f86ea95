// src/bin/verify_l1.rs
//
// Referential and invariant checks over the L1 tables. Exits non-zero when
// any check fails.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use identity_lib::models::stats_models::PipelineStats;
use identity_lib::utils::config::{CliArgs, PipelineConfig};
use identity_lib::utils::db_connect::connect;
use identity_lib::utils::env::load_env;
use identity_lib::verify::run_verification;
use log::info;
use std::time::Instant;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();

    let args = CliArgs::parse();
    let config = PipelineConfig::load(&args).context("Invalid configuration")?;
    config.log_config();

    let pool = connect(&config.db)
        .await
        .context("Failed to connect to database")?;

    let start = Instant::now();
    let report = run_verification(&pool, &config).await?;

    let mut stats = PipelineStats::new(Uuid::new_v4().to_string(), Utc::now().naive_utc(), false);
    stats.total_processing_time = start.elapsed().as_secs_f64();
    stats
        .phase_times
        .insert("verify".to_string(), stats.total_processing_time);
    stats.verification = Some(report);
    if let Some(path) = &config.report_path {
        stats.write_json(path)?;
    }

    if let Some(report) = &stats.verification {
        report.ensure_passed()?;
    }
    info!("L1 verification finished in {:.2?}", start.elapsed());
    Ok(())
}

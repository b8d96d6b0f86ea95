// src/bin/build_identity_mentions.rs
//
// Rebuilds l1.identity_mentions from the L1 passenger and person tables
// already in the database.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use identity_lib::models::stats_models::PipelineStats;
use identity_lib::pipelines::mentions::run_mentions;
use identity_lib::utils::capabilities::Capabilities;
use identity_lib::utils::config::{CliArgs, PipelineConfig};
use identity_lib::utils::db_connect::connect;
use identity_lib::utils::env::load_env;
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
    let capabilities = Capabilities::from_config(&config);
    capabilities.log_capabilities();

    let pool = connect(&config.db)
        .await
        .context("Failed to connect to database")?;
    let multi_progress = config.progress.create_multi_progress();

    let start = Instant::now();
    let (mentions, mention_stats) =
        run_mentions(&pool, &config, &capabilities, None, multi_progress.as_ref()).await?;

    let mut stats = PipelineStats::new(Uuid::new_v4().to_string(), Utc::now().naive_utc(), config.dry_run);
    stats.total_processing_time = start.elapsed().as_secs_f64();
    stats
        .phase_times
        .insert("mentions".to_string(), stats.total_processing_time);
    stats.mentions = Some(mention_stats);
    if let Some(path) = &config.report_path {
        stats.write_json(path)?;
    }

    info!(
        "Built {} identity mentions in {:.2?}",
        mentions.len(),
        start.elapsed()
    );
    Ok(())
}

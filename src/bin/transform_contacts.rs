// src/bin/transform_contacts.rs
//
// Rebuilds l1.contacts, l1.contact_persons and l1.phone_numbers from
// core.black_book.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use identity_lib::models::stats_models::PipelineStats;
use identity_lib::pipelines::contacts::run_contacts;
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
    let transform = run_contacts(&pool, &config, &capabilities, multi_progress.as_ref()).await?;

    let mut stats = PipelineStats::new(Uuid::new_v4().to_string(), Utc::now().naive_utc(), config.dry_run);
    stats.total_processing_time = start.elapsed().as_secs_f64();
    stats
        .phase_times
        .insert("contacts".to_string(), stats.total_processing_time);
    stats.contacts = Some(transform.stats);
    if let Some(path) = &config.report_path {
        stats.write_json(path)?;
    }

    info!("Contact transform finished in {:.2?}", start.elapsed());
    Ok(())
}

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use identity_lib::models::stats_models::PipelineStats;
use identity_lib::pipelines::contacts::run_contacts;
use identity_lib::pipelines::flights::run_flights;
use identity_lib::pipelines::mentions::{run_mentions, sources_from_transforms};
use identity_lib::utils::capabilities::Capabilities;
use identity_lib::utils::config::{CliArgs, PipelineConfig};
use identity_lib::utils::db_connect::{connect, get_pool_status, PgPool};
use identity_lib::utils::env::load_env;
use identity_lib::utils::get_memory_usage;
use identity_lib::utils::progress_bars::logging::log_run_start;
use identity_lib::utils::progress_bars::progress_config::ProgressConfig;
use identity_lib::verify::run_verification;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and environment
    env_logger::init();
    info!("Starting L1 normalization pipeline");
    load_env();

    let args = CliArgs::parse();
    let config = PipelineConfig::load(&args).context("Invalid configuration")?;
    config.log_config();

    let capabilities = Capabilities::from_config(&config);
    capabilities.log_capabilities();

    let progress_config_arc = Arc::new(config.progress.clone());
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config_arc.enabled, progress_config_arc.detailed
    );
    let multi_progress = progress_config_arc.create_multi_progress();

    // Create main pipeline progress bar
    let main_pb = if let Some(mp) = &multi_progress {
        let pb = mp.add(ProgressBar::new(4));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        pb.set_message("Initializing pipeline...");
        Some(pb)
    } else {
        None
    };

    let pool = connect(&config.db)
        .await
        .context("Failed to connect to database")?;
    info!("Successfully connected to the database");

    let run_id = Uuid::new_v4().to_string();
    let run_timestamp = Utc::now().naive_utc();
    log_run_start(&run_id, config.dry_run);
    let mut stats = PipelineStats::new(run_id.clone(), run_timestamp, config.dry_run);

    // Helper closure to update progress message with common stats
    let update_main_pb_message = |pb_clone: ProgressBar,
                                  phase_name: &'static str,
                                  config_arc: Arc<ProgressConfig>,
                                  db_pool_clone: PgPool| async move {
        let mut parts = Vec::new();
        if config_arc.should_show_memory() {
            let memory_mb = get_memory_usage().await;
            parts.push(format!("Memory: {} MB", memory_mb));
        }
        if config_arc.should_show_db_connection_stats() {
            let (size, available, _in_use) = get_pool_status(&db_pool_clone);
            parts.push(format!("DB: {}/{} (used/total)", size - available, size));
        }
        if parts.is_empty() {
            pb_clone.set_message(phase_name.to_string());
        } else {
            pb_clone.set_message(format!("{} ({})", phase_name, parts.join(", ")));
        }
    };

    // Phase 1: Contacts
    if let Some(pb) = &main_pb {
        update_main_pb_message(pb.clone(), "Phase 1: Contacts", progress_config_arc.clone(), pool.clone()).await;
    }
    let phase1_start = Instant::now();
    let contacts = run_contacts(&pool, &config, &capabilities, multi_progress.as_ref())
        .await
        .context("Contact pipeline failed")?;
    let phase1_duration = phase1_start.elapsed();
    stats
        .phase_times
        .insert("contacts".to_string(), phase1_duration.as_secs_f64());
    stats.contacts = Some(contacts.stats.clone());
    if let Some(pb) = &main_pb {
        pb.inc(1);
    }

    // Phase 2: Flights
    if let Some(pb) = &main_pb {
        update_main_pb_message(pb.clone(), "Phase 2: Flights", progress_config_arc.clone(), pool.clone()).await;
    }
    let phase2_start = Instant::now();
    let flights = run_flights(&pool, &config, multi_progress.as_ref())
        .await
        .context("Flight pipeline failed")?;
    let phase2_duration = phase2_start.elapsed();
    stats
        .phase_times
        .insert("flights".to_string(), phase2_duration.as_secs_f64());
    stats.flights = Some(flights.stats.clone());
    if let Some(pb) = &main_pb {
        pb.inc(1);
    }

    // Phase 3: Identity mentions, from this run's results
    if let Some(pb) = &main_pb {
        update_main_pb_message(pb.clone(), "Phase 3: Identity mentions", progress_config_arc.clone(), pool.clone()).await;
    }
    let phase3_start = Instant::now();
    let sources = sources_from_transforms(&contacts, &flights);
    let (mentions, mention_stats) = run_mentions(
        &pool,
        &config,
        &capabilities,
        Some(sources),
        multi_progress.as_ref(),
    )
    .await
    .context("Identity mention pipeline failed")?;
    let phase3_duration = phase3_start.elapsed();
    stats
        .phase_times
        .insert("mentions".to_string(), phase3_duration.as_secs_f64());
    stats.mentions = Some(mention_stats);
    if let Some(pb) = &main_pb {
        pb.inc(1);
    }

    // Phase 4: Verification (needs written L1 tables)
    if let Some(pb) = &main_pb {
        update_main_pb_message(pb.clone(), "Phase 4: Verification", progress_config_arc.clone(), pool.clone()).await;
    }
    let phase4_start = Instant::now();
    if config.dry_run {
        info!("Dry run: skipping L1 verification, nothing was written");
    } else {
        let report = run_verification(&pool, &config)
            .await
            .context("L1 verification could not run")?;
        stats.verification = Some(report);
    }
    let phase4_duration = phase4_start.elapsed();
    stats
        .phase_times
        .insert("verify".to_string(), phase4_duration.as_secs_f64());
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.finish_with_message("L1 normalization complete");
    }

    let total_time = phase1_duration + phase2_duration + phase3_duration + phase4_duration;
    stats.total_processing_time = total_time.as_secs_f64();

    info!("=== Pipeline Summary ===");
    info!("Run ID: {}", run_id);
    info!("Contacts: {}", contacts.contacts.len());
    info!("Contact persons: {}", contacts.persons.len());
    info!("Phone numbers: {}", contacts.phones.len());
    info!("Flight events: {}", flights.events.len());
    info!("Flight passengers: {}", flights.passengers.len());
    info!("Identity mentions: {}", mentions.len());
    info!("=== Timing Breakdown ===");
    info!("Phase 1 (Contacts): {:.2?}", phase1_duration);
    info!("Phase 2 (Flights): {:.2?}", phase2_duration);
    info!("Phase 3 (Identity mentions): {:.2?}", phase3_duration);
    info!("Phase 4 (Verification): {:.2?}", phase4_duration);
    info!("Total execution time: {:.2?}", total_time);

    if progress_config_arc.should_show_memory() {
        let final_memory_mb = get_memory_usage().await;
        info!("Final memory usage: {} MB", final_memory_mb);
    }

    let (pool_size, available_connections, in_use_connections) = get_pool_status(&pool);
    info!(
        "Final DB Connection Pool Status: Total: {}, Available: {}, In Use: {}",
        pool_size, available_connections, in_use_connections
    );

    if let Some(path) = &config.report_path {
        stats.write_json(path)?;
    }
    if let Some(report) = &stats.verification {
        report.ensure_passed()?;
    }

    info!("Pipeline completed successfully!");
    Ok(())
}

// src/utils/progress_bars/logging.rs - Logging helpers for the L1 pipelines
use log::{debug, info, warn};
use std::time::Instant;

use crate::models::stats_models::PipelineKind;

#[derive(Clone)]
pub struct PipelineLogger {
    name: &'static str,
    emoji: &'static str,
    start_time: Instant,
}

impl PipelineLogger {
    pub fn new(kind: PipelineKind) -> Self {
        let (name, emoji) = match kind {
            PipelineKind::Contacts => ("CONTACTS", "📒"),
            PipelineKind::Flights => ("FLIGHTS", "✈️"),
            PipelineKind::Mentions => ("MENTIONS", "👤"),
            PipelineKind::Verify => ("VERIFY", "🔎"),
        };
        Self {
            name,
            emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, dry_run: bool) {
        info!(
            "[{}] {} 🚀 Starting {} pipeline{}",
            self.name,
            self.emoji,
            self.name.to_lowercase(),
            if dry_run { " (DRY RUN: nothing will be written)" } else { "" }
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.name, self.emoji, phase, details, elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.name, self.emoji, phase, elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_loaded(&self, count: usize, source: &str) {
        info!(
            "[{}] {} 📊 Loaded {} rows from {}",
            self.name, self.emoji, count, source
        );
    }

    pub fn log_stat(&self, label: &str, value: impl std::fmt::Display) {
        info!("[{}] {}    • {}: {}", self.name, self.emoji, label, value);
    }

    pub fn log_distribution<'a>(
        &self,
        title: &str,
        entries: impl IntoIterator<Item = (&'a str, usize)>,
        total: usize,
    ) {
        info!("[{}] {} 📈 {}:", self.name, self.emoji, title);
        for (label, count) in entries {
            let percent = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            info!(
                "[{}] {}    • {:<20} {:>8} ({:.1}%)",
                self.name, self.emoji, label, count, percent
            );
        }
    }

    pub fn log_dry_run(&self) {
        info!(
            "[{}] {} 🧪 DRY RUN: statistics computed, no DDL, truncation or inserts performed",
            self.name, self.emoji
        );
    }

    pub fn log_written(&self, table: &str, rows: usize, batches: usize) {
        info!(
            "[{}] {} 💾 Wrote {} rows to {} in {} batches",
            self.name, self.emoji, rows, table, batches
        );
    }

    pub fn log_complete(&self) {
        info!(
            "[{}] {} 🎉 COMPLETED in {:.2?}",
            self.name,
            self.emoji,
            self.start_time.elapsed()
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.name, self.emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.name, self.emoji, message);
    }

    pub fn log_data_quality_issue(&self, issue_type: &str, count: usize) {
        if count > 0 {
            warn!(
                "[{}] {} ⚠️  Data quality: {} instances of {}",
                self.name, self.emoji, count, issue_type
            );
        }
    }
}

pub fn log_run_start(run_id: &str, dry_run: bool) {
    info!("🚀 ===== L1 NORMALIZATION RUN STARTING =====");
    info!("📅 Run ID: {}", run_id);
    info!("🧪 Dry run: {}", if dry_run { "yes" } else { "no" });
    info!("🎯 Stages: Contacts 📒, Flights ✈️, Mentions 👤, Verify 🔎");
    info!("=============================================");
}

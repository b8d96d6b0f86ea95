// src/models/stats_models.rs
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::models::normalized::{EntityType, IdentityConfidence, ParseType};
use crate::verify::VerificationReport;

/// The stages a run is made of, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Contacts,
    Flights,
    Mentions,
    Verify,
}

impl PipelineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Contacts => "contacts",
            PipelineKind::Flights => "flights",
            PipelineKind::Mentions => "mentions",
            PipelineKind::Verify => "verify",
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ContactStats {
    pub raw_records: usize,
    pub individual: usize,
    pub household: usize,
    pub organization: usize,
    pub unknown: usize,
    pub multi_person_entries: usize,
    pub total_persons: usize,
    pub phones_total: usize,
    pub phones_valid: usize,
    pub country_mapped: usize,
    pub country_unmapped: usize,
    /// L0 rows whose stored record_id no longer matches their content hash.
    pub record_id_drift: usize,
}

impl ContactStats {
    pub fn record_entity_type(&mut self, entity_type: EntityType) {
        match entity_type {
            EntityType::Individual => self.individual += 1,
            EntityType::Household => self.household += 1,
            EntityType::Organization => self.organization += 1,
            EntityType::Unknown => self.unknown += 1,
        }
    }

    /// Percentage of extracted phone numbers that normalized to E.164.
    pub fn phone_success_percent(&self) -> Option<f64> {
        if self.phones_total == 0 {
            None
        } else {
            Some(100.0 * self.phones_valid as f64 / self.phones_total as f64)
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct FlightStats {
    pub raw_records: usize,
    pub unique_flights: usize,
    pub passengers: usize,
    pub confidence_distribution: BTreeMap<String, usize>,
    pub potential_victims: usize,
    pub suppressed: usize,
    pub unparseable_dates: usize,
}

impl FlightStats {
    pub fn record_confidence(&mut self, confidence: IdentityConfidence) {
        *self
            .confidence_distribution
            .entry(confidence.label().to_string())
            .or_insert(0) += 1;
    }

    pub fn public_rows(&self) -> usize {
        self.passengers.saturating_sub(self.suppressed)
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct MentionStats {
    pub from_flight_passengers: usize,
    pub from_contact_persons: usize,
    pub skipped_without_name: usize,
    pub parse_types: BTreeMap<String, usize>,
    pub high_confidence: usize,
    pub low_confidence: usize,
    pub tagger_fallbacks: usize,
    pub with_first_code: usize,
    pub with_last_code: usize,
    pub unique_last_codes: usize,
}

impl MentionStats {
    pub fn total(&self) -> usize {
        self.from_flight_passengers + self.from_contact_persons
    }

    pub fn record_parse(&mut self, parse_type: ParseType, confidence: f64) {
        *self
            .parse_types
            .entry(parse_type.as_str().to_string())
            .or_insert(0) += 1;
        if confidence >= 0.7 {
            self.high_confidence += 1;
        } else {
            self.low_confidence += 1;
        }
    }

    /// Recomputes blocking coverage from the final codes.
    pub fn record_blocking<'a>(
        &mut self,
        codes: impl Iterator<Item = (Option<&'a str>, Option<&'a str>)>,
    ) {
        let mut unique_last = HashSet::new();
        self.with_first_code = 0;
        self.with_last_code = 0;
        for (first, last) in codes {
            if first.is_some() {
                self.with_first_code += 1;
            }
            if let Some(code) = last {
                self.with_last_code += 1;
                unique_last.insert(code.to_string());
            }
        }
        self.unique_last_codes = unique_last.len();
    }
}

/// Summary of one orchestrated run, exported with `--report`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub dry_run: bool,
    pub contacts: Option<ContactStats>,
    pub flights: Option<FlightStats>,
    pub mentions: Option<MentionStats>,
    pub verification: Option<VerificationReport>,
    pub phase_times: BTreeMap<String, f64>,
    pub total_processing_time: f64,
}

impl PipelineStats {
    pub fn new(run_id: String, run_timestamp: NaiveDateTime, dry_run: bool) -> Self {
        Self {
            run_id,
            run_timestamp,
            dry_run,
            contacts: None,
            flights: None,
            mentions: None,
            verification: None,
            phase_times: BTreeMap::new(),
            total_processing_time: 0.0,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run statistics")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("📝 Run report written to {}", path.display());
        Ok(())
    }
}

// src/verify/mod.rs
//
// Post-run checks over L0 and L1. Referential gaps and broken invariants are
// failures; distribution anomalies are warnings.

use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio_postgres::GenericClient;

use crate::db::readers::{count_rows, require_tables};
use crate::db::schema::{
    CONTACTS_TABLE, CONTACT_PERSONS_TABLE, FLIGHT_EVENTS_TABLE, FLIGHT_PASSENGERS_PUBLIC_VIEW,
    FLIGHT_PASSENGERS_TABLE, IDENTITY_MENTIONS_TABLE, L0_BLACK_BOOK, L0_FLIGHT_LOGS,
    PHONE_NUMBERS_TABLE,
};
use crate::models::stats_models::PipelineKind;
use crate::utils::config::PipelineConfig;
use crate::utils::db_connect::PgPool;
use crate::utils::progress_bars::logging::PipelineLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub severity: Severity,
    pub count: i64,
    pub detail: String,
}

/// A gap query: counts offending rows. Any nonzero count is reported at
/// `on_gap` severity.
struct GapCheck {
    name: &'static str,
    on_gap: Severity,
    sql: &'static str,
}

const GAP_CHECKS: &[GapCheck] = &[
    GapCheck {
        name: "directory rows without a contact",
        on_gap: Severity::Fail,
        sql: "SELECT COUNT(*) FROM core.black_book b
              LEFT JOIN l1.contacts c ON c.l0_record_id = b.record_id
              WHERE c.contact_id IS NULL",
    },
    GapCheck {
        name: "persons without a parent contact",
        on_gap: Severity::Fail,
        sql: "SELECT COUNT(*) FROM l1.contact_persons p
              LEFT JOIN l1.contacts c ON c.contact_id = p.contact_id
              WHERE c.contact_id IS NULL",
    },
    GapCheck {
        name: "phones without a parent contact",
        on_gap: Severity::Fail,
        sql: "SELECT COUNT(*) FROM l1.phone_numbers ph
              LEFT JOIN l1.contacts c ON c.contact_id = ph.contact_id
              WHERE c.contact_id IS NULL",
    },
    GapCheck {
        name: "passengers without a parent flight",
        on_gap: Severity::Fail,
        sql: "SELECT COUNT(*) FROM l1.flight_passengers p
              LEFT JOIN l1.flight_events f ON f.flight_id = p.flight_id
              WHERE f.flight_id IS NULL",
    },
    GapCheck {
        name: "manifest rows without a passenger",
        on_gap: Severity::Warn,
        sql: "SELECT COUNT(*) FROM core.flight_logs f
              LEFT JOIN l1.flight_passengers p ON p.l0_id = f.id
              WHERE p.passenger_id IS NULL",
    },
    GapCheck {
        name: "household id disagrees with sibling count",
        on_gap: Severity::Fail,
        sql: "SELECT COUNT(*) FROM l1.contact_persons p
              JOIN (SELECT l0_record_id, COUNT(*) AS siblings
                    FROM l1.contact_persons GROUP BY l0_record_id) s
                ON s.l0_record_id = p.l0_record_id
              WHERE (p.household_id IS NOT NULL) <> (s.siblings > 1)",
    },
    GapCheck {
        name: "suppression flag inconsistent with victim/confidence",
        on_gap: Severity::Fail,
        sql: "SELECT COUNT(*) FROM l1.flight_passengers
              WHERE suppress_from_public <> (potential_victim OR identity_confidence < 0.3)",
    },
    GapCheck {
        name: "suppressed passengers visible in public view",
        on_gap: Severity::Fail,
        sql: "SELECT COUNT(*) FROM l1.flight_passengers_public v
              JOIN l1.flight_passengers p ON p.passenger_id = v.passenger_id
              WHERE p.suppress_from_public",
    },
    GapCheck {
        name: "blocking codes disagree with parsed components",
        on_gap: Severity::Fail,
        sql: "SELECT COUNT(*) FROM l1.identity_mentions
              WHERE (parsed_first IS NULL) <> (soundex_first IS NULL)
                 OR (parsed_last IS NULL) <> (soundex_last IS NULL)",
    },
];

/// Grouped counts reported for information only.
const DISTRIBUTIONS: &[(&str, &str)] = &[
    (
        "Entity type distribution",
        "SELECT entity_type, COUNT(*) FROM l1.contacts GROUP BY 1 ORDER BY 1",
    ),
    (
        "Country normalization",
        "SELECT CASE
                    WHEN country_iso IS NOT NULL THEN 'mapped'
                    WHEN COALESCE(country_raw, '') <> '' THEN 'unmapped'
                    ELSE 'missing'
                END, COUNT(*)
         FROM l1.contacts GROUP BY 1 ORDER BY 1",
    ),
    (
        "Phones by type",
        "SELECT phone_type, COUNT(*) FROM l1.phone_numbers GROUP BY 1 ORDER BY 1",
    ),
    (
        "Identity confidence distribution",
        "SELECT identity_confidence::text, COUNT(*) FROM l1.flight_passengers GROUP BY 1 ORDER BY 1 DESC",
    ),
    (
        "Victim protection",
        "SELECT CASE
                    WHEN potential_victim THEN 'potential_victim'
                    WHEN suppress_from_public THEN 'suppressed'
                    ELSE 'public'
                END, COUNT(*)
         FROM l1.flight_passengers GROUP BY 1 ORDER BY 1",
    ),
    (
        "Mention sources",
        "SELECT source_table, COUNT(*) FROM l1.identity_mentions GROUP BY 1 ORDER BY 1",
    ),
];

const COUNTED_TABLES: &[&str] = &[
    L0_BLACK_BOOK,
    L0_FLIGHT_LOGS,
    CONTACTS_TABLE,
    CONTACT_PERSONS_TABLE,
    PHONE_NUMBERS_TABLE,
    FLIGHT_EVENTS_TABLE,
    FLIGHT_PASSENGERS_TABLE,
    IDENTITY_MENTIONS_TABLE,
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub record_counts: BTreeMap<String, i64>,
    pub checks: Vec<CheckResult>,
    pub distributions: BTreeMap<String, BTreeMap<String, i64>>,
    pub phones_valid: i64,
    pub phones_total: i64,
}

impl VerificationReport {
    pub fn worst(&self) -> Severity {
        self.checks
            .iter()
            .map(|c| c.severity)
            .max()
            .unwrap_or(Severity::Pass)
    }

    pub fn failures(&self) -> Vec<&CheckResult> {
        self.checks
            .iter()
            .filter(|c| c.severity == Severity::Fail)
            .collect()
    }

    /// Turns any `Fail` into an error naming every failed check.
    pub fn ensure_passed(&self) -> Result<()> {
        let failures = self.failures();
        if failures.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = failures
            .iter()
            .map(|c| format!("{} ({})", c.name, c.count))
            .collect();
        bail!("L1 verification failed: {}", names.join(", "));
    }
}

pub fn grade_gap(name: &'static str, count: i64, on_gap: Severity) -> CheckResult {
    let severity = if count == 0 { Severity::Pass } else { on_gap };
    CheckResult {
        name,
        severity,
        count,
        detail: if count == 0 {
            "none".to_string()
        } else {
            format!("{} rows", count)
        },
    }
}

/// Warns when the share of E.164-valid numbers falls below `threshold`
/// percent. No phones at all passes.
pub fn grade_phone_validity(valid: i64, total: i64, threshold: f64) -> CheckResult {
    let name = "phone validation rate";
    if total == 0 {
        return CheckResult {
            name,
            severity: Severity::Pass,
            count: 0,
            detail: "no phone numbers".to_string(),
        };
    }
    let percent = 100.0 * valid as f64 / total as f64;
    CheckResult {
        name,
        severity: if percent < threshold {
            Severity::Warn
        } else {
            Severity::Pass
        },
        count: total - valid,
        detail: format!(
            "{}/{} valid ({:.1}%, threshold {:.1}%)",
            valid, total, percent, threshold
        ),
    }
}

async fn scalar_count(client: &impl GenericClient, sql: &str, what: &str) -> Result<i64> {
    let row = client
        .query_one(sql, &[])
        .await
        .with_context(|| format!("Verification query failed: {}", what))?;
    Ok(row.get(0))
}

fn log_check(logger: &PipelineLogger, check: &CheckResult) {
    match check.severity {
        Severity::Pass => info!("[VERIFY] ✅ PASS {}: {}", check.name, check.detail),
        Severity::Warn => warn!("[VERIFY] ⚠️  WARN {}: {}", check.name, check.detail),
        Severity::Fail => error!("[VERIFY] ❌ FAIL {}: {}", check.name, check.detail),
    }
    logger.log_debug(&format!("{} -> {:?}", check.name, check.severity));
}

/// Runs every check. The report is returned even when checks fail; call
/// `ensure_passed` to make failures fatal.
pub async fn run_verification(pool: &PgPool, config: &PipelineConfig) -> Result<VerificationReport> {
    let logger = PipelineLogger::new(PipelineKind::Verify);
    logger.log_start(false);

    let conn = pool
        .get()
        .await
        .context("Failed to get DB connection for verification")?;
    let mut required: Vec<&str> = COUNTED_TABLES.to_vec();
    required.push(FLIGHT_PASSENGERS_PUBLIC_VIEW);
    require_tables(&*conn, &required).await?;

    let mut report = VerificationReport::default();

    logger.log_phase("Record counts", None);
    for table in COUNTED_TABLES {
        let n = count_rows(&*conn, table).await?;
        logger.log_stat(table, n);
        report.record_counts.insert(table.to_string(), n);
    }

    logger.log_phase("Referential and invariant checks", None);
    for check in GAP_CHECKS {
        let count = scalar_count(&*conn, check.sql, check.name).await?;
        let result = grade_gap(check.name, count, check.on_gap);
        log_check(&logger, &result);
        report.checks.push(result);
    }

    let row = conn
        .query_one(
            "SELECT COUNT(*) FILTER (WHERE is_valid), COUNT(*) FROM l1.phone_numbers",
            &[],
        )
        .await
        .context("Verification query failed: phone validity")?;
    report.phones_valid = row.get(0);
    report.phones_total = row.get(1);
    let phone_check = grade_phone_validity(
        report.phones_valid,
        report.phones_total,
        config.min_phone_valid_percent,
    );
    log_check(&logger, &phone_check);
    report.checks.push(phone_check);

    logger.log_phase("Distributions", None);
    for (title, sql) in DISTRIBUTIONS {
        let rows = conn
            .query(*sql, &[])
            .await
            .with_context(|| format!("Verification query failed: {}", title))?;
        let mut buckets = BTreeMap::new();
        for row in &rows {
            let key: Option<String> = row.get(0);
            let n: i64 = row.get(1);
            buckets.insert(key.unwrap_or_else(|| "NULL".to_string()), n);
        }
        let total = buckets.values().sum::<i64>() as usize;
        logger.log_distribution(
            title,
            buckets.iter().map(|(k, v)| (k.as_str(), *v as usize)),
            total,
        );
        report.distributions.insert(title.to_string(), buckets);
    }

    match report.worst() {
        Severity::Pass => info!("[VERIFY] ✅ All checks passed"),
        Severity::Warn => logger.log_warning("Checks passed with warnings"),
        Severity::Fail => error!("[VERIFY] ❌ {} check(s) failed", report.failures().len()),
    }
    logger.log_complete();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gap_grading() {
        assert_eq!(grade_gap("x", 0, Severity::Fail).severity, Severity::Pass);
        assert_eq!(grade_gap("x", 3, Severity::Fail).severity, Severity::Fail);
        assert_eq!(grade_gap("x", 3, Severity::Warn).severity, Severity::Warn);
    }

    #[test]
    fn test_phone_validity_threshold() {
        assert_eq!(grade_phone_validity(0, 0, 40.0).severity, Severity::Pass);
        assert_eq!(grade_phone_validity(39, 100, 40.0).severity, Severity::Warn);
        let ok = grade_phone_validity(40, 100, 40.0);
        assert_eq!(ok.severity, Severity::Pass);
        assert_eq!(ok.count, 60);
    }

    #[test]
    fn test_referential_gaps_are_fatal_and_manifest_gaps_warn() {
        let severity_of = |needle: &str| {
            GAP_CHECKS
                .iter()
                .find(|c| c.name.contains(needle))
                .map(|c| c.on_gap)
        };
        assert_eq!(severity_of("directory rows"), Some(Severity::Fail));
        assert_eq!(severity_of("without a parent"), Some(Severity::Fail));
        assert_eq!(severity_of("manifest rows"), Some(Severity::Warn));
        assert_eq!(severity_of("blocking codes"), Some(Severity::Fail));
    }

    #[test]
    fn test_report_failures_are_fatal_warnings_are_not() {
        let mut report = VerificationReport::default();
        report.checks.push(grade_gap("a", 0, Severity::Fail));
        report.checks.push(grade_phone_validity(1, 10, 40.0));
        assert_eq!(report.worst(), Severity::Warn);
        assert!(report.ensure_passed().is_ok());

        report.checks.push(grade_gap("orphans", 2, Severity::Fail));
        assert_eq!(report.worst(), Severity::Fail);
        let err = report.ensure_passed().unwrap_err().to_string();
        assert!(err.contains("orphans (2)"));
    }
}

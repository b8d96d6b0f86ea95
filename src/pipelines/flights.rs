// src/pipelines/flights.rs
//
// Manifest rows -> l1.flight_events (one per leg) and l1.flight_passengers
// (one per manifest row).

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar};
use log::debug;
use std::collections::HashSet;

use crate::db::readers::{load_flight_logs, require_tables};
use crate::db::schema::{
    ensure_flight_tables, FLIGHT_EVENTS_TABLE, FLIGHT_PASSENGERS_PUBLIC_VIEW,
    FLIGHT_PASSENGERS_TABLE, L0_FLIGHT_LOGS,
};
use crate::db::writer::{insert_rows, truncate_tables};
use crate::identity::keys;
use crate::models::normalized::{FlightEvent, FlightPassenger, IdentityConfidence};
use crate::models::raw::RawFlightRecord;
use crate::models::stats_models::{FlightStats, PipelineKind};
use crate::normalization::dates::parse_manifest_date;
use crate::normalization::flight_confidence::{score_passenger, PassengerFields};
use crate::pipelines::verify_written_counts;
use crate::utils::config::PipelineConfig;
use crate::utils::db_connect::PgPool;
use crate::utils::progress_bars::logging::PipelineLogger;

#[derive(Debug, Clone, Default)]
pub struct FlightTransform {
    /// Unique legs in first-seen order.
    pub events: Vec<FlightEvent>,
    pub passengers: Vec<FlightPassenger>,
    pub stats: FlightStats,
}

fn event_from_record(flight_id: uuid::Uuid, record: &RawFlightRecord) -> FlightEvent {
    FlightEvent {
        flight_id,
        flight_date: parse_manifest_date(record.date.as_deref()),
        flight_date_raw: record.date.clone(),
        year: record.year,
        aircraft_model: record.aircraft_model.clone(),
        aircraft_tail: record.aircraft_tail.clone(),
        aircraft_type: record.aircraft_type.clone(),
        num_seats: record.num_seats,
        dep_code: record.dep_code.clone(),
        arr_code: record.arr_code.clone(),
        dep_location: record.dep_location.clone(),
        arr_location: record.arr_location.clone(),
        flight_no: record.flight_no.clone(),
        data_source: record.data_source.clone(),
    }
}

/// Deduplicates legs and scores every passenger.
pub fn transform_flights(records: &[RawFlightRecord], pb: Option<&ProgressBar>) -> FlightTransform {
    let mut out = FlightTransform {
        stats: FlightStats {
            raw_records: records.len(),
            ..Default::default()
        },
        ..Default::default()
    };
    let mut seen = HashSet::new();

    for record in records {
        let flight_id = keys::flight_id(
            record.date.as_deref(),
            record.aircraft_tail.as_deref(),
            record.dep_code.as_deref(),
            record.arr_code.as_deref(),
            record.flight_no.as_deref(),
        );
        if seen.insert(flight_id) {
            let event = event_from_record(flight_id, record);
            if event.flight_date.is_none() {
                out.stats.unparseable_dates += 1;
                debug!("Flight {} has unparseable date {:?}", flight_id, record.date);
            }
            out.events.push(event);
        }

        let score = score_passenger(&PassengerFields::from_record(record));
        out.stats.record_confidence(score.confidence);
        if score.potential_victim {
            out.stats.potential_victims += 1;
        }
        if score.suppress_from_public {
            out.stats.suppressed += 1;
        }

        out.passengers.push(FlightPassenger {
            passenger_id: keys::passenger_id(record.id),
            flight_id,
            l0_id: record.id,
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            first_last: record.first_last.clone(),
            initials: record.initials.clone(),
            pass_position: record.pass_position.clone(),
            comment: record.comment.clone(),
            identity_confidence: score.confidence,
            known: record.known.clone(),
            potential_victim: score.potential_victim,
            suppress_from_public: score.suppress_from_public,
        });

        if let Some(pb) = pb {
            pb.inc(1);
        }
    }

    out.stats.unique_flights = out.events.len();
    out.stats.passengers = out.passengers.len();
    out
}

pub fn report_flight_stats(logger: &PipelineLogger, stats: &FlightStats) {
    logger.log_stat("Unique flights", stats.unique_flights);
    logger.log_stat("Passenger records", stats.passengers);
    let labels = [
        IdentityConfidence::Verified,
        IdentityConfidence::Unverified,
        IdentityConfidence::Initials,
        IdentityConfidence::Descriptive,
        IdentityConfidence::Unknown,
    ]
    .map(|c| c.label());
    logger.log_distribution(
        "Identity confidence distribution",
        labels.iter().map(|label| {
            (
                *label,
                stats.confidence_distribution.get(*label).copied().unwrap_or(0),
            )
        }),
        stats.passengers,
    );
    logger.log_stat("Potential victims", stats.potential_victims);
    logger.log_stat("Suppressed from public view", stats.suppressed);
    logger.log_stat("Publicly visible", stats.public_rows());
    logger.log_data_quality_issue("unparseable flight dates", stats.unparseable_dates);
}

/// Loads `core.flight_logs` and rebuilds the flight tables in one transaction.
pub async fn run_flights(
    pool: &PgPool,
    config: &PipelineConfig,
    multi_progress: Option<&MultiProgress>,
) -> Result<FlightTransform> {
    let logger = PipelineLogger::new(PipelineKind::Flights);
    logger.log_start(config.dry_run);

    let mut conn = pool
        .get()
        .await
        .context("Failed to get DB connection for flight pipeline")?;

    logger.log_phase("Loading manifest rows", Some(L0_FLIGHT_LOGS));
    require_tables(&*conn, &[L0_FLIGHT_LOGS]).await?;
    let records = load_flight_logs(&*conn).await?;
    logger.log_loaded(records.len(), L0_FLIGHT_LOGS);

    logger.log_phase("Deduplicating flights and scoring passengers", None);
    let pb = config
        .progress
        .row_bar(multi_progress, records.len() as u64, "✈️ Scoring passengers");
    let transform = transform_flights(&records, pb.as_ref());
    if let Some(pb) = pb {
        pb.finish_with_message(format!(
            "✈️ {} flights, {} passengers",
            transform.events.len(),
            transform.passengers.len()
        ));
    }
    report_flight_stats(&logger, &transform.stats);

    if config.dry_run {
        logger.log_dry_run();
        logger.log_complete();
        return Ok(transform);
    }

    logger.log_phase("Writing L1 flight tables", None);
    let transaction = conn
        .transaction()
        .await
        .context("Failed to start flight pipeline transaction")?;
    ensure_flight_tables(&transaction).await?;
    truncate_tables(&transaction, &[FLIGHT_PASSENGERS_TABLE, FLIGHT_EVENTS_TABLE]).await?;

    let batches = insert_rows(&transaction, &transform.events, config.batch_size).await?;
    logger.log_written(FLIGHT_EVENTS_TABLE, transform.events.len(), batches);
    let batches = insert_rows(&transaction, &transform.passengers, config.batch_size).await?;
    logger.log_written(FLIGHT_PASSENGERS_TABLE, transform.passengers.len(), batches);

    transaction
        .commit()
        .await
        .context("Failed to commit flight pipeline transaction")?;
    drop(conn);

    verify_written_counts(
        pool,
        &[
            (FLIGHT_EVENTS_TABLE, transform.events.len()),
            (FLIGHT_PASSENGERS_TABLE, transform.passengers.len()),
            (FLIGHT_PASSENGERS_PUBLIC_VIEW, transform.stats.public_rows()),
        ],
    )
    .await?;

    logger.log_complete();
    Ok(transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn leg(id: i32, first: &str, last: &str, known: &str) -> RawFlightRecord {
        RawFlightRecord {
            id,
            date: Some("3/7/2002".to_string()),
            year: Some(2002),
            aircraft_tail: Some("N908JE".to_string()),
            dep_code: Some("PBI".to_string()),
            arr_code: Some("TEB".to_string()),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            known: Some(known.to_string()),
            ..Default::default()
        }
    }

    fn sample() -> Vec<RawFlightRecord> {
        let mut other_leg = leg(4, "John", "Smith", "No");
        other_leg.dep_code = Some("TEB".to_string());
        other_leg.arr_code = Some("PBI".to_string());
        other_leg.date = Some("sometime in 2002".to_string());
        vec![
            leg(1, "John", "Smith", "Yes"),
            leg(2, "Female (3)", "", ""),
            leg(3, "?", "?", "No"),
            other_leg,
        ]
    }

    #[test]
    fn test_rows_sharing_a_key_collapse_to_one_event() {
        let out = transform_flights(&sample(), None);
        assert_eq!(out.events.len(), 2);
        assert_eq!(out.passengers.len(), 4);
        assert_eq!(out.stats.unique_flights, 2);
        assert_eq!(out.passengers[0].flight_id, out.passengers[2].flight_id);
        assert_ne!(out.passengers[0].flight_id, out.passengers[3].flight_id);
        assert_eq!(
            out.events[0].flight_date,
            NaiveDate::from_ymd_opt(2002, 3, 7)
        );
        assert_eq!(out.events[0].flight_id.to_string(), "bed759a4-0206-6ff6-8f74-4d9687e83267");
    }

    #[test]
    fn test_unparseable_date_keeps_raw_text() {
        let out = transform_flights(&sample(), None);
        assert_eq!(out.events[1].flight_date, None);
        assert_eq!(out.events[1].flight_date_raw.as_deref(), Some("sometime in 2002"));
        assert_eq!(out.stats.unparseable_dates, 1);
    }

    #[test]
    fn test_scores_and_suppression_counts() {
        let out = transform_flights(&sample(), None);
        let confidences: Vec<f64> = out
            .passengers
            .iter()
            .map(|p| p.identity_confidence.value())
            .collect();
        assert_eq!(confidences, vec![1.0, 0.1, 0.0, 0.7]);
        assert_eq!(out.stats.potential_victims, 1);
        assert_eq!(out.stats.suppressed, 2);
        assert_eq!(out.stats.public_rows(), 2);
        for p in &out.passengers {
            assert_eq!(
                p.suppress_from_public,
                p.potential_victim || p.identity_confidence.value() < 0.3
            );
        }
    }

    #[test]
    fn test_rerun_reproduces_identifiers() {
        let first = transform_flights(&sample(), None);
        let second = transform_flights(&sample(), None);
        assert_eq!(first.events, second.events);
        assert_eq!(first.passengers, second.passengers);
    }
}

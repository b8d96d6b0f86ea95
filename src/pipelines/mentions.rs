// src/pipelines/mentions.rs
//
// Named passengers and directory persons -> l1.identity_mentions, each with
// parsed components and Soundex blocking codes.

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar};
use log::debug;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::readers::{load_contact_person_rows, load_passenger_name_rows, require_tables};
use crate::db::schema::{
    ensure_mention_tables, CONTACTS_TABLE, CONTACT_PERSONS_TABLE, FLIGHT_PASSENGERS_TABLE,
    IDENTITY_MENTIONS_TABLE,
};
use crate::db::writer::{insert_rows, truncate_tables};
use crate::identity::blocking::assign_blocking_keys;
use crate::identity::keys;
use crate::identity::name_parser::{apply_hints, parse_name};
use crate::identity::tagger::NameTagger;
use crate::models::normalized::{
    EntityType, IdentityMention, PassengerNameRow, PersonNameRow, SourceTable,
};
use crate::models::stats_models::{MentionStats, PipelineKind};
use crate::normalization::flight_confidence::PUBLIC_CONFIDENCE_FLOOR;
use crate::pipelines::contacts::ContactTransform;
use crate::pipelines::flights::FlightTransform;
use crate::pipelines::verify_written_counts;
use crate::utils::capabilities::Capabilities;
use crate::utils::config::PipelineConfig;
use crate::utils::db_connect::PgPool;
use crate::utils::progress_bars::logging::PipelineLogger;

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn join_first_last(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let joined = format!("{} {}", first.unwrap_or(""), last.unwrap_or(""));
    present(Some(&joined)).map(str::to_string)
}

/// Passenger display name: `first_last`, else "first last".
pub fn passenger_raw_name(row: &PassengerNameRow) -> Option<String> {
    present(row.first_last.as_deref())
        .map(str::to_string)
        .or_else(|| join_first_last(row.first_name.as_deref(), row.last_name.as_deref()))
}

/// Person display name: the undecomposed text, else "first last".
pub fn person_raw_name(row: &PersonNameRow) -> Option<String> {
    present(row.extracted_raw.as_deref())
        .map(str::to_string)
        .or_else(|| join_first_last(row.extracted_first.as_deref(), row.extracted_last.as_deref()))
}

#[allow(clippy::too_many_arguments)]
fn build_mention(
    source_table: SourceTable,
    source_id: Uuid,
    l0_source_id: String,
    raw_name: String,
    first_hint: Option<&str>,
    last_hint: Option<&str>,
    tagger: &dyn NameTagger,
    stats: &mut MentionStats,
) -> IdentityMention {
    let outcome = parse_name(&raw_name, tagger);
    if outcome.used_fallback {
        stats.tagger_fallbacks += 1;
    }
    let mut parsed = outcome.parsed;
    apply_hints(&mut parsed, first_hint, last_hint);
    stats.record_parse(parsed.parse_type, parsed.confidence);

    IdentityMention {
        mention_id: keys::mention_id(source_table, &source_id),
        source_table,
        source_id,
        l0_source_id,
        raw_name,
        parsed,
        soundex_first: None,
        soundex_last: None,
    }
}

/// Builds mentions from both sources: passengers first, then persons, each in
/// input order. Passengers below the public confidence floor and persons of
/// non-people contacts are ignored.
pub fn transform_mentions(
    passengers: &[PassengerNameRow],
    persons: &[PersonNameRow],
    tagger: &dyn NameTagger,
    pb: Option<&ProgressBar>,
) -> (Vec<IdentityMention>, MentionStats) {
    let mut stats = MentionStats::default();
    let mut mentions = Vec::with_capacity(passengers.len() + persons.len());

    for row in passengers {
        if let Some(pb) = pb {
            pb.inc(1);
        }
        if row.identity_confidence < PUBLIC_CONFIDENCE_FLOOR {
            continue;
        }
        let Some(raw_name) = passenger_raw_name(row) else {
            stats.skipped_without_name += 1;
            debug!("Passenger {} has no usable name", row.l0_id);
            continue;
        };
        mentions.push(build_mention(
            SourceTable::FlightPassengers,
            row.passenger_id,
            row.l0_id.to_string(),
            raw_name,
            row.first_name.as_deref(),
            row.last_name.as_deref(),
            tagger,
            &mut stats,
        ));
        stats.from_flight_passengers += 1;
    }

    for row in persons {
        if let Some(pb) = pb {
            pb.inc(1);
        }
        if !row.entity_type.yields_mentions() {
            continue;
        }
        let Some(raw_name) = person_raw_name(row) else {
            stats.skipped_without_name += 1;
            debug!("Person {} has no usable name", row.person_id);
            continue;
        };
        mentions.push(build_mention(
            SourceTable::ContactPersons,
            row.person_id,
            row.l0_record_id.to_string(),
            raw_name,
            row.extracted_first.as_deref(),
            row.extracted_last.as_deref(),
            tagger,
            &mut stats,
        ));
        stats.from_contact_persons += 1;
    }

    assign_blocking_keys(&mut mentions);
    stats.record_blocking(
        mentions
            .iter()
            .map(|m| (m.soundex_first.as_deref(), m.soundex_last.as_deref())),
    );
    (mentions, stats)
}

/// Mention sources taken from the results of this run's earlier stages.
pub fn sources_from_transforms(
    contacts: &ContactTransform,
    flights: &FlightTransform,
) -> (Vec<PassengerNameRow>, Vec<PersonNameRow>) {
    let passengers = flights.passengers.iter().map(PassengerNameRow::from).collect();
    let entity_types: HashMap<Uuid, EntityType> = contacts
        .contacts
        .iter()
        .map(|c| (c.contact_id, c.entity_type))
        .collect();
    let persons = contacts
        .persons
        .iter()
        .filter_map(|person| {
            entity_types
                .get(&person.contact_id)
                .map(|entity_type| PersonNameRow::from_person(person, *entity_type))
        })
        .collect();
    (passengers, persons)
}

pub fn report_mention_stats(logger: &PipelineLogger, stats: &MentionStats) {
    logger.log_distribution(
        "Source distribution",
        [
            (SourceTable::FlightPassengers.as_str(), stats.from_flight_passengers),
            (SourceTable::ContactPersons.as_str(), stats.from_contact_persons),
        ],
        stats.total(),
    );
    logger.log_distribution(
        "Parse type distribution",
        stats.parse_types.iter().map(|(k, v)| (k.as_str(), *v)),
        stats.total(),
    );
    logger.log_stat("High confidence (>= 0.7)", stats.high_confidence);
    logger.log_stat("Low confidence (< 0.7)", stats.low_confidence);
    logger.log_stat("Tagger fallbacks", stats.tagger_fallbacks);
    logger.log_stat("With first-name code", stats.with_first_code);
    logger.log_stat("With last-name code", stats.with_last_code);
    logger.log_stat("Unique last-name codes", stats.unique_last_codes);
    logger.log_data_quality_issue("rows without a usable name", stats.skipped_without_name);
}

/// Parses, blocks and writes mentions. With `sources` the rows come from this
/// run's in-memory results, otherwise they are re-read from L1.
pub async fn run_mentions(
    pool: &PgPool,
    config: &PipelineConfig,
    capabilities: &Capabilities,
    sources: Option<(Vec<PassengerNameRow>, Vec<PersonNameRow>)>,
    multi_progress: Option<&MultiProgress>,
) -> Result<(Vec<IdentityMention>, MentionStats)> {
    let logger = PipelineLogger::new(PipelineKind::Mentions);
    logger.log_start(config.dry_run);

    let mut conn = pool
        .get()
        .await
        .context("Failed to get DB connection for mention pipeline")?;

    let (passengers, persons) = match sources {
        Some(sources) => {
            logger.log_phase("Using in-memory L1 rows", None);
            sources
        }
        None => {
            logger.log_phase("Loading L1 name sources", None);
            require_tables(
                &*conn,
                &[FLIGHT_PASSENGERS_TABLE, CONTACT_PERSONS_TABLE, CONTACTS_TABLE],
            )
            .await?;
            let passengers = load_passenger_name_rows(&*conn).await?;
            logger.log_loaded(passengers.len(), FLIGHT_PASSENGERS_TABLE);
            let persons = load_contact_person_rows(&*conn).await?;
            logger.log_loaded(persons.len(), CONTACT_PERSONS_TABLE);
            (passengers, persons)
        }
    };

    logger.log_phase(
        "Parsing names",
        Some(&format!("tagger: {}", capabilities.tagger.backend())),
    );
    let pb = config.progress.row_bar(
        multi_progress,
        (passengers.len() + persons.len()) as u64,
        "👤 Parsing names",
    );
    let (mentions, stats) =
        transform_mentions(&passengers, &persons, capabilities.tagger.as_ref(), pb.as_ref());
    if let Some(pb) = pb {
        pb.finish_with_message(format!("👤 {} identity mentions", mentions.len()));
    }
    report_mention_stats(&logger, &stats);

    if config.dry_run {
        logger.log_dry_run();
        logger.log_complete();
        return Ok((mentions, stats));
    }

    logger.log_phase("Writing identity mentions", None);
    let transaction = conn
        .transaction()
        .await
        .context("Failed to start mention pipeline transaction")?;
    ensure_mention_tables(&transaction).await?;
    truncate_tables(&transaction, &[IDENTITY_MENTIONS_TABLE]).await?;
    let batches = insert_rows(&transaction, &mentions, config.batch_size).await?;
    logger.log_written(IDENTITY_MENTIONS_TABLE, mentions.len(), batches);
    transaction
        .commit()
        .await
        .context("Failed to commit mention pipeline transaction")?;
    drop(conn);

    verify_written_counts(pool, &[(IDENTITY_MENTIONS_TABLE, mentions.len())]).await?;

    logger.log_complete();
    Ok((mentions, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::blocking::blocking_invariant_holds;
    use crate::identity::tagger::{LexiconTagger, UnavailableTagger};
    use crate::models::normalized::ParseType;

    fn passenger(l0_id: i32, first_last: Option<&str>, first: &str, last: &str, conf: f64) -> PassengerNameRow {
        PassengerNameRow {
            passenger_id: keys::passenger_id(l0_id),
            l0_id,
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            first_last: first_last.map(str::to_string),
            identity_confidence: conf,
        }
    }

    fn person(id: u128, raw: &str, first: &str, last: &str, entity_type: EntityType) -> PersonNameRow {
        PersonNameRow {
            person_id: Uuid::from_u128(id),
            l0_record_id: Uuid::from_u128(id + 100),
            extracted_first: Some(first.to_string()),
            extracted_last: Some(last.to_string()),
            extracted_raw: Some(raw.to_string()),
            entity_type,
        }
    }

    fn sources() -> (Vec<PassengerNameRow>, Vec<PersonNameRow>) {
        (
            vec![
                passenger(1, Some("John Smith"), "John", "Smith", 1.0),
                passenger(2, None, "Jo", "Sm", 0.3),
                passenger(3, None, "Female (3)", "", 0.1),
                passenger(4, Some("  "), "", "", 0.7),
            ],
            vec![
                person(10, "Doe, Jane", "Jane", "Doe", EntityType::Individual),
                person(11, "", "Mary", "Roe", EntityType::Household),
                person(12, "Acme Holdings", "", "", EntityType::Organization),
            ],
        )
    }

    #[test]
    fn test_source_filters_and_ordering() {
        let (passengers, persons) = sources();
        let (mentions, stats) = transform_mentions(&passengers, &persons, &LexiconTagger, None);
        assert_eq!(stats.from_flight_passengers, 2);
        assert_eq!(stats.from_contact_persons, 2);
        assert_eq!(stats.skipped_without_name, 1);
        assert_eq!(mentions.len(), stats.total());

        let raw: Vec<&str> = mentions.iter().map(|m| m.raw_name.as_str()).collect();
        assert_eq!(raw, vec!["John Smith", "Jo Sm", "Doe, Jane", "Mary Roe"]);
        assert_eq!(mentions[0].l0_source_id, "1");
        assert_eq!(mentions[2].l0_source_id, Uuid::from_u128(110).to_string());
        assert_eq!(mentions[2].source_table.l0_table(), "black_book");
    }

    #[test]
    fn test_blocking_codes_follow_components() {
        let (passengers, persons) = sources();
        let (mentions, stats) = transform_mentions(&passengers, &persons, &UnavailableTagger, None);
        assert!(mentions.iter().all(blocking_invariant_holds));
        assert_eq!(mentions[0].soundex_last.as_deref(), Some("S530"));
        assert_eq!(mentions[0].soundex_first.as_deref(), Some("J500"));
        assert_eq!(stats.with_last_code, mentions.len());
        assert_eq!(stats.tagger_fallbacks, mentions.len());
    }

    #[test]
    fn test_hints_fill_single_token_parses() {
        let passengers = vec![passenger(5, Some("Smith"), "John", "Smith", 0.7)];
        let (mentions, _) = transform_mentions(&passengers, &[], &UnavailableTagger, None);
        let parsed = &mentions[0].parsed;
        assert_eq!(parsed.last.as_deref(), Some("Smith"));
        assert_eq!(parsed.first.as_deref(), Some("John"));
        assert_eq!(parsed.parse_type, ParseType::Unknown);
        assert_eq!(mentions[0].soundex_first.as_deref(), Some("J500"));
    }

    #[test]
    fn test_rerun_reproduces_mentions() {
        let (passengers, persons) = sources();
        let first = transform_mentions(&passengers, &persons, &LexiconTagger, None);
        let second = transform_mentions(&passengers, &persons, &LexiconTagger, None);
        assert_eq!(first.0, second.0);
    }

    #[test]
    fn test_sources_from_in_memory_transforms() {
        use crate::models::raw::{RawContactRecord, RawFlightRecord};
        use crate::normalization::phone::NoPhoneParser;
        use crate::pipelines::contacts::transform_contacts;
        use crate::pipelines::flights::transform_flights;

        let contacts = transform_contacts(
            &[
                RawContactRecord {
                    record_id: Uuid::from_u128(1),
                    name: Some("Smith, John & Jane".to_string()),
                    ..Default::default()
                },
                RawContactRecord {
                    record_id: Uuid::from_u128(2),
                    name: Some("Acme".to_string()),
                    company_text: Some("Acme".to_string()),
                    ..Default::default()
                },
            ],
            &NoPhoneParser,
            None,
        );
        let flights = transform_flights(
            &[RawFlightRecord {
                id: 7,
                first_name: Some("?".to_string()),
                ..Default::default()
            }],
            None,
        );
        let (passengers, persons) = sources_from_transforms(&contacts, &flights);
        assert_eq!(passengers.len(), 1);
        assert_eq!(persons.len(), 3);

        let (mentions, stats) = transform_mentions(&passengers, &persons, &LexiconTagger, None);
        // The placeholder passenger and the organization never become mentions.
        assert_eq!(stats.from_flight_passengers, 0);
        assert_eq!(stats.from_contact_persons, 2);
        assert_eq!(mentions[0].raw_name, "John Smith");
    }
}

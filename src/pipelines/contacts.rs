// src/pipelines/contacts.rs
//
// Directory rows -> l1.contacts, l1.contact_persons, l1.phone_numbers.

use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar};
use log::debug;

use crate::db::readers::{load_black_book, require_tables};
use crate::db::schema::{
    ensure_contact_tables, CONTACTS_TABLE, CONTACT_PERSONS_TABLE, L0_BLACK_BOOK,
    PHONE_NUMBERS_TABLE,
};
use crate::db::writer::{insert_rows, truncate_tables};
use crate::identity::keys;
use crate::models::normalized::{ContactPerson, NormalizedContact, PhoneNumber};
use crate::models::raw::RawContactRecord;
use crate::models::stats_models::{ContactStats, PipelineKind};
use crate::normalization::country::normalize_country;
use crate::normalization::decompose::decompose_multi_person;
use crate::normalization::entity_type::{classify_entity_type, ClassifierInput};
use crate::normalization::phone::{extract_phones, PhoneParser};
use crate::pipelines::verify_written_counts;
use crate::utils::capabilities::Capabilities;
use crate::utils::config::PipelineConfig;
use crate::utils::db_connect::PgPool;
use crate::utils::progress_bars::logging::PipelineLogger;

/// Everything derived from one pass over the directory.
#[derive(Debug, Clone, Default)]
pub struct ContactTransform {
    pub contacts: Vec<NormalizedContact>,
    pub persons: Vec<ContactPerson>,
    pub phones: Vec<PhoneNumber>,
    pub stats: ContactStats,
}

fn transform_record(
    record: &RawContactRecord,
    phone_parser: &dyn PhoneParser,
    out: &mut ContactTransform,
) {
    let stats = &mut out.stats;
    let l0_record_id = record.record_id;

    let source_values = record.source_values();
    let stored_hash = keys::row_content_id(&source_values);
    if stored_hash != l0_record_id {
        stats.record_id_drift += 1;
        debug!(
            "record_id {} differs from its content hash {} (sha256 {})",
            l0_record_id,
            stored_hash,
            keys::content_digest_hex(&source_values)
        );
    }

    let country_iso = normalize_country(record.country.as_deref());
    if country_iso.is_some() {
        stats.country_mapped += 1;
    } else if record.country.as_deref().is_some_and(|c| !c.is_empty()) {
        stats.country_unmapped += 1;
        debug!("Unmapped country '{}'", record.country.as_deref().unwrap_or_default());
    }

    let entity_type = classify_entity_type(&ClassifierInput::from_record(record));
    stats.record_entity_type(entity_type);

    let contact_id = keys::contact_id(&l0_record_id);
    out.contacts.push(NormalizedContact {
        contact_id,
        l0_record_id,
        page: record.page,
        name: record.name.clone(),
        company_text: record.company_text.clone(),
        surname: record.surname.clone(),
        first_name: record.first_name.clone(),
        address: record.address.clone(),
        city: record.city.clone(),
        zip: record.zip.clone(),
        country_raw: record.country.clone(),
        country_iso: country_iso.clone(),
        entity_type,
        email: record.email.clone(),
    });

    let people = decompose_multi_person(
        record.name.as_deref().unwrap_or(""),
        record.surname.as_deref(),
        record.first_name.as_deref(),
    );
    let household_id = if people.len() > 1 {
        stats.multi_person_entries += 1;
        Some(keys::household_id(&l0_record_id))
    } else {
        None
    };
    stats.total_persons += people.len();
    for person in people {
        out.persons.push(ContactPerson {
            person_id: keys::person_id(&l0_record_id, person.position),
            contact_id,
            l0_record_id,
            household_id,
            extracted_first: person.first,
            extracted_last: person.last,
            extracted_raw: person.raw.unwrap_or_default(),
            position_in_record: person.position as i32,
        });
    }

    for (ordinal, (phone_type, phone)) in extract_phones(record, country_iso.as_deref(), phone_parser)
        .into_iter()
        .enumerate()
    {
        stats.phones_total += 1;
        if phone.is_valid {
            stats.phones_valid += 1;
        }
        out.phones.push(PhoneNumber {
            phone_id: keys::phone_id(&l0_record_id, ordinal + 1),
            contact_id,
            l0_record_id,
            phone_type,
            raw_value: phone.raw_value,
            e164_format: phone.e164_format,
            country_code: phone.country_code,
            national_format: phone.national_format,
            is_valid: phone.is_valid,
            parse_region: phone.parse_region,
        });
    }
}

/// Normalizes every directory row. Output order follows input order.
pub fn transform_contacts(
    records: &[RawContactRecord],
    phone_parser: &dyn PhoneParser,
    pb: Option<&ProgressBar>,
) -> ContactTransform {
    let mut out = ContactTransform {
        stats: ContactStats {
            raw_records: records.len(),
            ..Default::default()
        },
        ..Default::default()
    };
    for record in records {
        transform_record(record, phone_parser, &mut out);
        if let Some(pb) = pb {
            pb.inc(1);
        }
    }
    out
}

pub fn report_contact_stats(logger: &PipelineLogger, stats: &ContactStats) {
    logger.log_distribution(
        "Entity type distribution",
        [
            ("individual", stats.individual),
            ("household", stats.household),
            ("organization", stats.organization),
            ("unknown", stats.unknown),
        ],
        stats.raw_records,
    );
    logger.log_stat("Multi-person entries", stats.multi_person_entries);
    logger.log_stat("Total persons", stats.total_persons);
    logger.log_stat("Phones total", stats.phones_total);
    logger.log_stat("Phones valid (E.164)", stats.phones_valid);
    if let Some(percent) = stats.phone_success_percent() {
        logger.log_stat("Phone success rate", format!("{:.1}%", percent));
    }
    logger.log_stat("Countries mapped", stats.country_mapped);
    logger.log_stat("Countries unmapped", stats.country_unmapped);
    logger.log_data_quality_issue("record_id drift from content hash", stats.record_id_drift);
}

/// Loads `core.black_book`, normalizes it and rebuilds the contact tables in
/// one transaction.
pub async fn run_contacts(
    pool: &PgPool,
    config: &PipelineConfig,
    capabilities: &Capabilities,
    multi_progress: Option<&MultiProgress>,
) -> Result<ContactTransform> {
    let logger = PipelineLogger::new(PipelineKind::Contacts);
    logger.log_start(config.dry_run);

    let mut conn = pool
        .get()
        .await
        .context("Failed to get DB connection for contact pipeline")?;

    logger.log_phase("Loading directory rows", Some(L0_BLACK_BOOK));
    require_tables(&*conn, &[L0_BLACK_BOOK]).await?;
    let records = load_black_book(&*conn).await?;
    logger.log_loaded(records.len(), L0_BLACK_BOOK);

    logger.log_phase("Normalizing contacts", None);
    let pb = config
        .progress
        .row_bar(multi_progress, records.len() as u64, "📒 Normalizing contacts");
    let transform = transform_contacts(&records, capabilities.phone.as_ref(), pb.as_ref());
    if let Some(pb) = pb {
        pb.finish_with_message(format!(
            "📒 {} contacts, {} persons, {} phones",
            transform.contacts.len(),
            transform.persons.len(),
            transform.phones.len()
        ));
    }
    report_contact_stats(&logger, &transform.stats);

    if config.dry_run {
        logger.log_dry_run();
        logger.log_complete();
        return Ok(transform);
    }

    logger.log_phase("Writing L1 contact tables", None);
    let transaction = conn
        .transaction()
        .await
        .context("Failed to start contact pipeline transaction")?;
    ensure_contact_tables(&transaction).await?;
    truncate_tables(
        &transaction,
        &[PHONE_NUMBERS_TABLE, CONTACT_PERSONS_TABLE, CONTACTS_TABLE],
    )
    .await?;

    let batches = insert_rows(&transaction, &transform.contacts, config.batch_size).await?;
    logger.log_written(CONTACTS_TABLE, transform.contacts.len(), batches);
    let batches = insert_rows(&transaction, &transform.persons, config.batch_size).await?;
    logger.log_written(CONTACT_PERSONS_TABLE, transform.persons.len(), batches);
    let batches = insert_rows(&transaction, &transform.phones, config.batch_size).await?;
    logger.log_written(PHONE_NUMBERS_TABLE, transform.phones.len(), batches);

    transaction
        .commit()
        .await
        .context("Failed to commit contact pipeline transaction")?;
    drop(conn);

    verify_written_counts(
        pool,
        &[
            (CONTACTS_TABLE, transform.contacts.len()),
            (CONTACT_PERSONS_TABLE, transform.persons.len()),
            (PHONE_NUMBERS_TABLE, transform.phones.len()),
        ],
    )
    .await?;

    logger.log_complete();
    Ok(transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::normalized::{EntityType, PhoneType};
    use crate::normalization::phone::{LibPhoneNumber, NoPhoneParser};
    use uuid::Uuid;

    fn record(id: u128, name: &str) -> RawContactRecord {
        RawContactRecord {
            record_id: Uuid::from_u128(id),
            page: Some(1),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn sample() -> Vec<RawContactRecord> {
        let mut couple = record(1, "Smith, John & Jane");
        couple.surname = Some("Smith".to_string());
        couple.country = Some("U.K.".to_string());
        couple.phone_home = Some("020 7219 3000 | 020 7946 0000".to_string());

        let mut single = record(2, "Doe, Richard");
        single.surname = Some("Doe".to_string());
        single.first_name = Some("Richard".to_string());
        single.country = Some("Atlantis".to_string());
        single.phone_mobile = Some("not a number".to_string());

        let mut company = record(3, "Acme Holdings");
        company.company_text = Some("Acme Holdings Ltd".to_string());

        vec![couple, single, company]
    }

    #[test]
    fn test_one_contact_per_row_and_household_rule() {
        let out = transform_contacts(&sample(), &NoPhoneParser, None);
        assert_eq!(out.contacts.len(), 3);
        assert_eq!(out.stats.raw_records, 3);
        assert_eq!(out.contacts[0].entity_type, EntityType::Household);
        assert_eq!(out.contacts[2].entity_type, EntityType::Organization);

        let couple: Vec<_> = out
            .persons
            .iter()
            .filter(|p| p.l0_record_id == Uuid::from_u128(1))
            .collect();
        assert_eq!(couple.len(), 2);
        assert!(couple.iter().all(|p| p.household_id.is_some()));
        assert_eq!(couple[0].household_id, couple[1].household_id);
        assert_eq!(couple[0].extracted_first, "John");
        assert_eq!(couple[1].extracted_first, "Jane");
        assert_eq!(couple[1].position_in_record, 2);

        // Single-person rows never get a household.
        assert!(out
            .persons
            .iter()
            .filter(|p| p.l0_record_id != Uuid::from_u128(1))
            .all(|p| p.household_id.is_none()));
        assert_eq!(out.stats.multi_person_entries, 1);
        assert_eq!(out.stats.total_persons, out.persons.len());
    }

    #[test]
    fn test_country_counters() {
        let out = transform_contacts(&sample(), &NoPhoneParser, None);
        assert_eq!(out.contacts[0].country_iso.as_deref(), Some("GB"));
        assert_eq!(out.contacts[1].country_iso, None);
        assert_eq!(out.contacts[1].country_raw.as_deref(), Some("Atlantis"));
        assert_eq!(out.stats.country_mapped, 1);
        // Missing countries are neither mapped nor unmapped.
        assert_eq!(out.stats.country_unmapped, 1);
    }

    #[test]
    fn test_phones_are_kept_even_when_invalid() {
        let out = transform_contacts(&sample(), &LibPhoneNumber, None);
        assert_eq!(out.phones.len(), 3);
        assert_eq!(out.stats.phones_total, 3);
        let home: Vec<_> = out
            .phones
            .iter()
            .filter(|p| p.phone_type == PhoneType::Home)
            .collect();
        assert_eq!(home.len(), 2);
        assert_eq!(home[0].e164_format.as_deref(), Some("+442072193000"));
        let mobile = out
            .phones
            .iter()
            .find(|p| p.phone_type == PhoneType::Mobile)
            .unwrap();
        assert!(!mobile.is_valid);
        assert_eq!(mobile.e164_format, None);
        assert_eq!(out.stats.phones_valid, out.phones.iter().filter(|p| p.is_valid).count());
    }

    #[test]
    fn test_rerun_reproduces_identifiers() {
        let first = transform_contacts(&sample(), &LibPhoneNumber, None);
        let second = transform_contacts(&sample(), &LibPhoneNumber, None);
        assert_eq!(first.contacts, second.contacts);
        assert_eq!(first.persons, second.persons);
        assert_eq!(first.phones, second.phones);

        let mut ids: Vec<Uuid> = first.persons.iter().map(|p| p.person_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), first.persons.len());
    }

    #[test]
    fn test_record_id_drift_is_counted() {
        let mut row = record(0, "Doe, Jane");
        row.record_id = keys::row_content_id(&row.source_values());
        let drifted = record(9, "Doe, Jane");
        let out = transform_contacts(&[row, drifted], &NoPhoneParser, None);
        assert_eq!(out.stats.record_id_drift, 1);
    }
}

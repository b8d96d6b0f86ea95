// src/db/readers.rs
//
// L0 loaders, L1 re-reads for the standalone mention binary, and the
// precondition checks every pipeline runs before it touches anything.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use tokio_postgres::{GenericClient, Row};

use crate::db::schema::{
    CONTACTS_TABLE, CONTACT_PERSONS_TABLE, FLIGHT_PASSENGERS_TABLE, L0_BLACK_BOOK, L0_FLIGHT_LOGS,
};
use crate::models::normalized::{EntityType, PassengerNameRow, PersonNameRow};
use crate::models::raw::{RawContactRecord, RawFlightRecord};
use crate::normalization::flight_confidence::PUBLIC_CONFIDENCE_FLOOR;

/// Fails before any write when one of `tables` does not exist.
pub async fn require_tables(client: &impl GenericClient, tables: &[&str]) -> Result<()> {
    let mut missing = Vec::new();
    for table in tables {
        let row = client
            .query_one("SELECT to_regclass($1)::text AS found", &[table])
            .await
            .with_context(|| format!("Failed to look up table {}", table))?;
        let found: Option<String> = row.get("found");
        if found.is_none() {
            missing.push(*table);
        } else {
            debug!("Found required table {}", table);
        }
    }
    if !missing.is_empty() {
        bail!(
            "Required table(s) missing: {}. Load the upstream layer first.",
            missing.join(", ")
        );
    }
    Ok(())
}

fn contact_from_row(row: &Row) -> RawContactRecord {
    RawContactRecord {
        record_id: row.get("record_id"),
        page: row.get("page"),
        page_link: row.get("page_link"),
        name: row.get("name"),
        company_text: row.get("company_text"),
        surname: row.get("surname"),
        first_name: row.get("first_name"),
        address_type: row.get("address_type"),
        address: row.get("address"),
        zip: row.get("zip"),
        city: row.get("city"),
        country: row.get("country"),
        phone_general: row.get("phone_general"),
        phone_work: row.get("phone_work"),
        phone_home: row.get("phone_home"),
        phone_mobile: row.get("phone_mobile"),
        email: row.get("email"),
    }
}

/// All directory rows in a stable order.
pub async fn load_black_book(client: &impl GenericClient) -> Result<Vec<RawContactRecord>> {
    let query = format!(
        "SELECT record_id, page, page_link, name, company_text, surname, first_name,
                address_type, address, zip, city, country,
                phone_general, phone_work, phone_home, phone_mobile, email
         FROM {}
         ORDER BY page, name, record_id",
        L0_BLACK_BOOK
    );
    let rows = client
        .query(query.as_str(), &[])
        .await
        .with_context(|| format!("Failed to load {}", L0_BLACK_BOOK))?;
    info!("Loaded {} rows from {}", rows.len(), L0_BLACK_BOOK);
    Ok(rows.iter().map(contact_from_row).collect())
}

fn flight_from_row(row: &Row) -> RawFlightRecord {
    RawFlightRecord {
        id: row.get("id"),
        date: row.get("date"),
        year: row.get("year"),
        aircraft_model: row.get("aircraft_model"),
        aircraft_tail: row.get("aircraft_tail"),
        aircraft_type: row.get("aircraft_type"),
        num_seats: row.get("num_seats"),
        dep_code: row.get("dep_code"),
        arr_code: row.get("arr_code"),
        dep_location: row.get("dep_location"),
        arr_location: row.get("arr_location"),
        flight_no: row.get("flight_no"),
        pass_position: row.get("pass_position"),
        unique_id: row.get("unique_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        last_first: row.get("last_first"),
        first_last: row.get("first_last"),
        comment: row.get("comment"),
        initials: row.get("initials"),
        known: row.get("known"),
        data_source: row.get("data_source"),
    }
}

pub async fn load_flight_logs(client: &impl GenericClient) -> Result<Vec<RawFlightRecord>> {
    let query = format!(
        "SELECT id, date, year, aircraft_model, aircraft_tail, aircraft_type, num_seats,
                dep_code, arr_code, dep_location, arr_location, flight_no, pass_position,
                unique_id, first_name, last_name, last_first, first_last, comment,
                initials, known, data_source
         FROM {}
         ORDER BY id",
        L0_FLIGHT_LOGS
    );
    let rows = client
        .query(query.as_str(), &[])
        .await
        .with_context(|| format!("Failed to load {}", L0_FLIGHT_LOGS))?;
    info!("Loaded {} rows from {}", rows.len(), L0_FLIGHT_LOGS);
    Ok(rows.iter().map(flight_from_row).collect())
}

/// Passengers confident enough to become mentions.
pub async fn load_passenger_name_rows(client: &impl GenericClient) -> Result<Vec<PassengerNameRow>> {
    let query = format!(
        "SELECT passenger_id, l0_id, first_name, last_name, first_last,
                identity_confidence::float8 AS identity_confidence
         FROM {}
         WHERE identity_confidence::float8 >= $1
         ORDER BY l0_id",
        FLIGHT_PASSENGERS_TABLE
    );
    let rows = client
        .query(query.as_str(), &[&PUBLIC_CONFIDENCE_FLOOR])
        .await
        .context("Failed to load flight passengers for mention extraction")?;
    Ok(rows
        .iter()
        .map(|row| PassengerNameRow {
            passenger_id: row.get("passenger_id"),
            l0_id: row.get("l0_id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            first_last: row.get("first_last"),
            identity_confidence: row.get("identity_confidence"),
        })
        .collect())
}

/// Persons of people-bearing contacts, in contact order.
pub async fn load_contact_person_rows(client: &impl GenericClient) -> Result<Vec<PersonNameRow>> {
    let query = format!(
        "SELECT cp.person_id, cp.l0_record_id, cp.extracted_first, cp.extracted_last,
                cp.extracted_raw, c.entity_type
         FROM {} cp
         JOIN {} c ON c.contact_id = cp.contact_id
         WHERE c.entity_type IN ('individual', 'household')
         ORDER BY c.page, c.name, c.l0_record_id, cp.position_in_record",
        CONTACT_PERSONS_TABLE, CONTACTS_TABLE
    );
    let rows = client
        .query(query.as_str(), &[])
        .await
        .context("Failed to load contact persons for mention extraction")?;

    let mut persons = Vec::with_capacity(rows.len());
    for row in &rows {
        let entity_text: String = row.get("entity_type");
        let entity_type = match EntityType::from_db(&entity_text) {
            Some(t) => t,
            None => bail!("Unexpected entity_type '{}' in {}", entity_text, CONTACTS_TABLE),
        };
        persons.push(PersonNameRow {
            person_id: row.get("person_id"),
            l0_record_id: row.get("l0_record_id"),
            extracted_first: row.get("extracted_first"),
            extracted_last: row.get("extracted_last"),
            extracted_raw: row.get("extracted_raw"),
            entity_type,
        });
    }
    Ok(persons)
}

/// `SELECT COUNT(*)` for one table or view.
pub async fn count_rows(client: &impl GenericClient, table: &str) -> Result<i64> {
    let query = format!("SELECT COUNT(*) AS n FROM {}", table);
    let row = client
        .query_one(query.as_str(), &[])
        .await
        .with_context(|| format!("Failed to count rows in {}", table))?;
    Ok(row.get("n"))
}

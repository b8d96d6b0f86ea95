// src/db/writer.rs
//
// Batched multi-row INSERTs. Callers own the transaction; nothing here
// commits.

use anyhow::{Context, Result};
use log::{debug, error};
use std::ops::Range;
use postgres_types::ToSql;
use tokio_postgres::Transaction;

use crate::db::schema::{
    CONTACTS_TABLE, CONTACT_PERSONS_TABLE, FLIGHT_EVENTS_TABLE, FLIGHT_PASSENGERS_TABLE,
    IDENTITY_MENTIONS_TABLE, PHONE_NUMBERS_TABLE,
};
use crate::models::normalized::{
    ContactPerson, FlightEvent, FlightPassenger, IdentityMention, NormalizedContact, PhoneNumber,
};

/// Bind-parameter ceiling of the PostgreSQL wire protocol.
pub const MAX_BIND_PARAMS: usize = 65_535;

pub type SqlParams = Vec<Box<dyn ToSql + Sync + Send>>;

/// A row type with a fixed L1 target table.
pub trait InsertRow {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Pushes exactly `COLUMNS.len()` values, in column order.
    fn push_params(&self, params: &mut SqlParams);
}

/// `INSERT INTO t (cols) VALUES ($1, ..), (..)` for `row_count` rows.
pub fn build_insert_statement(table: &str, columns: &[&str], row_count: usize) -> String {
    let width = columns.len();
    let mut values_clause_parts = Vec::with_capacity(row_count);
    let mut param_idx = 1;
    for _ in 0..row_count {
        let placeholders: Vec<String> = (param_idx..param_idx + width)
            .map(|i| format!("${}", i))
            .collect();
        values_clause_parts.push(format!("({})", placeholders.join(", ")));
        param_idx += width;
    }
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        columns.join(", "),
        values_clause_parts.join(", ")
    )
}

/// Consecutive row ranges covering `0..total`. The requested size is capped so
/// no statement exceeds the bind-parameter limit.
pub fn batch_ranges(total: usize, batch_size: usize, width: usize) -> Vec<Range<usize>> {
    let cap = (MAX_BIND_PARAMS / width.max(1)).max(1);
    let size = batch_size.clamp(1, cap);
    (0..total)
        .step_by(size)
        .map(|start| start..(start + size).min(total))
        .collect()
}

/// Inserts `rows` in order; returns the number of statements executed.
pub async fn insert_rows<T: InsertRow>(
    transaction: &Transaction<'_>,
    rows: &[T],
    batch_size: usize,
) -> Result<usize> {
    let ranges = batch_ranges(rows.len(), batch_size, T::COLUMNS.len());
    for range in &ranges {
        let chunk = &rows[range.clone()];
        let mut params: SqlParams = Vec::with_capacity(chunk.len() * T::COLUMNS.len());
        for row in chunk {
            row.push_params(&mut params);
        }
        let sql = build_insert_statement(T::TABLE, T::COLUMNS, chunk.len());
        let params_slice: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        debug!(
            "Inserting rows {}..{} into {} with {} parameters",
            range.start,
            range.end,
            T::TABLE,
            params_slice.len()
        );
        transaction
            .execute(sql.as_str(), params_slice.as_slice())
            .await
            .map_err(|e| {
                error!("Batch insert into {} failed: {}", T::TABLE, e);
                e
            })
            .with_context(|| format!("Failed to insert batch into {}", T::TABLE))?;
    }
    Ok(ranges.len())
}

/// Empties `tables` in one statement, cascading to dependants.
pub async fn truncate_tables(transaction: &Transaction<'_>, tables: &[&str]) -> Result<()> {
    let sql = format!("TRUNCATE {} CASCADE", tables.join(", "));
    transaction
        .batch_execute(&sql)
        .await
        .with_context(|| format!("Failed to truncate {}", tables.join(", ")))?;
    debug!("Truncated {}", tables.join(", "));
    Ok(())
}

impl InsertRow for NormalizedContact {
    const TABLE: &'static str = CONTACTS_TABLE;
    const COLUMNS: &'static [&'static str] = &[
        "contact_id",
        "l0_record_id",
        "page",
        "name",
        "company_text",
        "surname",
        "first_name",
        "address",
        "city",
        "zip",
        "country_raw",
        "country_iso",
        "entity_type",
        "email",
    ];

    fn push_params(&self, params: &mut SqlParams) {
        params.push(Box::new(self.contact_id));
        params.push(Box::new(self.l0_record_id));
        params.push(Box::new(self.page));
        params.push(Box::new(self.name.clone()));
        params.push(Box::new(self.company_text.clone()));
        params.push(Box::new(self.surname.clone()));
        params.push(Box::new(self.first_name.clone()));
        params.push(Box::new(self.address.clone()));
        params.push(Box::new(self.city.clone()));
        params.push(Box::new(self.zip.clone()));
        params.push(Box::new(self.country_raw.clone()));
        params.push(Box::new(self.country_iso.clone()));
        params.push(Box::new(self.entity_type.as_str().to_string()));
        params.push(Box::new(self.email.clone()));
    }
}

impl InsertRow for ContactPerson {
    const TABLE: &'static str = CONTACT_PERSONS_TABLE;
    const COLUMNS: &'static [&'static str] = &[
        "person_id",
        "contact_id",
        "l0_record_id",
        "household_id",
        "extracted_first",
        "extracted_last",
        "extracted_raw",
        "position_in_record",
    ];

    fn push_params(&self, params: &mut SqlParams) {
        params.push(Box::new(self.person_id));
        params.push(Box::new(self.contact_id));
        params.push(Box::new(self.l0_record_id));
        params.push(Box::new(self.household_id));
        params.push(Box::new(self.extracted_first.clone()));
        params.push(Box::new(self.extracted_last.clone()));
        params.push(Box::new(self.extracted_raw.clone()));
        params.push(Box::new(self.position_in_record));
    }
}

impl InsertRow for PhoneNumber {
    const TABLE: &'static str = PHONE_NUMBERS_TABLE;
    const COLUMNS: &'static [&'static str] = &[
        "phone_id",
        "contact_id",
        "l0_record_id",
        "phone_type",
        "raw_value",
        "e164_format",
        "country_code",
        "national_format",
        "is_valid",
        "parse_region",
    ];

    fn push_params(&self, params: &mut SqlParams) {
        params.push(Box::new(self.phone_id));
        params.push(Box::new(self.contact_id));
        params.push(Box::new(self.l0_record_id));
        params.push(Box::new(self.phone_type.as_str().to_string()));
        params.push(Box::new(self.raw_value.clone()));
        params.push(Box::new(self.e164_format.clone()));
        params.push(Box::new(self.country_code));
        params.push(Box::new(self.national_format.clone()));
        params.push(Box::new(self.is_valid));
        params.push(Box::new(self.parse_region.clone()));
    }
}

impl InsertRow for FlightEvent {
    const TABLE: &'static str = FLIGHT_EVENTS_TABLE;
    const COLUMNS: &'static [&'static str] = &[
        "flight_id",
        "flight_date",
        "flight_date_raw",
        "year",
        "aircraft_model",
        "aircraft_tail",
        "aircraft_type",
        "num_seats",
        "dep_code",
        "arr_code",
        "dep_location",
        "arr_location",
        "flight_no",
        "data_source",
    ];

    fn push_params(&self, params: &mut SqlParams) {
        params.push(Box::new(self.flight_id));
        params.push(Box::new(self.flight_date));
        params.push(Box::new(self.flight_date_raw.clone()));
        params.push(Box::new(self.year));
        params.push(Box::new(self.aircraft_model.clone()));
        params.push(Box::new(self.aircraft_tail.clone()));
        params.push(Box::new(self.aircraft_type.clone()));
        params.push(Box::new(self.num_seats));
        params.push(Box::new(self.dep_code.clone()));
        params.push(Box::new(self.arr_code.clone()));
        params.push(Box::new(self.dep_location.clone()));
        params.push(Box::new(self.arr_location.clone()));
        params.push(Box::new(self.flight_no.clone()));
        params.push(Box::new(self.data_source.clone()));
    }
}

impl InsertRow for FlightPassenger {
    const TABLE: &'static str = FLIGHT_PASSENGERS_TABLE;
    const COLUMNS: &'static [&'static str] = &[
        "passenger_id",
        "flight_id",
        "l0_id",
        "first_name",
        "last_name",
        "first_last",
        "initials",
        "pass_position",
        "comment",
        "identity_confidence",
        "known",
        "potential_victim",
        "suppress_from_public",
    ];

    fn push_params(&self, params: &mut SqlParams) {
        params.push(Box::new(self.passenger_id));
        params.push(Box::new(self.flight_id));
        params.push(Box::new(self.l0_id));
        params.push(Box::new(self.first_name.clone()));
        params.push(Box::new(self.last_name.clone()));
        params.push(Box::new(self.first_last.clone()));
        params.push(Box::new(self.initials.clone()));
        params.push(Box::new(self.pass_position.clone()));
        params.push(Box::new(self.comment.clone()));
        params.push(Box::new(self.identity_confidence.value()));
        params.push(Box::new(self.known.clone()));
        params.push(Box::new(self.potential_victim));
        params.push(Box::new(self.suppress_from_public));
    }
}

impl InsertRow for IdentityMention {
    const TABLE: &'static str = IDENTITY_MENTIONS_TABLE;
    const COLUMNS: &'static [&'static str] = &[
        "mention_id",
        "source_table",
        "source_id",
        "l0_source_table",
        "l0_source_id",
        "raw_name",
        "parsed_prefix",
        "parsed_first",
        "parsed_middle",
        "parsed_last",
        "parsed_suffix",
        "parsed_nickname",
        "parse_type",
        "parse_confidence",
        "soundex_first",
        "soundex_last",
    ];

    fn push_params(&self, params: &mut SqlParams) {
        params.push(Box::new(self.mention_id));
        params.push(Box::new(self.source_table.as_str().to_string()));
        params.push(Box::new(self.source_id));
        params.push(Box::new(self.source_table.l0_table().to_string()));
        params.push(Box::new(self.l0_source_id.clone()));
        params.push(Box::new(self.raw_name.clone()));
        params.push(Box::new(self.parsed.prefix.clone()));
        params.push(Box::new(self.parsed.first.clone()));
        params.push(Box::new(self.parsed.middle.clone()));
        params.push(Box::new(self.parsed.last.clone()));
        params.push(Box::new(self.parsed.suffix.clone()));
        params.push(Box::new(self.parsed.nickname.clone()));
        params.push(Box::new(self.parsed.parse_type.as_str().to_string()));
        params.push(Box::new(self.parsed.confidence));
        params.push(Box::new(self.soundex_first.clone()));
        params.push(Box::new(self.soundex_last.clone()));
    }
}

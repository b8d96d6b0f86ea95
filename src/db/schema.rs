// src/db/schema.rs
//
// L1 DDL. Every statement is idempotent and runs inside the owning
// pipeline's transaction.

use anyhow::{Context, Result};
use log::{debug, info};
use tokio_postgres::GenericClient;

pub const CONTACTS_TABLE: &str = "l1.contacts";
pub const CONTACT_PERSONS_TABLE: &str = "l1.contact_persons";
pub const PHONE_NUMBERS_TABLE: &str = "l1.phone_numbers";
pub const FLIGHT_EVENTS_TABLE: &str = "l1.flight_events";
pub const FLIGHT_PASSENGERS_TABLE: &str = "l1.flight_passengers";
pub const FLIGHT_PASSENGERS_PUBLIC_VIEW: &str = "l1.flight_passengers_public";
pub const IDENTITY_MENTIONS_TABLE: &str = "l1.identity_mentions";

pub const L0_BLACK_BOOK: &str = "core.black_book";
pub const L0_FLIGHT_LOGS: &str = "core.flight_logs";

const SCHEMA_DDL: &str = "CREATE SCHEMA IF NOT EXISTS l1";

const CONTACTS_DDL: &str = "
CREATE TABLE IF NOT EXISTS l1.contacts (
    contact_id UUID PRIMARY KEY,
    l0_record_id UUID NOT NULL,
    page INTEGER,
    name TEXT,
    company_text TEXT,
    surname TEXT,
    first_name TEXT,
    address TEXT,
    city TEXT,
    zip TEXT,
    country_raw TEXT,
    country_iso VARCHAR(2),
    entity_type VARCHAR(20) CHECK (entity_type IN ('individual', 'household', 'organization', 'unknown')),
    email TEXT,
    created_at TIMESTAMP DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_contacts_l0 ON l1.contacts(l0_record_id);
CREATE INDEX IF NOT EXISTS idx_contacts_name ON l1.contacts(surname, first_name);
CREATE INDEX IF NOT EXISTS idx_contacts_country ON l1.contacts(country_iso);
CREATE INDEX IF NOT EXISTS idx_contacts_entity_type ON l1.contacts(entity_type);
";

const CONTACT_PERSONS_DDL: &str = "
CREATE TABLE IF NOT EXISTS l1.contact_persons (
    person_id UUID PRIMARY KEY,
    contact_id UUID REFERENCES l1.contacts(contact_id),
    l0_record_id UUID NOT NULL,
    household_id UUID,
    extracted_first TEXT,
    extracted_last TEXT,
    extracted_raw TEXT,
    position_in_record INTEGER,
    created_at TIMESTAMP DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_contact_persons_contact ON l1.contact_persons(contact_id);
CREATE INDEX IF NOT EXISTS idx_contact_persons_household ON l1.contact_persons(household_id);
CREATE INDEX IF NOT EXISTS idx_contact_persons_name ON l1.contact_persons(extracted_last, extracted_first);
";

const PHONE_NUMBERS_DDL: &str = "
CREATE TABLE IF NOT EXISTS l1.phone_numbers (
    phone_id UUID PRIMARY KEY,
    contact_id UUID REFERENCES l1.contacts(contact_id),
    l0_record_id UUID NOT NULL,
    phone_type VARCHAR(20),
    raw_value TEXT,
    e164_format VARCHAR(20),
    country_code INTEGER,
    national_format VARCHAR(30),
    is_valid BOOLEAN,
    parse_region VARCHAR(2),
    created_at TIMESTAMP DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_phone_numbers_contact ON l1.phone_numbers(contact_id);
CREATE INDEX IF NOT EXISTS idx_phone_numbers_e164 ON l1.phone_numbers(e164_format) WHERE e164_format IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_phone_numbers_valid ON l1.phone_numbers(is_valid);
";

const FLIGHT_EVENTS_DDL: &str = "
CREATE TABLE IF NOT EXISTS l1.flight_events (
    flight_id UUID PRIMARY KEY,
    flight_date DATE,
    flight_date_raw TEXT,
    year INTEGER,
    aircraft_model TEXT,
    aircraft_tail TEXT,
    aircraft_type TEXT,
    num_seats INTEGER,
    dep_code TEXT,
    arr_code TEXT,
    dep_location TEXT,
    arr_location TEXT,
    flight_no TEXT,
    data_source TEXT,
    created_at TIMESTAMP DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_flight_events_date ON l1.flight_events(flight_date);
CREATE INDEX IF NOT EXISTS idx_flight_events_tail ON l1.flight_events(aircraft_tail);
CREATE INDEX IF NOT EXISTS idx_flight_events_route ON l1.flight_events(dep_code, arr_code);
";

const FLIGHT_PASSENGERS_DDL: &str = "
CREATE TABLE IF NOT EXISTS l1.flight_passengers (
    passenger_id UUID PRIMARY KEY,
    flight_id UUID REFERENCES l1.flight_events(flight_id),
    l0_id INTEGER NOT NULL,
    first_name TEXT,
    last_name TEXT,
    first_last TEXT,
    initials TEXT,
    pass_position TEXT,
    comment TEXT,
    identity_confidence DOUBLE PRECISION NOT NULL,
    known TEXT,
    potential_victim BOOLEAN NOT NULL DEFAULT FALSE,
    suppress_from_public BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMP DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_flight_passengers_flight ON l1.flight_passengers(flight_id);
CREATE INDEX IF NOT EXISTS idx_flight_passengers_l0 ON l1.flight_passengers(l0_id);
CREATE INDEX IF NOT EXISTS idx_flight_passengers_name ON l1.flight_passengers(last_name, first_name);
CREATE INDEX IF NOT EXISTS idx_flight_passengers_confidence ON l1.flight_passengers(identity_confidence);
";

/// Only unsuppressed passengers, without comment or victim columns.
const PUBLIC_VIEW_DDL: &str = "
CREATE OR REPLACE VIEW l1.flight_passengers_public AS
SELECT
    passenger_id,
    flight_id,
    l0_id,
    first_name,
    last_name,
    first_last,
    initials,
    pass_position,
    identity_confidence,
    known,
    created_at
FROM l1.flight_passengers
WHERE suppress_from_public = FALSE
";

const IDENTITY_MENTIONS_DDL: &str = "
CREATE TABLE IF NOT EXISTS l1.identity_mentions (
    mention_id UUID PRIMARY KEY,
    source_table VARCHAR(50) NOT NULL,
    source_id UUID NOT NULL,
    l0_source_table VARCHAR(50),
    l0_source_id TEXT,
    raw_name TEXT,
    parsed_prefix VARCHAR(50),
    parsed_first VARCHAR(100),
    parsed_middle VARCHAR(100),
    parsed_last VARCHAR(100),
    parsed_suffix VARCHAR(50),
    parsed_nickname VARCHAR(100),
    parse_type VARCHAR(20),
    parse_confidence DOUBLE PRECISION,
    soundex_first VARCHAR(4),
    soundex_last VARCHAR(4),
    created_at TIMESTAMP DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_identity_mentions_soundex ON l1.identity_mentions(soundex_last, soundex_first);
CREATE INDEX IF NOT EXISTS idx_identity_mentions_source ON l1.identity_mentions(source_table, source_id);
CREATE INDEX IF NOT EXISTS idx_identity_mentions_name ON l1.identity_mentions(parsed_last, parsed_first);
CREATE INDEX IF NOT EXISTS idx_identity_mentions_confidence ON l1.identity_mentions(parse_confidence);
";

/// Column types this crate binds against. Tables created by earlier tooling
/// declared these as NUMERIC or CHAR; they are converted in place.
pub struct ColumnType {
    pub table: &'static str,
    pub column: &'static str,
    /// As written in DDL.
    pub sql_type: &'static str,
    /// As reported by `information_schema.columns.data_type`.
    pub data_type: &'static str,
}

pub const BOUND_COLUMN_TYPES: &[ColumnType] = &[
    ColumnType {
        table: CONTACTS_TABLE,
        column: "country_iso",
        sql_type: "VARCHAR(2)",
        data_type: "character varying",
    },
    ColumnType {
        table: FLIGHT_PASSENGERS_TABLE,
        column: "identity_confidence",
        sql_type: "DOUBLE PRECISION",
        data_type: "double precision",
    },
    ColumnType {
        table: IDENTITY_MENTIONS_TABLE,
        column: "parse_confidence",
        sql_type: "DOUBLE PRECISION",
        data_type: "double precision",
    },
];

const DROP_PUBLIC_VIEW_DDL: &str = "DROP VIEW IF EXISTS l1.flight_passengers_public";

fn alter_column_sql(column: &ColumnType) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
        column.table, column.column, column.sql_type, column.column, column.sql_type
    )
}

fn needs_alter(current: Option<&str>, column: &ColumnType) -> bool {
    matches!(current, Some(found) if found != column.data_type)
}

/// Converts any column of `table` whose stored type differs from what the
/// writers bind.
async fn align_column_types(client: &impl GenericClient, table: &str) -> Result<()> {
    for column in BOUND_COLUMN_TYPES.iter().filter(|c| c.table == table) {
        let (schema, name) = table.split_once('.').unwrap_or(("public", table));
        let row = client
            .query_opt(
                "SELECT data_type FROM information_schema.columns
                 WHERE table_schema = $1 AND table_name = $2 AND column_name = $3",
                &[&schema, &name, &column.column],
            )
            .await
            .with_context(|| format!("Failed to inspect {}.{}", table, column.column))?;
        let current: Option<String> = row.map(|r| r.get(0));
        if needs_alter(current.as_deref(), column) {
            info!(
                "Converting {}.{} from {} to {}",
                table,
                column.column,
                current.as_deref().unwrap_or_default(),
                column.sql_type
            );
            client
                .batch_execute(&alter_column_sql(column))
                .await
                .with_context(|| format!("Failed to convert {}.{}", table, column.column))?;
        }
    }
    Ok(())
}

/// Embedding slot for later stages; needs the pgvector extension.
const MENTION_EMBEDDING_DDL: &str =
    "ALTER TABLE l1.identity_mentions ADD COLUMN IF NOT EXISTS name_embedding vector(384)";

pub async fn ensure_contact_tables(client: &impl GenericClient) -> Result<()> {
    client
        .batch_execute(SCHEMA_DDL)
        .await
        .context("Failed to create schema l1")?;
    for (table, ddl) in [
        (CONTACTS_TABLE, CONTACTS_DDL),
        (CONTACT_PERSONS_TABLE, CONTACT_PERSONS_DDL),
        (PHONE_NUMBERS_TABLE, PHONE_NUMBERS_DDL),
    ] {
        client
            .batch_execute(ddl)
            .await
            .with_context(|| format!("Failed to create {}", table))?;
        align_column_types(client, table).await?;
        debug!("Ensured {}", table);
    }
    Ok(())
}

pub async fn ensure_flight_tables(client: &impl GenericClient) -> Result<()> {
    client
        .batch_execute(SCHEMA_DDL)
        .await
        .context("Failed to create schema l1")?;
    // The view pins the passenger column types, so it is rebuilt around them.
    client
        .batch_execute(DROP_PUBLIC_VIEW_DDL)
        .await
        .with_context(|| format!("Failed to drop {}", FLIGHT_PASSENGERS_PUBLIC_VIEW))?;
    for (table, ddl) in [
        (FLIGHT_EVENTS_TABLE, FLIGHT_EVENTS_DDL),
        (FLIGHT_PASSENGERS_TABLE, FLIGHT_PASSENGERS_DDL),
    ] {
        client
            .batch_execute(ddl)
            .await
            .with_context(|| format!("Failed to create {}", table))?;
        align_column_types(client, table).await?;
        debug!("Ensured {}", table);
    }
    client
        .batch_execute(PUBLIC_VIEW_DDL)
        .await
        .with_context(|| format!("Failed to create {}", FLIGHT_PASSENGERS_PUBLIC_VIEW))?;
    debug!("Ensured {}", FLIGHT_PASSENGERS_PUBLIC_VIEW);
    Ok(())
}

pub async fn vector_extension_installed(client: &impl GenericClient) -> Result<bool> {
    let row = client
        .query_one(
            "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = 'vector')",
            &[],
        )
        .await
        .context("Failed to check for the vector extension")?;
    Ok(row.get(0))
}

pub async fn ensure_mention_tables(client: &impl GenericClient) -> Result<()> {
    client
        .batch_execute(SCHEMA_DDL)
        .await
        .context("Failed to create schema l1")?;
    client
        .batch_execute(IDENTITY_MENTIONS_DDL)
        .await
        .with_context(|| format!("Failed to create {}", IDENTITY_MENTIONS_TABLE))?;
    align_column_types(client, IDENTITY_MENTIONS_TABLE).await?;

    if vector_extension_installed(client).await? {
        client
            .batch_execute(MENTION_EMBEDDING_DDL)
            .await
            .context("Failed to add name_embedding column")?;
        debug!("name_embedding column present");
    } else {
        info!("pgvector not installed; {} created without name_embedding", IDENTITY_MENTIONS_TABLE);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_view_filters_suppressed_rows() {
        assert!(PUBLIC_VIEW_DDL.contains("WHERE suppress_from_public = FALSE"));
        assert!(!PUBLIC_VIEW_DDL.contains("potential_victim"));
        assert!(!PUBLIC_VIEW_DDL.contains("comment"));
    }

    #[test]
    fn test_ddl_is_rerunnable() {
        for ddl in [
            CONTACTS_DDL,
            CONTACT_PERSONS_DDL,
            PHONE_NUMBERS_DDL,
            FLIGHT_EVENTS_DDL,
            FLIGHT_PASSENGERS_DDL,
            IDENTITY_MENTIONS_DDL,
        ] {
            for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                assert!(
                    statement.contains("IF NOT EXISTS"),
                    "not idempotent: {}",
                    statement
                );
            }
        }
        assert!(PUBLIC_VIEW_DDL.contains("CREATE OR REPLACE VIEW"));
        assert!(DROP_PUBLIC_VIEW_DDL.contains("IF EXISTS"));
    }

    fn ddl_for(table: &str) -> &'static str {
        match table {
            CONTACTS_TABLE => CONTACTS_DDL,
            FLIGHT_PASSENGERS_TABLE => FLIGHT_PASSENGERS_DDL,
            IDENTITY_MENTIONS_TABLE => IDENTITY_MENTIONS_DDL,
            other => panic!("no DDL for {}", other),
        }
    }

    #[test]
    fn test_bound_column_types_match_create_statements() {
        for column in BOUND_COLUMN_TYPES {
            let declared = format!("{} {}", column.column, column.sql_type);
            assert!(
                ddl_for(column.table).contains(&declared),
                "{} does not declare {}",
                column.table,
                declared
            );
        }
    }

    #[test]
    fn test_numeric_confidence_columns_are_converted() {
        let confidence = &BOUND_COLUMN_TYPES[1];
        assert_eq!(confidence.column, "identity_confidence");
        assert!(needs_alter(Some("numeric"), confidence));
        assert!(!needs_alter(Some("double precision"), confidence));
        // Missing columns are left to CREATE TABLE.
        assert!(!needs_alter(None, confidence));
        assert_eq!(
            alter_column_sql(confidence),
            "ALTER TABLE l1.flight_passengers ALTER COLUMN identity_confidence \
             TYPE DOUBLE PRECISION USING identity_confidence::DOUBLE PRECISION"
        );

        let country = &BOUND_COLUMN_TYPES[0];
        assert!(needs_alter(Some("character"), country));
        assert!(!needs_alter(Some("character varying"), country));
    }
}

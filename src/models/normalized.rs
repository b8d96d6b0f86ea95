// src/models/normalized.rs
//
// L1 rows produced by the pipelines. Every L1 table is rebuilt from scratch
// on each run, so none of these types carry update metadata.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Individual,
    Household,
    Organization,
    Unknown,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Individual => "individual",
            EntityType::Household => "household",
            EntityType::Organization => "organization",
            EntityType::Unknown => "unknown",
        }
    }

    /// Only people-bearing contacts feed the identity-mention pipeline.
    pub fn yields_mentions(&self) -> bool {
        matches!(self, EntityType::Individual | EntityType::Household)
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "individual" => Some(EntityType::Individual),
            "household" => Some(EntityType::Household),
            "organization" => Some(EntityType::Organization),
            "unknown" => Some(EntityType::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneType {
    General,
    Work,
    Home,
    Mobile,
}

impl PhoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneType::General => "general",
            PhoneType::Work => "work",
            PhoneType::Home => "home",
            PhoneType::Mobile => "mobile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseType {
    Person,
    Corporation,
    Unknown,
}

impl ParseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseType::Person => "Person",
            ParseType::Corporation => "Corporation",
            ParseType::Unknown => "Unknown",
        }
    }
}

/// Identity confidence for a manifest passenger. The numeric values are part
/// of the L1 contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentityConfidence {
    Unknown,
    Descriptive,
    Initials,
    Unverified,
    Verified,
}

impl IdentityConfidence {
    pub fn value(&self) -> f64 {
        match self {
            IdentityConfidence::Verified => 1.0,
            IdentityConfidence::Unverified => 0.7,
            IdentityConfidence::Initials => 0.3,
            IdentityConfidence::Descriptive => 0.1,
            IdentityConfidence::Unknown => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IdentityConfidence::Verified => "1.0 (verified)",
            IdentityConfidence::Unverified => "0.7 (unverified)",
            IdentityConfidence::Initials => "0.3 (initials)",
            IdentityConfidence::Descriptive => "0.1 (descriptive)",
            IdentityConfidence::Unknown => "0.0 (unknown)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    FlightPassengers,
    ContactPersons,
}

impl SourceTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTable::FlightPassengers => "flight_passengers",
            SourceTable::ContactPersons => "contact_persons",
        }
    }

    /// The L0 table the mention ultimately traces back to.
    pub fn l0_table(&self) -> &'static str {
        match self {
            SourceTable::FlightPassengers => "flight_logs",
            SourceTable::ContactPersons => "black_book",
        }
    }
}

/// One row of `l1.contacts`: one per L0 directory row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedContact {
    pub contact_id: Uuid,
    pub l0_record_id: Uuid,
    pub page: Option<i32>,
    pub name: Option<String>,
    pub company_text: Option<String>,
    pub surname: Option<String>,
    pub first_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub country_raw: Option<String>,
    pub country_iso: Option<String>,
    pub entity_type: EntityType,
    pub email: Option<String>,
}

/// One decomposed individual. `household_id` is set only when the same L0
/// row produced more than one person.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactPerson {
    pub person_id: Uuid,
    pub contact_id: Uuid,
    pub l0_record_id: Uuid,
    pub household_id: Option<Uuid>,
    pub extracted_first: String,
    pub extracted_last: String,
    pub extracted_raw: String,
    pub position_in_record: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhoneNumber {
    pub phone_id: Uuid,
    pub contact_id: Uuid,
    pub l0_record_id: Uuid,
    pub phone_type: PhoneType,
    pub raw_value: String,
    pub e164_format: Option<String>,
    pub country_code: Option<i32>,
    pub national_format: Option<String>,
    pub is_valid: bool,
    pub parse_region: Option<String>,
}

/// One deduplicated flight leg.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightEvent {
    pub flight_id: Uuid,
    pub flight_date: Option<NaiveDate>,
    pub flight_date_raw: Option<String>,
    pub year: Option<i32>,
    pub aircraft_model: Option<String>,
    pub aircraft_tail: Option<String>,
    pub aircraft_type: Option<String>,
    pub num_seats: Option<i32>,
    pub dep_code: Option<String>,
    pub arr_code: Option<String>,
    pub dep_location: Option<String>,
    pub arr_location: Option<String>,
    pub flight_no: Option<String>,
    pub data_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightPassenger {
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub l0_id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub first_last: Option<String>,
    pub initials: Option<String>,
    pub pass_position: Option<String>,
    pub comment: Option<String>,
    pub identity_confidence: IdentityConfidence,
    pub known: Option<String>,
    pub potential_victim: bool,
    pub suppress_from_public: bool,
}

/// Structured name components as produced by the name parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    pub prefix: Option<String>,
    pub first: Option<String>,
    pub middle: Option<String>,
    pub last: Option<String>,
    pub suffix: Option<String>,
    pub nickname: Option<String>,
    pub parse_type: ParseType,
    pub confidence: f64,
}

impl ParsedName {
    pub fn empty() -> Self {
        Self {
            prefix: None,
            first: None,
            middle: None,
            last: None,
            suffix: None,
            nickname: None,
            parse_type: ParseType::Unknown,
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityMention {
    pub mention_id: Uuid,
    pub source_table: SourceTable,
    pub source_id: Uuid,
    pub l0_source_id: String,
    pub raw_name: String,
    pub parsed: ParsedName,
    pub soundex_first: Option<String>,
    pub soundex_last: Option<String>,
}

/// Name-bearing passenger row feeding the mention pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PassengerNameRow {
    pub passenger_id: Uuid,
    pub l0_id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub first_last: Option<String>,
    pub identity_confidence: f64,
}

impl From<&FlightPassenger> for PassengerNameRow {
    fn from(p: &FlightPassenger) -> Self {
        Self {
            passenger_id: p.passenger_id,
            l0_id: p.l0_id,
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            first_last: p.first_last.clone(),
            identity_confidence: p.identity_confidence.value(),
        }
    }
}

/// Decomposed person joined with its contact's entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonNameRow {
    pub person_id: Uuid,
    pub l0_record_id: Uuid,
    pub extracted_first: Option<String>,
    pub extracted_last: Option<String>,
    pub extracted_raw: Option<String>,
    pub entity_type: EntityType,
}

impl PersonNameRow {
    pub fn from_person(person: &ContactPerson, entity_type: EntityType) -> Self {
        Self {
            person_id: person.person_id,
            l0_record_id: person.l0_record_id,
            extracted_first: Some(person.extracted_first.clone()),
            extracted_last: Some(person.extracted_last.clone()),
            extracted_raw: Some(person.extracted_raw.clone()),
            entity_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_values_are_contract() {
        let values: Vec<f64> = [
            IdentityConfidence::Unknown,
            IdentityConfidence::Descriptive,
            IdentityConfidence::Initials,
            IdentityConfidence::Unverified,
            IdentityConfidence::Verified,
        ]
        .iter()
        .map(|c| c.value())
        .collect();
        assert_eq!(values, vec![0.0, 0.1, 0.3, 0.7, 1.0]);
    }

    #[test]
    fn test_entity_type_round_trip_through_db_text() {
        for t in [
            EntityType::Individual,
            EntityType::Household,
            EntityType::Organization,
            EntityType::Unknown,
        ] {
            assert_eq!(EntityType::from_db(t.as_str()), Some(t));
        }
        assert_eq!(EntityType::from_db("person"), None);
        assert!(EntityType::Household.yields_mentions());
        assert!(!EntityType::Organization.yields_mentions());
    }
}

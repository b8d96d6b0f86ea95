// src/models/raw.rs
//
// L0 rows as supplied by the ingestion layer. These are read-only inputs:
// nothing in this crate writes back to `core.*`.

use uuid::Uuid;

/// One row of `core.black_book`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawContactRecord {
    pub record_id: Uuid,
    pub page: Option<i32>,
    pub page_link: Option<String>,
    pub name: Option<String>,
    pub company_text: Option<String>,
    pub surname: Option<String>,
    pub first_name: Option<String>,
    pub address_type: Option<String>,
    pub address: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone_general: Option<String>,
    pub phone_work: Option<String>,
    pub phone_home: Option<String>,
    pub phone_mobile: Option<String>,
    pub email: Option<String>,
}

impl RawContactRecord {
    /// Field values in source-column order, NULLs rendered as empty strings.
    /// This is the tuple the L0 `record_id` was derived from.
    pub fn source_values(&self) -> Vec<String> {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            self.page.map(|p| p.to_string()).unwrap_or_default(),
            text(&self.page_link),
            text(&self.name),
            text(&self.company_text),
            text(&self.surname),
            text(&self.first_name),
            text(&self.address_type),
            text(&self.address),
            text(&self.zip),
            text(&self.city),
            text(&self.country),
            text(&self.phone_general),
            text(&self.phone_work),
            text(&self.phone_home),
            text(&self.phone_mobile),
            text(&self.email),
        ]
    }
}

/// One row of `core.flight_logs` (one passenger on one leg).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFlightRecord {
    pub id: i32,
    pub date: Option<String>,
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
    pub pass_position: Option<String>,
    pub unique_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub last_first: Option<String>,
    pub first_last: Option<String>,
    pub comment: Option<String>,
    pub initials: Option<String>,
    pub known: Option<String>,
    pub data_source: Option<String>,
}

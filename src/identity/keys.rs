// src/identity/keys.rs
//
// Every deterministic identifier in L1 is minted here.
//
// Two schemes are in use:
// * content-derived ids: SHA-256 over `|`-joined values, first 16 digest bytes
//   used verbatim. No version/variant bits are set, so these reproduce ids
//   already stored in L0 and referenced downstream.
// * name-based ids: UUIDv5 under the URL namespace, for everything L1 mints.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::normalized::SourceTable;

pub const KEY_DELIMITER: &str = "|";

/// Namespace for every name-based identifier.
pub const IDENTITY_NAMESPACE: Uuid = Uuid::NAMESPACE_URL;

fn content_digest<S: AsRef<str>>(parts: &[S]) -> [u8; 32] {
    let joined = parts
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER);
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.finalize().into()
}

/// Full hex digest of the joined parts, for diagnostics.
pub fn content_digest_hex<S: AsRef<str>>(parts: &[S]) -> String {
    hex::encode(content_digest(parts))
}

/// SHA-256 of the joined parts, truncated to 128 bits.
pub fn content_derived_id<S: AsRef<str>>(parts: &[S]) -> Uuid {
    let digest = content_digest(parts);
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

/// Text hashed for a NULL flight number; stored keys were built from it.
pub const NULL_FLIGHT_NO: &str = "None";

/// FlightEvent dedup key over (date, tail, departure, arrival, flight number).
/// A NULL flight number hashes as `"None"`; other NULL components hash as
/// empty strings.
pub fn flight_id(
    date: Option<&str>,
    tail: Option<&str>,
    dep_code: Option<&str>,
    arr_code: Option<&str>,
    flight_no: Option<&str>,
) -> Uuid {
    content_derived_id(&[
        date.unwrap_or(""),
        tail.unwrap_or(""),
        dep_code.unwrap_or(""),
        arr_code.unwrap_or(""),
        flight_no.unwrap_or(NULL_FLIGHT_NO),
    ])
}

/// Dedup id of an L0 directory row from its ordered field values.
pub fn row_content_id<S: AsRef<str>>(values: &[S]) -> Uuid {
    content_derived_id(values)
}

/// Shared by every person decomposed from one directory row.
pub fn household_id(l0_record_id: &Uuid) -> Uuid {
    Uuid::new_v5(&IDENTITY_NAMESPACE, l0_record_id.to_string().as_bytes())
}

fn typed_id(kind: &str, parts: &[&str]) -> Uuid {
    let mut name = String::from(kind);
    for part in parts {
        name.push(':');
        name.push_str(part);
    }
    Uuid::new_v5(&IDENTITY_NAMESPACE, name.as_bytes())
}

pub fn contact_id(l0_record_id: &Uuid) -> Uuid {
    typed_id("contact", &[&l0_record_id.to_string()])
}

pub fn person_id(l0_record_id: &Uuid, position: u32) -> Uuid {
    typed_id("person", &[&l0_record_id.to_string(), &position.to_string()])
}

/// `ordinal` is the 1-based index of the number within its directory row.
pub fn phone_id(l0_record_id: &Uuid, ordinal: usize) -> Uuid {
    typed_id("phone", &[&l0_record_id.to_string(), &ordinal.to_string()])
}

pub fn passenger_id(l0_id: i32) -> Uuid {
    typed_id("passenger", &[&l0_id.to_string()])
}

pub fn mention_id(source_table: SourceTable, source_id: &Uuid) -> Uuid {
    typed_id("mention", &[source_table.as_str(), &source_id.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_id_matches_stored_keys() {
        let id = flight_id(Some("3/7/2002"), Some("N908JE"), Some("PBI"), Some("TEB"), None);
        assert_eq!(id.to_string(), "bed759a4-0206-6ff6-8f74-4d9687e83267");
        // Repeated calls are stable.
        assert_eq!(
            id,
            flight_id(Some("3/7/2002"), Some("N908JE"), Some("PBI"), Some("TEB"), None)
        );
    }

    #[test]
    fn test_null_flight_no_is_not_an_empty_flight_no() {
        let null = flight_id(Some("3/7/2002"), Some("N908JE"), Some("PBI"), Some("TEB"), None);
        let empty = flight_id(Some("3/7/2002"), Some("N908JE"), Some("PBI"), Some("TEB"), Some(""));
        assert_eq!(empty.to_string(), "7649d63a-f09e-744a-ecef-88c10c2a2d4e");
        assert_ne!(null, empty);
        assert_eq!(
            null,
            content_derived_id(&["3/7/2002", "N908JE", "PBI", "TEB", "None"])
        );
    }

    #[test]
    fn test_flight_id_changes_with_each_component() {
        let base = flight_id(Some("d"), Some("t"), Some("a"), Some("b"), Some("1"));
        let variants = [
            flight_id(Some("x"), Some("t"), Some("a"), Some("b"), Some("1")),
            flight_id(Some("d"), Some("x"), Some("a"), Some("b"), Some("1")),
            flight_id(Some("d"), Some("t"), Some("x"), Some("b"), Some("1")),
            flight_id(Some("d"), Some("t"), Some("a"), Some("x"), Some("1")),
            flight_id(Some("d"), Some("t"), Some("a"), Some("b"), Some("x")),
        ];
        for variant in variants {
            assert_ne!(base, variant);
        }
    }

    #[test]
    fn test_row_content_id_keeps_raw_digest_bytes() {
        let id = row_content_id(&["a", "b"]);
        assert_eq!(id.to_string(), "0eab8a0a-3380-abf4-c7d1-fb0b43b66aaf");
        // Not an RFC 4122 version; the digest nibble is kept as-is.
        assert_ne!(id.get_version_num(), 4);
        assert_ne!(id.get_version_num(), 5);
        assert_eq!(
            content_digest_hex(&["a", "b"]),
            "0eab8a0a3380abf4c7d1fb0b43b66aafbb64a4b953e4eb2dccca579461912d0c"
        );
    }

    #[test]
    fn test_household_id_is_v5_over_record_id() {
        let record_id = Uuid::from_u128(1);
        assert_eq!(
            household_id(&record_id).to_string(),
            "52224a0c-ec8a-5614-9d09-67de03fadd5c"
        );
    }

    #[test]
    fn test_typed_ids_are_distinct_and_stable() {
        let record_id = Uuid::from_u128(42);
        assert_ne!(contact_id(&record_id), household_id(&record_id));
        assert_ne!(person_id(&record_id, 1), person_id(&record_id, 2));
        assert_eq!(phone_id(&record_id, 3), phone_id(&record_id, 3));
        assert_ne!(
            mention_id(SourceTable::ContactPersons, &record_id),
            mention_id(SourceTable::FlightPassengers, &record_id)
        );
        assert_eq!(passenger_id(7).get_version_num(), 5);
    }
}

// src/identity/blocking.rs
//
// Soundex blocking keys. The encoding reproduces PostgreSQL's
// `fuzzystrmatch.soundex()` byte for byte, so codes computed here agree with
// any computed in SQL by downstream stages.

use crate::models::normalized::IdentityMention;

const SOUNDEX_LEN: usize = 4;
const SOUNDEX_TABLE: &[u8; 26] = b"01230120022455012623010202";

fn soundex_code(byte: u8) -> u8 {
    let upper = byte.to_ascii_uppercase();
    if upper.is_ascii_uppercase() {
        SOUNDEX_TABLE[(upper - b'A') as usize]
    } else {
        upper
    }
}

/// American Soundex. Leading non-letters are skipped; input with no ASCII
/// letter encodes to the empty string.
pub fn soundex(input: &str) -> String {
    let bytes = input.as_bytes();
    let Some(start) = bytes.iter().position(|b| b.is_ascii_alphabetic()) else {
        return String::new();
    };

    let mut code = Vec::with_capacity(SOUNDEX_LEN);
    code.push(bytes[start].to_ascii_uppercase());
    let mut idx = start + 1;
    while idx < bytes.len() && code.len() < SOUNDEX_LEN {
        let current = bytes[idx];
        // Neighbours are compared on their raw codes, so a vowel or H/W
        // between two equal consonants lets the second one through.
        if current.is_ascii_alphabetic() && soundex_code(current) != soundex_code(bytes[idx - 1]) {
            let digit = soundex_code(current);
            if digit != b'0' {
                code.push(digit);
            }
        }
        idx += 1;
    }
    code.resize(SOUNDEX_LEN, b'0');
    code.into_iter().map(char::from).collect()
}

/// A code exists exactly when the component does.
pub fn blocking_code(component: Option<&str>) -> Option<String> {
    component.map(soundex)
}

/// Bulk pass over an assembled mention batch.
pub fn assign_blocking_keys(mentions: &mut [IdentityMention]) {
    for mention in mentions.iter_mut() {
        mention.soundex_first = blocking_code(mention.parsed.first.as_deref());
        mention.soundex_last = blocking_code(mention.parsed.last.as_deref());
    }
}

pub fn blocking_invariant_holds(mention: &IdentityMention) -> bool {
    mention.parsed.first.is_some() == mention.soundex_first.is_some()
        && mention.parsed.last.is_some() == mention.soundex_last.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::normalized::{ParsedName, SourceTable};
    use uuid::Uuid;

    #[test]
    fn test_classic_codes() {
        assert_eq!(soundex("Robert"), "R163");
        assert_eq!(soundex("Rupert"), "R163");
        assert_eq!(soundex("Tymczak"), "T522");
        assert_eq!(soundex("Pfister"), "P236");
        assert_eq!(soundex("Lee"), "L000");
        assert_eq!(soundex("smith"), "S530");
    }

    #[test]
    fn test_postgres_neighbour_semantics() {
        // H between S and C does not merge them, unlike textbook Soundex.
        assert_eq!(soundex("Ashcraft"), "A226");
        assert_eq!(soundex("O'Hara"), "O600");
        assert_eq!(soundex("Smith-Jones"), "S532");
    }

    #[test]
    fn test_leading_junk_and_no_letters() {
        assert_eq!(soundex("  123 smith"), "S530");
        assert_eq!(soundex("?"), "");
        assert_eq!(soundex(""), "");
    }

    #[test]
    fn test_bulk_assignment_follows_components() {
        let mut parsed = ParsedName::empty();
        parsed.last = Some("Smith".to_string());
        let mut mentions = vec![IdentityMention {
            mention_id: Uuid::nil(),
            source_table: SourceTable::ContactPersons,
            source_id: Uuid::nil(),
            l0_source_id: String::new(),
            raw_name: "Smith".to_string(),
            parsed,
            soundex_first: Some("stale".to_string()),
            soundex_last: None,
        }];
        assign_blocking_keys(&mut mentions);
        assert_eq!(mentions[0].soundex_first, None);
        assert_eq!(mentions[0].soundex_last.as_deref(), Some("S530"));
        assert!(blocking_invariant_holds(&mentions[0]));
    }
}

// src/normalization/flight_confidence.rs
//
// Identity confidence and subject-protection flags for manifest passengers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::normalized::IdentityConfidence;
use crate::models::raw::RawFlightRecord;

/// Descriptive entry such as "Female" or "Male (2)".
static DESCRIPTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(Female|Male)\s*(\(\d+\))?$").expect("valid descriptive regex")
});

/// Descriptive entry carrying a sequence number: how the logs mark unnamed
/// passengers who may be victims.
static NUMBERED_DESCRIPTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(Female|Male)\s*\(\d+\)$").expect("valid victim regex")
});

/// Below this value a passenger is never shown publicly.
pub const PUBLIC_CONFIDENCE_FLOOR: f64 = 0.3;
pub const KNOWN_MARKER: &str = "Yes";

/// Name fields the scorer looks at, already trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassengerFields<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub known: &'a str,
}

impl<'a> PassengerFields<'a> {
    pub fn from_record(record: &'a RawFlightRecord) -> Self {
        Self {
            first_name: record.first_name.as_deref().unwrap_or("").trim(),
            last_name: record.last_name.as_deref().unwrap_or("").trim(),
            known: record.known.as_deref().unwrap_or(""),
        }
    }
}

type ConfidenceRule = fn(&PassengerFields<'_>) -> bool;

/// Exact marker only; "yes" or " Yes" are not verified.
fn is_known(p: &PassengerFields<'_>) -> bool {
    p.known == KNOWN_MARKER
}

fn has_placeholder(p: &PassengerFields<'_>) -> bool {
    p.first_name.contains('?') || p.last_name.contains('?')
}

fn is_descriptive(p: &PassengerFields<'_>) -> bool {
    DESCRIPTIVE.is_match(p.first_name)
}

fn is_initials_only(p: &PassengerFields<'_>) -> bool {
    p.first_name.chars().count() <= 2 && p.last_name.chars().count() <= 2
}

/// Evaluated in order; the first rule that holds sets the confidence.
/// Anything else is `Unverified`.
pub const CONFIDENCE_RULES: &[(ConfidenceRule, IdentityConfidence)] = &[
    (is_known, IdentityConfidence::Verified),
    (has_placeholder, IdentityConfidence::Unknown),
    (is_descriptive, IdentityConfidence::Descriptive),
    (is_initials_only, IdentityConfidence::Initials),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassengerScore {
    pub confidence: IdentityConfidence,
    pub potential_victim: bool,
    pub suppress_from_public: bool,
}

pub fn score_confidence(fields: &PassengerFields<'_>) -> IdentityConfidence {
    CONFIDENCE_RULES
        .iter()
        .find(|(rule, _)| rule(fields))
        .map(|(_, confidence)| *confidence)
        .unwrap_or(IdentityConfidence::Unverified)
}

pub fn is_potential_victim(fields: &PassengerFields<'_>) -> bool {
    NUMBERED_DESCRIPTIVE.is_match(fields.first_name)
}

pub fn score_passenger(fields: &PassengerFields<'_>) -> PassengerScore {
    let confidence = score_confidence(fields);
    let potential_victim = is_potential_victim(fields);
    PassengerScore {
        confidence,
        potential_victim,
        suppress_from_public: potential_victim || confidence.value() < PUBLIC_CONFIDENCE_FLOOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields<'a>(first: &'a str, last: &'a str, known: &'a str) -> PassengerFields<'a> {
        PassengerFields {
            first_name: first,
            last_name: last,
            known,
        }
    }

    #[test]
    fn test_known_marker_wins_over_everything() {
        let score = score_passenger(&fields("Female (3)", "?", "Yes"));
        assert_eq!(score.confidence.value(), 1.0);
        // The victim flag is independent of confidence.
        assert!(score.potential_victim);
        assert!(score.suppress_from_public);
    }

    #[test]
    fn test_placeholder_is_zero_and_suppressed() {
        let score = score_passenger(&fields("?", "Smith", "No"));
        assert_eq!(score.confidence, IdentityConfidence::Unknown);
        assert!(!score.potential_victim);
        assert!(score.suppress_from_public);
    }

    #[test]
    fn test_numbered_descriptive_is_victim() {
        let score = score_passenger(&fields("Female (3)", "", ""));
        assert_eq!(score.confidence.value(), 0.1);
        assert!(score.potential_victim);
        assert!(score.suppress_from_public);

        let score = score_passenger(&fields("male", "", ""));
        assert_eq!(score.confidence, IdentityConfidence::Descriptive);
        assert!(!score.potential_victim);
        assert!(score.suppress_from_public);
    }

    #[test]
    fn test_initials_are_public_at_the_floor() {
        let score = score_passenger(&fields("Jo", "Sm", ""));
        assert_eq!(score.confidence.value(), 0.3);
        assert!(!score.suppress_from_public);
    }

    #[test]
    fn test_full_name_is_unverified() {
        let score = score_passenger(&fields("John", "Smith", "No"));
        assert_eq!(score.confidence, IdentityConfidence::Unverified);
        assert!(!score.potential_victim);
        assert!(!score.suppress_from_public);
    }

    #[test]
    fn test_known_marker_is_case_and_space_sensitive() {
        for known in ["yes", "YES", " Yes", "Yes "] {
            let score = score_passenger(&fields("John", "Smith", known));
            assert_eq!(score.confidence, IdentityConfidence::Unverified, "{:?}", known);
        }
        let record = RawFlightRecord {
            first_name: Some("John".to_string()),
            last_name: Some("Smith".to_string()),
            known: Some("Yes ".to_string()),
            ..Default::default()
        };
        let score = score_passenger(&PassengerFields::from_record(&record));
        assert_eq!(score.confidence, IdentityConfidence::Unverified);
    }

    #[test]
    fn test_from_record_trims_and_defaults() {
        let record = RawFlightRecord {
            first_name: Some("  Male (12) ".to_string()),
            known: None,
            ..Default::default()
        };
        let score = score_passenger(&PassengerFields::from_record(&record));
        assert!(score.potential_victim);
        assert_eq!(score.confidence, IdentityConfidence::Descriptive);
    }

    #[test]
    fn test_suppression_invariant_over_rule_table() {
        let cases = [
            ("Jane", "Doe", "Yes"),
            ("?", "?", ""),
            ("Female", "", ""),
            ("A", "B", ""),
            ("Jane", "Doe", ""),
            ("Male (1)", "Doe", ""),
        ];
        for (first, last, known) in cases {
            let score = score_passenger(&fields(first, last, known));
            assert_eq!(
                score.suppress_from_public,
                score.potential_victim || score.confidence.value() < 0.3,
                "{:?}",
                (first, last, known)
            );
        }
    }
}

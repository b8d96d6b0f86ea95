// src/identity/name_parser.rs
//
// Layered name parsing: the configured tagger first, then a fixed fallback
// chain. Never fails.

use log::debug;

use crate::identity::tagger::{NameTagger, TaggedName};
use crate::models::normalized::{ParseType, ParsedName};

pub const TAGGED_PERSON_CONFIDENCE: f64 = 0.9;
pub const TAGGED_OTHER_CONFIDENCE: f64 = 0.5;
pub const COMMA_FALLBACK_CONFIDENCE: f64 = 0.5;
pub const TOKEN_FALLBACK_CONFIDENCE: f64 = 0.3;
pub const SINGLE_TOKEN_CONFIDENCE: f64 = 0.1;

/// Result of one parse and whether the tagger was bypassed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub parsed: ParsedName,
    pub used_fallback: bool,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn from_tagged(tagged: TaggedName) -> ParsedName {
    let confidence = if tagged.name_type == ParseType::Person {
        TAGGED_PERSON_CONFIDENCE
    } else {
        TAGGED_OTHER_CONFIDENCE
    };
    let clean = |v: Option<String>| v.as_deref().and_then(non_empty);
    ParsedName {
        prefix: clean(tagged.prefix),
        first: clean(tagged.given),
        middle: clean(tagged.middle),
        last: clean(tagged.surname),
        suffix: clean(tagged.suffix),
        nickname: clean(tagged.nickname),
        parse_type: tagged.name_type,
        confidence,
    }
}

/// Deterministic parse: "Last, First" → 0.5; "First [Middle..] Last" → 0.3;
/// a single token is a surname → 0.1; blank → empty, 0.0.
pub fn fallback_parse(raw: &str) -> ParsedName {
    let raw = raw.trim();
    if raw.is_empty() {
        return ParsedName::empty();
    }

    if let Some((last, first)) = raw.split_once(',') {
        return ParsedName {
            first: non_empty(first),
            last: non_empty(last),
            parse_type: ParseType::Person,
            confidence: COMMA_FALLBACK_CONFIDENCE,
            ..ParsedName::empty()
        };
    }

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() >= 2 {
        let middle = &tokens[1..tokens.len() - 1];
        return ParsedName {
            first: Some(tokens[0].to_string()),
            middle: if middle.is_empty() {
                None
            } else {
                Some(middle.join(" "))
            },
            last: Some(tokens[tokens.len() - 1].to_string()),
            parse_type: ParseType::Person,
            confidence: TOKEN_FALLBACK_CONFIDENCE,
            ..ParsedName::empty()
        };
    }

    ParsedName {
        last: Some(raw.to_string()),
        parse_type: ParseType::Unknown,
        confidence: SINGLE_TOKEN_CONFIDENCE,
        ..ParsedName::empty()
    }
}

/// Tagger first; any refusal falls through to `fallback_parse`.
pub fn parse_name(raw: &str, tagger: &dyn NameTagger) -> ParseOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParseOutcome {
            parsed: ParsedName::empty(),
            used_fallback: false,
        };
    }

    match tagger.tag(trimmed) {
        Ok(tagged) => ParseOutcome {
            parsed: from_tagged(tagged),
            used_fallback: false,
        },
        Err(e) => {
            debug!("Tagger '{}' refused '{}': {}", tagger.backend(), trimmed, e);
            ParseOutcome {
                parsed: fallback_parse(trimmed),
                used_fallback: true,
            }
        }
    }
}

/// Fills first/last from upstream-extracted components, only where the
/// parser produced nothing.
pub fn apply_hints(parsed: &mut ParsedName, first_hint: Option<&str>, last_hint: Option<&str>) {
    if parsed.first.is_none() {
        parsed.first = first_hint.and_then(non_empty);
    }
    if parsed.last.is_none() {
        parsed.last = last_hint.and_then(non_empty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::tagger::{LexiconTagger, TagError, UnavailableTagger};

    struct CorporateTagger;

    impl NameTagger for CorporateTagger {
        fn backend(&self) -> &'static str {
            "test"
        }

        fn tag(&self, _raw: &str) -> Result<TaggedName, TagError> {
            Ok(TaggedName {
                prefix: None,
                given: None,
                middle: None,
                surname: Some("  ".to_string()),
                suffix: None,
                nickname: None,
                name_type: ParseType::Corporation,
            })
        }
    }

    #[test]
    fn test_fallback_chain_order() {
        let comma = fallback_parse("Smith, John");
        assert_eq!(comma.last.as_deref(), Some("Smith"));
        assert_eq!(comma.first.as_deref(), Some("John"));
        assert_eq!(comma.confidence, 0.5);
        assert_eq!(comma.parse_type, ParseType::Person);

        let tokens = fallback_parse("John Paul Jones Smith");
        assert_eq!(tokens.first.as_deref(), Some("John"));
        assert_eq!(tokens.middle.as_deref(), Some("Paul Jones"));
        assert_eq!(tokens.last.as_deref(), Some("Smith"));
        assert_eq!(tokens.confidence, 0.3);

        let two = fallback_parse("John Smith");
        assert_eq!(two.middle, None);

        let single = fallback_parse(" Smith ");
        assert_eq!(single.first, None);
        assert_eq!(single.last.as_deref(), Some("Smith"));
        assert_eq!(single.parse_type, ParseType::Unknown);
        assert_eq!(single.confidence, 0.1);

        assert_eq!(fallback_parse("   "), ParsedName::empty());
    }

    #[test]
    fn test_comma_split_on_first_comma_only() {
        let parsed = fallback_parse("Smith, John, Jr.");
        assert_eq!(parsed.last.as_deref(), Some("Smith"));
        assert_eq!(parsed.first.as_deref(), Some("John, Jr."));

        let dangling = fallback_parse("Smith,");
        assert_eq!(dangling.first, None);
        assert_eq!(dangling.last.as_deref(), Some("Smith"));
    }

    #[test]
    fn test_tagger_confidence_by_type() {
        let outcome = parse_name("John Smith", &LexiconTagger);
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.parsed.confidence, 0.9);

        let outcome = parse_name("anything", &CorporateTagger);
        assert_eq!(outcome.parsed.parse_type, ParseType::Corporation);
        assert_eq!(outcome.parsed.confidence, 0.5);
        // Whitespace-only components are dropped.
        assert_eq!(outcome.parsed.last, None);
    }

    #[test]
    fn test_refusal_falls_back() {
        let outcome = parse_name("John Smith", &UnavailableTagger);
        assert!(outcome.used_fallback);
        assert_eq!(outcome.parsed.confidence, 0.3);

        let outcome = parse_name("Smith", &LexiconTagger);
        assert!(outcome.used_fallback);
        assert_eq!(outcome.parsed.last.as_deref(), Some("Smith"));
    }

    #[test]
    fn test_blank_input_skips_tagger() {
        let outcome = parse_name("  ", &UnavailableTagger);
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.parsed, ParsedName::empty());
    }

    #[test]
    fn test_hints_fill_only_empty_components() {
        let mut parsed = fallback_parse("Smith");
        apply_hints(&mut parsed, Some("John"), Some("Smythe"));
        assert_eq!(parsed.first.as_deref(), Some("John"));
        assert_eq!(parsed.last.as_deref(), Some("Smith"));

        let mut parsed = ParsedName::empty();
        apply_hints(&mut parsed, Some("  "), None);
        assert_eq!(parsed.first, None);
    }
}

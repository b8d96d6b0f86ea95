// src/normalization/decompose.rs
//
// Splits composite directory names ("Smith, John & Jane") into one record per
// person. Best effort: every input, including garbage, yields at least one
// record and nothing here returns an error.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalization::entity_type::has_multi_person_separator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecomposedPerson {
    pub first: String,
    pub last: String,
    /// The undecomposed name, kept when no pattern split it.
    pub raw: Option<String>,
    /// 1-based position within the source row.
    pub position: u32,
}

/// A two-person layout: which capture groups hold the shared surname and the
/// two given names.
pub struct DecompositionPattern {
    pub label: &'static str,
    pub regex: Regex,
    pub surname_group: usize,
    pub first_groups: [usize; 2],
}

/// Tried in order; the first match wins.
pub static DECOMPOSITION_PATTERNS: Lazy<Vec<DecompositionPattern>> = Lazy::new(|| {
    vec![
        DecompositionPattern {
            label: "surname_comma_first_amp_first",
            regex: Regex::new(r"^([^,]+),\s*(.+?)\s*&\s*(.+)$").expect("valid decomposition regex"),
            surname_group: 1,
            first_groups: [2, 3],
        },
        DecompositionPattern {
            label: "surname_first_amp_first",
            regex: Regex::new(r"^([A-Z][a-z]+)\s+(.+?)\s*&\s*(.+)$").expect("valid decomposition regex"),
            surname_group: 1,
            first_groups: [2, 3],
        },
        DecompositionPattern {
            label: "first_amp_first_surname",
            regex: Regex::new(r"^(.+?)\s*&\s*(.+?)\s+([A-Z][a-z]+)$").expect("valid decomposition regex"),
            surname_group: 3,
            first_groups: [1, 2],
        },
    ]
});

static AND_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+and\s+").expect("valid separator regex"));

/// Decomposes `name` into individual people, using the pre-extracted
/// `surname`/`first_name` columns as components whenever the name is not split.
pub fn decompose_multi_person(
    name: &str,
    surname: Option<&str>,
    first_name: Option<&str>,
) -> Vec<DecomposedPerson> {
    if name.is_empty() {
        return vec![DecomposedPerson {
            first: String::new(),
            last: String::new(),
            raw: None,
            position: 1,
        }];
    }
    decompose_with_retry(name, name, surname, first_name, false)
}

fn decompose_with_retry(
    candidate: &str,
    original: &str,
    surname: Option<&str>,
    first_name: Option<&str>,
    retried: bool,
) -> Vec<DecomposedPerson> {
    if !has_multi_person_separator(candidate) {
        return vec![single_person(original, surname, first_name)];
    }

    for pattern in DECOMPOSITION_PATTERNS.iter() {
        if let Some(caps) = pattern.regex.captures(candidate) {
            let last = caps
                .get(pattern.surname_group)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            debug!("Decomposed '{}' with pattern {}", original, pattern.label);
            return pattern
                .first_groups
                .iter()
                .enumerate()
                .map(|(idx, group)| DecomposedPerson {
                    first: caps
                        .get(*group)
                        .map(|m| m.as_str().trim().to_string())
                        .unwrap_or_default(),
                    last: last.clone(),
                    raw: None,
                    position: idx as u32 + 1,
                })
                .collect();
        }
    }

    if !retried {
        let substituted = AND_SEPARATOR.replace_all(candidate, " & ");
        if substituted != candidate {
            return decompose_with_retry(&substituted, original, surname, first_name, true);
        }
    }

    debug!("No decomposition pattern matched '{}'; keeping it whole", original);
    vec![single_person(original, surname, first_name)]
}

fn single_person(name: &str, surname: Option<&str>, first_name: Option<&str>) -> DecomposedPerson {
    DecomposedPerson {
        first: first_name.unwrap_or("").to_string(),
        last: surname.unwrap_or("").to_string(),
        raw: Some(name.to_string()),
        position: 1,
    }
}

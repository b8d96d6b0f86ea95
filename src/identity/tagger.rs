// src/identity/tagger.rs
//
// Name-tagging capability. A tagger labels the tokens of a raw name and may
// refuse: a refusal is never an error for the caller, it routes the name into
// the deterministic fallback chain in `name_parser`.

use thiserror::Error;

use crate::models::normalized::ParseType;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("no name tagger is configured")]
    Unavailable,
    #[error("label {label} assigned more than once in '{input}'")]
    RepeatedLabel { label: &'static str, input: String },
    #[error("cannot label '{0}' unambiguously")]
    Ambiguous(String),
}

/// Components as labelled by a tagger. Empty components are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedName {
    pub prefix: Option<String>,
    pub given: Option<String>,
    pub middle: Option<String>,
    pub surname: Option<String>,
    pub suffix: Option<String>,
    pub nickname: Option<String>,
    pub name_type: ParseType,
}

impl TaggedName {
    fn corporation() -> Self {
        Self {
            prefix: None,
            given: None,
            middle: None,
            surname: None,
            suffix: None,
            nickname: None,
            name_type: ParseType::Corporation,
        }
    }
}

pub trait NameTagger: Send + Sync {
    fn backend(&self) -> &'static str;
    fn tag(&self, raw: &str) -> Result<TaggedName, TagError>;
}

/// Always refuses; every name goes through the fallback chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableTagger;

impl NameTagger for UnavailableTagger {
    fn backend(&self) -> &'static str {
        "none"
    }

    fn tag(&self, _raw: &str) -> Result<TaggedName, TagError> {
        Err(TagError::Unavailable)
    }
}

const PREFIXES: &[&str] = &[
    "mr", "mrs", "ms", "miss", "mx", "dr", "sir", "dame", "lady", "lord", "prof", "professor",
    "rev", "reverend", "hon", "judge", "sen", "senator", "gov", "governor", "capt", "captain",
    "col", "gen", "prince", "princess", "sheikh", "baron", "baroness", "count", "countess",
];

const SUFFIXES: &[&str] = &[
    "jr", "sr", "ii", "iii", "iv", "v", "phd", "md", "esq", "qc", "kc", "obe", "mbe", "cbe",
    "dds", "cpa",
];

const SURNAME_PARTICLES: &[&str] = &[
    "van", "von", "de", "der", "den", "da", "di", "del", "della", "la", "le", "du", "des", "st",
    "bin", "al",
];

const CORPORATE_MARKERS: &[&str] = &[
    "inc", "llc", "ltd", "llp", "lp", "plc", "corp", "corporation", "incorporated", "co",
    "company", "limited", "gmbh", "ag", "sa", "srl", "foundation", "trust", "group", "holdings",
    "partners", "associates", "bank", "hotel", "club", "university", "school", "hospital",
    "restaurant", "gallery", "airlines", "aviation",
];

fn normalized_token(token: &str) -> String {
    token
        .trim_matches(|c: char| c == '.' || c == ',')
        .to_lowercase()
}

fn in_lexicon(lexicon: &[&str], token: &str) -> bool {
    let token = normalized_token(token);
    lexicon.iter().any(|entry| *entry == token)
}

fn join_tokens(tokens: &[&str]) -> Option<String> {
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Deterministic lexicon tagger: titles, generational/professional suffixes,
/// quoted or bracketed nicknames, surname particles and corporate markers.
/// Anything it cannot label with certainty is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconTagger;

impl LexiconTagger {
    /// Pulls `"Nick"` or `(Nick)` out of the name.
    fn extract_nickname(raw: &str) -> Result<(String, Option<String>), TagError> {
        let mut remainder = String::with_capacity(raw.len());
        let mut nickname: Option<String> = None;
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            let close = match c {
                '"' => '"',
                '(' => ')',
                _ => {
                    remainder.push(c);
                    continue;
                }
            };
            let mut inner = String::new();
            let mut closed = false;
            for next in chars.by_ref() {
                if next == close {
                    closed = true;
                    break;
                }
                inner.push(next);
            }
            if !closed {
                return Err(TagError::Ambiguous(raw.to_string()));
            }
            if nickname.is_some() {
                return Err(TagError::RepeatedLabel {
                    label: "Nickname",
                    input: raw.to_string(),
                });
            }
            let inner = inner.trim();
            if !inner.is_empty() {
                nickname = Some(inner.to_string());
            }
            remainder.push(' ');
        }
        Ok((remainder, nickname))
    }

    fn take_prefix<'t>(tokens: &mut Vec<&'t str>, raw: &str) -> Result<Option<String>, TagError> {
        let count = tokens
            .iter()
            .take_while(|t| in_lexicon(PREFIXES, t))
            .count();
        match count {
            0 => Ok(None),
            1 => Ok(Some(tokens.remove(0).to_string())),
            _ => Err(TagError::RepeatedLabel {
                label: "Prefix",
                input: raw.to_string(),
            }),
        }
    }

    fn take_suffixes<'t>(tokens: &mut Vec<&'t str>) -> Option<String> {
        let count = tokens
            .iter()
            .rev()
            .take_while(|t| in_lexicon(SUFFIXES, t))
            .count();
        // A lone "V" or "II" is a name, not a suffix.
        if count == 0 || count == tokens.len() {
            return None;
        }
        let split = tokens.len() - count;
        let suffixes: Vec<&str> = tokens.drain(split..).collect();
        join_tokens(&suffixes)
    }

    fn check_tokens(tokens: &[&str], raw: &str) -> Result<(), TagError> {
        let unusable = tokens.iter().any(|t| {
            !t.chars().any(char::is_alphabetic) || t.chars().any(|c| c.is_ascii_digit())
        });
        if unusable {
            Err(TagError::Ambiguous(raw.to_string()))
        } else {
            Ok(())
        }
    }

    /// Given names in natural order: `[prefix] given [middle..] [particles] surname [suffix..]`.
    fn tag_natural(
        mut tokens: Vec<&str>,
        nickname: Option<String>,
        raw: &str,
    ) -> Result<TaggedName, TagError> {
        let prefix = Self::take_prefix(&mut tokens, raw)?;
        let suffix = Self::take_suffixes(&mut tokens);
        Self::check_tokens(&tokens, raw)?;

        let (given, middle, surname) = match tokens.len() {
            0 => return Err(TagError::Ambiguous(raw.to_string())),
            // "Mr Smith" is a surname; a bare "Smith" could be either.
            1 if prefix.is_some() => (None, None, Some(tokens[0].to_string())),
            1 => return Err(TagError::Ambiguous(raw.to_string())),
            n => {
                let mut surname_start = n - 1;
                while surname_start > 1 && in_lexicon(SURNAME_PARTICLES, tokens[surname_start - 1]) {
                    surname_start -= 1;
                }
                (
                    Some(tokens[0].to_string()),
                    join_tokens(&tokens[1..surname_start]),
                    join_tokens(&tokens[surname_start..]),
                )
            }
        };

        Ok(TaggedName {
            prefix,
            given,
            middle,
            surname,
            suffix,
            nickname,
            name_type: ParseType::Person,
        })
    }

    /// Surname-first: `surname, [prefix] given [middle..] [, suffix]`.
    fn tag_inverted(
        segments: &[&str],
        nickname: Option<String>,
        raw: &str,
    ) -> Result<TaggedName, TagError> {
        let mut segments = segments.to_vec();
        let mut suffix = None;
        if segments.len() > 2 {
            let tail_segment: &str = segments[segments.len() - 1];
            let last: Vec<&str> = tail_segment.split_whitespace().collect();
            if !last.is_empty() && last.iter().all(|t| in_lexicon(SUFFIXES, t)) {
                suffix = join_tokens(&last);
                segments.pop();
            }
        }
        if segments.len() != 2 {
            return Err(TagError::Ambiguous(raw.to_string()));
        }

        let surname_tokens: Vec<&str> = segments[0].split_whitespace().collect();
        let mut given_tokens: Vec<&str> = segments[1].split_whitespace().collect();
        let prefix = Self::take_prefix(&mut given_tokens, raw)?;
        if suffix.is_none() {
            suffix = Self::take_suffixes(&mut given_tokens);
        }
        Self::check_tokens(&surname_tokens, raw)?;
        Self::check_tokens(&given_tokens, raw)?;
        if surname_tokens.is_empty() || given_tokens.is_empty() {
            return Err(TagError::Ambiguous(raw.to_string()));
        }

        Ok(TaggedName {
            prefix,
            given: Some(given_tokens[0].to_string()),
            middle: join_tokens(&given_tokens[1..]),
            surname: join_tokens(&surname_tokens),
            suffix,
            nickname,
            name_type: ParseType::Person,
        })
    }
}

impl NameTagger for LexiconTagger {
    fn backend(&self) -> &'static str {
        "lexicon"
    }

    fn tag(&self, raw: &str) -> Result<TaggedName, TagError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TagError::Ambiguous(String::new()));
        }
        if raw.split_whitespace().any(|t| in_lexicon(CORPORATE_MARKERS, t)) {
            return Ok(TaggedName::corporation());
        }

        let (remainder, nickname) = Self::extract_nickname(raw)?;
        let segments: Vec<&str> = remainder
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        match segments.len() {
            0 => Err(TagError::Ambiguous(raw.to_string())),
            1 => Self::tag_natural(segments[0].split_whitespace().collect(), nickname, raw),
            _ => {
                // "John Smith, Jr." is natural order with a trailing suffix.
                let tail: Vec<&str> = segments[1..]
                    .iter()
                    .flat_map(|s| s.split_whitespace())
                    .collect();
                if tail.iter().all(|t| in_lexicon(SUFFIXES, t)) {
                    let mut tagged =
                        Self::tag_natural(segments[0].split_whitespace().collect(), nickname, raw)?;
                    if tagged.suffix.is_some() {
                        return Err(TagError::RepeatedLabel {
                            label: "Suffix",
                            input: raw.to_string(),
                        });
                    }
                    tagged.suffix = join_tokens(&tail);
                    Ok(tagged)
                } else {
                    Self::tag_inverted(&segments, nickname, raw)
                }
            }
        }
    }
}

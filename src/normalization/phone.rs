// src/normalization/phone.rs
//
// Phone normalization to E.164. Parsing itself is delegated to a
// `PhoneParser`; this module owns region inference, multi-value splitting and
// the shape of the result. Nothing here fails: bad input is recorded as
// `is_valid = false`.

use log::debug;
use phonenumber::{country, Mode};
use std::panic::{self, AssertUnwindSafe};

use crate::models::normalized::PhoneType;
use crate::models::raw::RawContactRecord;

/// Separator used when one directory cell holds several numbers.
pub const MULTI_VALUE_DELIMITER: char = '|';

pub const DEFAULT_REGION: &str = "US";
/// Region assumed for trunk-prefixed numbers ("020 ...") when no country is known.
pub const ZERO_PREFIX_REGION: &str = "GB";

/// Country hint (ISO code, plus the common "UK" alias) to parsing region.
pub const REGION_TABLE: &[(&str, &str)] = &[
    ("GB", "GB"),
    ("UK", "GB"),
    ("US", "US"),
    ("FR", "FR"),
    ("CH", "CH"),
    ("ES", "ES"),
    ("IT", "IT"),
    ("DE", "DE"),
    ("AU", "AU"),
    ("BR", "BR"),
    ("CA", "CA"),
    ("SE", "SE"),
    ("IL", "IL"),
    ("SG", "SG"),
    ("HK", "HK"),
    ("ZA", "ZA"),
    ("JP", "JP"),
    ("MX", "MX"),
    ("NL", "NL"),
    ("IE", "IE"),
    ("AT", "AT"),
    ("BE", "BE"),
    ("RU", "RU"),
    ("IN", "IN"),
    ("NZ", "NZ"),
];

/// Directory phone columns and the semantic type each one carries.
pub const PHONE_FIELDS: [PhoneType; 4] = [
    PhoneType::General,
    PhoneType::Work,
    PhoneType::Home,
    PhoneType::Mobile,
];

/// A number the parser accepted as valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPhone {
    pub e164: String,
    pub country_code: u16,
    pub national: String,
}

/// Telephone parsing/validation capability.
pub trait PhoneParser: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Returns `None` for anything unparseable or invalid in `region`.
    fn parse(&self, raw: &str, region: &str) -> Option<ParsedPhone>;
}

/// libphonenumber metadata via the `phonenumber` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibPhoneNumber;

impl PhoneParser for LibPhoneNumber {
    fn backend(&self) -> &'static str {
        "libphonenumber"
    }

    fn parse(&self, raw: &str, region: &str) -> Option<ParsedPhone> {
        let region_id = region_id(region);
        // Parser panics are treated as unparseable input.
        let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
            let number = phonenumber::parse(region_id, raw).ok()?;
            if !phonenumber::is_valid(&number) {
                return None;
            }
            Some(ParsedPhone {
                e164: number.format().mode(Mode::E164).to_string(),
                country_code: number.code().value(),
                national: number.format().mode(Mode::National).to_string(),
            })
        }));
        match parsed {
            Ok(result) => result,
            Err(_) => {
                debug!("Phone parser panicked on '{}' (region {})", raw, region);
                None
            }
        }
    }
}

/// Used when no phone library is configured: every number is recorded invalid.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPhoneParser;

impl PhoneParser for NoPhoneParser {
    fn backend(&self) -> &'static str {
        "none"
    }

    fn parse(&self, _raw: &str, _region: &str) -> Option<ParsedPhone> {
        None
    }
}

fn region_id(region: &str) -> Option<country::Id> {
    let id = match region {
        "GB" => country::Id::GB,
        "US" => country::Id::US,
        "FR" => country::Id::FR,
        "CH" => country::Id::CH,
        "ES" => country::Id::ES,
        "IT" => country::Id::IT,
        "DE" => country::Id::DE,
        "AU" => country::Id::AU,
        "BR" => country::Id::BR,
        "CA" => country::Id::CA,
        "SE" => country::Id::SE,
        "IL" => country::Id::IL,
        "SG" => country::Id::SG,
        "HK" => country::Id::HK,
        "ZA" => country::Id::ZA,
        "JP" => country::Id::JP,
        "MX" => country::Id::MX,
        "NL" => country::Id::NL,
        "IE" => country::Id::IE,
        "AT" => country::Id::AT,
        "BE" => country::Id::BE,
        "RU" => country::Id::RU,
        "IN" => country::Id::IN,
        "NZ" => country::Id::NZ,
        _ => return None,
    };
    Some(id)
}

/// Picks the parsing region: mapped country hint, else the trunk-prefix
/// region for "0..." (but not "00...") numbers without a hint, else the
/// global default.
pub fn infer_region(raw: &str, country_hint: Option<&str>) -> &'static str {
    let mapped = country_hint.and_then(|hint| {
        REGION_TABLE
            .iter()
            .find(|(code, _)| *code == hint)
            .map(|(_, region)| *region)
    });
    if let Some(region) = mapped {
        return region;
    }
    if country_hint.is_none() && raw.starts_with('0') && !raw.starts_with("00") {
        return ZERO_PREFIX_REGION;
    }
    DEFAULT_REGION
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPhone {
    pub raw_value: String,
    pub e164_format: Option<String>,
    pub country_code: Option<i32>,
    pub national_format: Option<String>,
    pub is_valid: bool,
    pub parse_region: Option<String>,
}

impl NormalizedPhone {
    fn invalid(raw_value: String, parse_region: Option<String>) -> Self {
        Self {
            raw_value,
            e164_format: None,
            country_code: None,
            national_format: None,
            is_valid: false,
            parse_region,
        }
    }
}

/// Normalizes a single phone string.
pub fn normalize_phone(
    raw: &str,
    country_hint: Option<&str>,
    parser: &dyn PhoneParser,
) -> NormalizedPhone {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NormalizedPhone::invalid(raw.to_string(), None);
    }

    let region = infer_region(trimmed, country_hint);
    match parser.parse(trimmed, region) {
        Some(parsed) => NormalizedPhone {
            raw_value: trimmed.to_string(),
            e164_format: Some(parsed.e164),
            country_code: Some(i32::from(parsed.country_code)),
            national_format: Some(parsed.national),
            is_valid: true,
            parse_region: Some(region.to_string()),
        },
        None => {
            debug!("Phone '{}' not valid for region {}", trimmed, region);
            NormalizedPhone::invalid(trimmed.to_string(), Some(region.to_string()))
        }
    }
}

fn phone_field(record: &RawContactRecord, phone_type: PhoneType) -> Option<&str> {
    match phone_type {
        PhoneType::General => record.phone_general.as_deref(),
        PhoneType::Work => record.phone_work.as_deref(),
        PhoneType::Home => record.phone_home.as_deref(),
        PhoneType::Mobile => record.phone_mobile.as_deref(),
    }
}

/// Normalizes every number in a directory row's phone columns. Multi-valued
/// cells are split first and each segment keeps its column's type.
pub fn extract_phones(
    record: &RawContactRecord,
    country_iso: Option<&str>,
    parser: &dyn PhoneParser,
) -> Vec<(PhoneType, NormalizedPhone)> {
    let mut phones = Vec::new();
    for phone_type in PHONE_FIELDS {
        let Some(value) = phone_field(record, phone_type) else {
            continue;
        };
        for segment in value.split(MULTI_VALUE_DELIMITER) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            phones.push((phone_type, normalize_phone(segment, country_iso, parser)));
        }
    }
    phones
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts anything made of 10 digits, formatting it as a US number.
    struct TenDigitParser;

    impl PhoneParser for TenDigitParser {
        fn backend(&self) -> &'static str {
            "test"
        }

        fn parse(&self, raw: &str, _region: &str) -> Option<ParsedPhone> {
            let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
            (digits.len() == 10).then(|| ParsedPhone {
                e164: format!("+1{}", digits),
                country_code: 1,
                national: digits,
            })
        }
    }

    #[test]
    fn test_region_inference_order() {
        assert_eq!(infer_region("020 7219 3000", Some("FR")), "FR");
        assert_eq!(infer_region("020 7219 3000", Some("UK")), "GB");
        assert_eq!(infer_region("020 7219 3000", None), "GB");
        assert_eq!(infer_region("0044 20 7219 3000", None), "US");
        assert_eq!(infer_region("212 736 5000", None), "US");
        // A hint outside the table falls back to the default, even for "0..." numbers.
        assert_eq!(infer_region("0123", Some("PE")), "US");
    }

    #[test]
    fn test_blank_input_is_invalid_without_region() {
        let result = normalize_phone("   ", None, &TenDigitParser);
        assert!(!result.is_valid);
        assert_eq!(result.parse_region, None);
        assert_eq!(result.e164_format, None);
    }

    #[test]
    fn test_invalid_keeps_raw_and_region() {
        let result = normalize_phone(" 12 ", Some("US"), &TenDigitParser);
        assert!(!result.is_valid);
        assert_eq!(result.raw_value, "12");
        assert_eq!(result.parse_region.as_deref(), Some("US"));
    }

    #[test]
    fn test_multi_valued_cells_are_split_and_typed() {
        let record = RawContactRecord {
            phone_general: Some("212 736 5000 | 212 736 5001".to_string()),
            phone_home: Some("||".to_string()),
            phone_mobile: Some("garbage".to_string()),
            ..Default::default()
        };
        let phones = extract_phones(&record, Some("US"), &TenDigitParser);
        assert_eq!(phones.len(), 3);
        assert_eq!(phones[0].0, PhoneType::General);
        assert_eq!(phones[0].1.e164_format.as_deref(), Some("+12127365000"));
        assert_eq!(phones[1].0, PhoneType::General);
        assert_eq!(phones[1].1.e164_format.as_deref(), Some("+12127365001"));
        assert_eq!(phones[2].0, PhoneType::Mobile);
        assert!(!phones[2].1.is_valid);
    }

    #[test]
    fn test_no_phone_parser_marks_everything_invalid() {
        let result = normalize_phone("+1 212 736 5000", None, &NoPhoneParser);
        assert!(!result.is_valid);
        assert_eq!(result.raw_value, "+1 212 736 5000");
    }

    #[test]
    fn test_libphonenumber_formats_e164() {
        let uk = normalize_phone("020 7219 3000", None, &LibPhoneNumber);
        assert!(uk.is_valid);
        assert_eq!(uk.e164_format.as_deref(), Some("+442072193000"));
        assert_eq!(uk.country_code, Some(44));
        assert_eq!(uk.parse_region.as_deref(), Some("GB"));

        let us = normalize_phone("+1 212-736-5000", Some("GB"), &LibPhoneNumber);
        assert!(us.is_valid);
        assert_eq!(us.e164_format.as_deref(), Some("+12127365000"));
        assert_eq!(us.country_code, Some(1));
    }

    #[test]
    fn test_libphonenumber_rejects_garbage() {
        for raw in ["12", "not a number", "+", "++44"] {
            let result = normalize_phone(raw, None, &LibPhoneNumber);
            assert!(!result.is_valid, "{:?} should be invalid", raw);
        }
    }
}

// src/normalization/country.rs
//
// Free-text country (and, in this source, occasionally city) strings to
// ISO 3166-1 alpha-2. Unmapped values are a statistic, not an error.

use log::debug;

/// Alias table. Order matters only for the case-insensitive pass, where the
/// first alias that matches wins.
pub const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("US", "US"),
    ("USA", "US"),
    ("United States", "US"),
    ("UK", "GB"),
    ("U.K.", "GB"),
    ("England", "GB"),
    ("Great Britain", "GB"),
    ("France", "FR"),
    ("Switzerland", "CH"),
    ("Spain", "ES"),
    ("Italy", "IT"),
    ("Australia", "AU"),
    ("Germany", "DE"),
    ("Brazil", "BR"),
    ("Canada", "CA"),
    ("Sweden", "SE"),
    ("Israel", "IL"),
    ("Singapore", "SG"),
    ("Hong Kong", "HK"),
    ("South Africa", "ZA"),
    ("Kenya", "KE"),
    ("Peru", "PE"),
    ("Argentina", "AR"),
    ("Portugal", "PT"),
    ("Belgium", "BE"),
    ("Nigeria", "NG"),
    ("Russia", "RU"),
    ("Saudi Arabia", "SA"),
    ("Bahamas", "BS"),
    ("Monaco", "MC"),
    ("Mexico", "MX"),
    ("Japan", "JP"),
    ("Netherlands", "NL"),
    ("Ireland", "IE"),
    ("Austria", "AT"),
    ("Czech Republic", "CZ"),
    ("Poland", "PL"),
    ("Greece", "GR"),
    ("Turkey", "TR"),
    ("India", "IN"),
    ("Thailand", "TH"),
    ("Philippines", "PH"),
    ("Indonesia", "ID"),
    ("Malaysia", "MY"),
    ("New Zealand", "NZ"),
    ("Chile", "CL"),
    ("Colombia", "CO"),
    ("Venezuela", "VE"),
    ("Ecuador", "EC"),
    ("Uruguay", "UY"),
    ("Panama", "PA"),
    ("Costa Rica", "CR"),
    ("Dominican Republic", "DO"),
    ("Jamaica", "JM"),
    ("Barbados", "BB"),
    ("Trinidad", "TT"),
    ("Cayman Islands", "KY"),
    ("Bermuda", "BM"),
    ("Virgin Islands", "VI"),
    ("Puerto Rico", "PR"),
    // Misspellings seen in the directory
    ("Columbia", "CO"),
    ("Untied States", "US"),
    // Cities entered in the country column
    ("London", "GB"),
    ("New York", "US"),
    ("Paris", "FR"),
    ("Los Angeles", "US"),
    ("Miami", "US"),
    ("Palm Beach", "US"),
];

/// Maps a free-text country to ISO 3166-1 alpha-2.
///
/// Lookup order: exact alias, case-insensitive alias, then passthrough of a
/// value that already looks like an upper-case two-letter code.
pub fn normalize_country(country: Option<&str>) -> Option<String> {
    let country = country?.trim();
    if country.is_empty() {
        return None;
    }

    if let Some((_, iso)) = COUNTRY_ALIASES.iter().find(|(alias, _)| *alias == country) {
        return Some(iso.to_string());
    }

    let lowered = country.to_lowercase();
    if let Some((_, iso)) = COUNTRY_ALIASES
        .iter()
        .find(|(alias, _)| alias.to_lowercase() == lowered)
    {
        return Some(iso.to_string());
    }

    if country.chars().count() == 2 && country.chars().all(|c| c.is_ascii_uppercase()) {
        return Some(country.to_string());
    }

    debug!("Country '{}' has no ISO mapping", country);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_misspelled_aliases() {
        assert_eq!(normalize_country(Some("U.K.")), Some("GB".to_string()));
        assert_eq!(normalize_country(Some("Columbia")), Some("CO".to_string()));
        assert_eq!(normalize_country(Some("Untied States")), Some("US".to_string()));
        assert_eq!(normalize_country(Some("Palm Beach")), Some("US".to_string()));
    }

    #[test]
    fn test_case_insensitive_and_trimmed() {
        assert_eq!(normalize_country(Some("  france ")), Some("FR".to_string()));
        assert_eq!(normalize_country(Some("GREAT BRITAIN")), Some("GB".to_string()));
    }

    #[test]
    fn test_iso_passthrough_requires_uppercase_pair() {
        assert_eq!(normalize_country(Some("NO")), Some("NO".to_string()));
        assert_eq!(normalize_country(Some("no")), None);
        assert_eq!(normalize_country(Some("NOR")), None);
    }

    #[test]
    fn test_unmapped_and_missing() {
        assert_eq!(normalize_country(Some("Atlantis")), None);
        assert_eq!(normalize_country(Some("   ")), None);
        assert_eq!(normalize_country(None), None);
    }
}

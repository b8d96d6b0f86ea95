// src/normalization/dates.rs
use chrono::NaiveDate;
use log::debug;

/// Manifest dates are written month-first with a four-digit year.
pub const MANIFEST_DATE_FORMAT: &str = "%m/%d/%Y";

/// Parses a manifest date. Blank or malformed values give `None`; the caller
/// keeps the raw string alongside.
pub fn parse_manifest_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, MANIFEST_DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            debug!("Unparseable flight date '{}': {}", raw, e);
            None
        }
    }
}

//! Field extraction over whole messages.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;

use crate::patterns;

pub type FieldMap = HashMap<&'static str, String>;

/// Run one pattern set over a message.
///
/// Find-all semantics: zero matches leaves the field absent, a single match
/// is taken verbatim, multiple matches are reduced to the unique set and, if
/// still plural, joined with `", "`. `UserName` values are lower-cased and
/// stripped of `-` before deduplication so the same account reported by
/// RADIUS and by AD compares equal.
pub fn extract(fields: &[(&'static str, Regex)], message: &str) -> FieldMap {
    let mut out = FieldMap::new();
    for (key, regex) in fields {
        let mut matches: Vec<String> = regex
            .captures_iter(message)
            .filter_map(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .collect();
        if matches.is_empty() {
            continue;
        }
        if matches.len() == 1 {
            out.insert(*key, matches.remove(0));
            continue;
        }
        if *key == "UserName" {
            for value in &mut matches {
                *value = value.replace('-', "").to_lowercase();
            }
        }
        let mut unique: Vec<String> = Vec::new();
        for value in matches {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        out.insert(*key, unique.join(", "));
    }
    out
}

/// Timestamp embedded in the ISE header, or the receive time when absent.
pub fn message_timestamp(message: &str, received_at: DateTime<Utc>) -> String {
    match patterns::TIMESTAMP.captures(message).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().to_string(),
        None => received_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn absent_field_stays_absent() {
        let fields = extract(&patterns::FAILED_FIELDS, "nothing of interest here");
        assert!(fields.is_empty());
    }

    #[test]
    fn single_match_taken_verbatim() {
        let fields = extract(
            &patterns::FAILED_FIELDS,
            "UserName=Alice-Admin, FailureReason=22056 Subject not found, ",
        );
        assert_eq!(fields.get("UserName").map(String::as_str), Some("Alice-Admin"));
        assert_eq!(
            fields.get("FailureReason").map(String::as_str),
            Some("22056 Subject not found")
        );
    }

    #[test]
    fn duplicate_matches_collapse_to_one() {
        let fields = extract(
            &patterns::FAILED_FIELDS,
            "NetworkDeviceName=sw01, rest NetworkDeviceName=sw01, tail",
        );
        assert_eq!(fields.get("NetworkDeviceName").map(String::as_str), Some("sw01"));
    }

    #[test]
    fn distinct_matches_join_with_comma() {
        let fields = extract(
            &patterns::FAILED_FIELDS,
            "FailureReason=12345 first, then FailureReason=67890 second, end",
        );
        assert_eq!(
            fields.get("FailureReason").map(String::as_str),
            Some("12345 first, 67890 second")
        );
    }

    #[test]
    fn usernames_normalize_before_dedup() {
        let fields = extract(
            &patterns::PASSED_FIELDS,
            "UserName=ACME-op, more UserName=acmeop, end",
        );
        assert_eq!(fields.get("UserName").map(String::as_str), Some("acmeop"));
    }

    #[test]
    fn embedded_timestamp_preferred() {
        let received = Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap();
        let line = "CISE_Failed_Attempts 1 1 1 2024-05-06 11:22:33.456 +02:00 rest";
        assert_eq!(
            message_timestamp(line, received),
            "2024-05-06 11:22:33.456 +02:00"
        );
        assert_eq!(
            message_timestamp("no timestamp here", received),
            "2024-05-06 09:00:00"
        );
    }
}

// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Semester label handling.
//!
//! Terms are stored in the canonical `<Term><Year>` form (`Fall2025`,
//! `Spring2026`). User input arrives in many shapes (`fall 2025`,
//! `FALL-2025`), so everything that keys a record goes through
//! [`normalize`] first.

use chrono::{DateTime, Datelike, Utc};

/// Normalize a semester label to canonical form.
///
/// Recognizes a term word (fall/spring/summer, any case) plus a 20xx year
/// anywhere in the input. Input that cannot be recognized falls back to the
/// whitespace-stripped original so legacy labels keep matching themselves.
pub fn normalize(input: &str) -> String {
    let lower = input.to_lowercase();
    let term = if lower.contains("fall") {
        Some("Fall")
    } else if lower.contains("spring") {
        Some("Spring")
    } else if lower.contains("summer") {
        Some("Summer")
    } else {
        None
    };

    let year = find_year(input);

    match (term, year) {
        (Some(term), Some(year)) => format!("{term}{year}"),
        _ => input.split_whitespace().collect(),
    }
}

/// First `20xx` four-digit run in the input.
fn find_year(input: &str) -> Option<&str> {
    let bytes = input.as_bytes();
    for start in 0..bytes.len().saturating_sub(3) {
        let window = &bytes[start..start + 4];
        if window[0] == b'2'
            && window[1] == b'0'
            && window[2].is_ascii_digit()
            && window[3].is_ascii_digit()
        {
            return Some(&input[start..start + 4]);
        }
    }
    None
}

/// The date-derived default term: Spring through May, Summer through
/// August, Fall otherwise. The admin-configured current-semester setting
/// takes precedence over this.
pub fn current_for(now: DateTime<Utc>) -> String {
    let year = now.year();
    match now.month() {
        1..=5 => format!("Spring{year}"),
        6..=8 => format!("Summer{year}"),
        _ => format!("Fall{year}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_canonical_forms() {
        assert_eq!(normalize("Fall2025"), "Fall2025");
        assert_eq!(normalize("fall 2025"), "Fall2025");
        assert_eq!(normalize("FALL-2025"), "Fall2025");
        assert_eq!(normalize("spring semester 2026"), "Spring2026");
        assert_eq!(normalize("Summer 2025"), "Summer2025");
    }

    #[test]
    fn test_normalize_fallback_strips_whitespace() {
        assert_eq!(normalize("Winter 2025"), "Winter2025");
        assert_eq!(normalize("fall"), "fall");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_current_for_by_month() {
        let at = |month| Utc.with_ymd_and_hms(2025, month, 15, 12, 0, 0).unwrap();
        assert_eq!(current_for(at(2)), "Spring2025");
        assert_eq!(current_for(at(5)), "Spring2025");
        assert_eq!(current_for(at(7)), "Summer2025");
        assert_eq!(current_for(at(9)), "Fall2025");
        assert_eq!(current_for(at(12)), "Fall2025");
    }
}

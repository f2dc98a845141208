//! Expiry date parsing and days-remaining computation.
//!
//! Parsing is two-tier: a strict pattern table, then a permissive
//! digit-scraping heuristic. An uninterpretable string degrades the
//! display to blank instead of breaking the key list.

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Date-only patterns tried in order against strings without a time part.
const DATE_PATTERNS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%Y.%m.%d"];

/// Whole days from today until `datestr`, clamped at zero.
pub fn days_left(datestr: &str) -> Option<i64> {
    days_left_from(datestr, Local::now().date_naive())
}

/// Day computation against an explicit `today`.
pub fn days_left_from(datestr: &str, today: NaiveDate) -> Option<i64> {
    let date = parse_date(datestr)?;
    Some((date - today).num_days().max(0))
}

fn parse_date(datestr: &str) -> Option<NaiveDate> {
    let datestr = datestr.trim();
    if datestr.is_empty() {
        return None;
    }
    if datestr.contains('T') {
        if let Ok(dt) = NaiveDateTime::parse_from_str(datestr, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt.date());
        }
    } else {
        for pattern in DATE_PATTERNS {
            if let Ok(date) = NaiveDate::parse_from_str(datestr, pattern) {
                return Some(date);
            }
        }
    }
    scrape_date(datestr)
}

/// Last resort: pull year/month/day out of whatever digit runs are present.
fn scrape_date(datestr: &str) -> Option<NaiveDate> {
    let cleaned = datestr.replace(['-', '/'], " ");
    let parts: Vec<u32> = cleaned
        .split_whitespace()
        .filter(|tok| tok.len() >= 2 && tok.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|tok| tok.parse().ok())
        .collect();
    if parts.len() < 3 {
        return None;
    }
    NaiveDate::from_ymd_opt(parts[0] as i32, parts[1], parts[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn far_future_date_counts_days() {
        assert!(days_left("2099-01-01").unwrap() > 0);
    }

    #[test]
    fn past_date_clamps_to_zero() {
        assert_eq!(days_left("2000-01-01"), Some(0));
    }

    #[test]
    fn unparseable_strings_return_none() {
        assert_eq!(days_left("N/A"), None);
        assert_eq!(days_left(""), None);
        assert_eq!(days_left("soon"), None);
    }

    #[test]
    fn pattern_table_covers_common_formats() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        assert_eq!(days_left_from("2026-08-14", today), Some(10));
        assert_eq!(days_left_from("2026/08/05", today), Some(1));
        assert_eq!(days_left_from("14-08-2026", today), Some(10));
        assert_eq!(days_left_from("2026.08.09", today), Some(5));
        assert_eq!(days_left_from("2026-08-14T12:30:00", today), Some(10));
    }

    #[test]
    fn heuristic_scrapes_digit_tokens() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 4).unwrap();
        assert_eq!(days_left_from("valid until 2026 08 14", today), Some(10));
        assert_eq!(days_left_from("2026-13-40", today), None);
    }
}

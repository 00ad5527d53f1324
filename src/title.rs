//! Mission title normalization
//!
//! Strips any dates a dispatcher typed into the title and stamps it with
//! today's date instead: `"05-06-2025 - Search Alpha"`.

use chrono::{DateTime, FixedOffset, Local, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on title length, applied before any pattern matching
pub const MAX_TITLE_CHARS: usize = 500;

/// `YYYY-M-D`, `M-D-YYYY`, `M-D-YY` and bare `M-D`, with `-` or `/`
/// separators, tried in that order. Each is anchored and only accepted when
/// it is not glued to further digits, so letters, `_` or `T` may touch a
/// date but `123/4` is left alone.
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^[0-9]{4}[-/][0-9]{1,2}[-/][0-9]{1,2}",
        r"^[0-9]{1,2}[-/][0-9]{1,2}[-/][0-9]{4}",
        r"^[0-9]{1,2}[-/][0-9]{1,2}[-/][0-9]{2}",
        r"^[0-9]{1,2}[-/][0-9]{1,2}",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid regex pattern"))
    .collect()
});

/// Source of "now" for anything that stamps dates
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall-clock time in the server's local zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

pub fn normalize<Tz: TimeZone>(raw_title: &str, now: &DateTime<Tz>) -> String {
    let date = now.date_naive().format("%m-%d-%Y").to_string();
    let cleaned = clean_title(raw_title);

    if cleaned.is_empty() {
        date
    } else {
        format!("{date} - {cleaned}")
    }
}

fn clean_title(raw_title: &str) -> String {
    let truncated: String = raw_title.chars().take(MAX_TITLE_CHARS).collect();
    let without_dates = strip_dates(&truncated);
    let collapsed = without_dates.replace(" - ", " ");
    collapsed
        .trim()
        .trim_end_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}

fn strip_dates(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut kept_from = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_digit() && !continues_number(&bytes[..i]) {
            if let Some(len) = date_len_at(&text[i..]) {
                out.push_str(&text[kept_from..i]);
                i += len;
                kept_from = i;
                continue;
            }
        }
        i += 1;
    }

    out.push_str(&text[kept_from..]);
    out
}

fn date_len_at(text: &str) -> Option<usize> {
    DATE_PATTERNS.iter().find_map(|pattern| {
        let end = pattern.find(text)?.end();
        let rest = &text.as_bytes()[end..];
        let glued = match rest {
            [next, ..] if next.is_ascii_digit() => true,
            [b'-' | b'/', next, ..] => next.is_ascii_digit(),
            _ => false,
        };
        (!glued).then_some(end)
    })
}

/// True when `before` ends in a digit, or a separator right after a digit
fn continues_number(before: &[u8]) -> bool {
    match before {
        [.., last] if last.is_ascii_digit() => true,
        [.., digit, b'-' | b'/'] => digit.is_ascii_digit(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn may_6_2025() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-05-06T09:30:00-08:00").unwrap()
    }

    #[test]
    fn test_strips_leading_iso_date() {
        assert_eq!(
            normalize("2024-01-01 - Search Alpha", &may_6_2025()),
            "05-06-2025 - Search Alpha"
        );
    }

    #[test]
    fn test_strips_us_dates_with_two_and_four_digit_years() {
        let now = may_6_2025();
        assert_eq!(normalize("Lost Hiker 1/2/24", &now), "05-06-2025 - Lost Hiker");
        assert_eq!(normalize("12/31/2023 Lost Hiker", &now), "05-06-2025 - Lost Hiker");
        assert_eq!(normalize("Lost Hiker 3-14", &now), "05-06-2025 - Lost Hiker");
        assert_eq!(normalize("2024/1/9 Flood", &now), "05-06-2025 - Flood");
    }

    #[test]
    fn test_no_dangling_hyphen() {
        let result = normalize(" - trailing-", &may_6_2025());
        assert_eq!(result, "05-06-2025 - trailing");
        assert!(!result.ends_with('-'));
    }

    #[test]
    fn test_title_that_is_only_a_date() {
        assert_eq!(normalize("2024-01-01", &may_6_2025()), "05-06-2025");
        assert_eq!(normalize("   ", &may_6_2025()), "05-06-2025");
    }

    #[test]
    fn test_date_prefix_follows_injected_clock() {
        let new_year = DateTime::parse_from_rfc3339("2031-01-02T00:00:00+00:00").unwrap();
        let result = normalize("Avalanche 05-06-2025", &new_year);
        assert_eq!(result, "01-02-2031 - Avalanche");
    }

    #[test]
    fn test_uses_date_in_clock_timezone() {
        // Still May 5th locally even though UTC has rolled over
        let late = DateTime::parse_from_rfc3339("2025-05-05T23:30:00-08:00").unwrap();
        assert!(normalize("Search", &late).starts_with("05-05-2025 - "));
    }

    #[test]
    fn test_numbers_that_are_not_dates_survive() {
        assert_eq!(
            normalize("Team 12 Ridge 4500ft", &may_6_2025()),
            "05-06-2025 - Team 12 Ridge 4500ft"
        );
    }

    #[test]
    fn test_strips_dates_touching_letters_and_underscores() {
        let now = may_6_2025();
        assert_eq!(normalize("Search_2024-01-01", &now), "05-06-2025 - Search_");
        assert_eq!(
            normalize("2024-01-01T08:00 Search", &now),
            "05-06-2025 - T08:00 Search"
        );
        assert_eq!(normalize("Hiker 1/2/24am", &now), "05-06-2025 - Hiker am");
        assert_eq!(normalize("Callout 3/14/2024b", &now), "05-06-2025 - Callout b");
    }

    #[test]
    fn test_digit_runs_are_not_split_into_dates() {
        let now = may_6_2025();
        assert_eq!(normalize("Grid 123/4", &now), "05-06-2025 - Grid 123/4");
        assert_eq!(normalize("Unit 1/2/345", &now), "05-06-2025 - Unit 1/2/345");
        assert_eq!(normalize("Sector 12024-01-01", &now), "05-06-2025 - Sector 12024-01-01");
    }

    #[test]
    fn test_truncates_long_input_before_matching() {
        let long = format!("{}{}", "a".repeat(MAX_TITLE_CHARS), " tail that is dropped");
        let result = normalize(&long, &may_6_2025());
        assert_eq!(result, format!("05-06-2025 - {}", "a".repeat(MAX_TITLE_CHARS)));
    }

    #[test]
    fn test_pathological_input_is_fast() {
        let hostile = "1-".repeat(50_000);
        let start = std::time::Instant::now();
        let result = normalize(&hostile, &may_6_2025());
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
        assert!(result.starts_with("05-06-2025"));
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let long = "é".repeat(MAX_TITLE_CHARS + 10);
        let result = normalize(&long, &may_6_2025());
        let title = result.trim_start_matches("05-06-2025 - ");
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_fixed_clock_returns_pinned_instant() {
        let clock = FixedClock(may_6_2025());
        assert_eq!(clock.now(), may_6_2025());
        assert!(normalize("Search", &clock.now()).starts_with("05-06-2025"));
    }
}

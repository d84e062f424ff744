//! Record comparison
//!
//! [`compare_records`] is the single ordering rule shared by the in-memory
//! sorter, the run builder, the run merger and the sortedness checker. It is a
//! pure function of its inputs, which is what lets independently sorted runs
//! be merged back into one consistent order.

use crate::config::{SortConfig, SortMode};
use crate::record::Record;
use std::cmp::Ordering;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Compare two records in ascending order under `config`.
///
/// `config.reverse` is not applied here; callers invert the result so that
/// ascending and descending orders share one tie-break behaviour.
pub fn compare_records(a: &Record, b: &Record, config: &SortConfig) -> Ordering {
    let key_a = extract_key(a, config);
    let key_b = extract_key(b, config);

    match config.mode() {
        SortMode::Month => compare_month(key_a, key_b)
            .unwrap_or_else(|| a.original().cmp(b.original())),
        SortMode::HumanNumeric => {
            match (parse_human_numeric(key_a), parse_human_numeric(key_b)) {
                (Some(x), Some(y)) => compare_floats(x, y),
                _ => key_a.cmp(key_b),
            }
        }
        SortMode::Numeric => match (parse_numeric(key_a), parse_numeric(key_b)) {
            (Some(x), Some(y)) => compare_floats(x, y),
            _ => key_a.cmp(key_b),
        },
        SortMode::Lexicographic => key_a.cmp(key_b),
    }
}

/// Compare in the direction requested by `config.reverse`
#[inline]
pub fn compare_ordered(a: &Record, b: &Record, config: &SortConfig) -> Ordering {
    let cmp = compare_records(a, b, config);
    if config.reverse {
        cmp.reverse()
    } else {
        cmp
    }
}

/// The comparison key of a record: the configured field, or the whole line.
/// A record too short to have the field yields an empty key.
pub fn extract_key<'a>(record: &'a Record, config: &SortConfig) -> &'a str {
    let key = if config.key_field > 0 {
        record.field(config.key_field).unwrap_or("")
    } else {
        record.original()
    };

    if config.ignore_trailing_blanks {
        key.trim_end_matches([' ', '\t'])
    } else {
        key
    }
}

/// Month ordering of two keys; `None` unless both start with a month name.
/// Equal months are broken by the original lines, not the keys.
fn compare_month(a: &str, b: &str) -> Option<Ordering> {
    let month_a = month_number(a)?;
    let month_b = month_number(b)?;
    match month_a.cmp(&month_b) {
        Ordering::Equal => None,
        other => Some(other),
    }
}

/// 1-based month number of the first three bytes of `key`
pub fn month_number(key: &str) -> Option<usize> {
    let prefix = key.get(..3)?;
    MONTHS
        .iter()
        .position(|month| prefix.eq_ignore_ascii_case(month))
        .map(|index| index + 1)
}

/// Parse a number with an optional k/m/g suffix (powers of 1024).
/// Surrounding whitespace is ignored and an empty key counts as zero.
pub fn parse_human_numeric(key: &str) -> Option<f64> {
    let lowered = key.trim().to_lowercase();
    if lowered.is_empty() {
        return Some(0.0);
    }

    let (digits, multiplier) = match lowered.as_bytes()[lowered.len() - 1] {
        b'k' => (&lowered[..lowered.len() - 1], 1024.0),
        b'm' => (&lowered[..lowered.len() - 1], 1024.0 * 1024.0),
        b'g' => (&lowered[..lowered.len() - 1], 1024.0 * 1024.0 * 1024.0),
        _ => (lowered.as_str(), 1.0),
    };

    parse_numeric(digits).map(|value| value * multiplier)
}

/// Parse a key as a floating-point number; no whitespace is tolerated
pub fn parse_numeric(key: &str) -> Option<f64> {
    key.parse::<f64>().ok()
}

/// NaN compares equal to everything, as a plain `<`/`>` test would
#[inline]
fn compare_floats(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{presets, SortConfigBuilder};

    fn record(line: &str) -> Record {
        Record::new(line.to_string(), "\t")
    }

    fn cmp(a: &str, b: &str, config: &SortConfig) -> Ordering {
        compare_records(&record(a), &record(b), config)
    }

    #[test]
    fn test_lexicographic_is_bytewise() {
        let config = SortConfig::default();
        assert_eq!(cmp("apple", "banana", &config), Ordering::Less);
        assert_eq!(cmp("B", "a", &config), Ordering::Less);
        assert_eq!(cmp("10", "9", &config), Ordering::Less);
        assert_eq!(cmp("same", "same", &config), Ordering::Equal);
    }

    #[test]
    fn test_numeric_with_fallback() {
        let config = presets::numeric();
        assert_eq!(cmp("2", "10", &config), Ordering::Less);
        assert_eq!(cmp("-3.5", "-3", &config), Ordering::Less);
        assert_eq!(cmp("1e3", "999", &config), Ordering::Greater);
        assert_eq!(cmp("2.0", "2", &config), Ordering::Equal);
        // Either side unparsable: plain key comparison
        assert_eq!(cmp("abc", "10", &config), Ordering::Greater);
        assert_eq!(cmp(" 5", "10", &config), Ordering::Less);
    }

    #[test]
    fn test_human_numeric() {
        let config = presets::human_numeric();
        assert_eq!(cmp("500", "1k", &config), Ordering::Less);
        assert_eq!(cmp("1K", "1024", &config), Ordering::Equal);
        assert_eq!(cmp("2m", "1G", &config), Ordering::Less);
        assert_eq!(cmp("", "0", &config), Ordering::Equal);
        assert_eq!(cmp(" 3k ", "2k", &config), Ordering::Greater);
        // "k" alone does not parse, so the keys are compared as text
        assert_eq!(cmp("k", "1", &config), Ordering::Greater);
    }

    #[test]
    fn test_parse_human_numeric() {
        assert_eq!(parse_human_numeric("1k"), Some(1024.0));
        assert_eq!(parse_human_numeric("1.5M"), Some(1.5 * 1024.0 * 1024.0));
        assert_eq!(parse_human_numeric("  "), Some(0.0));
        assert_eq!(parse_human_numeric("12x"), None);
        assert_eq!(parse_human_numeric("g"), None);
    }

    #[test]
    fn test_month_order_and_fallbacks() {
        let config = presets::month();
        assert_eq!(cmp("Jan 5", "Feb 2", &config), Ordering::Less);
        assert_eq!(cmp("dec", "NOV", &config), Ordering::Greater);
        // Same month: original lines decide
        assert_eq!(cmp("Mar 9", "Mar 1", &config), Ordering::Greater);
        // One side is not a month: original lines decide
        assert_eq!(cmp("Zzz", "Jan", &config), Ordering::Greater);
        assert_eq!(cmp("Ja", "Feb", &config), Ordering::Greater);
    }

    #[test]
    fn test_month_tie_uses_original_line_not_key() {
        let config = SortConfigBuilder::new()
            .month()
            .key_field(2)
            .build()
            .expect("Failed to build test config");
        // Keys are both "Jan"; the originals differ in the first field
        assert_eq!(cmp("b\tJan", "a\tJan", &config), Ordering::Greater);
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("january"), Some(1));
        assert_eq!(month_number("DECEMBER"), Some(12));
        assert_eq!(month_number("ja"), None);
        assert_eq!(month_number("jäx"), None);
    }

    #[test]
    fn test_key_field_and_short_records() {
        let config = SortConfigBuilder::new()
            .key_field(2)
            .build()
            .expect("Failed to build test config");
        assert_eq!(cmp("b\t1", "a\t2", &config), Ordering::Less);
        // Missing field sorts as an empty key
        assert_eq!(cmp("only", "x\t", &config), Ordering::Equal);
        assert_eq!(cmp("only", "x\ta", &config), Ordering::Less);
    }

    #[test]
    fn test_ignore_trailing_blanks() {
        let plain = SortConfig::default();
        assert_eq!(cmp("a \t", "a", &plain), Ordering::Greater);

        let trimmed = SortConfig::default().with_ignore_trailing_blanks(true);
        assert_eq!(cmp("a \t", "a", &trimmed), Ordering::Equal);
        assert_eq!(cmp(" a", "a", &trimmed), Ordering::Less);
    }

    #[test]
    fn test_reverse_only_in_compare_ordered() {
        let config = presets::reverse();
        let (a, b) = (record("a"), record("b"));
        assert_eq!(compare_records(&a, &b, &config), Ordering::Less);
        assert_eq!(compare_ordered(&a, &b, &config), Ordering::Greater);
    }

    #[test]
    fn test_transitive_over_mixed_numeric_input() {
        let config = presets::numeric();
        let lines = ["-1", "0", "2", "10", "10.5", "1e2"];
        for a in lines {
            for b in lines {
                for c in lines {
                    if cmp(a, b, &config) == Ordering::Less
                        && cmp(b, c, &config) == Ordering::Less
                    {
                        assert_eq!(cmp(a, c, &config), Ordering::Less, "{a} {b} {c}");
                    }
                }
            }
        }
    }
}

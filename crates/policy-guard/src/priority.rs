//! Priority ordering among path patterns.
//!
//! When several patterns match one path, the single highest-priority
//! pattern's capability set governs. The order is a sequential
//! tie-break; the final lexicographic rule makes it total, so any two
//! distinct patterns are strictly ordered.

use std::cmp::Ordering;

use crate::policy::PathPattern;

/// Compare two patterns by priority. `Ordering::Greater` means `a`
/// outranks `b`.
///
/// Tie-breaks, applied in order until one distinguishes:
///
/// 1. later first-wildcard position wins (no wildcard at all ranks
///    above every wildcard position)
/// 2. no trailing `*` wins
/// 3. fewer `+` wildcards wins
/// 4. longer pattern wins
/// 5. lexicographically smaller pattern wins
pub fn compare(a: &PathPattern, b: &PathPattern) -> Ordering {
    compare_str(a.as_str(), b.as_str())
}

pub(crate) fn compare_str(a: &str, b: &str) -> Ordering {
    let a_wildcard = first_wildcard(a).unwrap_or(usize::MAX);
    let b_wildcard = first_wildcard(b).unwrap_or(usize::MAX);

    a_wildcard
        .cmp(&b_wildcard)
        .then_with(|| b.ends_with('*').cmp(&a.ends_with('*')))
        .then_with(|| plus_count(b).cmp(&plus_count(a)))
        .then_with(|| a.len().cmp(&b.len()))
        .then_with(|| b.cmp(a))
}

/// Byte position of the first wildcard, if any.
///
/// Wildcards are every `+` and a final `*`; a `*` elsewhere is a
/// literal and does not count. The alphabet is ASCII, so byte positions
/// coincide with character positions.
fn first_wildcard(pattern: &str) -> Option<usize> {
    let plus = pattern.find('+');
    let star = pattern.len().checked_sub(1).filter(|_| pattern.ends_with('*'));
    match (plus, star) {
        (Some(p), Some(s)) => Some(p.min(s)),
        (plus, star) => plus.or(star),
    }
}

fn plus_count(pattern: &str) -> usize {
    pattern.bytes().filter(|b| *b == b'+').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &str, b: &str) -> Ordering {
        compare_str(a, b)
    }

    #[test]
    fn reflexive() {
        assert_eq!(cmp("secret/app/db", "secret/app/db"), Ordering::Equal);
        assert_eq!(cmp("secret/+/x*", "secret/+/x*"), Ordering::Equal);
    }

    #[test]
    fn later_first_wildcard_outranks() {
        // wildcard at position 7 vs position 11
        assert_eq!(cmp("secret/app/+", "secret/+/db"), Ordering::Greater);
        // absence of wildcards outranks any wildcard
        assert_eq!(cmp("secret/app", "secret/app/very/long/+"), Ordering::Greater);
    }

    #[test]
    fn non_final_star_counts_as_literal_for_position() {
        // "a*b/+": the '*' is literal, first wildcard is '+' at 4;
        // "a/+/b": first wildcard at 2.
        assert_eq!(cmp("a*b/+", "a/+/b"), Ordering::Greater);
    }

    #[test]
    fn missing_trailing_star_outranks() {
        // same first-wildcard position (7)
        assert_eq!(cmp("secret/+", "secret/*"), Ordering::Greater);
    }

    #[test]
    fn fewer_plus_wildcards_outrank() {
        // same first-wildcard position, neither has a trailing star
        assert_eq!(cmp("secret/+/ab", "secret/+/+b"), Ordering::Greater);
    }

    #[test]
    fn longer_pattern_outranks() {
        assert_eq!(cmp("secret/app/db", "secret/app/d"), Ordering::Greater);
        // identical up to R3 as well
        assert_eq!(cmp("secret/+/long", "secret/+/ab"), Ordering::Greater);
    }

    #[test]
    fn lexicographically_smaller_outranks() {
        // equal on every structural rule, differ only in spelling
        assert_eq!(cmp("secret/aa", "secret/ab"), Ordering::Greater);
        assert_eq!(cmp("secret/zz", "secret/ab"), Ordering::Less);
    }

    #[test]
    fn antisymmetric_on_boundaries() {
        let pairs = [
            ("secret/app/+", "secret/+/db"),
            ("secret/+", "secret/*"),
            ("secret/+/ab", "secret/+/+b"),
            ("secret/app/db", "secret/app/d"),
            ("secret/aa", "secret/ab"),
        ];
        for (a, b) in pairs {
            assert_eq!(cmp(a, b), cmp(b, a).reverse(), "{a} vs {b}");
        }
    }
}

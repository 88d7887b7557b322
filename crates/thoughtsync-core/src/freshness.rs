//! Freshness ordering over datasets.
//!
//! A fetched dataset only replaces the cached one when its `lastUpdated`
//! timestamp is strictly later. Datasets without a parseable timestamp sort
//! below every timestamped dataset: a malformed candidate never wins against
//! an existing cache, and a malformed cache always loses to a well-formed
//! candidate.

use crate::models::Dataset;

/// Decide whether `candidate` supersedes `current`.
///
/// With no current dataset the candidate always wins, since anything is
/// better than an empty cache.
pub fn is_newer(candidate: &Dataset, current: Option<&Dataset>) -> bool {
    let Some(current) = current else {
        return true;
    };

    match (candidate.published_at(), current.published_at()) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(candidate_at), Some(current_at)) => candidate_at > current_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(ts: &str) -> Dataset {
        Dataset {
            last_updated: Some(ts.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_bootstrap_is_newer() {
        assert!(is_newer(&at("2024-01-01T00:00:00Z"), None));
        assert!(is_newer(&Dataset::default(), None));
    }

    #[test]
    fn test_strictly_greater_wins() {
        let old = at("2024-01-01T00:00:00Z");
        let new = at("2024-01-02T00:00:00Z");
        assert!(is_newer(&new, Some(&old)));
        assert!(!is_newer(&old, Some(&new)));
    }

    #[test]
    fn test_equal_timestamps_not_newer() {
        let a = at("2024-01-01T00:00:00Z");
        assert!(!is_newer(&a, Some(&a)));
    }

    #[test]
    fn test_compares_instants_not_strings() {
        // Same instant written with different offsets / precision
        let utc = at("2024-01-01T12:00:00.000Z");
        let offset = at("2024-01-01T14:00:00+02:00");
        assert!(!is_newer(&utc, Some(&offset)));
        assert!(!is_newer(&offset, Some(&utc)));

        // Lexically smaller but later in time
        let later = at("2024-01-01T09:00:00-05:00");
        let earlier = at("2024-01-01T13:00:00Z");
        assert!(is_newer(&later, Some(&earlier)));
    }

    #[test]
    fn test_accepts_iso_forms_without_rfc3339_offset() {
        let cached = at("2024-01-01T00:00:00Z");
        for candidate in [
            "2024-06-01T00:00:00",
            "2024-06-01T00:00:00.250",
            "2024-06-01",
            "2024-06-01T00:00:00.000+0000",
            "2024-06-01T02:00:00+0200",
        ] {
            assert!(is_newer(&at(candidate), Some(&cached)), "{candidate}");
            assert!(!is_newer(&cached, Some(&at(candidate))), "{candidate}");
        }
    }

    #[test]
    fn test_offsetless_forms_read_as_utc() {
        let utc = at("2024-06-01T00:00:00Z");
        assert!(!is_newer(&at("2024-06-01"), Some(&utc)));
        assert!(!is_newer(&at("2024-06-01T00:00:00"), Some(&utc)));
        assert!(!is_newer(&at("2024-06-01T00:00:00+0000"), Some(&utc)));
        assert!(is_newer(&at("2024-06-01T00:00:00.001"), Some(&utc)));
    }

    #[test]
    fn test_malformed_candidate_never_newer() {
        let good = at("1970-01-01T00:00:00Z");
        assert!(!is_newer(&Dataset::default(), Some(&good)));
        assert!(!is_newer(&at("yesterday"), Some(&good)));
    }

    #[test]
    fn test_malformed_current_always_loses() {
        let candidate = at("2000-01-01T00:00:00Z");
        assert!(is_newer(&candidate, Some(&Dataset::default())));
        assert!(is_newer(&candidate, Some(&at("not a date"))));
    }

    #[test]
    fn test_both_malformed_not_newer() {
        assert!(!is_newer(&Dataset::default(), Some(&at("garbage"))));
        assert!(!is_newer(&at("garbage"), Some(&Dataset::default())));
    }

    fn arb_dataset() -> impl Strategy<Value = Dataset> {
        prop_oneof![
            Just(Dataset::default()),
            "[a-z0-9:-]{0,12}".prop_map(|s| at(&s)),
            (0i64..4_000_000_000).prop_map(|secs| {
                let ts = chrono::DateTime::from_timestamp(secs, 0).unwrap_or_default();
                at(&ts.to_rfc3339())
            }),
        ]
    }

    proptest! {
        #[test]
        fn test_is_newer_antisymmetric(a in arb_dataset(), b in arb_dataset()) {
            prop_assert!(!(is_newer(&a, Some(&b)) && is_newer(&b, Some(&a))));
        }

        #[test]
        fn test_is_newer_irreflexive(a in arb_dataset()) {
            prop_assert!(!is_newer(&a, Some(&a)));
        }
    }
}

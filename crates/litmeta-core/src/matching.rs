/// Minimum title similarity for a source to vote in favour of a claim.
pub const SIMILARITY_THRESHOLD: f64 = 0.9;
/// Maximum distance in years between claimed and registry publication year.
pub const YEAR_TOLERANCE: i32 = 1;

/// Case-insensitive similarity ratio between two titles, in `[0.0, 1.0]`.
///
/// The ratio is `2 * M / T` where `M` is the number of characters in the
/// longest common subsequence and `T` the combined length of both strings.
/// Identical strings score 1.0 and strings sharing no characters score 0.0.
/// Two empty titles are considered identical.
pub fn title_similarity(claimed: &str, candidate: &str) -> f64 {
    let a = claimed.to_lowercase();
    let b = candidate.to_lowercase();

    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    rapidfuzz::fuzz::ratio(a.chars(), b.chars()).clamp(0.0, 1.0)
}

/// Whether a registry year corroborates the claimed year.
///
/// A claimed year of 0 means "unknown" and accepts any registry year.
pub fn year_within_tolerance(claimed: i32, found: i32) -> bool {
    claimed == 0 || found.abs_diff(claimed) <= YEAR_TOLERANCE.unsigned_abs()
}

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_titles_score_one() {
        assert_eq!(title_similarity("Deep Learning", "Deep Learning"), 1.0);
    }

    #[test]
    fn similarity_ignores_case() {
        assert!((title_similarity("Deep Learning", "Deep learning") - 1.0).abs() < 1e-9);
        assert!((title_similarity("DEEP LEARNING", "deep learning") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_titles_score_zero() {
        assert!(title_similarity("abc", "xyz") < 1e-9);
    }

    #[test]
    fn ratio_counts_common_characters() {
        // "abcd" vs "abce": 3 common of 8 total chars -> 6/8
        let score = title_similarity("abcd", "abce");
        assert!((score - 0.75).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn small_typo_stays_above_threshold() {
        let score = title_similarity(
            "Attention is all you need",
            "Attention is all you need.",
        );
        assert!(score >= SIMILARITY_THRESHOLD, "got {score}");
    }

    #[test]
    fn different_paper_falls_below_threshold() {
        let score = title_similarity(
            "Attention is all you need",
            "Convolutional sequence to sequence learning",
        );
        assert!(score < SIMILARITY_THRESHOLD, "got {score}");
    }

    #[test]
    fn empty_titles() {
        assert_eq!(title_similarity("", ""), 1.0);
        assert_eq!(title_similarity("Deep Learning", ""), 0.0);
        assert_eq!(title_similarity("", "Deep Learning"), 0.0);
    }

    #[test]
    fn year_tolerance() {
        assert!(year_within_tolerance(0, 1999));
        assert!(year_within_tolerance(0, 0));
        assert!(year_within_tolerance(2015, 2015));
        assert!(year_within_tolerance(2015, 2014));
        assert!(year_within_tolerance(2015, 2016));
        assert!(!year_within_tolerance(2015, 2017));
        assert!(!year_within_tolerance(2015, 0));
        assert!(!year_within_tolerance(i32::MAX, -1));
        assert!(!year_within_tolerance(i32::MAX, i32::MIN));
        assert!(year_within_tolerance(i32::MAX, i32::MAX - 1));
    }

    #[test]
    fn normalize_collapses_runs() {
        assert_eq!(normalize_whitespace("Hello   \n World"), "Hello World");
        assert_eq!(normalize_whitespace("  \t lead and trail \r\n"), "lead and trail");
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_whitespace("a\u{a0}\u{a0}b\n\nc   d");
        assert_eq!(normalize_whitespace(&once), once);
    }
}

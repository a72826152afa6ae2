use std::collections::{BTreeMap, BTreeSet};

/// Split free text into case-folded alphanumeric tokens.
///
/// Anything that is not a letter or digit separates tokens, so
/// `"Music, travel;HIKING"` yields `["music", "travel", "hiking"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Term frequencies for one document. A `BTreeMap` keeps iteration order
/// fixed, which keeps the floating point sums symmetric in their inputs.
fn term_counts(tokens: Vec<String>) -> BTreeMap<String, f64> {
    let mut counts = BTreeMap::new();
    for token in tokens {
        *counts.entry(token).or_insert(0.0) += 1.0;
    }
    counts
}

/// TF-IDF cosine similarity between two free-text attribute strings.
///
/// The IDF table is fitted on the two-document corpus `{text_a, text_b}` and
/// lives only for the duration of the call. IDF is smoothed:
/// `ln((1 + n) / (1 + df)) + 1` with `n = 2`.
///
/// Returns exactly `0.0` when either side is empty (or has no tokens after
/// normalization) and exactly `1.0` when both sides carry the same tokens
/// with the same frequencies.
pub fn similarity(text_a: &str, text_b: &str) -> f64 {
    let counts_a = term_counts(tokenize(text_a));
    let counts_b = term_counts(tokenize(text_b));

    if counts_a.is_empty() || counts_b.is_empty() {
        return 0.0;
    }
    if counts_a == counts_b {
        return 1.0;
    }

    let vocabulary: BTreeSet<&String> = counts_a.keys().chain(counts_b.keys()).collect();
    let n_docs = 2.0_f64;

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for term in vocabulary {
        let tf_a = counts_a.get(term).copied().unwrap_or(0.0);
        let tf_b = counts_b.get(term).copied().unwrap_or(0.0);
        let df = (tf_a > 0.0) as u8 as f64 + (tf_b > 0.0) as u8 as f64;
        let idf = ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0;

        let w_a = tf_a * idf;
        let w_b = tf_b * idf;
        dot += w_a * w_b;
        norm_a += w_a * w_a;
        norm_b += w_b * w_b;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator <= 0.0 || !denominator.is_finite() {
        return 0.0;
    }

    (dot / denominator).clamp(0.0, 1.0)
}

/// Jaccard index of two identifier sets; `0.0` if either is empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;

    shared as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_strips_punctuation_and_case() {
        assert_eq!(
            tokenize("Music, travel;HIKING  "),
            vec!["music", "travel", "hiking"]
        );
        assert_eq!(tokenize("Рок, Джаз"), vec!["рок", "джаз"]);
        assert!(tokenize(" ,;! ").is_empty());
    }

    #[test]
    fn test_identical_text_is_one() {
        assert_eq!(similarity("music, travel", "music, travel"), 1.0);
        assert_eq!(similarity("Music travel", "travel, MUSIC!"), 1.0);
    }

    #[test]
    fn test_single_shared_token_is_one() {
        assert_eq!(similarity("music", "Music"), 1.0);
    }

    #[test]
    fn test_empty_side_is_zero() {
        assert_eq!(similarity("", "music"), 0.0);
        assert_eq!(similarity("music", ""), 0.0);
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("...", "music"), 0.0);
    }

    #[test]
    fn test_disjoint_text_is_zero() {
        assert_eq!(similarity("music", "hiking"), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        let score = similarity(
            "музыка, книги, программирование",
            "книги, программирование, спорт",
        );
        assert!(score > 0.0 && score < 1.0, "got {}", score);
    }

    #[test]
    fn test_symmetric() {
        let a = "rock, jazz, blues, jazz";
        let b = "jazz, classical";
        assert_eq!(similarity(a, b), similarity(b, a));
    }

    #[test]
    fn test_calls_are_independent() {
        // A prior call with a large vocabulary must not influence later ones
        let _ = similarity("alpha beta gamma delta", "epsilon zeta eta theta");
        let first = similarity("rock jazz", "jazz");
        let _ = similarity("jazz jazz jazz", "rock rock");
        let second = similarity("rock jazz", "jazz");
        assert_eq!(first, second);
    }

    #[test]
    fn test_jaccard() {
        let a: BTreeSet<i64> = [1, 2, 3].into_iter().collect();
        let b: BTreeSet<i64> = [2, 3, 4].into_iter().collect();
        assert_eq!(jaccard(&a, &b), 0.5);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &BTreeSet::new()), 0.0);
    }
}

// twitchbot-core/src/utils/close_matches.rs
//
// "Did you mean" suggestions, scored with the normalized Damerau-Levenshtein
// similarity so a single swapped pair of letters still counts as close.

use strsim::normalized_damerau_levenshtein;

/// Up to `n` candidates whose similarity to `word` is at least `cutoff`,
/// best first; equal scores are ordered by the candidate, descending.
pub fn get_close_matches<S: AsRef<str>>(
    word: &str,
    possibilities: &[S],
    n: usize,
    cutoff: f64,
) -> Vec<String> {
    let mut scored: Vec<(f64, &str)> = possibilities
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|candidate| {
            let score = normalized_damerau_levenshtein(word, candidate);
            (score >= cutoff).then_some((score, candidate))
        })
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.cmp(a.1)));
    scored.into_iter().take(n).map(|(_, s)| s.to_string()).collect()
}

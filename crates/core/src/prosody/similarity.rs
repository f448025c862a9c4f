//! Edit distance between rhythm patterns, on top of `strsim`.

use crate::types::RhythmPattern;

/// Levenshtein distance with unit insert, delete and substitute costs.
pub fn edit_distance(a: &RhythmPattern, b: &RhythmPattern) -> usize {
    strsim::levenshtein(a.as_str(), b.as_str())
}

/// `1 - distance / max(len a, len b)`; two empty patterns are identical.
pub fn similarity(a: &RhythmPattern, b: &RhythmPattern) -> f64 {
    strsim::normalized_levenshtein(a.as_str(), b.as_str())
}

/// Highest similarity two patterns of these lengths could reach.
pub fn similarity_upper_bound(len_a: usize, len_b: usize) -> f64 {
    let longest = len_a.max(len_b);
    if longest == 0 {
        return 1.0;
    }
    1.0 - len_a.abs_diff(len_b) as f64 / longest as f64
}

//! Normalization, blending, replenishment boost and top-N selection.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::matrix::DenseIndex;
use crate::domain::item::ItemId;

/// Value every entry takes when a vector has no spread to normalize.
pub const FLAT_NORMALIZED_SCORE: f64 = 0.5;

/// Min-max normalizes into `[0, 1]`; a flat vector becomes all 0.5.
pub fn normalize(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }

    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == min {
        return vec![FLAT_NORMALIZED_SCORE; scores.len()];
    }

    let range = max - min;
    scores.iter().map(|score| (score - min) / range).collect()
}

/// Blends the two prediction vectors with weight `alpha` on the requester side.
///
/// Each side is normalized independently when both are present. When only
/// one side has scores it is returned unchanged.
pub fn fuse(requester_based: &[f64], item_based: &[f64], alpha: f64) -> Vec<f64> {
    match (requester_based.is_empty(), item_based.is_empty()) {
        (false, false) => {
            let requester_based = normalize(requester_based);
            let item_based = normalize(item_based);
            requester_based
                .iter()
                .zip(&item_based)
                .map(|(user, item)| alpha * user + (1.0 - alpha) * item)
                .collect()
        }
        (false, true) => requester_based.to_vec(),
        (true, false) => item_based.to_vec(),
        (true, true) => Vec::new(),
    }
}

/// Adds `boost` to the column of every flagged item known to the index.
pub fn apply_boost(
    scores: &mut [f64],
    items: &DenseIndex<ItemId>,
    flagged: &BTreeSet<ItemId>,
    boost: f64,
) -> usize {
    let mut boosted = 0;
    for item in flagged {
        if let Some(score) = items.position(item).and_then(|col| scores.get_mut(col)) {
            *score += boost;
            boosted += 1;
        }
    }
    boosted
}

/// Column positions of the best `top_n` strictly positive scores.
///
/// Ordered by score descending, ties by column position. Columns marked in
/// `excluded` never qualify.
pub fn rank(scores: &[f64], excluded: &[bool], top_n: usize) -> Vec<(usize, f64)> {
    let mut candidates: Vec<(usize, f64)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(col, score)| *score > 0.0 && !excluded.get(*col).copied().unwrap_or(false))
        .collect();

    candidates.sort_by(|(left_col, left), (right_col, right)| {
        right.partial_cmp(left).unwrap_or(Ordering::Equal).then(left_col.cmp(right_col))
    });
    candidates.truncate(top_n);
    candidates
}

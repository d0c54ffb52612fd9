//! Raw requester-based and item-based score vectors for one requester.

use super::matrix::{AffinityModel, Matrix};
use super::similarity::cosine_similarity;
use crate::domain::requester::RequesterId;

/// Score given to items the requester already interacted with.
pub const MASKED_SCORE: f64 = -1.0;

/// Unnormalized predictions over every catalog column of the model.
#[derive(Clone, Debug, PartialEq)]
pub struct Predictions {
    pub requester_based: Vec<f64>,
    pub item_based: Vec<f64>,
    /// `true` for columns the requester already has affinity with.
    pub interacted: Vec<bool>,
}

/// Computes both prediction vectors, or `None` for a requester without a row.
pub fn predict(model: &AffinityModel, requester: RequesterId) -> Option<Predictions> {
    let row = model.requesters.position(&requester)?;
    let interacted: Vec<bool> = model.matrix.row(row).iter().map(|value| *value > 0.0).collect();

    let requester_similarity = cosine_similarity(&model.matrix);
    let item_similarity = cosine_similarity(&model.matrix.transpose());

    let mut requester_based = requester_based(&model.matrix, &requester_similarity, row);
    let mut item_based = item_based(&model.matrix, &item_similarity, row);
    mask(&mut requester_based, &interacted);
    mask(&mut item_based, &interacted);

    Some(Predictions { requester_based, item_based, interacted })
}

/// Similarity-weighted sum of every other requester's affinity row.
pub fn requester_based(affinity: &Matrix, requester_similarity: &Matrix, row: usize) -> Vec<f64> {
    let mut weights = requester_similarity.row(row).to_vec();
    weights[row] = 0.0;
    affinity.left_multiply(&weights)
}

/// The requester's own affinity row projected through item similarity.
pub fn item_based(affinity: &Matrix, item_similarity: &Matrix, row: usize) -> Vec<f64> {
    item_similarity.left_multiply(affinity.row(row))
}

fn mask(scores: &mut [f64], interacted: &[bool]) {
    for (score, seen) in scores.iter_mut().zip(interacted) {
        if *seen {
            *score = MASKED_SCORE;
        }
    }
}

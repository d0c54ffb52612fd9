//! Pairwise cosine similarity between matrix rows.

use super::matrix::Matrix;

/// Returns the `rows × rows` cosine similarity matrix of `matrix`.
///
/// A zero norm is replaced by 1.0 before dividing, so an all-zero row has
/// similarity 0 to every row, itself included.
pub fn cosine_similarity(matrix: &Matrix) -> Matrix {
    let n = matrix.rows();
    let norms: Vec<f64> = (0..n)
        .map(|row| {
            let norm = matrix.row(row).iter().map(|value| value * value).sum::<f64>().sqrt();
            if norm == 0.0 {
                1.0
            } else {
                norm
            }
        })
        .collect();

    let mut similarity = Matrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let dot: f64 =
                matrix.row(i).iter().zip(matrix.row(j)).map(|(left, right)| left * right).sum();
            let value = dot / (norms[i] * norms[j]);
            similarity.set(i, j, value);
            similarity.set(j, i, value);
        }
    }
    similarity
}

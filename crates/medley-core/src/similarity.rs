//! Vector similarity and distance measures

use crate::error::{Error, Result};

fn check_lengths(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::InvalidInput(format!(
            "vector length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// Cosine similarity of two vectors.
///
/// Returns `IndeterminateSimilarity` when either vector has zero norm, so no
/// NaN ever leaves this function.
pub fn cosine(a: &[f64], b: &[f64]) -> Result<f64> {
    check_lengths(a, b)?;

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(Error::IndeterminateSimilarity);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}

/// Cosine distance `1 - cos`, with a zero-norm side counted as similarity 0
pub fn cosine_distance(a: &[f64], b: &[f64]) -> Result<f64> {
    match cosine(a, b) {
        Ok(similarity) => Ok(1.0 - similarity),
        Err(Error::IndeterminateSimilarity) => Ok(1.0),
        Err(e) => Err(e),
    }
}

/// Euclidean (L2) distance
pub fn euclidean(a: &[f64], b: &[f64]) -> Result<f64> {
    check_lengths(a, b)?;
    Ok(a.iter()
        .zip(b)
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt())
}

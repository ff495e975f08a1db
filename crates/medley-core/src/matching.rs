//! Ranking policy and query results
//!
//! Both engines score every indexed item against the query and hand the
//! scores to [`rank`], which filters, orders and truncates them. Image
//! scores are distances (smaller is closer), tone scores are similarities
//! (larger is closer).

use serde::{Deserialize, Serialize};


/// One retrieved item
/// Output format: JSON for easy parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    /// Display name (basename) of the indexed file
    pub name: String,
    /// Distance or similarity, depending on the engine
    pub score: f64,
}

impl RankedMatch {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Direction in which scores improve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    /// Distances: best first means smallest first
    Ascending,
    /// Similarities: best first means largest first
    Descending,
}

impl RankOrder {
    /// Whether `score` passes `cutoff` in this order
    fn passes(self, score: f64, cutoff: f64) -> bool {
        match self {
            RankOrder::Ascending => score <= cutoff,
            RankOrder::Descending => score >= cutoff,
        }
    }
}

/// Rank scores by position.
///
/// Non-finite scores and scores failing `cutoff` are dropped. Survivors are
/// stably sorted so equal scores keep their input order, then truncated to
/// `limit`. Returns `(position, score)` pairs.
pub fn rank(
    scores: &[f64],
    order: RankOrder,
    cutoff: Option<f64>,
    limit: Option<usize>,
) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| score.is_finite())
        .filter(|&(_, score)| cutoff.map_or(true, |c| order.passes(score, c)))
        .collect();

    match order {
        RankOrder::Ascending => ranked.sort_by(|a, b| a.1.total_cmp(&b.1)),
        RankOrder::Descending => ranked.sort_by(|a, b| b.1.total_cmp(&a.1)),
    }

    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    ranked
}

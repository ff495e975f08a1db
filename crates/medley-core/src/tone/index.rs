//! In-memory tone histogram index

use super::features::ToneHistogram;
use crate::error::Error;
use crate::matching::{rank, RankOrder, RankedMatch};
use crate::scan::display_name;
use std::path::{Path, PathBuf};

/// Histograms keyed by source path, in insertion order
#[derive(Debug, Clone, Default)]
pub struct ToneIndex {
    entries: Vec<(PathBuf, ToneHistogram)>,
}

impl ToneIndex {
    pub fn build(entries: Vec<(PathBuf, ToneHistogram)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&ToneHistogram> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, histogram)| histogram)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(p, _)| p.as_path())
    }

    /// Rank every entry by cosine similarity to `query`.
    ///
    /// An empty histogram on either side scores 0.0.
    pub fn rank(
        &self,
        query: &ToneHistogram,
        threshold: f64,
        limit: Option<usize>,
    ) -> Vec<RankedMatch> {
        let scores: Vec<f64> = self
            .entries
            .iter()
            .map(|(path, histogram)| match histogram.cosine_similarity(query) {
                Ok(similarity) => similarity,
                Err(Error::IndeterminateSimilarity) => {
                    log::debug!("Empty tone histogram for {}, scoring 0", path.display());
                    0.0
                }
                Err(e) => {
                    log::debug!("Cannot score {}: {}", path.display(), e);
                    f64::NAN
                }
            })
            .collect();

        rank(&scores, RankOrder::Descending, Some(threshold), limit)
            .into_iter()
            .map(|(i, score)| RankedMatch::new(display_name(&self.entries[i].0), score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn index() -> ToneIndex {
        ToneIndex::build(vec![
            (
                PathBuf::from("songs/major.mid"),
                ToneHistogram::from_notes(&[60, 64, 67], 60),
            ),
            (
                PathBuf::from("songs/minor.mid"),
                ToneHistogram::from_notes(&[60, 63, 67], 60),
            ),
            (PathBuf::from("songs/silent.wav"), ToneHistogram::default()),
            (
                PathBuf::from("songs/far.mid"),
                ToneHistogram::from_notes(&[20, 110], 60),
            ),
        ])
    }

    #[test]
    fn test_self_query_ranks_first() {
        let index = index();
        let query = ToneHistogram::from_notes(&[60, 64, 67], 60);
        let results = index.rank(&query, 0.55, None);

        assert_eq!(results[0].name, "major.mid");
        assert_relative_eq!(results[0].score, 1.0, epsilon = 1e-12);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(results.iter().all(|r| r.score >= 0.55));
    }

    #[test]
    fn test_zero_histograms_score_zero() {
        let index = index();
        let results = index.rank(&ToneHistogram::default(), 0.0, None);

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.score == 0.0));
        // Ties keep insertion order
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["major.mid", "minor.mid", "silent.wav", "far.mid"]);
    }

    #[test]
    fn test_limit_and_threshold() {
        let index = index();
        let query = ToneHistogram::from_notes(&[60, 64, 67], 60);

        assert_eq!(index.rank(&query, 0.0, Some(1)).len(), 1);
        assert!(index.rank(&query, 1.01, None).is_empty());
    }

    #[test]
    fn test_get() {
        let index = index();
        assert_eq!(index.len(), 4);
        assert!(index.get(Path::new("songs/silent.wav")).unwrap().is_zero());
        assert!(index.get(Path::new("songs/missing.mid")).is_none());
    }
}

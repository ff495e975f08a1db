//! In-memory index of projected images

use crate::config::SimilarityMetric;
use crate::error::{Error, Result};
use crate::matching::{rank, RankOrder, RankedMatch};
use crate::scan::display_name;
use crate::similarity;
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Projections co-indexed with their source paths
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    paths: Vec<PathBuf>,
    projections: Vec<Vec<f64>>,
}

impl ImageIndex {
    /// Build from `paths[i]` and projection row `i`
    pub fn build(paths: Vec<PathBuf>, projections: &Array2<f64>) -> Result<Self> {
        if paths.len() != projections.nrows() {
            return Err(Error::InvalidInput(format!(
                "{} paths but {} projections",
                paths.len(),
                projections.nrows()
            )));
        }

        let projections = projections.outer_iter().map(|row| row.to_vec()).collect();
        Ok(Self { paths, projections })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn projection(&self, path: &Path) -> Option<&[f64]> {
        self.paths
            .iter()
            .position(|p| p == path)
            .map(|i| self.projections[i].as_slice())
    }

    /// Rank every indexed image by distance to `query`, closest first.
    ///
    /// Distances above `max_distance` are dropped; ties keep index order.
    pub fn rank(
        &self,
        query: &[f64],
        limit: usize,
        max_distance: Option<f64>,
        metric: SimilarityMetric,
    ) -> Result<Vec<RankedMatch>> {
        let distances = self
            .projections
            .iter()
            .map(|stored| match metric {
                SimilarityMetric::Euclidean => similarity::euclidean(stored, query),
                SimilarityMetric::Cosine => similarity::cosine_distance(stored, query),
            })
            .collect::<Result<Vec<f64>>>()?;

        let results = rank(&distances, RankOrder::Ascending, max_distance, Some(limit))
            .into_iter()
            .map(|(i, distance)| RankedMatch::new(display_name(&self.paths[i]), distance))
            .collect();

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn index() -> ImageIndex {
        ImageIndex::build(
            vec![
                PathBuf::from("gallery/a.png"),
                PathBuf::from("gallery/b.png"),
                PathBuf::from("gallery/c.jpg"),
                PathBuf::from("gallery/d.png"),
            ],
            &array![[0.0, 0.0], [3.0, 4.0], [1.0, 0.0], [0.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_build_rejects_mismatched_lengths() {
        let result = ImageIndex::build(vec![PathBuf::from("a.png")], &array![[0.0], [1.0]]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_self_query_ranks_first() {
        let index = index();
        let results = index
            .rank(&[3.0, 4.0], 5, None, SimilarityMetric::Euclidean)
            .unwrap();

        assert_eq!(results[0].name, "b.png");
        assert_eq!(results[0].score, 0.0);
        assert!(results.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[test]
    fn test_euclidean_ties_keep_index_order() {
        let index = index();
        let results = index
            .rank(&[0.0, 0.0], 5, None, SimilarityMetric::Euclidean)
            .unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "d.png", "c.jpg", "b.png"]);
        assert_relative_eq!(results[3].score, 5.0);
    }

    #[test]
    fn test_limit_and_max_distance() {
        let index = index();

        let limited = index
            .rank(&[0.0, 0.0], 2, None, SimilarityMetric::Euclidean)
            .unwrap();
        assert_eq!(limited.len(), 2);

        let bounded = index
            .rank(&[0.0, 0.0], 5, Some(1.0), SimilarityMetric::Euclidean)
            .unwrap();
        assert_eq!(bounded.len(), 3);
        assert!(bounded.iter().all(|r| r.score <= 1.0));

        let none = index
            .rank(&[100.0, 100.0], 5, Some(1.0), SimilarityMetric::Euclidean)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_cosine_distance_ranking() {
        let index = index();
        let results = index
            .rank(&[1.0, 0.0], 5, None, SimilarityMetric::Cosine)
            .unwrap();

        assert_eq!(results[0].name, "c.jpg");
        assert_relative_eq!(results[0].score, 0.0, epsilon = 1e-12);
        assert_relative_eq!(results[1].score, 0.4, epsilon = 1e-12);
        // Zero-norm projections sit at distance 1
        assert_relative_eq!(results[2].score, 1.0);
        assert_eq!(results[2].name, "a.png");
    }

    #[test]
    fn test_query_length_mismatch() {
        let index = index();
        assert!(matches!(
            index.rank(&[1.0, 2.0, 3.0], 5, None, SimilarityMetric::Euclidean),
            Err(Error::InvalidInput(_))
        ));
    }
}

//! Tone-interval histograms
//!
//! A note sequence is rewritten three ways: absolute tones (ATB), tones
//! relative to a fixed reference note (RTB) and tones relative to the first
//! note (FTB). The three series are concatenated and counted into one
//! histogram with a bucket per integer value in `0..=127`.

use crate::error::Result;
use crate::similarity;

/// Number of histogram buckets
pub const HISTOGRAM_BINS: usize = 128;

/// The three transforms of one note sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneFeatures {
    pub absolute: Vec<i32>,
    pub relative: Vec<i32>,
    pub first: Vec<i32>,
}

impl ToneFeatures {
    pub fn extract(notes: &[i32], reference: i32) -> Self {
        let absolute = notes.iter().map(|&n| n.clamp(0, 127)).collect();
        let relative = notes
            .iter()
            .map(|&n| (n - reference).clamp(-127, 127))
            .collect();
        let first = match notes.first() {
            Some(&head) => notes.iter().map(|&n| n - head).collect(),
            None => Vec::new(),
        };

        Self {
            absolute,
            relative,
            first,
        }
    }

    /// Count all three series into one histogram
    pub fn histogram(&self) -> ToneHistogram {
        let mut counts = [0u32; HISTOGRAM_BINS];
        let values = self
            .absolute
            .iter()
            .chain(&self.relative)
            .chain(&self.first);

        for &value in values {
            // Out-of-range tones fall outside every bucket
            if let Ok(bucket) = usize::try_from(value) {
                if let Some(slot) = counts.get_mut(bucket) {
                    *slot += 1;
                }
            }
        }

        ToneHistogram(counts)
    }
}

/// Fixed-size tone histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneHistogram([u32; HISTOGRAM_BINS]);

impl ToneHistogram {
    /// Histogram of a note sequence
    pub fn from_notes(notes: &[i32], reference: i32) -> Self {
        ToneFeatures::extract(notes, reference).histogram()
    }

    pub fn counts(&self) -> &[u32; HISTOGRAM_BINS] {
        &self.0
    }

    pub fn to_vector(&self) -> [f64; HISTOGRAM_BINS] {
        self.0.map(f64::from)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }

    /// Cosine similarity between two histograms.
    ///
    /// Fails with `IndeterminateSimilarity` when either histogram is empty.
    pub fn cosine_similarity(&self, other: &ToneHistogram) -> Result<f64> {
        similarity::cosine(&self.to_vector(), &other.to_vector())
    }
}

impl Default for ToneHistogram {
    fn default() -> Self {
        Self([0; HISTOGRAM_BINS])
    }
}

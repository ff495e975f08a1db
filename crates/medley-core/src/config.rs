//! Configuration parameters for both retrieval engines
//!
//! Defaults follow the reference retrieval service: 64x64 grayscale images
//! reduced to 50 components, and 22.05 kHz audio tracked with a 2048-point
//! STFT and 512-sample hop.

use crate::error::{Error, Result};
use crate::media::MediaFormat;
use serde::{Deserialize, Serialize};

/// Distance used to compare image projections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// L2 norm of the difference
    #[default]
    Euclidean,
    /// Cosine distance, `1 - cos`
    Cosine,
}

/// Image engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    // Feature extraction
    pub width: u32,
    pub height: u32,
    pub recursive: bool,

    // Subspace model
    pub n_components: usize,

    // Ranking
    pub metric: SimilarityMetric,
    pub limit: usize,
    pub max_distance: Option<f64>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            recursive: false,
            n_components: 50,
            metric: SimilarityMetric::Euclidean,
            limit: 5,
            max_distance: None,
        }
    }
}

impl ImageConfig {
    /// Length of every feature vector produced with this configuration
    pub fn feature_dimension(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(
                "resize shape must be two positive integers".to_string(),
            ));
        }
        if self.n_components == 0 {
            return Err(Error::InvalidConfig("n_components must be > 0".to_string()));
        }
        if self.n_components > self.feature_dimension() {
            return Err(Error::InvalidConfig(format!(
                "n_components ({}) exceeds feature dimension ({})",
                self.n_components,
                self.feature_dimension()
            )));
        }
        if self.limit == 0 {
            return Err(Error::InvalidConfig("limit must be > 0".to_string()));
        }
        if matches!(self.max_distance, Some(d) if d.is_nan()) {
            return Err(Error::InvalidConfig("max_distance must not be NaN".to_string()));
        }
        Ok(())
    }
}

/// Audio engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    // Audio processing
    pub sample_rate: u32,
    pub max_duration_s: Option<f64>,
    pub recursive: bool,

    // Spectral transform
    pub n_fft: usize,
    pub hop_length: usize,

    // Harmonic separation
    pub harmonic_kernel: usize,
    pub percussive_kernel: usize,

    // Pitch tracking
    pub fmin: f32,
    pub fmax: f32,
    pub peak_threshold: f32,
    pub wav_threshold: f32,
    pub mp3_threshold: f32,
    pub m4a_threshold: f32,

    // Tone features and ranking
    pub reference_note: i32,
    pub similarity_threshold: f64,
    pub limit: Option<usize>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            max_duration_s: Some(600.0),
            recursive: true,

            n_fft: 2048,
            hop_length: 512,

            harmonic_kernel: 31,
            percussive_kernel: 31,

            fmin: 50.0,
            fmax: 2000.0,
            peak_threshold: 0.1,
            wav_threshold: 0.2,
            mp3_threshold: 0.1,
            m4a_threshold: 0.2,

            reference_note: 60,
            similarity_threshold: 0.55,
            limit: None,
        }
    }
}

impl AudioConfig {
    /// Minimum peak magnitude for a frame to emit a note, per source format
    pub fn magnitude_threshold(&self, format: MediaFormat) -> f32 {
        match format {
            MediaFormat::Mp3 => self.mp3_threshold,
            MediaFormat::M4a => self.m4a_threshold,
            _ => self.wav_threshold,
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be > 0".to_string()));
        }
        if self.n_fft < 4 || self.hop_length == 0 {
            return Err(Error::InvalidConfig(
                "n_fft must be >= 4 and hop_length > 0".to_string(),
            ));
        }
        if self.harmonic_kernel == 0 || self.percussive_kernel == 0 {
            return Err(Error::InvalidConfig("median kernels must be > 0".to_string()));
        }
        if !(self.fmin >= 0.0 && self.fmin < self.fmax) {
            return Err(Error::InvalidConfig("fmin must be >= 0 and < fmax".to_string()));
        }
        if !(0..=127).contains(&self.reference_note) {
            return Err(Error::InvalidConfig(
                "reference_note must be within 0..=127".to_string(),
            ));
        }
        if self.similarity_threshold.is_nan() {
            return Err(Error::InvalidConfig(
                "similarity_threshold must not be NaN".to_string(),
            ));
        }
        if self.limit == Some(0) {
            return Err(Error::InvalidConfig("limit must be > 0".to_string()));
        }
        if matches!(self.max_duration_s, Some(d) if !(d > 0.0)) {
            return Err(Error::InvalidConfig("max_duration_s must be > 0".to_string()));
        }
        Ok(())
    }
}

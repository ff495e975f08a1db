//! Medley Core - Content-based image and music retrieval
//!
//! Two engines share one surface ([`Retriever`]): images are reduced to a
//! principal subspace of their grayscale pixels and ranked by distance,
//! audio is transcribed to notes, summarised as tone-interval histograms
//! and ranked by cosine similarity.

pub mod audio;
pub mod config;
pub mod error;
pub mod image;
pub mod matching;
pub mod media;
pub mod retrieval;
pub mod scan;
pub mod settings;
pub mod similarity;
pub mod tone;
pub mod transform;

pub use config::{AudioConfig, ImageConfig, SimilarityMetric};
pub use error::{Error, Result};
pub use matching::RankedMatch;
pub use media::{MediaFormat, MediaKind, QueryInput};
pub use retrieval::{AudioRetriever, ImageRetriever, Retriever};
pub use settings::MedleySettings;
pub use tone::NoteSequence;

/// Transcribe one audio or MIDI file with the given configuration
pub fn transcribe_notes(path: &std::path::Path, config: &AudioConfig) -> Result<NoteSequence> {
    tone::ToneTranscriber::new(config).transcribe(path)
}

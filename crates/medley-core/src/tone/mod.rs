//! Tone engine: note transcription, tone histograms and their index

pub mod features;
pub mod hpss;
pub mod index;
pub mod pitch;
pub mod transcribe;

pub use features::{ToneFeatures, ToneHistogram, HISTOGRAM_BINS};
pub use index::ToneIndex;
pub use pitch::{PitchCandidate, PitchTracker};
pub use transcribe::{NoteSequence, ToneTranscriber};

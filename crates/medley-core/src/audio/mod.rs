//! Audio decoding and resampling
//!
//! Supports WAV, MP3 and M4A (AAC in an MP4 container) using pure Rust decoders.

mod container;
mod decoder;

pub use container::decode_container;
pub use decoder::{decode_audio, AudioData};

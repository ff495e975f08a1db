//! Audio and MIDI to note sequence transcription

use super::hpss;
use super::pitch::{hz_to_midi, PitchCandidate, PitchTracker};
use crate::audio::decode_audio;
use crate::config::AudioConfig;
use crate::error::{Error, Result};
use crate::media::{MediaFormat, MediaKind};
use crate::transform;
use midly::{MidiMessage, Smf, TrackEventKind};
use std::path::Path;

/// Ordered MIDI note numbers, one per detected onset
pub type NoteSequence = Vec<i32>;

/// Converts one audio or MIDI file into a [`NoteSequence`]
#[derive(Debug, Clone)]
pub struct ToneTranscriber {
    config: AudioConfig,
    tracker: PitchTracker,
}

impl ToneTranscriber {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            config: config.clone(),
            tracker: PitchTracker::new(
                config.sample_rate,
                config.n_fft,
                config.fmin,
                config.fmax,
                config.peak_threshold,
            ),
        }
    }

    /// Transcribe a file, dispatching on its format
    pub fn transcribe(&self, path: &Path) -> Result<NoteSequence> {
        let format = MediaFormat::expect_kind(path, MediaKind::Audio)?;
        if format.is_symbolic() {
            read_midi_notes(path)
        } else {
            self.transcribe_waveform(path, format)
        }
    }

    fn transcribe_waveform(&self, path: &Path, format: MediaFormat) -> Result<NoteSequence> {
        let mut audio = decode_audio(path, self.config.sample_rate)?;

        if let Some(max_s) = self.config.max_duration_s {
            let before_ms = audio.duration_ms;
            audio.truncate_seconds(max_s);
            if audio.duration_ms < before_ms {
                log::info!(
                    "Truncated {} from {:.1}s to {:.1}s for transcription",
                    path.display(),
                    f64::from(before_ms) / 1000.0,
                    max_s
                );
            }
        }

        let spectrum = transform::stft(&audio.samples, self.config.n_fft, self.config.hop_length);
        let magnitude = spectrum.mapv(|c| c.norm());
        let harmonic = hpss::harmonic(
            &magnitude,
            self.config.harmonic_kernel,
            self.config.percussive_kernel,
        );

        let frames = self.tracker.track(&harmonic);
        let notes = notes_from_frames(&frames, self.config.magnitude_threshold(format));

        log::debug!(
            "Transcribed {}: {} frames, {} notes",
            path.display(),
            frames.len(),
            notes.len()
        );
        Ok(notes)
    }
}

/// Turn per-frame pitch candidates into notes.
///
/// A frame emits a note when its candidate is louder than `threshold` and has
/// a positive frequency. Consecutive identical notes collapse into one.
pub fn notes_from_frames(frames: &[Option<PitchCandidate>], threshold: f32) -> NoteSequence {
    let mut notes = Vec::new();
    let mut last_note = None;

    for candidate in frames.iter().flatten() {
        if candidate.magnitude <= threshold || candidate.frequency <= 0.0 {
            continue;
        }
        let note = hz_to_midi(candidate.frequency).round_ties_even() as i32;
        if last_note != Some(note) {
            notes.push(note);
            last_note = Some(note);
        }
    }

    notes
}

/// Read note-on events with positive velocity, track by track in file order
pub fn read_midi_notes(path: &Path) -> Result<NoteSequence> {
    let bytes = std::fs::read(path)?;
    let smf = Smf::parse(&bytes).map_err(|e| Error::decode(path, e))?;

    let notes = smf
        .tracks
        .iter()
        .flatten()
        .filter_map(|event| match event.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } if vel.as_int() > 0 => Some(i32::from(key.as_int())),
            _ => None,
        })
        .collect();

    Ok(notes)
}

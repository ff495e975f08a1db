//! Frame-wise pitch tracking on a magnitude spectrogram
//!
//! Candidates are spectral peaks: bins that are local maxima along frequency
//! after discarding everything below a fraction of the frame's loudest bin.
//! Each peak is refined by parabolic interpolation over its neighbours.

use crate::transform::fft_frequencies;
use ndarray::Array2;

/// The strongest pitch candidate of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchCandidate {
    /// Interpolated frequency (Hz)
    pub frequency: f32,
    /// Interpolated peak magnitude
    pub magnitude: f32,
}

/// Pitch tracker
#[derive(Debug, Clone)]
pub struct PitchTracker {
    sample_rate: u32,
    n_fft: usize,
    fmin: f32,
    fmax: f32,
    peak_threshold: f32,
}

impl PitchTracker {
    pub fn new(sample_rate: u32, n_fft: usize, fmin: f32, fmax: f32, peak_threshold: f32) -> Self {
        Self {
            sample_rate,
            n_fft,
            fmin: fmin.max(0.0),
            fmax: fmax.min(sample_rate as f32 / 2.0),
            peak_threshold,
        }
    }

    /// Strongest candidate per frame, `None` for frames without any peak
    pub fn track(&self, magnitude: &Array2<f32>) -> Vec<Option<PitchCandidate>> {
        let (num_bins, num_frames) = magnitude.dim();
        if num_bins < 3 {
            return vec![None; num_frames];
        }

        let freqs = fft_frequencies(self.sample_rate, self.n_fft);
        let in_band: Vec<bool> = (0..num_bins)
            .map(|bin| {
                freqs
                    .get(bin)
                    .is_some_and(|&f| f >= self.fmin && f < self.fmax)
            })
            .collect();
        let bin_to_hz = self.sample_rate as f32 / self.n_fft as f32;

        let mut frames = Vec::with_capacity(num_frames);
        let mut gated = vec![0.0f32; num_bins];

        for column in magnitude.columns() {
            let frame_max = column.iter().copied().fold(0.0f32, f32::max);
            let floor = self.peak_threshold * frame_max;
            for (slot, &value) in gated.iter_mut().zip(column.iter()) {
                *slot = if value > floor { value } else { 0.0 };
            }

            let mut best: Option<PitchCandidate> = None;

            for bin in 1..num_bins {
                if !in_band[bin] {
                    continue;
                }
                let next = gated.get(bin + 1).copied().unwrap_or(gated[bin]);
                if !(gated[bin] > gated[bin - 1] && gated[bin] >= next) {
                    continue;
                }

                let (shift, skew) = if bin + 1 < num_bins {
                    parabolic_offset(column[bin - 1], column[bin], column[bin + 1])
                } else {
                    (0.0, 0.0)
                };

                let candidate = PitchCandidate {
                    frequency: (bin as f32 + shift) * bin_to_hz,
                    magnitude: column[bin] + skew,
                };

                // First maximum wins ties
                if best.map_or(true, |b| candidate.magnitude > b.magnitude) {
                    best = Some(candidate);
                }
            }

            frames.push(best);
        }

        frames
    }
}

/// Sub-bin offset of a peak and the matching magnitude correction
fn parabolic_offset(prev: f32, curr: f32, next: f32) -> (f32, f32) {
    let avg = 0.5 * (next - prev);
    let curvature = 2.0 * curr - next - prev;
    let denom = if curvature.abs() < f32::MIN_POSITIVE {
        curvature + 1.0
    } else {
        curvature
    };
    let shift = avg / denom;
    (shift, 0.5 * avg * shift)
}

/// Convert a frequency to a fractional MIDI note number (A4 = 440 Hz = 69)
pub fn hz_to_midi(frequency: f32) -> f64 {
    12.0 * (f64::from(frequency) / 440.0).log2() + 69.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hz_to_midi() {
        assert_relative_eq!(hz_to_midi(440.0), 69.0, epsilon = 1e-9);
        assert_relative_eq!(hz_to_midi(261.6256), 60.0, epsilon = 1e-4);
        assert_relative_eq!(hz_to_midi(880.0), 81.0, epsilon = 1e-9);
    }

    #[test]
    fn test_parabolic_offset_symmetric_peak() {
        let (shift, skew) = parabolic_offset(1.0, 2.0, 1.0);
        assert_relative_eq!(shift, 0.0);
        assert_relative_eq!(skew, 0.0);
    }

    #[test]
    fn test_parabolic_offset_leans_toward_larger_neighbour() {
        let (shift, _) = parabolic_offset(1.0, 3.0, 2.0);
        assert!(shift > 0.0 && shift < 0.5);
    }

    #[test]
    fn test_track_picks_strongest_peak() {
        // 2048-point FFT at 22050 Hz: ~10.77 Hz per bin
        let tracker = PitchTracker::new(22050, 2048, 50.0, 2000.0, 0.1);
        let mut magnitude = Array2::<f32>::zeros((1025, 2));
        magnitude[(40, 0)] = 10.0;
        magnitude[(80, 0)] = 4.0;
        magnitude[(100, 1)] = 6.0;

        let frames = tracker.track(&magnitude);
        assert_eq!(frames.len(), 2);

        let first = frames[0].unwrap();
        assert_relative_eq!(first.frequency, 40.0 * 22050.0 / 2048.0, epsilon = 1e-3);
        assert_relative_eq!(first.magnitude, 10.0);

        let second = frames[1].unwrap();
        assert_relative_eq!(second.frequency, 100.0 * 22050.0 / 2048.0, epsilon = 1e-3);
    }

    #[test]
    fn test_track_ignores_out_of_band_and_silent_frames() {
        let tracker = PitchTracker::new(22050, 2048, 50.0, 2000.0, 0.1);
        let mut magnitude = Array2::<f32>::zeros((1025, 2));
        // 3000 Hz is above fmax
        magnitude[(279, 0)] = 10.0;

        let frames = tracker.track(&magnitude);
        assert_eq!(frames, vec![None, None]);
    }

    #[test]
    fn test_peak_threshold_is_relative_to_frame_max() {
        let tracker = PitchTracker::new(22050, 2048, 50.0, 2000.0, 0.5);
        let mut magnitude = Array2::<f32>::zeros((1025, 1));
        magnitude[(40, 0)] = 10.0;
        magnitude[(60, 0)] = 4.0;
        // Only bin 40 survives the gate; bin 60 is below half the frame max
        let frames = tracker.track(&magnitude);
        assert_relative_eq!(frames[0].unwrap().magnitude, 10.0);
    }
}

//! Short-time Fourier transform
//!
//! Centred frames (zero padding of `n_fft / 2` on both sides), periodic Hann
//! window, one-sided spectrum. Output is laid out `[frequency_bin, frame]`.

use ndarray::Array2;
use rustfft::{num_complex::Complex32, FftPlanner};
use std::f32::consts::PI;

/// Compute the STFT of `samples`
pub fn stft(samples: &[f32], n_fft: usize, hop_length: usize) -> Array2<Complex32> {
    let num_bins = n_fft / 2 + 1;

    if samples.is_empty() || n_fft == 0 || hop_length == 0 {
        return Array2::zeros((num_bins, 0));
    }

    // Centre padding
    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let num_frames = 1 + (padded.len() - n_fft) / hop_length;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let window = hann_window(n_fft);

    let mut spectrum = Array2::<Complex32>::zeros((num_bins, num_frames));
    let mut frame = vec![Complex32::new(0.0, 0.0); n_fft];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_length;

        for (i, slot) in frame.iter_mut().enumerate() {
            *slot = Complex32::new(padded[start + i] * window[i], 0.0);
        }

        fft.process(&mut frame);

        for (bin, value) in frame.iter().take(num_bins).enumerate() {
            spectrum[(bin, frame_idx)] = *value;
        }
    }

    spectrum
}

/// Centre frequency of every one-sided FFT bin
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f32> {
    let resolution = sample_rate as f32 / n_fft as f32;
    (0..=n_fft / 2).map(|bin| bin as f32 * resolution).collect()
}

/// Periodic Hann window
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = hann_window(512);
        assert_eq!(window.len(), 512);
        assert!((window[0] - 0.0).abs() < 0.001);
        assert!((window[256] - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_stft_shape() {
        let samples = vec![0.0f32; 22050];
        let spectrum = stft(&samples, 2048, 512);
        assert_eq!(spectrum.nrows(), 1025);
        assert_eq!(spectrum.ncols(), 1 + 22050 / 512);
    }

    #[test]
    fn test_empty_input_has_no_frames() {
        let spectrum = stft(&[], 2048, 512);
        assert_eq!(spectrum.shape(), &[1025, 0]);
    }

    #[test]
    fn test_sine_peak_bin() {
        let sr = 22050u32;
        let freq = 1000.0f32;
        let samples: Vec<f32> = (0..sr)
            .map(|i| (2.0 * PI * freq * i as f32 / sr as f32).sin())
            .collect();

        let spectrum = stft(&samples, 2048, 512);
        let mid = spectrum.ncols() / 2;
        let peak = (0..spectrum.nrows())
            .max_by(|&a, &b| {
                spectrum[(a, mid)]
                    .norm()
                    .total_cmp(&spectrum[(b, mid)].norm())
            })
            .unwrap();

        let freqs = fft_frequencies(sr, 2048);
        assert!((freqs[peak] - freq).abs() < sr as f32 / 2048.0);
    }
}

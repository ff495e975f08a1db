//! Harmonic-percussive separation by median filtering
//!
//! Harmonic energy is smooth along time, percussive energy along frequency.
//! Each magnitude spectrogram is median filtered in its own direction and
//! the results drive a soft (Wiener-like) mask.

use ndarray::{Array2, Axis};

/// Separated magnitude spectrograms, `[frequency_bin, frame]`
#[derive(Debug, Clone)]
pub struct Separation {
    pub harmonic: Array2<f32>,
    pub percussive: Array2<f32>,
}

/// Split a magnitude spectrogram into harmonic and percussive parts.
///
/// `harmonic_kernel` is the median length along time, `percussive_kernel`
/// along frequency. Masks use power 2; bins where both filtered
/// magnitudes vanish are assigned to neither part.
pub fn separate(
    magnitude: &Array2<f32>,
    harmonic_kernel: usize,
    percussive_kernel: usize,
) -> Separation {
    let harmonic_ref = median_filter(magnitude, Axis(1), harmonic_kernel);
    let percussive_ref = median_filter(magnitude, Axis(0), percussive_kernel);

    let mut harmonic = Array2::<f32>::zeros(magnitude.raw_dim());
    let mut percussive = Array2::<f32>::zeros(magnitude.raw_dim());

    for ((idx, &value), (&h, &p)) in magnitude
        .indexed_iter()
        .zip(harmonic_ref.iter().zip(percussive_ref.iter()))
    {
        let (mask_h, mask_p) = soft_masks(h, p);
        harmonic[idx] = value * mask_h;
        percussive[idx] = value * mask_p;
    }

    Separation {
        harmonic,
        percussive,
    }
}

/// Harmonic part only
pub fn harmonic(
    magnitude: &Array2<f32>,
    harmonic_kernel: usize,
    percussive_kernel: usize,
) -> Array2<f32> {
    separate(magnitude, harmonic_kernel, percussive_kernel).harmonic
}

fn soft_masks(h: f32, p: f32) -> (f32, f32) {
    let z = h.max(p);
    if z < f32::MIN_POSITIVE {
        return (0.0, 0.0);
    }
    let h = (h / z).powi(2);
    let p = (p / z).powi(2);
    let total = h + p;
    (h / total, p / total)
}

/// Median filter along one axis with a window truncated at the edges
fn median_filter(input: &Array2<f32>, axis: Axis, kernel: usize) -> Array2<f32> {
    let mut output = Array2::<f32>::zeros(input.raw_dim());
    let half = kernel / 2;
    let mut window = Vec::with_capacity(kernel);

    for (lane, mut out_lane) in input.lanes(axis).into_iter().zip(output.lanes_mut(axis)) {
        let len = lane.len();
        for i in 0..len {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(len);

            window.clear();
            window.extend((start..end).map(|j| lane[j]));

            let mid = window.len() / 2;
            let (_, median, _) = window.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
            out_lane[i] = *median;
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_filter_along_time() {
        let input = Array2::from_shape_vec((1, 5), vec![1.0, 9.0, 2.0, 8.0, 3.0]).unwrap();
        let filtered = median_filter(&input, Axis(1), 3);
        assert_eq!(filtered.shape(), &[1, 5]);
        assert_relative_eq!(filtered[(0, 1)], 2.0);
        assert_relative_eq!(filtered[(0, 2)], 8.0);
    }

    #[test]
    fn test_steady_tone_is_harmonic() {
        // A single frequency row constant over time, with one broadband click.
        let mut magnitude = Array2::<f32>::zeros((9, 21));
        for t in 0..21 {
            magnitude[(4, t)] = 10.0;
        }
        for f in 0..9 {
            magnitude[(f, 10)] += 5.0;
        }

        let separation = separate(&magnitude, 7, 7);

        // Steady partial stays harmonic away from the click
        assert!(separation.harmonic[(4, 3)] > 9.0);
        assert!(separation.percussive[(4, 3)] < 1.0);
        // Click energy off the partial is percussive
        assert!(separation.percussive[(1, 10)] > separation.harmonic[(1, 10)]);
    }

    #[test]
    fn test_silence_stays_silent() {
        let magnitude = Array2::<f32>::zeros((5, 5));
        let separation = separate(&magnitude, 31, 31);
        assert!(separation.harmonic.iter().all(|&v| v == 0.0));
        assert!(separation.percussive.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_spectrogram() {
        let magnitude = Array2::<f32>::zeros((1025, 0));
        let h = harmonic(&magnitude, 31, 31);
        assert_eq!(h.shape(), &[1025, 0]);
    }
}

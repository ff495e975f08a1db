//! Audio decoding for the supported waveform formats

use crate::error::{Error, Result};
use crate::media::MediaFormat;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

const RESAMPLE_CHUNK: usize = 1024;

/// Decoded audio data
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u32,
}

impl AudioData {
    pub(crate) fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let frames_per_second = f64::from(sample_rate) * f64::from(channels.max(1));
        let duration_ms = if frames_per_second > 0.0 {
            (samples.len() as f64 / frames_per_second * 1000.0) as u32
        } else {
            0
        };
        Self {
            samples,
            sample_rate,
            channels,
            duration_ms,
        }
    }

    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        let mut mono = Vec::with_capacity(self.samples.len() / self.channels as usize);
        for chunk in self.samples.chunks(self.channels as usize) {
            let avg: f32 = chunk.iter().sum::<f32>() / chunk.len() as f32;
            mono.push(avg);
        }
        mono
    }

    /// Keep at most `seconds` of audio
    pub fn truncate_seconds(&mut self, seconds: f64) {
        let max_samples =
            (seconds * f64::from(self.sample_rate)) as usize * self.channels.max(1) as usize;
        if self.samples.len() > max_samples {
            self.samples.truncate(max_samples);
            self.duration_ms = (seconds * 1000.0) as u32;
        }
    }
}

/// Decode an audio file to mono at the target sample rate
pub fn decode_audio(path: &Path, target_sample_rate: u32) -> Result<AudioData> {
    if !path.exists() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("audio file not found: {}", path.display()),
        )));
    }

    let audio_data = match MediaFormat::from_path(path)? {
        MediaFormat::Wav => decode_wav(path)?,
        MediaFormat::Mp3 => decode_mp3(path)?,
        MediaFormat::M4a => super::decode_container(path)?,
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "{} is not a waveform format ({:?})",
                path.display(),
                other
            )))
        }
    };

    if audio_data.samples.is_empty() || audio_data.sample_rate == 0 {
        return Ok(AudioData::new(Vec::new(), target_sample_rate, 1));
    }

    let mono = audio_data.to_mono();
    let samples = if audio_data.sample_rate != target_sample_rate {
        resample(path, &mono, audio_data.sample_rate, target_sample_rate)?
    } else {
        mono
    };

    Ok(AudioData::new(samples, target_sample_rate, 1))
}

/// Band-limited resampling of a mono signal with a windowed-sinc filter.
///
/// The input is fed in fixed chunks, the last one zero-padded, and the
/// output is cut to the exact length implied by the rate ratio.
fn resample(path: &Path, samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let divisor = gcd(from_rate, to_rate);
    let ratio = f64::from(to_rate / divisor) / f64::from(from_rate / divisor);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| Error::decode(path, format!("resampler: {}", e)))?;

    let expected = (samples.len() as f64 * ratio).round() as usize;
    let mut output = Vec::with_capacity(expected + RESAMPLE_CHUNK);

    for chunk in samples.chunks(RESAMPLE_CHUNK) {
        let mut block = vec![0.0f32; RESAMPLE_CHUNK];
        block[..chunk.len()].copy_from_slice(chunk);

        let out = resampler
            .process(&[block], None)
            .map_err(|e| Error::decode(path, format!("resampler: {}", e)))?;
        if let Some(channel) = out.into_iter().next() {
            output.extend(channel);
        }
    }

    output.truncate(expected);
    Ok(output)
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Decode WAV file
fn decode_wav(path: &Path) -> Result<AudioData> {
    let file = File::open(path)?;
    let mut reader = hound::WavReader::new(BufReader::new(file)).map_err(|e| match e {
        // hound reports short reads as `Other`; those are truncated files
        hound::Error::IoError(err)
            if !matches!(err.kind(), io::ErrorKind::UnexpectedEof | io::ErrorKind::Other) =>
        {
            Error::Io(err)
        }
        other => Error::decode(path, other),
    })?;

    let spec = reader.spec();

    // Read samples and convert to f32
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::decode(path, e))?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::decode(path, e))?
        }
    };

    Ok(AudioData::new(samples, spec.sample_rate, spec.channels))
}

/// Decode MP3 file
fn decode_mp3(path: &Path) -> Result<AudioData> {
    let data = std::fs::read(path)?;

    let mut decoder = minimp3::Decoder::new(&data[..]);
    let mut samples = Vec::new();
    let mut sample_rate = 0;
    let mut channels = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                }
                // Convert i16 to f32
                samples.extend(frame.data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::decode(path, e)),
        }
    }

    if sample_rate == 0 {
        return Err(Error::decode(path, "no MP3 frames found"));
    }

    Ok(AudioData::new(samples, sample_rate, channels))
}

//! Decoded audio buffers for preview playback

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::types::Seconds;

/// Decoded stereo audio, ready for the output callback
///
/// Mono sources are duplicated to both channels at load time; sources with
/// more than two channels keep the first two.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Build a buffer from split channels; trailing samples of the longer
    /// channel are dropped so both stay frame-aligned
    pub fn new(mut left: Vec<f32>, mut right: Vec<f32>, sample_rate: u32) -> Self {
        let frames = left.len().min(right.len());
        left.truncate(frames);
        right.truncate(frames);
        Self {
            left,
            right,
            sample_rate,
        }
    }

    /// Build a buffer from a mono signal, duplicated to both channels
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            left: samples.clone(),
            right: samples,
            sample_rate,
        }
    }

    /// Decode a WAV file into a stereo buffer
    ///
    /// Supports 16/24/32-bit integer and 32-bit float PCM.
    pub fn from_wav_file(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open WAV file {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .context("failed to decode float WAV samples")?,
            (hound::SampleFormat::Int, 16) => reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32_768.0))
                .collect::<Result<_, _>>()
                .context("failed to decode 16-bit WAV samples")?,
            (hound::SampleFormat::Int, 24) => reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8_388_608.0))
                .collect::<Result<_, _>>()
                .context("failed to decode 24-bit WAV samples")?,
            (hound::SampleFormat::Int, 32) => reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
                .collect::<Result<_, _>>()
                .context("failed to decode 32-bit WAV samples")?,
            (fmt, bits) => bail!("unsupported WAV format: {:?} {} bit", fmt, bits),
        };

        let frames = interleaved.len() / channels;
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        let right_channel = if channels > 1 { 1 } else { 0 };
        for frame in interleaved.chunks_exact(channels) {
            left.push(frame[0]);
            right.push(frame[right_channel]);
        }

        Ok(Self {
            left,
            right,
            sample_rate: spec.sample_rate,
        })
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn len_frames(&self) -> usize {
        self.left.len()
    }

    /// Whether the buffer holds any audio
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total duration in seconds
    pub fn duration_seconds(&self) -> Seconds {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len_frames() as Seconds / self.sample_rate as Seconds
    }

    /// Stereo frame at index `i`, silence when out of range
    #[inline]
    pub fn frame(&self, i: usize) -> (f32, f32) {
        match (self.left.get(i), self.right.get(i)) {
            (Some(&l), Some(&r)) => (l, r),
            _ => (0.0, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Short sine wave for fixture files
    fn sine(frames: usize, sample_rate: u32, frequency: f32) -> Vec<f32> {
        (0..frames)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.5
            })
            .collect()
    }

    #[test]
    fn test_float_wav_round_trip() {
        let sample_rate = 44100;
        let samples = sine(4410, sample_rate, 440.0);

        let temp = tempfile::NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(temp.path(), spec).unwrap();
        for &s in &samples {
            writer.write_sample(s).unwrap();
            writer.write_sample(-s).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = AudioBuffer::from_wav_file(temp.path()).unwrap();
        assert_eq!(buffer.sample_rate(), sample_rate);
        assert_eq!(buffer.len_frames(), 4410);
        assert!((buffer.duration_seconds() - 0.1).abs() < 1e-9);

        let (l, r) = buffer.frame(100);
        assert!((l - samples[100]).abs() < 1e-6);
        assert!((r + samples[100]).abs() < 1e-6);
    }

    #[test]
    fn test_mono_int16_upmixes_to_both_channels() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(temp.path(), spec).unwrap();
        for v in [0i16, 16384, -16384, 32767] {
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = AudioBuffer::from_wav_file(temp.path()).unwrap();
        assert_eq!(buffer.len_frames(), 4);
        let (l, r) = buffer.frame(1);
        assert_eq!(l, r);
        assert!((l - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_unsupported_bit_depth_fails() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 8,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(temp.path(), spec).unwrap();
        writer.write_sample(0i8).unwrap();
        writer.finalize().unwrap();

        assert!(AudioBuffer::from_wav_file(temp.path()).is_err());
    }

    #[test]
    fn test_out_of_range_frame_is_silence() {
        let buffer = AudioBuffer::from_mono(vec![0.5, 0.25], 44100);
        assert_eq!(buffer.frame(0), (0.5, 0.5));
        assert_eq!(buffer.frame(99), (0.0, 0.0));
    }

    #[test]
    fn test_mismatched_channel_lengths_truncate() {
        let buffer = AudioBuffer::new(vec![0.1, 0.2, 0.3], vec![0.4, 0.5], 44100);
        assert_eq!(buffer.len_frames(), 2);
    }
}

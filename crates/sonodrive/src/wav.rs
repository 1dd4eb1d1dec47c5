//! WAV decoding into mono `f32` samples.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::debug;

/// Decoded mono signal
#[derive(Debug, Clone)]
pub struct MonoSignal {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl MonoSignal {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Read a WAV file, normalising integer samples to `[-1, 1]` and averaging
/// channels down to mono
pub fn load(path: &Path) -> Result<MonoSignal> {
    let reader =
        hound::WavReader::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        bail!("{:?} declares zero channels", path);
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .with_context(|| format!("Failed to decode {:?}", path))?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()
                .with_context(|| format!("Failed to decode {:?}", path))?
        }
    };

    debug!(
        "Decoded {:?}: {}Hz, {} channels, {} bits, {} samples",
        path,
        spec.sample_rate,
        channels,
        spec.bits_per_sample,
        interleaved.len()
    );

    Ok(MonoSignal {
        sample_rate: spec.sample_rate,
        samples: downmix(&interleaved, channels),
    })
}

/// Average interleaved frames of `channels` samples; a trailing partial
/// frame is dropped
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_downmix_averages_channels() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0, 0.25];
        assert_eq!(downmix(&stereo, 2), vec![0.5, 0.5, 0.0]);
        assert_eq!(downmix(&stereo, 1), stereo.to_vec());
    }

    #[test]
    fn test_load_int_stereo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(i16::MAX).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let signal = load(&path).unwrap();
        assert_eq!(signal.sample_rate, 22050);
        assert_eq!(signal.samples.len(), 100);
        assert!(signal.samples.iter().all(|&s| (s - 0.5).abs() < 1e-3));
    }

    #[test]
    fn test_load_float_mono() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..441 {
            writer.write_sample(i as f32 / 441.0).unwrap();
        }
        writer.finalize().unwrap();

        let signal = load(&path).unwrap();
        assert_eq!(signal.samples.len(), 441);
        assert!((signal.duration_secs() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(load(Path::new("/nonexistent/missing.wav")).is_err());
    }
}

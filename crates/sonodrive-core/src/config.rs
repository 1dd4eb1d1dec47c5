//! Pipeline configuration and its on-disk format.
//!
//! [`PipelineConfig`] bundles the size-affecting [`AnalysisConfig`], the
//! tunable [`AudioProcessorParams`] and the [`LogConfig`]. It is stored as
//! RON or JSON depending on the file extension.

use crate::logging::LogConfig;
use crate::params::AudioProcessorParams;
use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Maximum accepted config file size (1 MiB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Dimensions of the analysis pipeline
///
/// Changing `buckets` or `length` discards driver history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Input sample rate (Hz)
    pub sample_rate: u32,
    /// Samples per processed frame
    pub frame_size: usize,
    /// Sliding FFT window (power of 2)
    pub fft_size: usize,
    /// Number of log-spaced frequency buckets
    pub buckets: usize,
    /// Amplitude history columns kept in the drivers
    pub length: usize,
    /// Lowest analysed frequency (Hz)
    pub f_min: f32,
    /// Highest analysed frequency (Hz)
    pub f_max: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            frame_size: 512,
            fft_size: 2048,
            buckets: 32,
            length: 128,
            f_min: 32.0,
            f_max: 12000.0,
        }
    }
}

impl AnalysisConfig {
    /// Nyquist frequency (Hz)
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Convert frequency (Hz) to FFT bin index
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        ((hz * self.fft_size as f32) / self.sample_rate as f32) as usize
    }

    /// FFT bins covering `[f_min, f_max)`, at least one bin per bucket
    pub fn bucket_bins(&self) -> std::ops::Range<usize> {
        let half = self.fft_size / 2;
        let start = self.hz_to_bin(self.f_min).min(half);
        let end = self.hz_to_bin(self.f_max).clamp(start, half);
        if end - start >= self.buckets {
            start..end
        } else {
            let end = (start + self.buckets).min(half);
            end.saturating_sub(self.buckets)..end
        }
    }

    /// Check dimensions (power-of-two FFT, frame fits the window, etc.)
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(CoreError::InvalidArgument(
                "sample rate must be > 0".to_string(),
            ));
        }
        if !self.fft_size.is_power_of_two() || self.fft_size < 4 {
            return Err(CoreError::InvalidArgument(format!(
                "FFT size must be a power of 2 and at least 4, got {}",
                self.fft_size
            )));
        }
        if self.frame_size == 0 || self.frame_size > self.fft_size {
            return Err(CoreError::InvalidArgument(format!(
                "frame size must be in 1..={}, got {}",
                self.fft_size, self.frame_size
            )));
        }
        if self.buckets == 0 || self.buckets > self.fft_size / 2 {
            return Err(CoreError::InvalidArgument(format!(
                "bucket count must be in 1..={}, got {}",
                self.fft_size / 2,
                self.buckets
            )));
        }
        if self.length == 0 {
            return Err(CoreError::InvalidArgument(
                "history length must be > 0".to_string(),
            ));
        }
        if !(self.f_min >= 0.0 && self.f_max > self.f_min && self.f_max <= self.nyquist()) {
            return Err(CoreError::InvalidArgument(format!(
                "frequency range {}..{}Hz must lie within 0..{}Hz",
                self.f_min,
                self.f_max,
                self.nyquist()
            )));
        }
        Ok(())
    }
}

/// Everything needed to stand up a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Pipeline dimensions
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Tunables
    #[serde(default)]
    pub params: AudioProcessorParams,
    /// Logging setup
    #[serde(default)]
    pub logging: LogConfig,
}

impl PipelineConfig {
    /// Load from `path` (RON unless the extension is `json`)
    pub fn load(path: &Path) -> Result<Self> {
        let size = fs::metadata(path)?.len();
        if size > MAX_CONFIG_FILE_SIZE {
            return Err(CoreError::InvalidArgument(format!(
                "config file is {} bytes, limit is {}",
                size, MAX_CONFIG_FILE_SIZE
            )));
        }

        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = match extension(path) {
            "json" => serde_json::from_str(&content)?,
            _ => ron::from_str(&content)?,
        };
        config.analysis.validate()?;
        Ok(config)
    }

    /// Save to `path` (RON unless the extension is `json`)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = match extension(path) {
            "json" => serde_json::to_string_pretty(self)?,
            _ => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?,
        };
        fs::write(path, content)?;
        Ok(())
    }
}

fn extension(path: &Path) -> &str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("ron")
}

//! Top-level per-frame integrator.
//!
//! Owns the whole pipeline and decides which reconfigurations keep history:
//! - `resize` / `set_length`: rebuild the [`Bucketer`] and/or
//!   [`FrequencyProcessor`], history is discarded
//! - decimation change: rebuild the [`FrequencyProcessor`]
//! - anything else: coefficients change in place, history is kept

use crate::audio::bucketer::Bucketer;
use crate::audio::drivers::Drivers;
use crate::audio::frequency_processor::FrequencyProcessor;
use crate::audio::sliding_fft::{SlidingFft, SpectralTransform};
use crate::config::AnalysisConfig;
use crate::params::{AudioProcessorParams, ParamUpdate};
use crate::{CoreError, Result};
use tracing::{debug, info, trace};

/// Raw samples in, drivers out
pub struct AudioProcessor {
    config: AnalysisConfig,
    params: AudioProcessorParams,
    fft: SlidingFft,
    bucketer: Bucketer,
    processor: FrequencyProcessor,
    /// Spectrum bins handed to the bucketer
    bins: std::ops::Range<usize>,
    bucketed: Vec<f32>,
    /// Samples waiting for a complete frame
    carry: Vec<f32>,
    frames: u64,
}

impl AudioProcessor {
    /// Build the pipeline with a rustfft transform
    pub fn new(config: AnalysisConfig, params: AudioProcessorParams) -> Result<Self> {
        config.validate()?;
        let fft = SlidingFft::new(config.fft_size)?;
        Self::assemble(config, params, fft)
    }

    /// Build the pipeline around a custom transform primitive
    pub fn with_transform(
        config: AnalysisConfig,
        params: AudioProcessorParams,
        transform: Box<dyn SpectralTransform>,
    ) -> Result<Self> {
        config.validate()?;
        if transform.size() != config.fft_size {
            return Err(CoreError::InvalidArgument(format!(
                "transform size {} does not match FFT size {}",
                transform.size(),
                config.fft_size
            )));
        }
        let fft = SlidingFft::with_transform(transform)?;
        Self::assemble(config, params, fft)
    }

    fn assemble(
        config: AnalysisConfig,
        params: AudioProcessorParams,
        fft: SlidingFft,
    ) -> Result<Self> {
        let bins = config.bucket_bins();
        let bucketer = Bucketer::new(bins.len(), config.buckets, config.f_min, config.f_max)?;
        let processor = FrequencyProcessor::new(config.buckets, config.length, params);

        debug!(
            "AudioProcessor created: sample_rate={}, frame_size={}, fft_size={}, buckets={}, bins={:?}",
            config.sample_rate, config.frame_size, config.fft_size, config.buckets, bins
        );

        Ok(Self {
            config,
            params,
            fft,
            bucketer,
            processor,
            bins,
            bucketed: vec![0.0; config.buckets],
            carry: Vec::with_capacity(config.frame_size),
            frames: 0,
        })
    }

    /// Current dimensions
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Current tunables
    pub fn params(&self) -> &AudioProcessorParams {
        &self.params
    }

    /// Bucketer in use
    pub fn bucketer(&self) -> &Bucketer {
        &self.bucketer
    }

    /// Frequency processor in use
    pub fn frequency_processor(&self) -> &FrequencyProcessor {
        &self.processor
    }

    /// Number of frames consumed since construction
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Most recent log-magnitude spectrum
    pub fn spectrum(&self) -> &[f32] {
        self.fft.spectrum()
    }

    /// Most recent bucketed spectrum
    pub fn bucketed(&self) -> &[f32] {
        &self.bucketed
    }

    /// Run one frame of `frame_size` samples through the pipeline
    pub fn process(&mut self, frame: &[f32]) -> Result<()> {
        if frame.len() != self.config.frame_size {
            return Err(CoreError::InvalidArgument(format!(
                "expected frame of {} samples, got {}",
                self.config.frame_size,
                frame.len()
            )));
        }

        let spectrum = self.fft.process(frame)?;
        self.bucketer
            .bucket(&spectrum[self.bins.clone()], &mut self.bucketed);
        self.processor.process(&self.bucketed);

        self.frames += 1;
        if self.frames % 1024 == 0 {
            trace!(
                "AudioProcessor: {} frames, {} pipeline steps",
                self.frames,
                self.processor.frame_count()
            );
        }
        Ok(())
    }

    /// Split an arbitrary block into frames, keeping the remainder for later
    ///
    /// Returns the number of frames processed.
    pub fn process_samples(&mut self, samples: &[f32]) -> Result<usize> {
        let frame_size = self.config.frame_size;
        let mut processed = 0;
        let mut rest = samples;

        if !self.carry.is_empty() {
            let needed = frame_size - self.carry.len();
            let take = needed.min(rest.len());
            self.carry.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.carry.len() < frame_size {
                return Ok(0);
            }
            let frame = std::mem::take(&mut self.carry);
            self.process(&frame)?;
            self.carry = frame;
            self.carry.clear();
            processed += 1;
        }

        let mut chunks = rest.chunks_exact(frame_size);
        for frame in &mut chunks {
            self.process(frame)?;
            processed += 1;
        }
        self.carry.extend_from_slice(chunks.remainder());

        Ok(processed)
    }

    /// Drivers plus the edge-triggered update flag
    pub fn get_drivers(&mut self) -> (&Drivers, bool) {
        self.processor.get_drivers()
    }

    /// Drivers without consuming the update flag
    pub fn drivers(&self) -> &Drivers {
        self.processor.drivers()
    }

    /// Replace all tunables
    ///
    /// A decimation change rebuilds the frequency processor and drops its
    /// history; any other change keeps filter state.
    pub fn set_audio_params(&mut self, params: AudioProcessorParams) {
        if params.decimation.max(1) != self.processor.decimation() {
            info!(
                "Decimation changed {} -> {}, resetting driver history",
                self.processor.decimation(),
                params.decimation
            );
            self.processor =
                FrequencyProcessor::new(self.config.buckets, self.config.length, params);
        } else {
            self.processor.set_params(params);
        }
        self.params = params;
    }

    /// Apply a single typed update
    pub fn update(&mut self, update: ParamUpdate) {
        let params = self.params.apply(update);
        self.set_audio_params(params);
    }

    /// Change the bucket count, rebuilding bucketer and frequency processor
    pub fn resize(&mut self, buckets: usize) -> Result<()> {
        let config = AnalysisConfig {
            buckets,
            ..self.config
        };
        config.validate()?;

        let bins = config.bucket_bins();
        let bucketer = Bucketer::new(bins.len(), buckets, config.f_min, config.f_max)?;

        info!(
            "Resizing {} -> {} buckets, resetting driver history",
            self.config.buckets, buckets
        );

        self.bucketer = bucketer;
        self.bins = bins;
        self.processor = FrequencyProcessor::new(buckets, config.length, self.params);
        self.bucketed = vec![0.0; buckets];
        self.config = config;
        Ok(())
    }

    /// Change the amplitude history length, rebuilding the frequency processor
    pub fn set_length(&mut self, length: usize) -> Result<()> {
        let config = AnalysisConfig {
            length,
            ..self.config
        };
        config.validate()?;

        info!(
            "History length {} -> {}, resetting driver history",
            self.config.length, length
        );

        self.processor = FrequencyProcessor::new(config.buckets, length, self.params);
        self.config = config;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ScalarParam;
    use std::f32::consts::PI;

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            sample_rate: 44100,
            frame_size: 256,
            fft_size: 1024,
            buckets: 8,
            length: 16,
            f_min: 32.0,
            f_max: 12000.0,
        }
    }

    fn sine(len: usize, freq: f32, offset: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * (i + offset) as f32 / 44100.0).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_process_sets_update_flag() {
        let mut ap = AudioProcessor::new(small_config(), AudioProcessorParams::default()).unwrap();
        ap.process(&sine(256, 440.0, 0)).unwrap();

        let (drivers, updated) = ap.get_drivers();
        assert!(updated);
        assert_eq!(drivers.buckets(), 8);
        assert!(!ap.get_drivers().1);
    }

    #[test]
    fn test_wrong_frame_size_fails() {
        let mut ap = AudioProcessor::new(small_config(), AudioProcessorParams::default()).unwrap();
        assert!(matches!(
            ap.process(&[0.0; 100]),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_process_samples_carries_remainder() {
        let mut ap = AudioProcessor::new(small_config(), AudioProcessorParams::default()).unwrap();

        assert_eq!(ap.process_samples(&sine(300, 440.0, 0)).unwrap(), 1);
        assert_eq!(ap.process_samples(&sine(200, 440.0, 300)).unwrap(), 0);
        assert_eq!(ap.process_samples(&sine(100, 440.0, 500)).unwrap(), 1);
        assert_eq!(ap.process_samples(&sine(10, 440.0, 600)).unwrap(), 0);
        assert_eq!(ap.frames_processed(), 2);
    }

    #[test]
    fn test_param_update_keeps_history() {
        let mut ap = AudioProcessor::new(small_config(), AudioProcessorParams::default()).unwrap();
        for i in 0..8 {
            ap.process(&sine(256, 440.0, i * 256)).unwrap();
        }
        let before = ap.drivers().column(0).to_vec();
        let index = ap.drivers().column_index();

        ap.update(ParamUpdate::Scalar(ScalarParam::Sync, 0.2));

        assert_eq!(ap.params().sync, 0.2);
        assert_eq!(ap.drivers().column(0), before.as_slice());
        assert_eq!(ap.drivers().column_index(), index);
    }

    #[test]
    fn test_decimation_change_resets_history() {
        let mut ap = AudioProcessor::new(small_config(), AudioProcessorParams::default()).unwrap();
        for i in 0..8 {
            ap.process(&sine(256, 440.0, i * 256)).unwrap();
        }
        assert_ne!(ap.drivers().column_index(), 0);

        ap.update(ParamUpdate::Decimation(2));

        assert_eq!(ap.drivers().column_index(), 0);
        assert_eq!(ap.frequency_processor().decimation(), 2);
        assert!(ap.drivers().column(0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_resize_rebuilds_pipeline() {
        let mut ap = AudioProcessor::new(small_config(), AudioProcessorParams::default()).unwrap();
        ap.process(&sine(256, 440.0, 0)).unwrap();

        ap.resize(12).unwrap();
        assert_eq!(ap.bucketer().buckets(), 12);
        assert_eq!(ap.drivers().buckets(), 12);

        ap.process(&sine(256, 440.0, 256)).unwrap();
        assert_eq!(ap.drivers().column(0).len(), 12);
        assert_eq!(ap.bucketed().len(), 12);

        assert!(ap.resize(0).is_err());
        assert_eq!(ap.config().buckets, 12);
    }

    #[test]
    fn test_set_length_rebuilds_drivers() {
        let mut ap = AudioProcessor::new(small_config(), AudioProcessorParams::default()).unwrap();
        ap.set_length(4).unwrap();
        assert_eq!(ap.drivers().length(), 4);
        assert!(ap.set_length(0).is_err());
    }
}

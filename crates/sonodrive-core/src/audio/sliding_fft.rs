//! Sliding window spectral framing.
//!
//! Each incoming frame is pushed into a [`WindowBuffer`]; the latest
//! `fft_size` samples are Blackman-Harris windowed and transformed into a
//! log-compressed magnitude spectrum of `fft_size / 2` bins.

use crate::audio::window_buffer::WindowBuffer;
use crate::{CoreError, Result};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;
use tracing::debug;

const BH_A0: f32 = 0.35875;
const BH_A1: f32 = 0.48829;
const BH_A2: f32 = 0.14128;
const BH_A3: f32 = 0.01168;

/// Complex transform primitive: real N-sample frame -> N/2 complex bins
pub trait SpectralTransform: Send {
    /// Number of real input samples
    fn size(&self) -> usize;

    /// Transform `input` (length `size()`) into `output` (length `size() / 2`)
    fn forward(&mut self, input: &[f32], output: &mut [Complex<f32>]);
}

/// [`SpectralTransform`] backed by rustfft
pub struct RustFftTransform {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RustFftTransform {
    /// Plan a forward transform of `size` samples
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch_len = fft.get_inplace_scratch_len();

        Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }
}

impl SpectralTransform for RustFftTransform {
    fn size(&self) -> usize {
        self.buffer.len()
    }

    fn forward(&mut self, input: &[f32], output: &mut [Complex<f32>]) {
        for (slot, &sample) in self.buffer.iter_mut().zip(input) {
            *slot = Complex::new(sample, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let half = output.len().min(self.buffer.len() / 2);
        output[..half].copy_from_slice(&self.buffer[..half]);
    }
}

/// Blackman-Harris window of length `size`
pub fn blackman_harris(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f32;
    (0..size)
        .map(|i| {
            let f = 2.0 * PI * i as f32 / denom;
            BH_A0 - BH_A1 * f.cos() + BH_A2 * (2.0 * f).cos() - BH_A3 * (3.0 * f).cos()
        })
        .collect()
}

/// Windowed, log-compressed magnitude spectrum over a sliding sample window
pub struct SlidingFft {
    buffer: WindowBuffer,
    window: Vec<f32>,
    transform: Box<dyn SpectralTransform>,
    /// Windowed samples handed to the transform
    frame: Vec<f32>,
    bins: Vec<Complex<f32>>,
    /// Output spectrum (`fft_size / 2`)
    spectrum: Vec<f32>,
}

impl SlidingFft {
    /// Create a sliding FFT over `fft_size` samples using rustfft
    pub fn new(fft_size: usize) -> Result<Self> {
        Self::with_transform(Box::new(RustFftTransform::new(fft_size)))
    }

    /// Create a sliding FFT with a custom transform primitive
    pub fn with_transform(transform: Box<dyn SpectralTransform>) -> Result<Self> {
        let fft_size = transform.size();
        if fft_size < 2 {
            return Err(CoreError::InvalidArgument(format!(
                "FFT size must be at least 2, got {}",
                fft_size
            )));
        }

        debug!("SlidingFft created: fft_size={}", fft_size);

        Ok(Self {
            buffer: WindowBuffer::new(fft_size),
            window: blackman_harris(fft_size),
            transform,
            frame: vec![0.0; fft_size],
            bins: vec![Complex::new(0.0, 0.0); fft_size / 2],
            spectrum: vec![0.0; fft_size / 2],
        })
    }

    /// Window length in samples
    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    /// Number of spectrum bins produced per frame
    pub fn output_size(&self) -> usize {
        self.spectrum.len()
    }

    /// Push `frame` and return the updated spectrum, `log2(1 + |bin|)` per bin
    pub fn process(&mut self, frame: &[f32]) -> Result<&[f32]> {
        self.buffer.push(frame)?;
        self.buffer.read_latest(&mut self.frame)?;

        for (sample, w) in self.frame.iter_mut().zip(&self.window) {
            *sample *= w;
        }

        self.transform.forward(&self.frame, &mut self.bins);

        for (out, bin) in self.spectrum.iter_mut().zip(&self.bins) {
            *out = (1.0 + bin.norm()).log2();
        }

        Ok(&self.spectrum)
    }

    /// Last computed spectrum
    pub fn spectrum(&self) -> &[f32] {
        &self.spectrum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blackman_harris_shape() {
        let window = blackman_harris(1024);

        // Near zero at the edges, ~1 at the center
        assert!(window[0].abs() < 1e-3);
        assert!(window[1023].abs() < 1e-3);
        assert!((window[512] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_output_size_is_half() {
        let fft = SlidingFft::new(256).unwrap();
        assert_eq!(fft.output_size(), 128);
        assert_eq!(fft.fft_size(), 256);
    }

    #[test]
    fn test_silence_yields_zero_spectrum() {
        let mut fft = SlidingFft::new(256).unwrap();
        let spectrum = fft.process(&[0.0; 64]).unwrap();
        assert!(spectrum.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let size = 1024;
        let mut fft = SlidingFft::new(size).unwrap();

        // Exactly bin 32
        let samples: Vec<f32> = (0..size)
            .map(|i| (2.0 * PI * 32.0 * i as f32 / size as f32).sin())
            .collect();

        let spectrum = fft.process(&samples).unwrap();
        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        assert_eq!(peak, 32);
        assert!(spectrum.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_oversized_frame_fails() {
        let mut fft = SlidingFft::new(64).unwrap();
        assert!(matches!(
            fft.process(&[0.0; 65]),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    struct ConstantTransform {
        size: usize,
        value: Complex<f32>,
    }

    impl SpectralTransform for ConstantTransform {
        fn size(&self) -> usize {
            self.size
        }

        fn forward(&mut self, _input: &[f32], output: &mut [Complex<f32>]) {
            output.fill(self.value);
        }
    }

    #[test]
    fn test_custom_transform_is_log_compressed() {
        let transform = ConstantTransform {
            size: 16,
            value: Complex::new(3.0, 4.0),
        };
        let mut fft = SlidingFft::with_transform(Box::new(transform)).unwrap();

        // |3 + 4i| = 5 -> log2(6)
        let spectrum = fft.process(&[0.5; 16]).unwrap();
        assert_eq!(spectrum.len(), 8);
        for &v in spectrum {
            assert!((v - 6.0f32.log2()).abs() < 1e-6);
        }
    }
}

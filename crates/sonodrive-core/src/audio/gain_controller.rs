//! Per-channel automatic gain control.
//!
//! A PD loop in log-error space pushes each channel's long-term filtered
//! level toward 1.0. Gains are clamped to `[MIN_GAIN, MAX_GAIN]`.

use crate::audio::filter::Filter;
use crate::params::FilterParams;

/// Upper gain clamp
pub const MAX_GAIN: f32 = 100.0;
/// Lower gain clamp
pub const MIN_GAIN: f32 = 0.01;
/// Default proportional term
pub const DEFAULT_KP: f32 = 0.001;
/// Default derivative term
pub const DEFAULT_KD: f32 = 0.005;

/// Level filter used to measure each channel
pub const LEVEL_FILTER: FilterParams = FilterParams {
    tao: 138.0,
    gain: 1.0,
};

/// Signed log2 distance of `v` from 1
pub fn log_error(v: f32) -> f32 {
    let d = 1.000001 - v;
    d.signum() * d.abs().log2()
}

/// PD-feedback gain normaliser
#[derive(Debug, Clone)]
pub struct GainController {
    gain: Vec<f32>,
    err: Vec<f32>,
    filter: Filter,
    kp: f32,
    kd: f32,
}

impl GainController {
    /// Create a controller for `size` channels with default loop terms
    pub fn new(size: usize) -> Self {
        Self::with_terms(size, DEFAULT_KP, DEFAULT_KD)
    }

    /// Create a controller with explicit proportional and derivative terms
    pub fn with_terms(size: usize, kp: f32, kd: f32) -> Self {
        Self {
            gain: vec![1.0; size],
            err: vec![0.0; size],
            filter: Filter::new(size, LEVEL_FILTER),
            kp,
            kd,
        }
    }

    /// Apply the current gains to `x` in place, then update the gains
    ///
    /// The error is `log2` of the filtered level, so channels below unity
    /// get a negative error and their gain is raised.
    pub fn process(&mut self, x: &mut [f32]) {
        for (v, g) in x.iter_mut().zip(&self.gain) {
            *v *= g;
        }

        let filtered = self.filter.process(x);

        for ((g, err), &level) in self.gain.iter_mut().zip(self.err.iter_mut()).zip(filtered) {
            let e = log_error(1.0 - level);
            let u = self.kp * e + self.kd * (e - *err);
            *g = (*g - u).clamp(MIN_GAIN, MAX_GAIN);
            *err = e;
        }
    }

    /// Current per-channel gains
    pub fn gains(&self) -> &[f32] {
        &self.gain
    }

    /// Filtered, gain-applied level per channel
    pub fn levels(&self) -> &[f32] {
        self.filter.values()
    }
}

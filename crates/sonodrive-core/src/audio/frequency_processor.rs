//! Frequency-domain control loop.
//!
//! Turns bucketed spectra into driver signals. Every processed frame runs
//! the same fixed sequence:
//! 1. Preemphasis
//! 2. Automatic gain control
//! 3. Amplitude and differential filter cascades
//! 4. Amplitude column, differential and energy integration
//! 5. Energy sync across buckets with deferred wraparound
//! 6. Adaptive value scaling
//! 7. Column mean

use crate::audio::drivers::Drivers;
use crate::audio::filter::{BiasedFilter, Filter};
use crate::audio::gain_controller::GainController;
use crate::params::AudioProcessorParams;
use std::f32::consts::TAU;
use tracing::{debug, trace};

/// Smallest filtered value used when inverting into a scale
pub const MIN_SCALE_DIVISOR: f32 = 0.001;

/// Orchestrates the filter chain over one [`Drivers`] instance
pub struct FrequencyProcessor {
    buckets: usize,
    params: AudioProcessorParams,
    /// Fixed at construction; changing it means building a new processor
    decimation: u32,

    drivers: Drivers,
    has_update: bool,

    gain_controller: GainController,
    gain_filter: Filter,
    gain_feedback: Filter,
    diff_filter: Filter,
    diff_feedback: Filter,
    scale_filter: BiasedFilter,

    /// Sum of bucketed frames awaiting decimation
    pending: Vec<f32>,
    pending_count: u32,

    input: Vec<f32>,
    diff_input: Vec<f32>,
    amp: Vec<f32>,
    scaled: Vec<f32>,
    energy_scratch: Vec<f32>,

    frame_count: u64,
}

impl FrequencyProcessor {
    /// Create a processor for `buckets` channels keeping `length` columns of history
    pub fn new(buckets: usize, length: usize, params: AudioProcessorParams) -> Self {
        let decimation = params.decimation.max(1);

        debug!(
            "FrequencyProcessor created: buckets={}, length={}, decimation={}",
            buckets, length, decimation
        );

        Self {
            buckets,
            params,
            decimation,
            drivers: Drivers::new(buckets, length),
            has_update: false,
            gain_controller: GainController::new(buckets),
            gain_filter: Filter::new(buckets, params.gain_filter),
            gain_feedback: Filter::new(buckets, params.gain_feedback),
            diff_filter: Filter::new(buckets, params.diff_filter),
            diff_feedback: Filter::new(buckets, params.diff_feedback),
            scale_filter: BiasedFilter::new(buckets, params.pos_scale, params.neg_scale),
            pending: vec![0.0; buckets],
            pending_count: 0,
            input: vec![0.0; buckets],
            diff_input: vec![0.0; buckets],
            amp: vec![0.0; buckets],
            scaled: vec![0.0; buckets],
            energy_scratch: vec![0.0; buckets],
            frame_count: 0,
        }
    }

    /// Number of buckets
    pub fn buckets(&self) -> usize {
        self.buckets
    }

    /// Decimation factor this processor was built with
    pub fn decimation(&self) -> u32 {
        self.decimation
    }

    /// Active parameters
    pub fn params(&self) -> &AudioProcessorParams {
        &self.params
    }

    /// Per-bucket automatic gains
    pub fn gains(&self) -> &[f32] {
        self.gain_controller.gains()
    }

    /// Number of frames that went through the full pipeline
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Swap in new parameters, keeping all filter history
    ///
    /// The decimation factor is not changed here.
    pub fn set_params(&mut self, params: AudioProcessorParams) {
        if params.decimation.max(1) != self.decimation {
            debug!(
                "FrequencyProcessor keeps decimation={} (requested {})",
                self.decimation, params.decimation
            );
        }
        self.gain_filter.set_params(params.gain_filter);
        self.gain_feedback.set_params(params.gain_feedback);
        self.diff_filter.set_params(params.diff_filter);
        self.diff_feedback.set_params(params.diff_feedback);
        self.scale_filter
            .set_params(params.pos_scale, params.neg_scale);
        self.params = params;
    }

    /// Feed one bucketed frame
    ///
    /// With decimation `n`, every `n`th call runs the pipeline on the mean
    /// of the last `n` frames. Returns whether the drivers changed.
    pub fn process(&mut self, bucketed: &[f32]) -> bool {
        debug_assert_eq!(bucketed.len(), self.buckets);

        for (sum, &v) in self.pending.iter_mut().zip(bucketed) {
            *sum += v;
        }
        self.pending_count += 1;
        if self.pending_count < self.decimation {
            return false;
        }

        let n = self.pending_count as f32;
        for (dst, sum) in self.input.iter_mut().zip(self.pending.iter_mut()) {
            *dst = *sum / n;
            *sum = 0.0;
        }
        self.pending_count = 0;

        self.run_pipeline();
        true
    }

    fn run_pipeline(&mut self) {
        let p = self.params;
        let buckets = self.buckets as f32;

        // 1. Preemphasis
        for (i, v) in self.input.iter_mut().enumerate() {
            *v *= 1.0 + i as f32 * (p.preemphasis - 1.0) / buckets;
        }

        // 2. Gain control
        self.gain_controller.process(&mut self.input);

        // 3. Filter cascade
        self.diff_input.copy_from_slice(self.gain_filter.values());
        let amp_smooth = self.gain_filter.process(&self.input);
        for (d, &after) in self.diff_input.iter_mut().zip(amp_smooth) {
            *d -= after;
        }
        self.gain_feedback.process(&self.input);
        self.diff_filter.process(&self.diff_input);
        self.diff_feedback.process(&self.diff_input);

        // 4. Effects
        for (i, amp) in self.amp.iter_mut().enumerate() {
            *amp = p.amp_offset
                + p.amp_scale * (self.gain_filter.values()[i] + self.gain_feedback.values()[i]);
        }
        self.drivers.increment_column_idx();
        self.drivers.current_column_mut().copy_from_slice(&self.amp);

        let drivers = &mut self.drivers;
        for i in 0..self.buckets {
            let diff =
                p.diff_gain * (self.diff_filter.values()[i] + self.diff_feedback.values()[i]);
            drivers.diff[i] = diff;
            drivers.energy[i] = drivers.energy[i] * (1.0 - p.decay) + p.drag - diff * p.accum;
        }

        // 5. Sync
        sync_energy(&mut drivers.energy, &mut self.energy_scratch, p.sync);
        wrap_energy(&mut drivers.energy);

        // 6. Value scaling
        for ((sv, &scale), &amp) in self.scaled.iter_mut().zip(&drivers.scales).zip(&self.amp) {
            *sv = (scale * (amp - 1.0)).abs();
        }
        let filtered = self.scale_filter.process(&self.scaled);
        for (scale, &f) in drivers.scales.iter_mut().zip(filtered) {
            *scale = 1.0 / f.max(MIN_SCALE_DIVISOR);
        }

        // 7. Mean
        let column_mean = if self.buckets == 0 {
            0.0
        } else {
            drivers
                .scales
                .iter()
                .zip(&self.amp)
                .map(|(s, a)| s * (a - 1.0))
                .sum::<f32>()
                / buckets
        };
        let slot = drivers.column_index();
        drivers.mean[slot] = column_mean;

        self.has_update = true;
        self.frame_count += 1;

        if self.frame_count % 256 == 0 {
            trace!(
                "FrequencyProcessor frame #{}: mean={:.4}, energy_mean={:.4}",
                self.frame_count,
                column_mean,
                average(&self.drivers.energy)
            );
        }
    }

    /// Drivers plus whether they changed since the previous call
    ///
    /// The flag is cleared on read.
    pub fn get_drivers(&mut self) -> (&Drivers, bool) {
        let has_update = std::mem::take(&mut self.has_update);
        (&self.drivers, has_update)
    }

    /// Drivers without consuming the update flag
    pub fn drivers(&self) -> &Drivers {
        &self.drivers
    }

    /// Whether a processed frame is waiting to be read
    pub fn has_update(&self) -> bool {
        self.has_update
    }
}

fn average(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// `sign(d) * d^2`
fn signed_square(d: f32) -> f32 {
    d * d.abs()
}

/// Relax each bucket's energy toward its neighbours and the global mean
///
/// All terms are computed from the energy before relaxation.
pub fn sync_energy(energy: &mut [f32], scratch: &mut Vec<f32>, sync: f32) {
    scratch.clear();
    scratch.extend_from_slice(energy);
    let mean = average(scratch);
    let n = scratch.len();

    for (i, e) in energy.iter_mut().enumerate() {
        let current = scratch[i];
        let mut delta = signed_square(mean - current);
        if i > 0 {
            delta += signed_square(scratch[i - 1] - current);
        }
        if i + 1 < n {
            delta += signed_square(scratch[i + 1] - current);
        }
        *e = current + delta * sync;
    }
}

/// Shift all energies by one period once every bucket is past `±2π`
///
/// Only considered when the mean has left `[-2π, 2π]`. Returns whether a
/// shift happened.
pub fn wrap_energy(energy: &mut [f32]) -> bool {
    let mean = average(energy);
    if mean > TAU && energy.iter().all(|&e| e > TAU) {
        energy.iter_mut().for_each(|e| *e -= TAU);
        true
    } else if mean < -TAU && energy.iter().all(|&e| e < -TAU) {
        energy.iter_mut().for_each(|e| *e += TAU);
        true
    } else {
        false
    }
}

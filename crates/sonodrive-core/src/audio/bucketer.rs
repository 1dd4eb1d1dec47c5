//! Logarithmic frequency bucketing.
//!
//! The input spectrum is assumed to span `[f_min, f_max)` linearly. Bucket
//! boundaries are spaced evenly in `log2(1 + f)` so low frequencies get
//! narrow buckets and high frequencies wide ones.

use crate::{CoreError, Result};
use tracing::debug;

/// Map a frequency onto the log scale used for bucket spacing
pub fn to_log_scale(x: f32) -> f32 {
    (1.0 + x).log2()
}

/// Inverse of [`to_log_scale`]
pub fn from_log_scale(x: f32) -> f32 {
    x.exp2() - 1.0
}

/// Averages spectrum bins into log-spaced buckets
#[derive(Debug, Clone)]
pub struct Bucketer {
    input_size: usize,
    buckets: usize,
    f_min: f32,
    f_max: f32,
    /// `buckets - 1` strictly increasing split points in `(0, input_size)`
    boundaries: Vec<usize>,
}

impl Bucketer {
    /// Precompute bucket boundaries for `input_size` bins covering `[f_min, f_max)`
    pub fn new(input_size: usize, buckets: usize, f_min: f32, f_max: f32) -> Result<Self> {
        if buckets == 0 || buckets > input_size {
            return Err(CoreError::InvalidArgument(format!(
                "bucket count {} must be in 1..={}",
                buckets, input_size
            )));
        }
        if !(f_min >= 0.0 && f_max > f_min) {
            return Err(CoreError::InvalidArgument(format!(
                "invalid frequency range {}..{}",
                f_min, f_max
            )));
        }

        let boundaries = compute_boundaries(input_size, buckets, f_min, f_max);

        debug!(
            "Bucketer created: input_size={}, buckets={}, range={}..{}Hz, boundaries={:?}",
            input_size, buckets, f_min, f_max, boundaries
        );

        Ok(Self {
            input_size,
            buckets,
            f_min,
            f_max,
            boundaries,
        })
    }

    /// Number of output buckets
    pub fn buckets(&self) -> usize {
        self.buckets
    }

    /// Expected input length
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Frequency range covered by the input
    pub fn frequency_range(&self) -> (f32, f32) {
        (self.f_min, self.f_max)
    }

    /// Interior split points
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    /// Average `input` into `out`, one value per bucket
    ///
    /// Bucket `i` covers `input[start_i..stop_i)` with `start_0 = 0` and the
    /// last bucket ending at `input.len()`.
    pub fn bucket(&self, input: &[f32], out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.buckets);

        let mut start = 0;
        for (i, slot) in out.iter_mut().enumerate() {
            let stop = if i + 1 == self.buckets {
                input.len()
            } else {
                self.boundaries[i].min(input.len())
            };
            let span = &input[start.min(stop)..stop];
            *slot = if span.is_empty() {
                0.0
            } else {
                span.iter().sum::<f32>() / span.len() as f32
            };
            start = stop;
        }
    }

    /// Allocating variant of [`Bucketer::bucket`]
    pub fn bucket_vec(&self, input: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; self.buckets];
        self.bucket(input, &mut out);
        out
    }
}

fn compute_boundaries(input_size: usize, buckets: usize, f_min: f32, f_max: f32) -> Vec<usize> {
    let span_hz = f_max - f_min;
    let to_index = |f: f32| (((f - f_min) / span_hz) * input_size as f32).floor().max(0.0) as usize;
    let to_freq = |index: usize| f_min + span_hz * index as f32 / input_size as f32;

    let log_max = to_log_scale(f_max);
    let mut log_lo = to_log_scale(f_min);

    // Bucket index where the current evenly spaced segment starts. Bumped
    // every time a boundary has to be forced forward, so the remaining
    // buckets share what is left of the log span.
    let mut offset = 0;
    let mut last = 0;
    let mut boundaries = Vec::with_capacity(buckets.saturating_sub(1));

    for i in 1..buckets {
        let t = (i - offset) as f32 / (buckets - offset) as f32;
        let mut index = to_index(from_log_scale(log_lo + (log_max - log_lo) * t));

        if index <= last {
            index = last + 1;
            offset = i;
            log_lo = to_log_scale(to_freq(index));
        }

        // Leave one bin for each remaining bucket
        index = index.min(input_size - (buckets - i));

        boundaries.push(index);
        last = index;
    }

    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_input_averages_to_itself() {
        let bucketer = Bucketer::new(8, 4, 32.0, 12000.0).unwrap();
        let out = bucketer.bucket_vec(&[1.0; 8]);
        assert_eq!(out, vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_boundaries_strictly_increasing_in_range() {
        let bucketer = Bucketer::new(8, 4, 32.0, 12000.0).unwrap();
        let b = bucketer.boundaries();
        assert_eq!(b.len(), 3);
        assert!(b[0] > 0);
        assert!(b.windows(2).all(|w| w[0] < w[1]));
        assert!(*b.last().unwrap() < 8);
    }

    #[test]
    fn test_dense_low_end_is_forced_forward() {
        // Far more buckets than the low end can resolve
        let bucketer = Bucketer::new(64, 48, 20.0, 20000.0).unwrap();
        let b = bucketer.boundaries();
        assert_eq!(b.len(), 47);
        assert!(b.windows(2).all(|w| w[0] < w[1]));
        assert!(b[0] >= 1);
        assert!(*b.last().unwrap() < 64);
    }

    #[test]
    fn test_buckets_equal_input_size() {
        let bucketer = Bucketer::new(16, 16, 32.0, 12000.0).unwrap();
        assert_eq!(bucketer.boundaries(), (1..16).collect::<Vec<_>>().as_slice());

        let input: Vec<f32> = (0..16).map(|i| i as f32).collect();
        assert_eq!(bucketer.bucket_vec(&input), input);
    }

    #[test]
    fn test_high_buckets_are_wider() {
        let bucketer = Bucketer::new(1024, 16, 32.0, 12000.0).unwrap();
        let b = bucketer.boundaries();
        let first_width = b[0];
        let last_width = 1024 - b[b.len() - 1];
        assert!(last_width > first_width);
    }

    #[test]
    fn test_single_bucket_averages_everything() {
        let bucketer = Bucketer::new(4, 1, 32.0, 12000.0).unwrap();
        assert!(bucketer.boundaries().is_empty());
        assert_eq!(bucketer.bucket_vec(&[1.0, 2.0, 3.0, 6.0]), vec![3.0]);
    }

    #[test]
    fn test_rejects_invalid_sizes() {
        assert!(matches!(
            Bucketer::new(4, 5, 32.0, 12000.0),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            Bucketer::new(4, 0, 32.0, 12000.0),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(Bucketer::new(4, 2, 500.0, 100.0).is_err());
    }

    #[test]
    fn test_log_scale_inverse() {
        for &x in &[0.0f32, 1.0, 31.0, 1000.0] {
            assert!((from_log_scale(to_log_scale(x)) - x).abs() < 1e-2);
        }
    }
}

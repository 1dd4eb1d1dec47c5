//! Ring-buffered driver state read by renderers.

use serde::{Deserialize, Serialize};

/// Output state of the frequency processor
///
/// `amp` is a ring of `length` amplitude columns of `buckets` values each.
/// Columns are addressed relative to the newest write through
/// [`Drivers::column`]; the ring itself is never handed out mutably.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drivers {
    buckets: usize,
    length: usize,
    amp: Vec<Vec<f32>>,
    /// Per-bucket contrast scale
    pub scales: Vec<f32>,
    /// Per-bucket phase-like accumulator
    pub energy: Vec<f32>,
    /// Per-bucket differential
    pub diff: Vec<f32>,
    /// Per-column scalar summary, indexed like `amp`
    pub mean: Vec<f32>,
    column_index: usize,
}

impl Drivers {
    /// Create zeroed drivers (`scales` start at 1)
    pub fn new(buckets: usize, length: usize) -> Self {
        let length = length.max(1);
        Self {
            buckets,
            length,
            amp: vec![vec![0.0; buckets]; length],
            scales: vec![1.0; buckets],
            energy: vec![0.0; buckets],
            diff: vec![0.0; buckets],
            mean: vec![0.0; length],
            column_index: 0,
        }
    }

    /// Number of buckets per column
    pub fn buckets(&self) -> usize {
        self.buckets
    }

    /// Number of columns kept in the ring
    pub fn length(&self) -> usize {
        self.length
    }

    /// Ring slot of the newest column
    pub fn column_index(&self) -> usize {
        self.column_index
    }

    /// Advance the write pointer by one column
    pub fn increment_column_idx(&mut self) {
        self.column_index = (self.column_index + 1) % self.length;
    }

    /// Ring slot of the column written `k` frames ago (`k` modulo `length`)
    pub fn slot(&self, k: usize) -> usize {
        (self.column_index + self.length - k % self.length) % self.length
    }

    /// Amplitude column written `k` frames ago; `k = 0` is the newest
    pub fn column(&self, k: usize) -> &[f32] {
        &self.amp[self.slot(k)]
    }

    /// Scalar mean of the column written `k` frames ago
    pub fn column_mean(&self, k: usize) -> f32 {
        self.mean[self.slot(k)]
    }

    /// Raw ring slot access
    pub fn column_at(&self, slot: usize) -> &[f32] {
        &self.amp[slot % self.length]
    }

    pub(crate) fn current_column_mut(&mut self) -> &mut [f32] {
        &mut self.amp[self.column_index]
    }

    /// Owned copy with columns ordered newest first
    pub fn snapshot(&self) -> DriverSnapshot {
        DriverSnapshot {
            amp: (0..self.length).map(|k| self.column(k).to_vec()).collect(),
            mean: (0..self.length).map(|k| self.column_mean(k)).collect(),
            scales: self.scales.clone(),
            energy: self.energy.clone(),
            diff: self.diff.clone(),
        }
    }
}

/// Serialisable copy of [`Drivers`], history ordered newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSnapshot {
    /// Amplitude columns, `amp[0]` is the newest
    pub amp: Vec<Vec<f32>>,
    /// Column means, same order as `amp`
    pub mean: Vec<f32>,
    /// Per-bucket contrast scale
    pub scales: Vec<f32>,
    /// Per-bucket phase-like accumulator
    pub energy: Vec<f32>,
    /// Per-bucket differential
    pub diff: Vec<f32>,
}

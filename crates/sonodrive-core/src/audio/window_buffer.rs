//! Fixed-capacity circular sample buffer.

use crate::{CoreError, Result};

/// Circular float buffer holding the most recent `capacity` samples
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    /// Backing store
    data: Vec<f32>,
    /// Write position (next sample lands here)
    index: usize,
}

impl WindowBuffer {
    /// Create a zero-filled buffer
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity],
            index: 0,
        }
    }

    /// Maximum number of samples retained
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Append a chunk, overwriting the oldest samples
    pub fn push(&mut self, chunk: &[f32]) -> Result<()> {
        let capacity = self.capacity();
        if chunk.len() > capacity {
            return Err(CoreError::InvalidArgument(format!(
                "chunk of {} samples exceeds window capacity {}",
                chunk.len(),
                capacity
            )));
        }
        if chunk.is_empty() {
            return Ok(());
        }

        let head = (capacity - self.index).min(chunk.len());
        self.data[self.index..self.index + head].copy_from_slice(&chunk[..head]);
        self.data[..chunk.len() - head].copy_from_slice(&chunk[head..]);

        self.index = (self.index + chunk.len()) % capacity;
        Ok(())
    }

    /// Copy the most recent `out.len()` samples into `out`, oldest first
    pub fn read_latest(&self, out: &mut [f32]) -> Result<()> {
        let capacity = self.capacity();
        let n = out.len();
        if n > capacity {
            return Err(CoreError::InvalidArgument(format!(
                "requested {} samples from window of capacity {}",
                n, capacity
            )));
        }
        if n == 0 {
            return Ok(());
        }

        let start = (self.index + capacity - n) % capacity;
        let head = (capacity - start).min(n);
        out[..head].copy_from_slice(&self.data[start..start + head]);
        out[head..].copy_from_slice(&self.data[..n - head]);
        Ok(())
    }

    /// Most recent `n` samples in chronological order
    pub fn get(&self, n: usize) -> Result<Vec<f32>> {
        let mut out = vec![0.0; n];
        self.read_latest(&mut out)?;
        Ok(out)
    }
}

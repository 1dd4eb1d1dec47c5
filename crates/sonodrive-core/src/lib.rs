//! Sonodrive Core - Audio Driver Extraction
//!
//! This crate turns a stream of raw microphone samples into a compact set of
//! smoothly varying "driver" signals for audio-reactive renderers:
//! - Circular sample windowing and spectral framing
//! - Logarithmic frequency bucketing
//! - Adaptive filtering, automatic gain control and cross-bucket sync
//! - Parameter snapshots, typed updates and versioned settings export

#![warn(missing_docs)]

use thiserror::Error;

pub mod audio;
pub mod config;
pub mod logging;
pub mod params;
pub mod settings;

// --- Re-exports grouped by category ---

// Audio pipeline
pub use audio::{
    AudioProcessor, BiasedFilter, Bucketer, DriverSnapshot, Drivers, Filter, FrequencyProcessor,
    GainController, RustFftTransform, SlidingFft, SpectralTransform, WindowBuffer,
};

// Parameters & Configuration
pub use config::{AnalysisConfig, PipelineConfig};
pub use logging::LogConfig;
pub use params::{AudioProcessorParams, FilterParams, FilterSlot, ParamUpdate, ScalarParam};

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// A size or dimension exceeds what the receiver can hold
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Settings were exported by an unknown format version
    #[error("Unsupported settings version: {0}")]
    UnsupportedVersion(String),

    /// Settings array is malformed
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Named parameter update with an unknown field name
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON deserialization error
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("RON serialize error: {0}")]
    RonSerialize(#[from] ron::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

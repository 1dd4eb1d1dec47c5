//! Audio analysis pipeline.
//!
//! Data flows one way per tick:
//! raw frame -> [`SlidingFft`] -> [`Bucketer`] -> [`FrequencyProcessor`] -> [`Drivers`].

pub mod audio_processor;
pub mod bucketer;
pub mod drivers;
pub mod filter;
pub mod frequency_processor;
pub mod gain_controller;
pub mod sliding_fft;
pub mod window_buffer;

pub use audio_processor::AudioProcessor;
pub use bucketer::Bucketer;
pub use drivers::{DriverSnapshot, Drivers};
pub use filter::{BiasedFilter, Filter};
pub use frequency_processor::FrequencyProcessor;
pub use gain_controller::GainController;
pub use sliding_fft::{RustFftTransform, SlidingFft, SpectralTransform};
pub use window_buffer::WindowBuffer;

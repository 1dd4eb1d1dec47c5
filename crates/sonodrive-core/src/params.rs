//! Tunable parameters and typed updates.
//!
//! [`AudioProcessorParams`] is an immutable snapshot; updates produce a new
//! snapshot that replaces the old one wholesale.

use crate::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic description of a single-pole filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Time constant in frames
    pub tao: f32,
    /// Steady-state gain
    pub gain: f32,
}

impl FilterParams {
    /// Create filter parameters
    pub const fn new(tao: f32, gain: f32) -> Self {
        Self { tao, gain }
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

/// All tunables of the audio pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioProcessorParams {
    /// High-frequency boost, applied linearly across bucket index
    pub preemphasis: f32,
    /// Amplitude smoothing
    pub gain_filter: FilterParams,
    /// Slow counter-bias on amplitude (usually negative gain)
    pub gain_feedback: FilterParams,
    /// Differential smoothing
    pub diff_filter: FilterParams,
    /// Slow counter-bias on the differential
    pub diff_feedback: FilterParams,
    /// Scale smoothing while the scaled value falls
    pub pos_scale: FilterParams,
    /// Scale smoothing while the scaled value rises
    pub neg_scale: FilterParams,
    /// Differential output gain
    pub diff_gain: f32,
    /// Amplitude output gain
    pub amp_scale: f32,
    /// Amplitude output offset
    pub amp_offset: f32,
    /// Energy coupling strength between buckets
    pub sync: f32,
    /// Fraction of energy leaked per frame
    pub decay: f32,
    /// Differential to energy coupling
    pub accum: f32,
    /// Constant energy drift per frame
    pub drag: f32,
    /// Bucketed frames averaged per processed frame
    pub decimation: u32,
}

impl Default for AudioProcessorParams {
    fn default() -> Self {
        Self {
            preemphasis: 2.0,
            gain_filter: FilterParams::new(2.0, 1.0),
            gain_feedback: FilterParams::new(100.0, -0.75),
            diff_filter: FilterParams::new(4.0, 1.0),
            diff_feedback: FilterParams::new(48.0, -0.5),
            pos_scale: FilterParams::new(128.0, 1.0),
            neg_scale: FilterParams::new(8.0, 1.0),
            diff_gain: 1.0,
            amp_scale: 4.0,
            amp_offset: 1.0,
            sync: 0.01,
            decay: 0.0005,
            accum: 1.0,
            drag: 0.0002,
            decimation: 1,
        }
    }
}

impl AudioProcessorParams {
    /// Filter parameters for `slot`
    pub fn filter(&self, slot: FilterSlot) -> FilterParams {
        match slot {
            FilterSlot::GainFilter => self.gain_filter,
            FilterSlot::GainFeedback => self.gain_feedback,
            FilterSlot::DiffFilter => self.diff_filter,
            FilterSlot::DiffFeedback => self.diff_feedback,
            FilterSlot::PosScale => self.pos_scale,
            FilterSlot::NegScale => self.neg_scale,
        }
    }

    /// Scalar value for `param`
    pub fn scalar(&self, param: ScalarParam) -> f32 {
        match param {
            ScalarParam::Preemphasis => self.preemphasis,
            ScalarParam::DiffGain => self.diff_gain,
            ScalarParam::AmpScale => self.amp_scale,
            ScalarParam::AmpOffset => self.amp_offset,
            ScalarParam::Sync => self.sync,
            ScalarParam::Decay => self.decay,
            ScalarParam::Accum => self.accum,
            ScalarParam::Drag => self.drag,
        }
    }

    /// Snapshot with `update` applied
    pub fn apply(&self, update: ParamUpdate) -> Self {
        let mut next = *self;
        match update {
            ParamUpdate::All(params) => next = params,
            ParamUpdate::Decimation(d) => next.decimation = d.max(1),
            ParamUpdate::Filter(slot, params) => {
                let target = match slot {
                    FilterSlot::GainFilter => &mut next.gain_filter,
                    FilterSlot::GainFeedback => &mut next.gain_feedback,
                    FilterSlot::DiffFilter => &mut next.diff_filter,
                    FilterSlot::DiffFeedback => &mut next.diff_feedback,
                    FilterSlot::PosScale => &mut next.pos_scale,
                    FilterSlot::NegScale => &mut next.neg_scale,
                };
                *target = params;
            }
            ParamUpdate::Scalar(param, value) => {
                let target = match param {
                    ScalarParam::Preemphasis => &mut next.preemphasis,
                    ScalarParam::DiffGain => &mut next.diff_gain,
                    ScalarParam::AmpScale => &mut next.amp_scale,
                    ScalarParam::AmpOffset => &mut next.amp_offset,
                    ScalarParam::Sync => &mut next.sync,
                    ScalarParam::Decay => &mut next.decay,
                    ScalarParam::Accum => &mut next.accum,
                    ScalarParam::Drag => &mut next.drag,
                };
                *target = value;
            }
        }
        next
    }
}

/// Scalar tunables addressable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarParam {
    /// `preemphasis`
    Preemphasis,
    /// `diff_gain`
    DiffGain,
    /// `amp_scale`
    AmpScale,
    /// `amp_offset`
    AmpOffset,
    /// `sync`
    Sync,
    /// `decay`
    Decay,
    /// `accum`
    Accum,
    /// `drag`
    Drag,
}

impl ScalarParam {
    /// All scalar parameters
    pub const ALL: [ScalarParam; 8] = [
        Self::Preemphasis,
        Self::DiffGain,
        Self::AmpScale,
        Self::AmpOffset,
        Self::Sync,
        Self::Decay,
        Self::Accum,
        Self::Drag,
    ];

    /// Field name
    pub fn name(self) -> &'static str {
        match self {
            Self::Preemphasis => "preemphasis",
            Self::DiffGain => "diff_gain",
            Self::AmpScale => "amp_scale",
            Self::AmpOffset => "amp_offset",
            Self::Sync => "sync",
            Self::Decay => "decay",
            Self::Accum => "accum",
            Self::Drag => "drag",
        }
    }
}

impl fmt::Display for ScalarParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ScalarParam {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| CoreError::UnknownParameter(s.to_string()))
    }
}

/// Filter slots addressable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterSlot {
    /// `gain_filter`
    GainFilter,
    /// `gain_feedback`
    GainFeedback,
    /// `diff_filter`
    DiffFilter,
    /// `diff_feedback`
    DiffFeedback,
    /// `pos_scale`
    PosScale,
    /// `neg_scale`
    NegScale,
}

impl FilterSlot {
    /// All filter slots, in settings export order
    pub const ALL: [FilterSlot; 6] = [
        Self::GainFilter,
        Self::GainFeedback,
        Self::DiffFilter,
        Self::DiffFeedback,
        Self::PosScale,
        Self::NegScale,
    ];

    /// Field name
    pub fn name(self) -> &'static str {
        match self {
            Self::GainFilter => "gain_filter",
            Self::GainFeedback => "gain_feedback",
            Self::DiffFilter => "diff_filter",
            Self::DiffFeedback => "diff_feedback",
            Self::PosScale => "pos_scale",
            Self::NegScale => "neg_scale",
        }
    }
}

impl fmt::Display for FilterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FilterSlot {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| CoreError::UnknownParameter(s.to_string()))
    }
}

/// A single typed parameter change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamUpdate {
    /// Set one scalar tunable
    Scalar(ScalarParam, f32),
    /// Replace one filter's parameters
    Filter(FilterSlot, FilterParams),
    /// Change the decimation factor (discards driver history)
    Decimation(u32),
    /// Replace every tunable
    All(AudioProcessorParams),
}

impl ParamUpdate {
    /// Resolve a named scalar field into a typed update
    ///
    /// Accepts every scalar name plus `decimation` (rounded, at least 1).
    pub fn named(name: &str, value: f32) -> Result<Self> {
        if name == "decimation" {
            return Ok(Self::Decimation(value.round().max(1.0) as u32));
        }
        Ok(Self::Scalar(name.parse()?, value))
    }

    /// Resolve a named filter field into a typed update
    pub fn named_filter(name: &str, params: FilterParams) -> Result<Self> {
        Ok(Self::Filter(name.parse()?, params))
    }

    /// Whether applying this update discards driver history
    pub fn resets_history(&self, current: &AudioProcessorParams) -> bool {
        match self {
            Self::Decimation(d) => (*d).max(1) != current.decimation,
            Self::All(params) => params.decimation != current.decimation,
            _ => false,
        }
    }
}

//! Versioned flat-array settings export.
//!
//! Parameters are shared as a compact JSON array: a version tag followed by
//! every tunable as a number, e.g. `["v0.1", 2.0, 2.0, 1.0, ...]`. Fields
//! appended in later revisions fall back to their defaults when absent.

use crate::params::{AudioProcessorParams, FilterParams, FilterSlot};
use crate::{CoreError, Result};
use serde_json::Value;
use tracing::warn;

/// Current export version tag
pub const SETTINGS_VERSION: &str = "v0.1";

/// Number of numeric fields in a complete export
pub const FIELD_COUNT: usize = 21;

/// Fields every export must carry (everything up to and including `decay`)
pub const REQUIRED_FIELDS: usize = 18;

const DEFAULT_ACCUM: f32 = 1.0;
const DEFAULT_DRAG: f32 = 0.0002;
const DEFAULT_DECIMATION: u32 = 1;

/// Flatten `params` into the export order (without the version tag)
pub fn to_fields(params: &AudioProcessorParams) -> Vec<f32> {
    let mut fields = Vec::with_capacity(FIELD_COUNT);
    fields.push(params.preemphasis);
    for slot in FilterSlot::ALL {
        let f = params.filter(slot);
        fields.push(f.tao);
        fields.push(f.gain);
    }
    fields.extend_from_slice(&[
        params.diff_gain,
        params.amp_scale,
        params.amp_offset,
        params.sync,
        params.decay,
        params.accum,
        params.drag,
        params.decimation as f32,
    ]);
    fields
}

/// Rebuild parameters from export-ordered fields
pub fn from_fields(fields: &[f32]) -> Result<AudioProcessorParams> {
    if fields.len() < REQUIRED_FIELDS || fields.len() > FIELD_COUNT {
        return Err(CoreError::InvalidSettings(format!(
            "expected {}..={} values, got {}",
            REQUIRED_FIELDS,
            FIELD_COUNT,
            fields.len()
        )));
    }

    let filter = |slot: usize| FilterParams::new(fields[1 + 2 * slot], fields[2 + 2 * slot]);

    Ok(AudioProcessorParams {
        preemphasis: fields[0],
        gain_filter: filter(0),
        gain_feedback: filter(1),
        diff_filter: filter(2),
        diff_feedback: filter(3),
        pos_scale: filter(4),
        neg_scale: filter(5),
        diff_gain: fields[13],
        amp_scale: fields[14],
        amp_offset: fields[15],
        sync: fields[16],
        decay: fields[17],
        accum: fields.get(18).copied().unwrap_or(DEFAULT_ACCUM),
        drag: fields.get(19).copied().unwrap_or(DEFAULT_DRAG),
        decimation: fields
            .get(20)
            .map(|d| d.round().max(1.0) as u32)
            .unwrap_or(DEFAULT_DECIMATION),
    })
}

/// Export `params` as `["v0.1", ...]`
pub fn export(params: &AudioProcessorParams) -> Value {
    let mut items = Vec::with_capacity(FIELD_COUNT + 1);
    items.push(Value::from(SETTINGS_VERSION));
    items.extend(to_fields(params).into_iter().map(|v| Value::from(v as f64)));
    Value::Array(items)
}

/// Export `params` as a compact JSON string
pub fn export_string(params: &AudioProcessorParams) -> String {
    export(params).to_string()
}

/// Import parameters from an exported array
pub fn import(value: &Value) -> Result<AudioProcessorParams> {
    let items = value
        .as_array()
        .ok_or_else(|| CoreError::InvalidSettings("settings must be an array".to_string()))?;

    let version = match items.first() {
        Some(Value::String(v)) => v.as_str(),
        Some(other) => {
            warn!("Rejecting settings without version tag: {}", other);
            return Err(CoreError::UnsupportedVersion(other.to_string()));
        }
        None => return Err(CoreError::InvalidSettings("settings are empty".to_string())),
    };

    if version != SETTINGS_VERSION {
        warn!("Rejecting settings with version {}", version);
        return Err(CoreError::UnsupportedVersion(version.to_string()));
    }

    let fields = items[1..]
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                CoreError::InvalidSettings(format!("value #{} is not a number: {}", i, v))
            })
        })
        .collect::<Result<Vec<f32>>>()?;

    from_fields(&fields)
}

/// Import parameters from a JSON string
pub fn import_str(s: &str) -> Result<AudioProcessorParams> {
    let value: Value = serde_json::from_str(s)?;
    import(&value)
}

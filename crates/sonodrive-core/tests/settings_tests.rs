use sonodrive_core::params::{FilterSlot, ScalarParam};
use sonodrive_core::settings::{self, FIELD_COUNT, SETTINGS_VERSION};
use sonodrive_core::{AudioProcessorParams, CoreError, FilterParams, ParamUpdate};

#[test]
fn test_export_import_string() {
    let params = AudioProcessorParams::default()
        .apply(ParamUpdate::Scalar(ScalarParam::AmpScale, 2.5))
        .apply(ParamUpdate::Filter(
            FilterSlot::NegScale,
            FilterParams::new(3.0, 0.5),
        ))
        .apply(ParamUpdate::Decimation(2));

    let exported = settings::export_string(&params);
    assert!(exported.starts_with(&format!("[\"{}\"", SETTINGS_VERSION)));

    let imported = settings::import_str(&exported).unwrap();
    assert_eq!(imported, params);
}

#[test]
fn test_field_order_is_stable() {
    let params = AudioProcessorParams {
        preemphasis: 1.5,
        gain_filter: FilterParams::new(11.0, 12.0),
        neg_scale: FilterParams::new(61.0, 62.0),
        diff_gain: 13.0,
        drag: 20.0,
        decimation: 21,
        ..Default::default()
    };
    let fields = settings::to_fields(&params);

    assert_eq!(fields.len(), FIELD_COUNT);
    assert_eq!(fields[0], 1.5);
    assert_eq!(&fields[1..3], &[11.0, 12.0]);
    assert_eq!(&fields[11..13], &[61.0, 62.0]);
    assert_eq!(fields[13], 13.0);
    assert_eq!(fields[19], 20.0);
    assert_eq!(fields[20], 21.0);
}

#[test]
fn test_import_older_export_without_late_fields() {
    let mut fields = settings::to_fields(&AudioProcessorParams::default());
    fields.truncate(18);

    let mut items = vec![serde_json::json!("v0.1")];
    items.extend(fields.iter().map(|&f| serde_json::json!(f)));
    let params = settings::import(&serde_json::Value::Array(items)).unwrap();

    assert_eq!(params.accum, 1.0);
    assert_eq!(params.drag, 0.0002);
    assert_eq!(params.decimation, 1);
    assert_eq!(params.preemphasis, AudioProcessorParams::default().preemphasis);
}

#[test]
fn test_foreign_version_is_reported() {
    let err = settings::import_str(r#"["v9.9", 1, 2, 3]"#).unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedVersion(ref v) if v == "v9.9"));
    assert!(err.to_string().contains("v9.9"));
}

#[test]
fn test_not_json_fails() {
    assert!(matches!(
        settings::import_str("v0.1,1,2"),
        Err(CoreError::Json(_))
    ));
}

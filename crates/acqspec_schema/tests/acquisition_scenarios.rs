//! End-to-end editing scenarios over an in-memory row source.

use acqspec_schema::{
    apply_script, parse_script, BuilderError, ConstraintKind, ConstraintValue, EditTarget,
    InMemoryRowSource, RecordingNotifier, SchemaBuilder, SchemaDocument, SchemaSession,
    ValidationError,
};
use serde_json::json;

fn records() -> InMemoryRowSource {
    let json = json!([
        {"ProtocolName": "T1w", "FlipAngle": 9, "EchoTime": 3.25, "SeriesDescription": "T1 MPRAGE"},
        {"ProtocolName": "T1w", "FlipAngle": 9, "EchoTime": 4.5, "SeriesDescription": "T1 MPRAGE"},
        {"ProtocolName": "T1w", "FlipAngle": 9, "EchoTime": 4.5, "SeriesDescription": "T1 MPRAGE"},
        {"ProtocolName": "FLAIR", "FlipAngle": 120, "EchoTime": 80, "SeriesDescription": "FLAIR"},
    ]);
    InMemoryRowSource::from_json("ProtocolName", &json.to_string()).unwrap()
}

fn initialized(fields: &[&str]) -> SchemaBuilder {
    let mut builder = SchemaBuilder::new("T1w");
    for field in fields {
        builder.select_field(*field).unwrap();
    }
    builder.finish_selection(&records()).unwrap();
    builder
}

#[test]
fn test_initialization_splits_constant_and_variable() {
    let builder = initialized(&["FlipAngle", "EchoTime"]);

    let constant = builder.constant().records();
    assert_eq!(constant.len(), 1);
    assert_eq!(constant[0].name, "FlipAngle");
    assert_eq!(constant[0].value, ConstraintValue::exact("9"));

    let rows = builder.variable().rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].series, 1);
    assert_eq!(rows[0].get("EchoTime"), Some(&ConstraintValue::exact("3.25")));
    assert_eq!(rows[1].series, 2);
    assert_eq!(rows[1].get("EchoTime"), Some(&ConstraintValue::exact("4.5")));
    assert!(builder.verify().is_ok());
}

#[test]
fn test_initialization_is_lossless() {
    let builder = initialized(&["FlipAngle", "EchoTime", "SeriesDescription"]);
    let expanded = builder.schema().expanded_rows();
    assert_eq!(expanded.len(), 2);
    for (cells, echo) in expanded.iter().zip(["3.25", "4.5"]) {
        assert_eq!(cells["FlipAngle"], ConstraintValue::exact("9"));
        assert_eq!(cells["SeriesDescription"], ConstraintValue::exact("T1 MPRAGE"));
        assert_eq!(cells["EchoTime"], ConstraintValue::exact(echo));
    }
}

#[test]
fn test_missing_field_fails_selection() {
    let mut builder = SchemaBuilder::new("T1w");
    builder.select_field("SliceTiming").unwrap();
    assert!(matches!(
        builder.finish_selection(&records()),
        Err(BuilderError::Source(_))
    ));
}

#[test]
fn test_demote_then_promote_collapses_rows() {
    let mut builder = initialized(&["FlipAngle", "EchoTime"]);
    let notifier = RecordingNotifier::new();

    assert!(matches!(
        builder.demote_by_name("FlipAngle"),
        Err(BuilderError::NotEditing)
    ));
    builder.start_editing().unwrap();
    builder.demote_by_name("FlipAngle").unwrap();
    assert!(builder.constant().is_empty());
    assert_eq!(builder.variable().len(), 2);

    builder.promote("EchoTime").unwrap();
    let constant = builder.constant().records();
    assert_eq!(constant.len(), 1);
    assert_eq!(constant[0].name, "EchoTime");
    assert_eq!(constant[0].value, ConstraintValue::exact("3.25"));

    let rows = builder.variable().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].series, 1);
    assert_eq!(rows[0].get("FlipAngle"), Some(&ConstraintValue::exact("9")));
    builder.finish_editing(&notifier).unwrap();
    assert!(builder.verify().is_ok());
}

#[test]
fn test_empty_name_commit_is_rejected() {
    let mut builder = initialized(&["FlipAngle", "EchoTime"]);
    let notifier = RecordingNotifier::new();
    let before = builder.constant().clone();
    let id = before.records()[0].id.clone();

    builder.start_editing().unwrap();
    builder.open_field_edit(&id).unwrap();
    builder.rename_field(&id, "").unwrap();
    let err = builder.commit_field(&id, &notifier).unwrap_err();

    assert!(matches!(err, BuilderError::Validation(ValidationError::EmptyName)));
    assert_eq!(builder.constant(), &before);
    assert!(builder.is_open(&EditTarget::Field(id)));
    assert_eq!(notifier.len(), 1);
    assert_eq!(notifier.last().unwrap().title, "Invalid field name");
}

#[test]
fn test_loosen_constraints_and_export() {
    let mut builder = initialized(&["FlipAngle", "EchoTime"]);
    let notifier = RecordingNotifier::new();
    builder.start_editing().unwrap();

    let flip = builder.constant().records()[0].id.clone();
    builder.open_field_edit(&flip).unwrap();
    builder.set_field_kind(&flip, ConstraintKind::Tolerance).unwrap();
    builder
        .set_field_value(&flip, acqspec_schema::SubField::Tolerance, "1")
        .unwrap();

    let second = builder.variable().rows()[1].id.clone();
    builder.open_row_edit(&second).unwrap();
    builder
        .set_cell_kind(&second, "EchoTime", ConstraintKind::Range)
        .unwrap();
    builder
        .set_cell_value(&second, "EchoTime", acqspec_schema::SubField::Min, "4")
        .unwrap();
    builder
        .set_cell_value(&second, "EchoTime", acqspec_schema::SubField::Max, "5")
        .unwrap();

    builder.finish_editing(&notifier).unwrap();
    assert!(notifier.is_empty());

    let mut session = SchemaSession::new();
    session.add(builder);
    let document = session.finalize().unwrap();
    let value = serde_json::to_value(&document).unwrap();
    let t1w = &value["acquisitions"]["T1w"];
    assert_eq!(t1w["fields"][0], json!({"field": "FlipAngle", "value": "9", "tolerance": "1"}));
    assert_eq!(
        t1w["series"][1],
        json!({"name": "Series 2", "fields": [{"field": "EchoTime", "min": "4", "max": "5"}]})
    );

    let reloaded = SchemaDocument::from_json(&document.to_json().unwrap()).unwrap();
    assert!(reloaded.hash_matches());
}

#[test]
fn test_scripted_edits_over_reloaded_document() {
    let mut session = SchemaSession::new();
    session.add(initialized(&["FlipAngle", "EchoTime"]));
    let document = session.finalize().unwrap();

    let mut session = SchemaSession::from_document(&document).unwrap();
    let builder = session.find_by_title_mut("T1w").unwrap();
    let script = parse_script(
        r#"[
            {"action": "start_editing"},
            {"action": "add_series"},
            {"action": "set_cell_value", "series": 3, "field": "EchoTime", "sub": "value", "value": "6"},
            {"action": "relabel", "series": 1, "to": 4},
            {"action": "finish_editing"},
            {"action": "set_description", "description": "Structural"}
        ]"#,
    )
    .unwrap();
    apply_script(builder, &script, &RecordingNotifier::new()).unwrap();

    let echoes: Vec<String> = builder
        .variable()
        .iter()
        .map(|r| r.get("EchoTime").unwrap().to_string())
        .collect();
    assert_eq!(echoes, vec!["4.5", "6", "3.25"]);
    assert!(builder.verify().is_ok());

    let document = session.finalize().unwrap();
    assert_eq!(document.acquisitions["T1w"].description, "Structural");
    assert_eq!(document.acquisitions["T1w"].series.len(), 3);
}

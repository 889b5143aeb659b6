//! Property tests for the schema invariants.
//!
//! Random distinct-row sets are fed through initialization, then random
//! sequences of structural operations; every intermediate state must keep
//! series labels contiguous, rows unique, and constant names unique.
//! Dedup idempotence over tables with real duplicates lives next to
//! `VariableTable` since those tables cannot be built through the public API.

use acqspec_schema::{
    partition, ConstraintValue, RawRow, RecordingNotifier, SchemaBuilder, SubField, VariableTable,
};
use proptest::prelude::*;
use std::collections::HashSet;

const FIELDS: [&str; 4] = ["FlipAngle", "EchoTime", "RepetitionTime", "SliceThickness"];

#[derive(Debug, Clone)]
enum Op {
    Promote(usize),
    Demote(usize),
    DeleteColumn(usize),
    DeleteRow(usize),
    AddRow(Vec<u8>),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize).prop_map(Op::Promote),
        (0..4usize).prop_map(Op::Demote),
        (0..4usize).prop_map(Op::DeleteColumn),
        (0..8usize).prop_map(Op::DeleteRow),
        prop::collection::vec(0..3u8, 4).prop_map(Op::AddRow),
    ]
}

fn rows_strategy() -> impl Strategy<Value = Vec<RawRow>> {
    prop::collection::vec(prop::collection::vec(0..3u8, 4), 0..8).prop_map(|rows| {
        let mut seen = HashSet::new();
        rows.into_iter()
            .filter(|values| seen.insert(values.clone()))
            .map(|values| {
                FIELDS
                    .iter()
                    .zip(values)
                    .map(|(f, v)| (f.to_string(), serde_json::json!(v)))
                    .collect()
            })
            .collect()
    })
}

fn fields() -> Vec<String> {
    FIELDS.iter().map(|f| f.to_string()).collect()
}

fn builder_for(rows: &[RawRow]) -> SchemaBuilder {
    let mut builder = SchemaBuilder::new("T1w");
    for field in FIELDS {
        builder.select_field(field).unwrap();
    }
    builder.finish_selection_with_rows(rows).unwrap();
    builder
}

fn assert_contiguous(table: &VariableTable) {
    let labels: Vec<u32> = table.iter().map(|r| r.series).collect();
    let expected: Vec<u32> = (1..=table.len() as u32).collect();
    assert_eq!(labels, expected);
}

fn apply(builder: &mut SchemaBuilder, op: &Op) {
    let notifier = RecordingNotifier::new();
    builder.start_editing().unwrap();
    match op {
        Op::Promote(i) => {
            let _ = builder.promote(FIELDS[*i]);
        }
        Op::Demote(i) => {
            let _ = builder.demote_by_name(FIELDS[*i]);
        }
        Op::DeleteColumn(i) => {
            let _ = builder.delete_variable_column(FIELDS[*i]);
        }
        Op::DeleteRow(i) => {
            if let Some(id) = builder.variable().rows().get(*i).map(|r| r.id.clone()) {
                builder.delete_series_row(&id).unwrap();
            }
        }
        Op::AddRow(values) => {
            let id = builder.add_series_row().unwrap();
            let columns = builder.variable().columns().to_vec();
            for (column, value) in columns.iter().zip(values) {
                builder
                    .set_cell_value(&id, column, SubField::Value, value.to_string())
                    .unwrap();
            }
            if builder.commit_row(&id, &notifier).is_err() {
                builder.cancel(&acqspec_schema::EditTarget::Row(id)).unwrap();
            }
        }
    }
    builder.finish_editing(&notifier).unwrap();
}

proptest! {
    #[test]
    fn prop_initialization_reconstructs_rows(rows in rows_strategy()) {
        let builder = builder_for(&rows);
        prop_assert!(builder.verify().is_ok());

        let expanded = builder.schema().expanded_rows();
        prop_assert_eq!(expanded.len(), rows.len());
        for (cells, raw) in expanded.iter().zip(&rows) {
            for field in FIELDS {
                let expected = ConstraintValue::exact(raw[field].to_string());
                prop_assert_eq!(&cells[field], &expected);
            }
        }
    }

    #[test]
    fn prop_invariants_hold_after_operations(
        rows in rows_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..12),
    ) {
        let mut builder = builder_for(&rows);
        for op in &ops {
            apply(&mut builder, op);
            prop_assert!(builder.verify().is_ok(), "invariant broken after {:?}", op);
            assert_contiguous(builder.variable());

            let keys: HashSet<_> = builder.variable().iter().map(|r| r.canonical_key()).collect();
            prop_assert_eq!(keys.len(), builder.variable().len());

            let names: HashSet<&str> = builder.constant().iter().map(|r| r.name.as_str()).collect();
            prop_assert_eq!(names.len(), builder.constant().len());
        }
    }

    #[test]
    fn prop_promotion_is_deterministic(rows in rows_strategy(), field in 0..4usize) {
        let mut first = builder_for(&rows);
        let mut second = builder_for(&rows);
        first.start_editing().unwrap();
        second.start_editing().unwrap();
        let a = first.promote(FIELDS[field]).is_ok();
        let b = second.promote(FIELDS[field]).is_ok();
        prop_assert_eq!(a, b);
        prop_assert_eq!(first.schema().expanded_rows(), second.schema().expanded_rows());
        prop_assert_eq!(
            first.schema().constant_value(FIELDS[field]),
            second.schema().constant_value(FIELDS[field])
        );
    }

    #[test]
    fn prop_partition_constants_are_uniform(rows in rows_strategy()) {
        let (constant, variable) = partition(&fields(), &rows);
        for record in constant.iter() {
            for raw in &rows {
                prop_assert_eq!(
                    &record.value,
                    &ConstraintValue::exact(raw[record.name.as_str()].to_string())
                );
            }
        }
        for column in variable.columns() {
            prop_assert!(constant.find_by_name(column).is_none());
        }
    }
}

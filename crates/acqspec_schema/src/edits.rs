//! Scripted edits.
//!
//! An [`EditAction`] is one discrete user action (what a click or keystroke
//! in an editor would do), addressed by field name and series label rather
//! than by id so scripts stay readable and survive a reload.
//!
//! ```json
//! [
//!   {"action": "start_editing"},
//!   {"action": "set_field_kind", "field": "FlipAngle", "kind": "range"},
//!   {"action": "set_field_value", "field": "FlipAngle", "sub": "min", "value": "8"},
//!   {"action": "set_field_value", "field": "FlipAngle", "sub": "max", "value": "10"},
//!   {"action": "promote", "field": "EchoTime"},
//!   {"action": "finish_editing"}
//! ]
//! ```
//!
//! Setter actions open the target for editing when it is not already open.

use crate::builder::{BuilderError, SchemaBuilder};
use crate::constraint::{ConstraintKind, SubField};
use crate::draft::EditTarget;
use crate::notify::Notifier;
use acqspec_ids::{FieldId, RowId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Failure of a single [`EditAction`].
#[derive(Debug, Error)]
pub enum EditActionError {
    #[error("No constant field named '{0}'")]
    UnknownField(String),

    #[error("No row labelled Series {0}")]
    UnknownSeries(u32),

    #[error("A {kind} constraint has no '{sub}' part")]
    InapplicableSubField { sub: SubField, kind: ConstraintKind },

    #[error(transparent)]
    Builder(#[from] BuilderError),
}

/// Failure of a script, with the zero-based index of the failing action.
#[derive(Debug, Error)]
#[error("Edit step {step} ({action}) failed: {source}")]
pub struct ScriptError {
    pub step: usize,
    pub action: &'static str,
    #[source]
    pub source: EditActionError,
}

/// Which entity a commit or cancel applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum ActionTarget {
    Field { field: String },
    Series { series: u32 },
}

/// One discrete edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditAction {
    SetTitle { title: String },
    SetDescription { description: String },

    StartEditing,
    FinishEditing,

    /// Add a constant field and name its draft
    AddField { name: String },
    /// Add a blank series row labelled N+1
    AddSeries,

    RenameField { field: String, name: String },
    SetFieldKind { field: String, kind: ConstraintKind },
    SetFieldValue { field: String, sub: SubField, value: String },

    SetCellKind { series: u32, field: String, kind: ConstraintKind },
    SetCellValue { series: u32, field: String, sub: SubField, value: String },
    /// Relabel a row to an unused label; on commit the row moves to the end
    Relabel { series: u32, to: u32 },

    Commit(ActionTarget),
    Cancel(ActionTarget),

    DeleteField { field: String },
    DeleteSeries { series: u32 },
    DeleteVariable { field: String },

    Promote { field: String },
    Demote { field: String },
}

impl EditAction {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            EditAction::SetTitle { .. } => "set_title",
            EditAction::SetDescription { .. } => "set_description",
            EditAction::StartEditing => "start_editing",
            EditAction::FinishEditing => "finish_editing",
            EditAction::AddField { .. } => "add_field",
            EditAction::AddSeries => "add_series",
            EditAction::RenameField { .. } => "rename_field",
            EditAction::SetFieldKind { .. } => "set_field_kind",
            EditAction::SetFieldValue { .. } => "set_field_value",
            EditAction::SetCellKind { .. } => "set_cell_kind",
            EditAction::SetCellValue { .. } => "set_cell_value",
            EditAction::Relabel { .. } => "relabel",
            EditAction::Commit(_) => "commit",
            EditAction::Cancel(_) => "cancel",
            EditAction::DeleteField { .. } => "delete_field",
            EditAction::DeleteSeries { .. } => "delete_series",
            EditAction::DeleteVariable { .. } => "delete_variable",
            EditAction::Promote { .. } => "promote",
            EditAction::Demote { .. } => "demote",
        }
    }

    /// Apply this action to `builder`. Rejected commits are reported through
    /// `notifier` and leave the edit open.
    pub fn apply(&self, builder: &mut SchemaBuilder, notifier: &dyn Notifier) -> Result<(), EditActionError> {
        debug!(acquisition = %builder.source_key(), action = self.name(), "applying edit");
        match self {
            EditAction::SetTitle { title } => builder.set_title(title.clone()),
            EditAction::SetDescription { description } => builder.set_description(description.clone()),
            EditAction::StartEditing => builder.start_editing()?,
            EditAction::FinishEditing => builder.finish_editing(notifier)?,
            EditAction::AddField { name } => {
                let id = builder.add_constant_field()?;
                builder.rename_field(&id, name.clone())?;
            }
            EditAction::AddSeries => {
                builder.add_series_row()?;
            }
            EditAction::RenameField { field, name } => {
                let id = open_field(builder, field)?;
                builder.rename_field(&id, name.clone())?;
            }
            EditAction::SetFieldKind { field, kind } => {
                let id = open_field(builder, field)?;
                builder.set_field_kind(&id, *kind)?;
            }
            EditAction::SetFieldValue { field, sub, value } => {
                let id = open_field(builder, field)?;
                if !builder.set_field_value(&id, *sub, value.clone())? {
                    let kind = builder
                        .field_draft(&id)
                        .map(|d| d.value.kind())
                        .unwrap_or(ConstraintKind::Exact);
                    return Err(EditActionError::InapplicableSubField { sub: *sub, kind });
                }
            }
            EditAction::SetCellKind { series, field, kind } => {
                let id = open_row(builder, *series)?;
                builder.set_cell_kind(&id, field, *kind)?;
            }
            EditAction::SetCellValue {
                series,
                field,
                sub,
                value,
            } => {
                let id = open_row(builder, *series)?;
                if !builder.set_cell_value(&id, field, *sub, value.clone())? {
                    let kind = builder
                        .row_draft(&id)
                        .and_then(|d| d.cells.get(field.as_str()))
                        .map(|v| v.kind())
                        .unwrap_or(ConstraintKind::Exact);
                    return Err(EditActionError::InapplicableSubField { sub: *sub, kind });
                }
            }
            EditAction::Relabel { series, to } => {
                let id = open_row(builder, *series)?;
                builder.set_series(&id, *to)?;
            }
            EditAction::Commit(target) => {
                let target = resolve_target(builder, target)?;
                builder.commit(&target, notifier)?;
            }
            EditAction::Cancel(target) => {
                let target = resolve_target(builder, target)?;
                builder.cancel(&target)?;
            }
            EditAction::DeleteField { field } => {
                let id = resolve_field(builder, field)?;
                builder.delete_constant_field(&id)?;
            }
            EditAction::DeleteSeries { series } => {
                let id = resolve_series(builder, *series)?;
                builder.delete_series_row(&id)?;
            }
            EditAction::DeleteVariable { field } => builder.delete_variable_column(field)?,
            EditAction::Promote { field } => {
                builder.promote(field)?;
            }
            EditAction::Demote { field } => {
                let id = resolve_field(builder, field)?;
                builder.demote(&id)?;
            }
        }
        Ok(())
    }
}

/// Apply actions in order, stopping at the first failure.
pub fn apply_script(
    builder: &mut SchemaBuilder,
    actions: &[EditAction],
    notifier: &dyn Notifier,
) -> Result<(), ScriptError> {
    for (step, action) in actions.iter().enumerate() {
        action.apply(builder, notifier).map_err(|source| ScriptError {
            step,
            action: action.name(),
            source,
        })?;
    }
    Ok(())
}

/// Parse a JSON array of actions.
pub fn parse_script(json: &str) -> Result<Vec<EditAction>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Find a constant by name, preferring an open draft that already carries
/// that name (e.g. a field just added by the script).
fn resolve_field(builder: &SchemaBuilder, name: &str) -> Result<FieldId, EditActionError> {
    let drafted = builder.open_edits().find_map(|target| match target {
        EditTarget::Field(id) if builder.field_draft(&id).map_or(false, |d| d.name == name) => Some(id),
        _ => None,
    });
    drafted
        .or_else(|| builder.constant().find_by_name(name).map(|r| r.id.clone()))
        .ok_or_else(|| EditActionError::UnknownField(name.to_string()))
}

fn resolve_series(builder: &SchemaBuilder, series: u32) -> Result<RowId, EditActionError> {
    builder
        .variable()
        .iter()
        .find(|r| r.series == series)
        .map(|r| r.id.clone())
        .ok_or(EditActionError::UnknownSeries(series))
}

fn resolve_target(builder: &SchemaBuilder, target: &ActionTarget) -> Result<EditTarget, EditActionError> {
    Ok(match target {
        ActionTarget::Field { field } => EditTarget::Field(resolve_field(builder, field)?),
        ActionTarget::Series { series } => EditTarget::Row(resolve_series(builder, *series)?),
    })
}

fn open_field(builder: &mut SchemaBuilder, name: &str) -> Result<FieldId, EditActionError> {
    let id = resolve_field(builder, name)?;
    builder.open_field_edit(&id)?;
    Ok(id)
}

fn open_row(builder: &mut SchemaBuilder, series: u32) -> Result<RowId, EditActionError> {
    let id = resolve_series(builder, series)?;
    builder.open_row_edit(&id)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintValue;
    use crate::notify::RecordingNotifier;
    use crate::raw::RawRow;
    use crate::validation::ValidationError;
    use serde_json::json;

    fn builder() -> SchemaBuilder {
        let mut builder = SchemaBuilder::new("T1w");
        builder.select_field("FlipAngle").unwrap();
        builder.select_field("EchoTime").unwrap();
        let rows: Vec<RawRow> = serde_json::from_value(json!([
            {"FlipAngle": 9, "EchoTime": 3.25},
            {"FlipAngle": 9, "EchoTime": 4.5},
        ]))
        .unwrap();
        builder.finish_selection_with_rows(&rows).unwrap();
        builder
    }

    #[test]
    fn test_parse_script_from_json() {
        let script = parse_script(
            r#"[
                {"action": "start_editing"},
                {"action": "set_field_kind", "field": "FlipAngle", "kind": "range"},
                {"action": "commit", "target": "field", "field": "FlipAngle"},
                {"action": "relabel", "series": 2, "to": 1}
            ]"#,
        )
        .unwrap();
        assert_eq!(script.len(), 4);
        assert_eq!(
            script[2],
            EditAction::Commit(ActionTarget::Field {
                field: "FlipAngle".to_string()
            })
        );
        assert_eq!(script[3], EditAction::Relabel { series: 2, to: 1 });
    }

    #[test]
    fn test_range_edit_script() {
        let mut builder = builder();
        let notifier = RecordingNotifier::new();
        let script = vec![
            EditAction::StartEditing,
            EditAction::SetFieldKind {
                field: "FlipAngle".to_string(),
                kind: ConstraintKind::Range,
            },
            EditAction::SetFieldValue {
                field: "FlipAngle".to_string(),
                sub: SubField::Min,
                value: "8".to_string(),
            },
            EditAction::SetFieldValue {
                field: "FlipAngle".to_string(),
                sub: SubField::Max,
                value: "10".to_string(),
            },
            EditAction::FinishEditing,
        ];
        apply_script(&mut builder, &script, &notifier).unwrap();
        assert_eq!(
            builder.schema().constant_value("FlipAngle"),
            Some(&ConstraintValue::range("8", "10"))
        );
        assert!(!builder.is_editing());
    }

    #[test]
    fn test_added_field_addressable_by_draft_name() {
        let mut builder = builder();
        let notifier = RecordingNotifier::new();
        let script = vec![
            EditAction::StartEditing,
            EditAction::AddField {
                name: "Manufacturer".to_string(),
            },
            EditAction::SetFieldKind {
                field: "Manufacturer".to_string(),
                kind: ConstraintKind::Contains,
            },
            EditAction::SetFieldValue {
                field: "Manufacturer".to_string(),
                sub: SubField::Substring,
                value: "Siemens".to_string(),
            },
            EditAction::Commit(ActionTarget::Field {
                field: "Manufacturer".to_string(),
            }),
        ];
        apply_script(&mut builder, &script, &notifier).unwrap();
        assert_eq!(
            builder.schema().constant_value("Manufacturer"),
            Some(&ConstraintValue::contains("Siemens"))
        );
    }

    #[test]
    fn test_failing_step_is_reported() {
        let mut builder = builder();
        let notifier = RecordingNotifier::new();
        let script = vec![
            EditAction::StartEditing,
            EditAction::AddSeries,
            EditAction::SetCellValue {
                series: 3,
                field: "EchoTime".to_string(),
                sub: SubField::Value,
                value: "4.5".to_string(),
            },
            EditAction::Commit(ActionTarget::Series { series: 3 }),
        ];
        let err = apply_script(&mut builder, &script, &notifier).unwrap_err();
        assert_eq!(err.step, 3);
        assert_eq!(err.action, "commit");
        assert!(matches!(
            err.source,
            EditActionError::Builder(BuilderError::Validation(ValidationError::DuplicateRow(2)))
        ));
        assert_eq!(notifier.last().unwrap().title, "Duplicate row");
    }

    #[test]
    fn test_inapplicable_sub_field() {
        let mut builder = builder();
        let notifier = RecordingNotifier::new();
        EditAction::StartEditing.apply(&mut builder, &notifier).unwrap();
        let err = EditAction::SetFieldValue {
            field: "FlipAngle".to_string(),
            sub: SubField::Min,
            value: "1".to_string(),
        }
        .apply(&mut builder, &notifier)
        .unwrap_err();
        assert!(matches!(
            err,
            EditActionError::InapplicableSubField {
                sub: SubField::Min,
                kind: ConstraintKind::Exact
            }
        ));
    }

    #[test]
    fn test_unknown_targets() {
        let mut builder = builder();
        let notifier = RecordingNotifier::new();
        assert!(matches!(
            EditAction::Demote {
                field: "SliceThickness".to_string()
            }
            .apply(&mut builder, &notifier),
            Err(EditActionError::UnknownField(_))
        ));
        assert!(matches!(
            EditAction::DeleteSeries { series: 9 }.apply(&mut builder, &notifier),
            Err(EditActionError::UnknownSeries(9))
        ));
    }

    #[test]
    fn test_structural_actions() {
        let mut builder = builder();
        let notifier = RecordingNotifier::new();
        let promote = EditAction::Promote {
            field: "EchoTime".to_string(),
        };
        assert!(matches!(
            promote.apply(&mut builder, &notifier),
            Err(EditActionError::Builder(BuilderError::NotEditing))
        ));

        let script = vec![
            EditAction::StartEditing,
            EditAction::Demote {
                field: "FlipAngle".to_string(),
            },
            promote,
            EditAction::FinishEditing,
        ];
        apply_script(&mut builder, &script, &notifier).unwrap();
        assert_eq!(builder.variable().len(), 1);
        assert_eq!(builder.variable().columns(), &["FlipAngle".to_string()]);
        assert!(builder.verify().is_ok());
    }
}

//! Schema builder - the editing engine for one acquisition.
//!
//! # Lifecycle
//!
//! 1. **SelectingFields**: the user picks which header fields to constrain.
//! 2. **Editing**: ingestion supplies the distinct rows, the builder splits
//!    them into constants and variable series, and the user edits.
//!
//! Inside `Editing`, a global edit toggle gates every change to the fields
//! and rows: opening them for editing, adding, deleting, promoting and
//! demoting. Open edits hold drafts; the schema only changes when a
//! draft passes validation on commit. The toggle cannot be switched off while
//! any draft fails validation.
//!
//! Structural operations (promote, demote, delete column) reshape every row,
//! so they are refused while a row draft is open.

use crate::acquisition::{AcquisitionSchema, SchemaInvariantError};
use crate::constant::{ConstantSet, FieldRecord};
use crate::constraint::{ConstraintKind, ConstraintValue, SubField};
use crate::draft::{EditTarget, FieldDraft, OpenEdit, RowDraft};
use crate::notify::Notifier;
use crate::raw::{field_text, RawRow};
use crate::source::{RowSource, RowSourceError};
use crate::validation::{validate, ValidationError};
use crate::variable::{Cells, SeriesRow, VariableTable, SERIES_FIELD};
use acqspec_ids::{AcquisitionId, FieldId, RowId};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from builder operations.
///
/// Validation failures are also reported through the [`Notifier`]; the other
/// variants signal calls that do not fit the builder's current state.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("Field selection is already closed")]
    SelectionClosed,

    #[error("Acquisition is still selecting fields")]
    SelectionOpen,

    #[error("Edit mode is off")]
    NotEditing,

    #[error("'{0}' is reserved and cannot be selected")]
    ReservedField(String),

    #[error("Unknown constant field: {0}")]
    UnknownField(FieldId),

    #[error("Unknown series row: {0}")]
    UnknownRow(RowId),

    #[error("Unknown variable field: '{0}'")]
    UnknownColumn(String),

    #[error("No open edit for {0}")]
    EditNotOpen(EditTarget),

    #[error("Cannot reshape the table while {0} is being edited")]
    EditInProgress(EditTarget),

    #[error("Failed to load rows: {0}")]
    Source(#[from] RowSourceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type BuilderResult<T> = Result<T, BuilderError>;

/// Lifecycle phase of an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SelectingFields,
    Editing,
}

/// Split distinct raw rows into constant fields and variable series.
///
/// A field whose canonical value is the same on every row becomes a constant
/// `Exact(value)`. The remaining fields become columns, one row per input row
/// in input order, labelled 1..N. With no varying field the table is empty.
pub fn partition(fields: &[String], rows: &[RawRow]) -> (ConstantSet, VariableTable) {
    let mut constant = ConstantSet::new();
    let mut variable_fields: Vec<String> = Vec::new();

    let Some(first) = rows.first() else {
        return (constant, VariableTable::new());
    };

    for field in fields {
        let first_text = field_text(first, field);
        if rows.iter().all(|row| field_text(row, field) == first_text) {
            constant.push(FieldRecord::new(field.clone(), ConstraintValue::exact(first_text)));
        } else if !variable_fields.contains(field) {
            variable_fields.push(field.clone());
        }
    }

    if variable_fields.is_empty() {
        return (constant, VariableTable::new());
    }

    let cells: Vec<Cells> = rows
        .iter()
        .map(|row| {
            variable_fields
                .iter()
                .map(|f| (f.clone(), ConstraintValue::exact(field_text(row, f))))
                .collect()
        })
        .collect();
    (constant, VariableTable::from_cells(variable_fields, cells))
}

/// Editing engine for one acquisition's schema.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    id: AcquisitionId,
    /// Name the ingestion collaborator knows this acquisition by
    source_key: String,
    schema: AcquisitionSchema,
    phase: Phase,
    selected: Vec<String>,
    editing: bool,
    open: Vec<OpenEdit>,
}

impl SchemaBuilder {
    /// Start a new acquisition in the field-selection phase.
    pub fn new(source_key: impl Into<String>) -> Self {
        let source_key = source_key.into();
        Self {
            id: AcquisitionId::new(),
            schema: AcquisitionSchema::new(source_key.clone()),
            source_key,
            phase: Phase::SelectingFields,
            selected: Vec::new(),
            editing: false,
            open: Vec::new(),
        }
    }

    /// Resume editing an existing schema (e.g. one loaded from an export).
    pub fn from_schema(schema: AcquisitionSchema) -> Self {
        Self {
            id: AcquisitionId::new(),
            source_key: schema.title.clone(),
            selected: schema.field_names(),
            schema,
            phase: Phase::Editing,
            editing: false,
            open: Vec::new(),
        }
    }

    pub fn id(&self) -> &AcquisitionId {
        &self.id
    }

    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn schema(&self) -> &AcquisitionSchema {
        &self.schema
    }

    pub fn into_schema(self) -> AcquisitionSchema {
        self.schema
    }

    pub fn title(&self) -> &str {
        &self.schema.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.schema.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.schema.description = description.into();
    }

    pub fn constant(&self) -> &ConstantSet {
        &self.schema.constant
    }

    pub fn variable(&self) -> &VariableTable {
        &self.schema.variable
    }

    pub fn selected_fields(&self) -> &[String] {
        &self.selected
    }

    // ------------------------------------------------------------------
    // Field selection
    // ------------------------------------------------------------------

    /// Add a field to the selection. Returns `false` if it was already selected.
    pub fn select_field(&mut self, field: impl Into<String>) -> BuilderResult<bool> {
        self.require_phase(Phase::SelectingFields)?;
        let field = field.into();
        if field == SERIES_FIELD {
            return Err(BuilderError::ReservedField(field));
        }
        if self.selected.contains(&field) {
            return Ok(false);
        }
        self.selected.push(field);
        Ok(true)
    }

    /// Remove a field from the selection. Returns `false` if it was not selected.
    pub fn deselect_field(&mut self, field: &str) -> BuilderResult<bool> {
        self.require_phase(Phase::SelectingFields)?;
        let before = self.selected.len();
        self.selected.retain(|f| f != field);
        Ok(self.selected.len() != before)
    }

    /// Close the selection: fetch distinct rows and build the initial schema.
    pub fn finish_selection(&mut self, source: &dyn RowSource) -> BuilderResult<()> {
        self.require_phase(Phase::SelectingFields)?;
        let rows = source.distinct_rows(&self.source_key, &self.selected)?;
        self.initialize(&rows);
        Ok(())
    }

    /// Close the selection with rows already fetched by the caller.
    pub fn finish_selection_with_rows(&mut self, rows: &[RawRow]) -> BuilderResult<()> {
        self.require_phase(Phase::SelectingFields)?;
        self.initialize(rows);
        Ok(())
    }

    fn initialize(&mut self, rows: &[RawRow]) {
        let (constant, variable) = partition(&self.selected, rows);
        info!(
            acquisition = %self.source_key,
            rows = rows.len(),
            constant = constant.len(),
            variable = variable.columns().len(),
            series = variable.len(),
            "initialized acquisition schema"
        );
        self.schema.constant = constant;
        self.schema.variable = variable;
        self.phase = Phase::Editing;
    }

    // ------------------------------------------------------------------
    // Edit toggles
    // ------------------------------------------------------------------

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Turn the global edit toggle on.
    pub fn start_editing(&mut self) -> BuilderResult<()> {
        self.require_phase(Phase::Editing)?;
        self.editing = true;
        Ok(())
    }

    /// Commit every open edit, then turn the global edit toggle off.
    ///
    /// Each failing edit is reported through `notifier` and stays open; the
    /// toggle stays on and the first failure is returned.
    pub fn finish_editing(&mut self, notifier: &dyn Notifier) -> BuilderResult<()> {
        self.require_phase(Phase::Editing)?;
        let targets: Vec<EditTarget> = self.open.iter().map(OpenEdit::target).collect();
        let mut first_error = None;
        for target in targets {
            if let Err(err) = self.commit(&target, notifier) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => {
                self.editing = false;
                Ok(())
            }
        }
    }

    pub fn has_open_edits(&self) -> bool {
        !self.open.is_empty()
    }

    pub fn open_edits(&self) -> impl Iterator<Item = EditTarget> + '_ {
        self.open.iter().map(OpenEdit::target)
    }

    pub fn is_open(&self, target: &EditTarget) -> bool {
        self.open.iter().any(|e| &e.target() == target)
    }

    /// Open a constant field for editing. Opening twice keeps the first draft.
    pub fn open_field_edit(&mut self, id: &FieldId) -> BuilderResult<()> {
        self.require_editing()?;
        let record = self
            .schema
            .constant
            .get(id)
            .ok_or_else(|| BuilderError::UnknownField(id.clone()))?;
        if !self.is_open(&EditTarget::Field(id.clone())) {
            self.open.push(OpenEdit::Field {
                id: id.clone(),
                draft: FieldDraft::from_record(record),
                is_new: false,
            });
        }
        Ok(())
    }

    /// Open a series row for editing. Opening twice keeps the first draft.
    pub fn open_row_edit(&mut self, id: &RowId) -> BuilderResult<()> {
        self.require_editing()?;
        let row = self
            .schema
            .variable
            .get(id)
            .ok_or_else(|| BuilderError::UnknownRow(id.clone()))?;
        if !self.is_open(&EditTarget::Row(id.clone())) {
            self.open.push(OpenEdit::Row {
                id: id.clone(),
                draft: RowDraft::from_row(row),
                is_new: false,
            });
        }
        Ok(())
    }

    pub fn field_draft(&self, id: &FieldId) -> Option<&FieldDraft> {
        self.open.iter().find_map(|e| match e {
            OpenEdit::Field { id: open_id, draft, .. } if open_id == id => Some(draft),
            _ => None,
        })
    }

    pub fn row_draft(&self, id: &RowId) -> Option<&RowDraft> {
        self.open.iter().find_map(|e| match e {
            OpenEdit::Row { id: open_id, draft, .. } if open_id == id => Some(draft),
            _ => None,
        })
    }

    pub fn field_draft_mut(&mut self, id: &FieldId) -> BuilderResult<&mut FieldDraft> {
        self.open
            .iter_mut()
            .find_map(|e| match e {
                OpenEdit::Field { id: open_id, draft, .. } if open_id == id => Some(draft),
                _ => None,
            })
            .ok_or_else(|| BuilderError::EditNotOpen(EditTarget::Field(id.clone())))
    }

    pub fn row_draft_mut(&mut self, id: &RowId) -> BuilderResult<&mut RowDraft> {
        self.open
            .iter_mut()
            .find_map(|e| match e {
                OpenEdit::Row { id: open_id, draft, .. } if open_id == id => Some(draft),
                _ => None,
            })
            .ok_or_else(|| BuilderError::EditNotOpen(EditTarget::Row(id.clone())))
    }

    /// Rename an open constant field draft.
    pub fn rename_field(&mut self, id: &FieldId, name: impl Into<String>) -> BuilderResult<()> {
        self.field_draft_mut(id)?.name = name.into();
        Ok(())
    }

    /// Switch the constraint kind of an open constant field draft.
    pub fn set_field_kind(&mut self, id: &FieldId, kind: ConstraintKind) -> BuilderResult<()> {
        self.field_draft_mut(id)?.set_kind(kind);
        Ok(())
    }

    /// Set a sub-field of an open constant field draft. Returns whether the
    /// active constraint kind has that sub-field.
    pub fn set_field_value(
        &mut self,
        id: &FieldId,
        sub: SubField,
        raw: impl Into<String>,
    ) -> BuilderResult<bool> {
        Ok(self.field_draft_mut(id)?.set_value(sub, raw))
    }

    /// Switch the constraint kind of one cell in an open row draft.
    pub fn set_cell_kind(&mut self, id: &RowId, field: &str, kind: ConstraintKind) -> BuilderResult<()> {
        let cell = self.draft_cell(id, field)?;
        cell.set_variant(kind);
        Ok(())
    }

    /// Set a sub-field of one cell in an open row draft.
    pub fn set_cell_value(
        &mut self,
        id: &RowId,
        field: &str,
        sub: SubField,
        raw: impl Into<String>,
    ) -> BuilderResult<bool> {
        let cell = self.draft_cell(id, field)?;
        Ok(cell.set_field(sub, raw))
    }

    /// Relabel an open row draft.
    pub fn set_series(&mut self, id: &RowId, series: u32) -> BuilderResult<()> {
        self.row_draft_mut(id)?.series = Some(series);
        Ok(())
    }

    fn draft_cell(&mut self, id: &RowId, field: &str) -> BuilderResult<&mut ConstraintValue> {
        self.row_draft_mut(id)?
            .cell_mut(field)
            .ok_or_else(|| BuilderError::UnknownColumn(field.to_string()))
    }

    /// Validate and apply an open edit.
    ///
    /// On failure the message goes to `notifier`, the edit stays open and the
    /// schema is unchanged.
    pub fn commit(&mut self, target: &EditTarget, notifier: &dyn Notifier) -> BuilderResult<()> {
        let index = self
            .open
            .iter()
            .position(|e| &e.target() == target)
            .ok_or_else(|| BuilderError::EditNotOpen(target.clone()))?;

        if let Err(err) = validate(&self.schema, &self.open[index]) {
            notifier.notify(&err.to_string(), err.title());
            debug!(acquisition = %self.source_key, %target, error = %err, "edit rejected");
            return Err(err.into());
        }

        match self.open.remove(index) {
            OpenEdit::Field { id, draft, .. } => {
                if let Some(record) = self.schema.constant.get_mut(&id) {
                    record.name = draft.name;
                    record.value = draft.value;
                }
            }
            OpenEdit::Row { id, draft, .. } => {
                let current = self.schema.variable.get(&id).map(|r| r.series);
                if let Some(current) = current {
                    let series = draft.series.unwrap_or(current);
                    self.schema.variable.replace_row(&id, series, draft.cells);
                }
            }
        }
        debug!(acquisition = %self.source_key, %target, "edit committed");
        Ok(())
    }

    pub fn commit_field(&mut self, id: &FieldId, notifier: &dyn Notifier) -> BuilderResult<()> {
        self.commit(&EditTarget::Field(id.clone()), notifier)
    }

    pub fn commit_row(&mut self, id: &RowId, notifier: &dyn Notifier) -> BuilderResult<()> {
        self.commit(&EditTarget::Row(id.clone()), notifier)
    }

    /// Discard an open edit. A field or row added in this edit is removed.
    pub fn cancel(&mut self, target: &EditTarget) -> BuilderResult<()> {
        let index = self
            .open
            .iter()
            .position(|e| &e.target() == target)
            .ok_or_else(|| BuilderError::EditNotOpen(target.clone()))?;
        let edit = self.open.remove(index);
        if edit.is_new() {
            match edit {
                OpenEdit::Field { id, .. } => {
                    self.schema.constant.remove(&id);
                }
                OpenEdit::Row { id, .. } => {
                    self.schema.variable.remove_row(&id);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Add / delete
    // ------------------------------------------------------------------

    /// Append an unnamed `Exact("")` constant and open it for editing.
    pub fn add_constant_field(&mut self) -> BuilderResult<FieldId> {
        self.require_editing()?;
        let record = FieldRecord::blank();
        let id = record.id.clone();
        self.open.push(OpenEdit::Field {
            id: id.clone(),
            draft: FieldDraft::from_record(&record),
            is_new: true,
        });
        self.schema.constant.push(record);
        debug!(acquisition = %self.source_key, field = %id.short(), "added constant field");
        Ok(id)
    }

    /// Append a row shaped like the others (every cell `Exact("")`), labelled
    /// N+1, and open it for editing.
    pub fn add_series_row(&mut self) -> BuilderResult<RowId> {
        self.require_editing()?;
        let id = self.schema.variable.push_blank_row();
        let draft = self
            .schema
            .variable
            .get(&id)
            .map(RowDraft::from_row)
            .ok_or_else(|| BuilderError::UnknownRow(id.clone()))?;
        self.open.push(OpenEdit::Row {
            id: id.clone(),
            draft,
            is_new: true,
        });
        debug!(acquisition = %self.source_key, row = %id.short(), "added series row");
        Ok(id)
    }

    /// Delete a constant field, discarding any open edit on it.
    pub fn delete_constant_field(&mut self, id: &FieldId) -> BuilderResult<FieldRecord> {
        self.require_editing()?;
        let record = self
            .schema
            .constant
            .remove(id)
            .ok_or_else(|| BuilderError::UnknownField(id.clone()))?;
        self.drop_edit(&EditTarget::Field(id.clone()));
        debug!(acquisition = %self.source_key, field = %record.name, "deleted constant field");
        Ok(record)
    }

    /// Delete a series row and renumber the rest.
    pub fn delete_series_row(&mut self, id: &RowId) -> BuilderResult<SeriesRow> {
        self.require_editing()?;
        let row = self
            .schema
            .variable
            .remove_row(id)
            .ok_or_else(|| BuilderError::UnknownRow(id.clone()))?;
        self.drop_edit(&EditTarget::Row(id.clone()));
        debug!(acquisition = %self.source_key, series = row.series, "deleted series row");
        Ok(row)
    }

    /// Remove a variable field from every row, dedup and renumber. With no
    /// columns left the table becomes empty.
    pub fn delete_variable_column(&mut self, field: &str) -> BuilderResult<()> {
        self.require_reshapeable()?;
        self.schema
            .variable
            .take_column(field)
            .ok_or_else(|| BuilderError::UnknownColumn(field.to_string()))?;
        if self.schema.variable.columns().is_empty() {
            self.schema.variable.clear();
        }
        debug!(
            acquisition = %self.source_key,
            field,
            series = self.schema.variable.len(),
            "deleted variable field"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Promotion / demotion
    // ------------------------------------------------------------------

    /// Move a variable field into the constant set.
    ///
    /// The first row's value wins; values in other rows are discarded. Rows
    /// that become identical collapse and the table is renumbered. A table
    /// that had rows keeps at least one.
    pub fn promote(&mut self, field: &str) -> BuilderResult<FieldId> {
        self.require_reshapeable()?;
        let before = self.schema.variable.len();
        let value = self
            .schema
            .variable
            .take_column(field)
            .ok_or_else(|| BuilderError::UnknownColumn(field.to_string()))?;
        let record = FieldRecord::new(field, value);
        let id = record.id.clone();
        self.schema.constant.push(record);
        debug!(
            acquisition = %self.source_key,
            field,
            collapsed = before - self.schema.variable.len(),
            "promoted field to constant"
        );
        Ok(id)
    }

    /// Move a constant field into every series row with its current value.
    /// An empty table gains a single row.
    pub fn demote(&mut self, id: &FieldId) -> BuilderResult<()> {
        self.require_reshapeable()?;
        if self.is_open(&EditTarget::Field(id.clone())) {
            return Err(BuilderError::EditInProgress(EditTarget::Field(id.clone())));
        }
        let record = self
            .schema
            .constant
            .remove(id)
            .ok_or_else(|| BuilderError::UnknownField(id.clone()))?;
        self.schema.variable.insert_column(&record.name, &record.value);
        debug!(
            acquisition = %self.source_key,
            field = %record.name,
            series = self.schema.variable.len(),
            "demoted field to variable"
        );
        Ok(())
    }

    /// Demote by field name.
    pub fn demote_by_name(&mut self, name: &str) -> BuilderResult<()> {
        let id = self
            .schema
            .constant
            .find_by_name(name)
            .map(|r| r.id.clone())
            .ok_or_else(|| BuilderError::UnknownColumn(name.to_string()))?;
        self.demote(&id)
    }

    /// Check every schema invariant. Only meaningful with no edits open.
    pub fn verify(&self) -> Result<(), SchemaInvariantError> {
        if !self.open.is_empty() {
            return Err(SchemaInvariantError::EditsOpen(self.open.len()));
        }
        self.schema.verify()
    }

    // ------------------------------------------------------------------
    // Guards
    // ------------------------------------------------------------------

    fn require_phase(&self, phase: Phase) -> BuilderResult<()> {
        if self.phase == phase {
            return Ok(());
        }
        match phase {
            Phase::SelectingFields => Err(BuilderError::SelectionClosed),
            Phase::Editing => Err(BuilderError::SelectionOpen),
        }
    }

    fn require_editing(&self) -> BuilderResult<()> {
        self.require_phase(Phase::Editing)?;
        if !self.editing {
            return Err(BuilderError::NotEditing);
        }
        Ok(())
    }

    fn require_reshapeable(&self) -> BuilderResult<()> {
        self.require_editing()?;
        match self.open.iter().find(|e| e.is_row()) {
            Some(edit) => Err(BuilderError::EditInProgress(edit.target())),
            None => Ok(()),
        }
    }

    fn drop_edit(&mut self, target: &EditTarget) {
        self.open.retain(|e| &e.target() != target);
    }
}

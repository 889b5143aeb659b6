//! Pending edits.
//!
//! While a field or row is open for editing, changes go to a draft. The
//! schema itself only changes when the draft passes validation on commit.

use crate::constant::FieldRecord;
use crate::constraint::{ConstraintKind, ConstraintValue, SubField};
use crate::variable::{Cells, SeriesRow};
use acqspec_ids::{FieldId, RowId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an edit applies to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "target", content = "id", rename_all = "snake_case")]
pub enum EditTarget {
    Field(FieldId),
    Row(RowId),
}

impl fmt::Display for EditTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditTarget::Field(id) => write!(f, "field {}", id.short()),
            EditTarget::Row(id) => write!(f, "row {}", id.short()),
        }
    }
}

/// Draft of a constant field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDraft {
    pub name: String,
    pub value: ConstraintValue,
}

impl FieldDraft {
    pub fn from_record(record: &FieldRecord) -> Self {
        Self {
            name: record.name.clone(),
            value: record.value.clone(),
        }
    }

    pub fn set_kind(&mut self, kind: ConstraintKind) {
        self.value.set_variant(kind);
    }

    pub fn set_value(&mut self, field: SubField, raw: impl Into<String>) -> bool {
        self.value.set_field(field, raw)
    }
}

/// Draft of a series row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDraft {
    /// New series label; `None` keeps the row's current label
    pub series: Option<u32>,
    pub cells: Cells,
}

impl RowDraft {
    pub fn from_row(row: &SeriesRow) -> Self {
        Self {
            series: None,
            cells: row.cells.clone(),
        }
    }

    /// Mutable access to one existing cell. Drafts never gain or lose columns.
    pub fn cell_mut(&mut self, field: &str) -> Option<&mut ConstraintValue> {
        self.cells.get_mut(field)
    }
}

/// An open edit: the target, its draft, and whether the entity was just added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenEdit {
    Field {
        id: FieldId,
        draft: FieldDraft,
        is_new: bool,
    },
    Row {
        id: RowId,
        draft: RowDraft,
        is_new: bool,
    },
}

impl OpenEdit {
    pub fn target(&self) -> EditTarget {
        match self {
            OpenEdit::Field { id, .. } => EditTarget::Field(id.clone()),
            OpenEdit::Row { id, .. } => EditTarget::Row(id.clone()),
        }
    }

    pub fn is_new(&self) -> bool {
        match self {
            OpenEdit::Field { is_new, .. } | OpenEdit::Row { is_new, .. } => *is_new,
        }
    }

    pub fn is_row(&self) -> bool {
        matches!(self, OpenEdit::Row { .. })
    }
}

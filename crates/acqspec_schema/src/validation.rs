//! Commit-time validation.
//!
//! Pure checks run when an open edit is closed. A failure keeps the edit open
//! and is reported to the user; it never changes the schema.

use crate::acquisition::AcquisitionSchema;
use crate::draft::{FieldDraft, OpenEdit, RowDraft};
use crate::variable::{canonical_key, SERIES_FIELD};
use acqspec_ids::{FieldId, RowId};
use thiserror::Error;

/// A rejected edit. Always recoverable by correcting the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field name cannot be empty")]
    EmptyName,

    #[error("'{0}' is reserved for the series label")]
    ReservedName(String),

    #[error("A constant field named '{0}' already exists")]
    DuplicateConstant(String),

    #[error("'{0}' is already a variable field")]
    CollidesWithVariable(String),

    #[error("This row duplicates Series {0}")]
    DuplicateRow(u32),

    #[error("Series {0} is already in use")]
    DuplicateSeries(u32),

    #[error("Series labels start at 1")]
    ZeroSeries,
}

impl ValidationError {
    /// Short title for the alert shown to the user.
    pub fn title(&self) -> &'static str {
        match self {
            ValidationError::EmptyName
            | ValidationError::ReservedName(_)
            | ValidationError::DuplicateConstant(_)
            | ValidationError::CollidesWithVariable(_) => "Invalid field name",
            ValidationError::DuplicateRow(_) => "Duplicate row",
            ValidationError::DuplicateSeries(_) | ValidationError::ZeroSeries => "Invalid series",
        }
    }
}

/// Validate any open edit against the committed schema.
pub fn validate(schema: &AcquisitionSchema, edit: &OpenEdit) -> Result<(), ValidationError> {
    match edit {
        OpenEdit::Field { id, draft, .. } => validate_field(schema, id, draft),
        OpenEdit::Row { id, draft, .. } => validate_row(schema, id, draft),
    }
}

/// A constant's name must be non-empty, not `Series`, and unique across the
/// acquisition (other constants and variable columns).
pub fn validate_field(
    schema: &AcquisitionSchema,
    id: &FieldId,
    draft: &FieldDraft,
) -> Result<(), ValidationError> {
    let name = draft.name.as_str();
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name == SERIES_FIELD {
        return Err(ValidationError::ReservedName(name.to_string()));
    }
    if schema.constant.name_taken(name, Some(id)) {
        return Err(ValidationError::DuplicateConstant(name.to_string()));
    }
    if schema.variable.has_column(name) {
        return Err(ValidationError::CollidesWithVariable(name.to_string()));
    }
    Ok(())
}

/// A row must not duplicate another row's contents or series label.
pub fn validate_row(
    schema: &AcquisitionSchema,
    id: &RowId,
    draft: &RowDraft,
) -> Result<(), ValidationError> {
    if let Some(series) = draft.series {
        if series == 0 {
            return Err(ValidationError::ZeroSeries);
        }
        if schema.variable.series_taken(series, Some(id)) {
            return Err(ValidationError::DuplicateSeries(series));
        }
    }
    let key = canonical_key(&draft.cells);
    if let Some(existing) = schema.variable.key_taken(&key, Some(id)) {
        return Err(ValidationError::DuplicateRow(existing));
    }
    Ok(())
}

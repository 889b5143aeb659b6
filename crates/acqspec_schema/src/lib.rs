//! Acquisition Schema Model
//!
//! # Philosophy: Constant First, Vary Only Where Needed
//!
//! An acquisition groups the scans a protocol produces. Its schema says what
//! each header field must look like:
//!
//! 1. **Selection**: the user picks which header fields to constrain
//! 2. **Initialization**: fields identical across every distinct row become
//!    constants; the rest become a table with one row per series
//! 3. **Editing**: constraints are loosened (range, tolerance, contains),
//!    fields move between constant and variable, rows are added and removed
//! 4. **Export**: the finished schemas go to the compliance engine
//!
//! Edits never leave the schema in a bad state. Pending changes live in a
//! draft and are validated on commit; a rejected commit changes nothing.
//!
//! # Modules
//!
//! - [`constraint`]: the four constraint shapes
//! - [`constant`] / [`variable`]: constant fields and the series table
//! - [`builder`]: the per-acquisition editing engine
//! - [`validation`]: commit-time checks
//! - [`source`]: the ingestion collaborator that supplies distinct rows
//! - [`edits`]: scripted edit actions
//! - [`session`] / [`export`]: several acquisitions and the export document

pub mod acquisition;
pub mod builder;
pub mod constant;
pub mod constraint;
pub mod draft;
pub mod edits;
pub mod export;
pub mod notify;
pub mod raw;
pub mod session;
pub mod source;
pub mod validation;
pub mod variable;

pub use acquisition::{AcquisitionSchema, SchemaInvariantError};
pub use builder::{partition, BuilderError, BuilderResult, Phase, SchemaBuilder};
pub use constant::{ConstantSet, FieldRecord};
pub use constraint::{ConstraintKind, ConstraintValue, SubField};
pub use draft::{EditTarget, FieldDraft, OpenEdit, RowDraft};
pub use notify::{Notification, Notifier, RecordingNotifier, TracingNotifier};
pub use raw::RawRow;
pub use session::SchemaSession;
pub use source::{InMemoryRowSource, RowSource, RowSourceError};
pub use validation::ValidationError;
pub use variable::{Cells, SeriesRow, TableInvariantError, VariableTable, SERIES_FIELD};

// Re-export key types from the export and edit modules
pub use edits::{apply_script, parse_script, ActionTarget, EditAction, EditActionError, ScriptError};
pub use export::{
    ExportError, ExportedAcquisition, ExportedField, ExportedSeries, SchemaDocument, WireConstraint,
    DOCUMENT_VERSION,
};

pub use acqspec_ids::{AcquisitionId, FieldId, RowId};

//! Export document: the finished schemas handed to the compliance engine.
//!
//! ```json
//! {
//!   "version": 1,
//!   "generated_at": "2026-01-01T00:00:00Z",
//!   "content_hash": "…",
//!   "acquisitions": {
//!     "T1w": {
//!       "fields": [{"field": "FlipAngle", "value": "9"}],
//!       "series": [
//!         {"name": "Series 1", "fields": [{"field": "EchoTime", "min": "3", "max": "3.5"}]}
//!       ]
//!     }
//!   }
//! }
//! ```

use crate::acquisition::{AcquisitionSchema, SchemaInvariantError};
use crate::constant::{ConstantSet, FieldRecord};
use crate::constraint::ConstraintValue;
use crate::variable::{Cells, VariableTable, SERIES_FIELD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

/// Current document format version.
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Acquisition '{0}' is still selecting fields")]
    SelectionOpen(String),

    #[error("Acquisition '{title}' has {count} open edit(s)")]
    EditsOpen { title: String, count: usize },

    #[error("Two acquisitions are titled '{0}'")]
    DuplicateTitle(String),

    #[error("Unsupported document version {0}")]
    UnsupportedVersion(u32),

    #[error("Series '{0}' in acquisition '{1}' repeats another series")]
    DuplicateSeries(String, String),

    #[error("Acquisition '{title}' uses the reserved field name '{field}'")]
    ReservedField { title: String, field: String },

    #[error("Series '{series}' in acquisition '{title}' does not constrain the same fields as the others")]
    RaggedSeries { title: String, series: String },

    #[error("Acquisition '{title}' is not a valid schema: {source}")]
    InvalidSchema {
        title: String,
        #[source]
        source: SchemaInvariantError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A constraint as written in the document. Variants are tried in order on
/// read, so the two-key shapes come before `{value}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireConstraint {
    Tolerance { value: String, tolerance: String },
    Range { min: String, max: String },
    Contains { contains: String },
    Exact { value: String },
}

impl From<&ConstraintValue> for WireConstraint {
    fn from(value: &ConstraintValue) -> Self {
        match value.clone() {
            ConstraintValue::Exact { value } => WireConstraint::Exact { value },
            ConstraintValue::Range { min, max } => WireConstraint::Range { min, max },
            ConstraintValue::Tolerance { value, tolerance } => WireConstraint::Tolerance { value, tolerance },
            ConstraintValue::Contains { substring } => WireConstraint::Contains { contains: substring },
        }
    }
}

impl From<WireConstraint> for ConstraintValue {
    fn from(wire: WireConstraint) -> Self {
        match wire {
            WireConstraint::Exact { value } => ConstraintValue::Exact { value },
            WireConstraint::Range { min, max } => ConstraintValue::Range { min, max },
            WireConstraint::Tolerance { value, tolerance } => ConstraintValue::Tolerance { value, tolerance },
            WireConstraint::Contains { contains } => ConstraintValue::Contains { substring: contains },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedField {
    pub field: String,
    #[serde(flatten)]
    pub constraint: WireConstraint,
}

impl ExportedField {
    fn new(field: &str, value: &ConstraintValue) -> Self {
        Self {
            field: field.to_string(),
            constraint: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedSeries {
    pub name: String,
    pub fields: Vec<ExportedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedAcquisition {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub fields: Vec<ExportedField>,
    #[serde(default)]
    pub series: Vec<ExportedSeries>,
}

impl ExportedAcquisition {
    pub fn from_schema(schema: &AcquisitionSchema) -> Self {
        let fields = schema
            .constant
            .iter()
            .map(|r| ExportedField::new(&r.name, &r.value))
            .collect();
        let columns = schema.variable.columns();
        let series = schema
            .variable
            .iter()
            .map(|row| ExportedSeries {
                name: row.series_name(),
                fields: columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| ExportedField::new(c, v)))
                    .collect(),
            })
            .collect();
        Self {
            description: schema.description.clone(),
            fields,
            series,
        }
    }

    /// Rebuild an editable schema. Series keep document order and are
    /// renumbered; every record gets a fresh id.
    ///
    /// The result must pass [`AcquisitionSchema::verify`]: every series names
    /// the same fields once each, no field is called `Series`, and constant
    /// names are unique and disjoint from the series fields.
    pub fn to_schema(&self, title: &str) -> Result<AcquisitionSchema, ExportError> {
        let reserved = self
            .fields
            .iter()
            .chain(self.series.iter().flat_map(|s| s.fields.iter()))
            .any(|f| f.field == SERIES_FIELD);
        if reserved {
            return Err(ExportError::ReservedField {
                title: title.to_string(),
                field: SERIES_FIELD.to_string(),
            });
        }

        let constant: ConstantSet = self
            .fields
            .iter()
            .map(|f| FieldRecord::new(f.field.clone(), f.constraint.clone().into()))
            .collect();

        let mut columns: Vec<String> = Vec::new();
        for series in &self.series {
            for field in &series.fields {
                if !columns.contains(&field.field) {
                    columns.push(field.field.clone());
                }
            }
        }
        for series in &self.series {
            let mut names: Vec<&str> = series.fields.iter().map(|f| f.field.as_str()).collect();
            names.sort_unstable();
            names.dedup();
            if names.len() != series.fields.len() || names.len() != columns.len() {
                return Err(ExportError::RaggedSeries {
                    title: title.to_string(),
                    series: series.name.clone(),
                });
            }
        }

        let rows: Vec<Cells> = self
            .series
            .iter()
            .map(|s| {
                s.fields
                    .iter()
                    .map(|f| (f.field.clone(), f.constraint.clone().into()))
                    .collect()
            })
            .collect();
        let variable = VariableTable::from_cells(columns, rows);
        if variable.len() != self.series.len() {
            let name = self
                .series
                .get(variable.len())
                .map(|s| s.name.clone())
                .unwrap_or_default();
            return Err(ExportError::DuplicateSeries(name, title.to_string()));
        }

        let schema = AcquisitionSchema {
            title: title.to_string(),
            description: self.description.clone(),
            constant,
            variable,
        };
        schema.verify().map_err(|source| ExportError::InvalidSchema {
            title: title.to_string(),
            source,
        })?;
        Ok(schema)
    }
}

/// Finalized schemas for every acquisition, keyed by title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    /// SHA-256 of the canonical JSON of `acquisitions`
    pub content_hash: String,
    pub acquisitions: BTreeMap<String, ExportedAcquisition>,
}

impl SchemaDocument {
    pub fn new(acquisitions: BTreeMap<String, ExportedAcquisition>) -> Result<Self, ExportError> {
        let content_hash = content_hash(&acquisitions)?;
        Ok(Self {
            version: DOCUMENT_VERSION,
            generated_at: Utc::now(),
            content_hash,
            acquisitions,
        })
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        let document: SchemaDocument = serde_json::from_str(json)?;
        if document.version != DOCUMENT_VERSION {
            return Err(ExportError::UnsupportedVersion(document.version));
        }
        Ok(document)
    }

    /// Whether `content_hash` matches the acquisitions (false after a hand edit).
    pub fn hash_matches(&self) -> bool {
        content_hash(&self.acquisitions)
            .map(|h| h == self.content_hash)
            .unwrap_or(false)
    }
}

fn content_hash(acquisitions: &BTreeMap<String, ExportedAcquisition>) -> Result<String, ExportError> {
    let canonical = serde_json::to_vec(acquisitions)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

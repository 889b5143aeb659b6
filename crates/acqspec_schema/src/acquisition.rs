//! The schema of one acquisition: constant fields plus variable series.

use crate::constant::ConstantSet;
use crate::constraint::ConstraintValue;
use crate::variable::{Cells, TableInvariantError, VariableTable, SERIES_FIELD};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Violations reported by [`AcquisitionSchema::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaInvariantError {
    #[error(transparent)]
    Table(#[from] TableInvariantError),

    #[error("Constant field name is empty")]
    EmptyName,

    #[error("Constant field '{0}' is defined more than once")]
    DuplicateConstant(String),

    #[error("'{0}' is both a constant and a variable field")]
    NameInBoth(String),

    #[error("'{0}' is reserved for the series label")]
    ReservedName(String),

    #[error("{0} edit(s) still open")]
    EditsOpen(usize),
}

/// Expected acquisition parameters for a group of related scans.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionSchema {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub constant: ConstantSet,
    pub variable: VariableTable,
}

impl AcquisitionSchema {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Every field name: constants first, then variable columns.
    pub fn field_names(&self) -> Vec<String> {
        self.constant
            .iter()
            .map(|r| r.name.clone())
            .chain(self.variable.columns().iter().cloned())
            .collect()
    }

    /// Expand back into one full set of cells per series: each row's variable
    /// cells merged with every constant.
    ///
    /// For a freshly initialized schema this reproduces the distinct input
    /// rows (wrapped as exact constraints).
    pub fn expanded_rows(&self) -> Vec<Cells> {
        let constants = self
            .constant
            .records()
            .iter()
            .map(|r| (r.name.clone(), r.value.clone()));
        if self.variable.is_empty() {
            let cells: Cells = constants.collect();
            return if cells.is_empty() { Vec::new() } else { vec![cells] };
        }
        self.variable
            .iter()
            .map(|row| {
                let mut cells = row.cells.clone();
                cells.extend(constants.clone());
                cells
            })
            .collect()
    }

    /// Value of a constant field by name.
    pub fn constant_value(&self, name: &str) -> Option<&ConstraintValue> {
        self.constant.find_by_name(name).map(|r| &r.value)
    }

    /// Check naming and table invariants.
    pub fn verify(&self) -> Result<(), SchemaInvariantError> {
        self.variable.verify()?;

        if let Some(name) = self.constant.duplicate_names().into_iter().next() {
            return Err(SchemaInvariantError::DuplicateConstant(name));
        }
        let columns: HashSet<&str> = self.variable.columns().iter().map(String::as_str).collect();
        for record in &self.constant {
            if record.name.trim().is_empty() {
                return Err(SchemaInvariantError::EmptyName);
            }
            if record.name == SERIES_FIELD {
                return Err(SchemaInvariantError::ReservedName(record.name.clone()));
            }
            if columns.contains(record.name.as_str()) {
                return Err(SchemaInvariantError::NameInBoth(record.name.clone()));
            }
        }
        Ok(())
    }
}

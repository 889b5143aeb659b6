//! Ingestion collaborator: supplies the distinct raw rows a schema starts from.

use crate::raw::{canonical_text, distinct_sorted, RawRow};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised by a [`RowSource`].
#[derive(Debug, Error)]
pub enum RowSourceError {
    #[error("Fields not present in the session: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Failed to parse records: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Row source error: {0}")]
    Other(String),
}

/// Produces the distinct combinations of `fields` seen in one acquisition.
///
/// Rows come back deduplicated and sorted ascending by `fields` in order.
pub trait RowSource {
    fn distinct_rows(
        &self,
        acquisition: &str,
        fields: &[String],
    ) -> Result<Vec<RawRow>, RowSourceError>;
}

/// [`RowSource`] over flat records held in memory, one record per file.
#[derive(Debug, Clone)]
pub struct InMemoryRowSource {
    acquisition_field: String,
    records: Vec<RawRow>,
}

impl InMemoryRowSource {
    pub fn new(acquisition_field: impl Into<String>, records: Vec<RawRow>) -> Self {
        Self {
            acquisition_field: acquisition_field.into(),
            records,
        }
    }

    /// Parse a JSON array of flat objects.
    pub fn from_json(acquisition_field: impl Into<String>, json: &str) -> Result<Self, RowSourceError> {
        let records: Vec<RawRow> = serde_json::from_str(json)?;
        Ok(Self::new(acquisition_field, records))
    }

    pub fn acquisition_field(&self) -> &str {
        &self.acquisition_field
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Distinct acquisition names in first-seen order.
    pub fn acquisitions(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for record in &self.records {
            if let Some(value) = record.get(&self.acquisition_field) {
                let name = canonical_text(value);
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Every field name present on at least one record, sorted.
    pub fn columns(&self) -> Vec<String> {
        let columns: BTreeSet<&String> = self.records.iter().flat_map(|r| r.keys()).collect();
        columns.into_iter().cloned().collect()
    }

    /// Number of records belonging to `acquisition`.
    pub fn records_in(&self, acquisition: &str) -> usize {
        self.records
            .iter()
            .filter(|r| self.belongs_to(r, acquisition))
            .count()
    }

    fn belongs_to(&self, record: &RawRow, acquisition: &str) -> bool {
        record
            .get(&self.acquisition_field)
            .map_or(false, |v| canonical_text(v) == acquisition)
    }
}

impl RowSource for InMemoryRowSource {
    fn distinct_rows(
        &self,
        acquisition: &str,
        fields: &[String],
    ) -> Result<Vec<RawRow>, RowSourceError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let columns = self.columns();
        let missing: Vec<String> = fields
            .iter()
            .filter(|f| !columns.contains(*f))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(RowSourceError::MissingFields(missing));
        }

        let rows = self
            .records
            .iter()
            .filter(|r| self.belongs_to(r, acquisition))
            .cloned();
        Ok(distinct_sorted(rows, fields))
    }
}

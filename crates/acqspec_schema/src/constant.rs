//! Constant fields - values identical across every series of an acquisition.

use crate::constraint::ConstraintValue;
use acqspec_ids::FieldId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named constraint with a stable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Assigned once at creation; survives renames and reordering
    pub id: FieldId,

    /// Display and lookup key (e.g. "FlipAngle")
    pub name: String,

    /// Acceptance rule for the field
    pub value: ConstraintValue,
}

impl FieldRecord {
    pub fn new(name: impl Into<String>, value: ConstraintValue) -> Self {
        Self {
            id: FieldId::new(),
            name: name.into(),
            value,
        }
    }

    /// Unnamed record holding `Exact("")`.
    pub fn blank() -> Self {
        Self::new("", ConstraintValue::empty())
    }
}

/// Ordered list of constant field records.
///
/// Name uniqueness is enforced when edits are committed (see
/// [`crate::validation`]); the set itself only stores records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstantSet {
    records: Vec<FieldRecord>,
}

impl ConstantSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRecord> {
        self.records.iter()
    }

    pub fn get(&self, id: &FieldId) -> Option<&FieldRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&FieldRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Whether a record other than `except` already uses `name`.
    pub fn name_taken(&self, name: &str, except: Option<&FieldId>) -> bool {
        self.records
            .iter()
            .any(|r| r.name == name && Some(&r.id) != except)
    }

    /// Names appearing on more than one record, in first-seen order.
    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for record in &self.records {
            if !seen.insert(record.name.as_str()) && !duplicates.contains(&record.name) {
                duplicates.push(record.name.clone());
            }
        }
        duplicates
    }

    pub(crate) fn push(&mut self, record: FieldRecord) {
        self.records.push(record);
    }

    pub(crate) fn get_mut(&mut self, id: &FieldId) -> Option<&mut FieldRecord> {
        self.records.iter_mut().find(|r| &r.id == id)
    }

    pub(crate) fn remove(&mut self, id: &FieldId) -> Option<FieldRecord> {
        let index = self.records.iter().position(|r| &r.id == id)?;
        Some(self.records.remove(index))
    }
}

impl<'a> IntoIterator for &'a ConstantSet {
    type Item = &'a FieldRecord;
    type IntoIter = std::slice::Iter<'a, FieldRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<FieldRecord> for ConstantSet {
    fn from_iter<I: IntoIterator<Item = FieldRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

//! Variable fields - one row per distinct series of an acquisition.
//!
//! Invariants (whenever no operation is in flight):
//! - every row has exactly the table's columns
//! - no two rows share a canonical key
//! - `Series` labels are 1..N in row order
//! - a table without rows has no columns

use crate::constraint::ConstraintValue;
use acqspec_ids::RowId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Name of the per-row identity label. Reserved; never a real column.
pub const SERIES_FIELD: &str = "Series";

/// Field name → value, kept sorted by name.
pub type Cells = BTreeMap<String, ConstraintValue>;

/// A row's non-Series contents as sorted (name, value) pairs.
pub type CanonicalKey = Vec<(String, ConstraintValue)>;

/// Canonical key of a set of cells, used to detect duplicate rows.
pub fn canonical_key(cells: &Cells) -> CanonicalKey {
    // BTreeMap iteration is already sorted by field name.
    cells
        .iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// One series of an acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub id: RowId,

    /// Position label, 1-based
    pub series: u32,

    pub cells: Cells,
}

impl SeriesRow {
    fn new(series: u32, cells: Cells) -> Self {
        Self {
            id: RowId::new(),
            series,
            cells,
        }
    }

    pub fn get(&self, field: &str) -> Option<&ConstraintValue> {
        self.cells.get(field)
    }

    pub fn canonical_key(&self) -> CanonicalKey {
        canonical_key(&self.cells)
    }

    /// The `Series` label as the exact constraint it is exported as.
    pub fn series_value(&self) -> ConstraintValue {
        ConstraintValue::exact(self.series.to_string())
    }

    /// Human-readable series name, e.g. "Series 2".
    pub fn series_name(&self) -> String {
        format!("{} {}", SERIES_FIELD, self.series)
    }
}

/// Violations reported by [`VariableTable::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableInvariantError {
    #[error("Series {series} has columns {found:?}, expected {expected:?}")]
    ShapeMismatch {
        series: u32,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Series {first} and {second} are identical")]
    DuplicateRow { first: u32, second: u32 },

    #[error("Row at position {position} is labelled Series {found}")]
    SeriesOutOfOrder { position: usize, found: u32 },

    #[error("Table has columns {0:?} but no rows")]
    ColumnsWithoutRows(Vec<String>),

    #[error("Column '{0}' is listed more than once")]
    DuplicateColumn(String),
}

/// Ordered collection of series rows sharing one set of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableTable {
    /// Column display order
    columns: Vec<String>,
    rows: Vec<SeriesRow>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from per-row cells in order.
    ///
    /// Rows missing a column get `Exact("")`; cells outside `columns` are
    /// dropped. Duplicates are removed and rows numbered 1..N. An empty
    /// `rows` list yields an empty table regardless of `columns`.
    pub fn from_cells(columns: Vec<String>, rows: Vec<Cells>) -> Self {
        if rows.is_empty() {
            return Self::new();
        }
        let mut unique_columns: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            if column != SERIES_FIELD && !unique_columns.contains(&column) {
                unique_columns.push(column);
            }
        }
        let rows = rows
            .into_iter()
            .map(|mut cells| {
                let shaped: Cells = unique_columns
                    .iter()
                    .map(|c| (c.clone(), cells.remove(c).unwrap_or_default()))
                    .collect();
                SeriesRow::new(0, shaped)
            })
            .collect();
        let mut table = Self {
            columns: unique_columns,
            rows,
        };
        table.dedup();
        table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesRow> {
        self.rows.iter()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.columns.iter().any(|c| c == field)
    }

    pub fn get(&self, id: &RowId) -> Option<&SeriesRow> {
        self.rows.iter().find(|r| &r.id == id)
    }

    pub fn position(&self, id: &RowId) -> Option<usize> {
        self.rows.iter().position(|r| &r.id == id)
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, field: &str) -> Vec<&ConstraintValue> {
        self.rows.iter().filter_map(|r| r.cells.get(field)).collect()
    }

    /// Relabel rows 1..N in their current order.
    pub fn renumber(&mut self) {
        for (index, row) in self.rows.iter_mut().enumerate() {
            row.series = index as u32 + 1;
        }
    }

    /// Drop rows whose canonical key repeats an earlier row, then renumber.
    ///
    /// Returns the number of rows removed. Running it twice removes nothing
    /// the second time.
    pub fn dedup(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<CanonicalKey> = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.canonical_key()));
        self.renumber();
        before - self.rows.len()
    }

    /// Whether another row (not `except`) has the given canonical key.
    pub fn key_taken(&self, key: &CanonicalKey, except: Option<&RowId>) -> Option<u32> {
        self.rows
            .iter()
            .find(|r| Some(&r.id) != except && &r.canonical_key() == key)
            .map(|r| r.series)
    }

    /// Whether another row (not `except`) is labelled `series`.
    pub fn series_taken(&self, series: u32, except: Option<&RowId>) -> bool {
        self.rows
            .iter()
            .any(|r| Some(&r.id) != except && r.series == series)
    }

    /// Remove `field` from every row, then dedup and renumber.
    ///
    /// Returns the first row's value for the field (the value promotion keeps),
    /// or `None` when the column does not exist. Rows are kept even when no
    /// columns remain; dedup collapses them to a single row.
    pub(crate) fn take_column(&mut self, field: &str) -> Option<ConstraintValue> {
        let index = self.columns.iter().position(|c| c == field)?;
        self.columns.remove(index);

        let mut first = None;
        for row in &mut self.rows {
            let removed = row.cells.remove(field);
            if first.is_none() {
                first = removed;
            }
        }
        self.dedup();
        Some(first.unwrap_or_default())
    }

    /// Add `field` to every row with `value`; an empty table gains one row.
    pub(crate) fn insert_column(&mut self, field: &str, value: &ConstraintValue) {
        if self.rows.is_empty() {
            self.rows.push(SeriesRow::new(1, Cells::new()));
        }
        if !self.has_column(field) {
            self.columns.push(field.to_string());
        }
        for row in &mut self.rows {
            row.cells.insert(field.to_string(), value.clone());
        }
    }

    /// Append a row with the table's columns, each `Exact("")`, labelled N+1.
    pub(crate) fn push_blank_row(&mut self) -> RowId {
        let cells: Cells = self
            .columns
            .iter()
            .map(|c| (c.clone(), ConstraintValue::empty()))
            .collect();
        let row = SeriesRow::new(self.rows.len() as u32 + 1, cells);
        let id = row.id.clone();
        self.rows.push(row);
        id
    }

    /// Remove a row and renumber. Removing the last row clears the columns.
    pub(crate) fn remove_row(&mut self, id: &RowId) -> Option<SeriesRow> {
        let index = self.position(id)?;
        let removed = self.rows.remove(index);
        self.renumber();
        if self.rows.is_empty() {
            self.columns.clear();
        }
        Some(removed)
    }

    /// Store committed cells for a row. A changed `series` label moves the row
    /// to the end of the table, then the table is renumbered.
    ///
    /// Commit validation only accepts labels no other row holds, and 1..N are
    /// always taken, so a relabel can only ever point past the last row.
    pub(crate) fn replace_row(&mut self, id: &RowId, series: u32, cells: Cells) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let mut row = self.rows.remove(index);
        let moved = row.series != series;
        row.cells = cells;
        if moved {
            self.rows.push(row);
        } else {
            self.rows.insert(index, row);
        }
        self.renumber();
        true
    }

    pub(crate) fn clear(&mut self) {
        self.columns.clear();
        self.rows.clear();
    }

    /// Check every table invariant.
    pub fn verify(&self) -> Result<(), TableInvariantError> {
        if self.rows.is_empty() && !self.columns.is_empty() {
            return Err(TableInvariantError::ColumnsWithoutRows(self.columns.clone()));
        }

        let mut expected: Vec<String> = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            if expected.contains(column) {
                return Err(TableInvariantError::DuplicateColumn(column.clone()));
            }
            expected.push(column.clone());
        }
        expected.sort();

        let mut keys: Vec<(CanonicalKey, u32)> = Vec::with_capacity(self.rows.len());
        for (position, row) in self.rows.iter().enumerate() {
            if row.series != position as u32 + 1 {
                return Err(TableInvariantError::SeriesOutOfOrder {
                    position,
                    found: row.series,
                });
            }
            let found: Vec<String> = row.cells.keys().cloned().collect();
            if found != expected {
                return Err(TableInvariantError::ShapeMismatch {
                    series: row.series,
                    expected: expected.clone(),
                    found,
                });
            }
            let key = row.canonical_key();
            if let Some((_, first)) = keys.iter().find(|(k, _)| *k == key) {
                return Err(TableInvariantError::DuplicateRow {
                    first: *first,
                    second: row.series,
                });
            }
            keys.push((key, row.series));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(pairs: &[(&str, &str)]) -> Cells {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), ConstraintValue::exact(*v)))
            .collect()
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn series(table: &VariableTable) -> Vec<u32> {
        table.iter().map(|r| r.series).collect()
    }

    #[test]
    fn test_from_cells_numbers_rows() {
        let table = VariableTable::from_cells(
            columns(&["EchoTime"]),
            vec![cells(&[("EchoTime", "3.25")]), cells(&[("EchoTime", "4.5")])],
        );
        assert_eq!(series(&table), vec![1, 2]);
        assert!(table.verify().is_ok());
    }

    #[test]
    fn test_from_cells_fills_missing_and_drops_extra() {
        let table = VariableTable::from_cells(
            columns(&["EchoTime", "FlipAngle"]),
            vec![cells(&[("EchoTime", "3"), ("Other", "x")])],
        );
        let row = &table.rows()[0];
        assert_eq!(row.get("FlipAngle"), Some(&ConstraintValue::empty()));
        assert!(row.get("Other").is_none());
        assert!(table.verify().is_ok());
    }

    #[test]
    fn test_from_cells_ignores_series_column() {
        let table = VariableTable::from_cells(
            columns(&["Series", "EchoTime"]),
            vec![cells(&[("EchoTime", "3")])],
        );
        assert_eq!(table.columns(), &["EchoTime".to_string()]);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut table = VariableTable::from_cells(
            columns(&["A", "B"]),
            vec![
                cells(&[("A", "1"), ("B", "x")]),
                cells(&[("A", "2"), ("B", "x")]),
            ],
        );
        let first = table.rows()[0].id.clone();
        table.take_column("A");
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].id, first);
        assert_eq!(series(&table), vec![1]);
        assert_eq!(table.dedup(), 0);
    }

    #[test]
    fn test_take_column_returns_first_row_value() {
        let mut table = VariableTable::from_cells(
            columns(&["A", "B"]),
            vec![
                cells(&[("A", "1"), ("B", "x")]),
                cells(&[("A", "2"), ("B", "y")]),
            ],
        );
        assert_eq!(table.take_column("A"), Some(ConstraintValue::exact("1")));
        assert_eq!(table.len(), 2);
        assert!(table.take_column("A").is_none());
        assert!(table.verify().is_ok());
    }

    #[test]
    fn test_take_last_column_leaves_single_row() {
        let mut table = VariableTable::from_cells(
            columns(&["A"]),
            vec![cells(&[("A", "1")]), cells(&[("A", "2")])],
        );
        table.take_column("A");
        assert_eq!(table.len(), 1);
        assert!(table.columns().is_empty());
        assert!(table.verify().is_ok());
    }

    #[test]
    fn test_insert_column_into_empty_table_creates_row() {
        let mut table = VariableTable::new();
        table.insert_column("FlipAngle", &ConstraintValue::exact("9"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].series, 1);
        assert_eq!(
            table.rows()[0].get("FlipAngle"),
            Some(&ConstraintValue::exact("9"))
        );
        assert!(table.verify().is_ok());
    }

    #[test]
    fn test_remove_row_renumbers() {
        let mut table = VariableTable::from_cells(
            columns(&["A"]),
            vec![cells(&[("A", "1")]), cells(&[("A", "2")]), cells(&[("A", "3")])],
        );
        let middle = table.rows()[1].id.clone();
        table.remove_row(&middle).unwrap();
        assert_eq!(series(&table), vec![1, 2]);
        assert_eq!(table.rows()[1].get("A"), Some(&ConstraintValue::exact("3")));
    }

    #[test]
    fn test_remove_last_row_clears_columns() {
        let mut table = VariableTable::from_cells(columns(&["A"]), vec![cells(&[("A", "1")])]);
        let id = table.rows()[0].id.clone();
        table.remove_row(&id);
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert!(table.verify().is_ok());
    }

    #[test]
    fn test_replace_row_moves_relabelled_row() {
        let mut table = VariableTable::from_cells(
            columns(&["A"]),
            vec![cells(&[("A", "1")]), cells(&[("A", "2")]), cells(&[("A", "3")])],
        );
        let first = table.rows()[0].id.clone();
        assert!(table.replace_row(&first, 7, cells(&[("A", "1")])));
        let values: Vec<String> = table
            .iter()
            .map(|r| r.get("A").unwrap().to_string())
            .collect();
        assert_eq!(values, vec!["2", "3", "1"]);
        assert_eq!(series(&table), vec![1, 2, 3]);
    }

    #[test]
    fn test_replace_row_without_relabel_keeps_position() {
        let mut table = VariableTable::from_cells(
            columns(&["A"]),
            vec![cells(&[("A", "1")]), cells(&[("A", "2")]), cells(&[("A", "3")])],
        );
        let middle = table.rows()[1].id.clone();
        assert!(table.replace_row(&middle, 2, cells(&[("A", "5")])));
        let values: Vec<String> = table
            .iter()
            .map(|r| r.get("A").unwrap().to_string())
            .collect();
        assert_eq!(values, vec!["1", "5", "3"]);
        assert_eq!(table.position(&middle), Some(1));
    }

    /// Table holding `rows` as given: no dedup and labels that need renumbering.
    fn raw_table(cols: &[&str], rows: &[Vec<u8>]) -> VariableTable {
        VariableTable {
            columns: if rows.is_empty() { Vec::new() } else { columns(cols) },
            rows: rows
                .iter()
                .map(|values| {
                    let cells = cols
                        .iter()
                        .zip(values)
                        .map(|(c, v)| (c.to_string(), ConstraintValue::exact(v.to_string())))
                        .collect();
                    SeriesRow::new(0, cells)
                })
                .collect(),
        }
    }

    #[test]
    fn test_dedup_removes_repeats_then_settles() {
        let mut table = raw_table(&["A", "B"], &[vec![1, 0], vec![2, 0], vec![1, 0], vec![2, 1]]);
        let ids: Vec<RowId> = table.iter().map(|r| r.id.clone()).collect();

        assert_eq!(table.dedup(), 1);
        let kept: Vec<RowId> = table.iter().map(|r| r.id.clone()).collect();
        assert_eq!(kept, vec![ids[0].clone(), ids[1].clone(), ids[3].clone()]);
        assert_eq!(series(&table), vec![1, 2, 3]);

        let snapshot = table.clone();
        assert_eq!(table.dedup(), 0);
        assert_eq!(table, snapshot);
    }

    proptest::proptest! {
        #[test]
        fn prop_dedup_is_idempotent(
            rows in proptest::collection::vec(proptest::collection::vec(0..3u8, 2), 0..12),
        ) {
            let mut table = raw_table(&["EchoTime", "FlipAngle"], &rows);
            let mut first_seen: Vec<(RowId, CanonicalKey)> = Vec::new();
            for row in table.iter() {
                let key = row.canonical_key();
                if !first_seen.iter().any(|(_, k)| *k == key) {
                    first_seen.push((row.id.clone(), key));
                }
            }

            let removed = table.dedup();
            proptest::prop_assert_eq!(removed, rows.len() - first_seen.len());
            let kept: Vec<RowId> = table.iter().map(|r| r.id.clone()).collect();
            let expected: Vec<RowId> = first_seen.into_iter().map(|(id, _)| id).collect();
            proptest::prop_assert_eq!(kept, expected);
            proptest::prop_assert!(table.verify().is_ok());

            let snapshot = table.clone();
            proptest::prop_assert_eq!(table.dedup(), 0);
            proptest::prop_assert_eq!(table, snapshot);
        }
    }

    #[test]
    fn test_push_blank_row_copies_shape() {
        let mut table = VariableTable::from_cells(
            columns(&["A", "B"]),
            vec![cells(&[("A", "1"), ("B", "2")])],
        );
        let id = table.push_blank_row();
        let row = table.get(&id).unwrap();
        assert_eq!(row.series, 2);
        assert_eq!(row.get("A"), Some(&ConstraintValue::empty()));
        assert_eq!(row.get("B"), Some(&ConstraintValue::empty()));
    }

    #[test]
    fn test_verify_reports_duplicates() {
        let mut table = VariableTable::from_cells(columns(&["A"]), vec![cells(&[("A", "1")])]);
        table.push_blank_row();
        table.push_blank_row();
        assert_eq!(
            table.verify(),
            Err(TableInvariantError::DuplicateRow { first: 2, second: 3 })
        );
    }

    #[test]
    fn test_key_and_series_lookups() {
        let table = VariableTable::from_cells(
            columns(&["A"]),
            vec![cells(&[("A", "1")]), cells(&[("A", "2")])],
        );
        let first = table.rows()[0].id.clone();
        let key = canonical_key(&cells(&[("A", "2")]));
        assert_eq!(table.key_taken(&key, Some(&first)), Some(2));
        assert!(table.series_taken(2, Some(&first)));
        assert!(!table.series_taken(1, Some(&first)));
    }

    #[test]
    fn test_series_value_and_name() {
        let table = VariableTable::from_cells(columns(&["A"]), vec![cells(&[("A", "1")])]);
        let row = &table.rows()[0];
        assert_eq!(row.series_value(), ConstraintValue::exact("1"));
        assert_eq!(row.series_name(), "Series 1");
    }
}

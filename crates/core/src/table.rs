//! Column-oriented numeric tables.
//!
//! A [`Table`] holds named `f64` columns of equal length. Row order is file
//! order unless a caller sorts explicitly. Cells that have no value (for
//! example coordinates of an atom missing from a left join) are stored as NaN
//! and reported by [`Table::is_missing`].

use std::collections::{BTreeMap, HashSet};

use crate::error::{Result, UppoutError};

/// Tables partitioned by projection index.
pub type ProjectedTables = BTreeMap<i64, Table>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            columns: vec![Vec::new(); names.len()],
        }
    }

    /// Build a table from row-major data. Every row must have one value per column.
    pub fn from_rows<S: AsRef<str>>(names: &[S], rows: Vec<Vec<f64>>) -> Self {
        let mut table = Self::new(names);
        for row in rows {
            table.push_row(&row);
        }
        table
    }

    /// Append one row.
    ///
    /// # Panics
    /// If `row` does not have exactly one value per column.
    pub fn push_row(&mut self, row: &[f64]) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row width does not match table width"
        );
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(*value);
        }
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.column_index(name).map(|idx| self.columns[idx].as_slice())
    }

    /// Like [`Table::column`] but fails with `MissingColumn`.
    pub fn require_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| UppoutError::MissingColumn(name.to_string()))
    }

    /// Copy of one row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.num_rows() {
            return None;
        }
        Some(self.columns.iter().map(|column| column[index]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        (0..self.num_rows()).map(move |idx| self.columns.iter().map(|c| c[idx]).collect())
    }

    /// Value at `(row, column)`, `None` if either is out of range.
    pub fn get(&self, row: usize, name: &str) -> Option<f64> {
        self.column(name).and_then(|column| column.get(row).copied())
    }

    /// Whether the cell holds no value.
    pub fn is_missing(&self, row: usize, name: &str) -> bool {
        self.get(row, name).map_or(true, f64::is_nan)
    }

    /// New table holding the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|column| indices.iter().map(|&idx| column[idx]).collect())
                .collect(),
        }
    }

    /// New table holding the rows for which `keep` returns true.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(usize) -> bool,
    {
        let indices: Vec<usize> = (0..self.num_rows()).filter(|&idx| keep(idx)).collect();
        self.take_rows(&indices)
    }

    /// Row selection with slice semantics `[start:end:step]`.
    ///
    /// Negative bounds count from the end, out-of-range bounds are clamped and
    /// a negative step walks backwards. A zero step is rejected.
    pub fn slice_rows(
        &self,
        start: Option<isize>,
        end: Option<isize>,
        step: Option<isize>,
    ) -> Result<Table> {
        let indices = slice_indices(self.num_rows(), start, end, step)?;
        Ok(self.take_rows(&indices))
    }

    /// Remove a column, returning its values.
    pub fn drop_column(&mut self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        self.names.remove(idx);
        Some(self.columns.remove(idx))
    }

    /// Append a column. The values must match the current row count unless
    /// the table has no columns yet.
    ///
    /// # Panics
    /// If the length does not match.
    pub fn push_column(&mut self, name: &str, values: Vec<f64>) {
        if !self.columns.is_empty() {
            assert_eq!(values.len(), self.num_rows(), "column length mismatch");
        }
        self.names.push(name.to_string());
        self.columns.push(values);
    }

    /// Arithmetic mean of a column over every row, ignoring missing cells.
    /// `None` if the column is absent or holds no values.
    pub fn column_mean(&self, name: &str) -> Option<f64> {
        let (sum, count) = self
            .column(name)?
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Smallest and largest value of a column.
    pub fn min_max(&self, name: &str) -> Option<(f64, f64)> {
        self.column(name)?
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }

    /// Number of distinct values in a column.
    pub fn distinct_count(&self, name: &str) -> Option<usize> {
        let column = self.column(name)?;
        Some(column.iter().map(|v| v.to_bits()).collect::<HashSet<_>>().len())
    }

    /// Distinct values of a column in order of first appearance.
    pub fn unique_in_order(&self, name: &str) -> Option<Vec<f64>> {
        let column = self.column(name)?;
        let mut seen = HashSet::new();
        Some(
            column
                .iter()
                .copied()
                .filter(|v| seen.insert(v.to_bits()))
                .collect(),
        )
    }

    /// Split rows into one table per integer value of `key`, preserving row
    /// order inside every partition. The key column is kept; keys are
    /// truncated, so callers must check they are whole numbers.
    pub fn partition_by(&self, key: &str) -> Result<ProjectedTables> {
        let keys = self.require_column(key)?;
        let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, value) in keys.iter().enumerate() {
            groups.entry(*value as i64).or_default().push(idx);
        }
        Ok(groups
            .into_iter()
            .map(|(value, indices)| (value, self.take_rows(&indices)))
            .collect())
    }
}

// ============================================================================
// Slice Semantics
// ============================================================================

/// Row indices selected by `[start:end:step]` on a sequence of length `len`.
pub fn slice_indices(
    len: usize,
    start: Option<isize>,
    end: Option<isize>,
    step: Option<isize>,
) -> Result<Vec<usize>> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(UppoutError::InvalidRowStep);
    }

    let len = len as isize;
    let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
    let clamp = |bound: Option<isize>, default: isize| match bound {
        None => default,
        Some(mut idx) => {
            if idx < 0 {
                idx += len;
            }
            idx.clamp(lower, upper)
        }
    };

    let (start, end) = if step > 0 {
        (clamp(start, lower), clamp(end, upper))
    } else {
        (clamp(start, upper), clamp(end, lower))
    };

    let mut indices = Vec::new();
    let mut idx = start;
    while (step > 0 && idx < end) || (step < 0 && idx > end) {
        indices.push(idx as usize);
        match idx.checked_add(step) {
            Some(next) => idx = next,
            None => break,
        }
    }
    Ok(indices)
}

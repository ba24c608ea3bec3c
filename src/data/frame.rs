//! Columnar dataset
//!
//! A `Dataset` is an ordered list of named columns of equal length. Nulls are
//! stored as `None` in every column kind. Grouping keys follow first-appearance
//! order, matching how the claims notebooks iterate over `unique()` values.

use chrono::NaiveDateTime;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::DataError;

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Timestamp,
    Text,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "category"),
            ColumnKind::Timestamp => write!(f, "datetime"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// Cell storage for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
            ColumnData::Timestamp(_) => ColumnKind::Timestamp,
            ColumnData::Text(_) => ColumnKind::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) | ColumnData::Text(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v.get(row).map_or(true, Option::is_none),
            ColumnData::Categorical(v) | ColumnData::Text(v) => {
                v.get(row).map_or(true, Option::is_none)
            }
            ColumnData::Timestamp(v) => v.get(row).map_or(true, Option::is_none),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    /// String form of a cell, used as a grouping key. `None` for nulls.
    pub fn key_at(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map(format_number),
            ColumnData::Categorical(v) | ColumnData::Text(v) => v.get(row).cloned().flatten(),
            ColumnData::Timestamp(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    /// Numeric cells, if this is a numeric column.
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            ColumnData::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Select the given rows (in the given order).
    pub fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(rows.iter().map(|&i| v[i].clone()).collect())
            }
            ColumnData::Timestamp(v) => {
                ColumnData::Timestamp(rows.iter().map(|&i| v[i]).collect())
            }
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// Render a float the way a postal code or count should read: integers
/// without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// In-memory table of named, equal-length columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset, checking that names are unique and lengths agree.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, DataError> {
        let mut dataset = Self::new();
        for column in columns {
            if dataset.has_column(&column.name) {
                return Err(DataError::DuplicateColumn(column.name));
            }
            dataset.insert_column(column.name, column.data)?;
        }
        Ok(dataset)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&ColumnData, DataError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.data)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut ColumnData, DataError> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.data)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    }

    /// Insert a column, replacing an existing one of the same name in place.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        data: ColumnData,
    ) -> Result<(), DataError> {
        let name = name.into();
        if self.columns.is_empty() {
            self.n_rows = data.len();
        } else if data.len() != self.n_rows {
            return Err(DataError::LengthMismatch {
                column: name,
                expected: self.n_rows,
                actual: data.len(),
            });
        }

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.data = data,
            None => self.columns.push(Column { name, data }),
        }
        Ok(())
    }

    /// Names of all columns of the given kind, in column order.
    pub fn names_of_kind(&self, kind: ColumnKind) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.data.kind() == kind)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Numeric cells of a column, or a kind mismatch error.
    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>], DataError> {
        let data = self.column(name)?;
        data.as_numeric().ok_or_else(|| DataError::KindMismatch {
            column: name.to_string(),
            expected: ColumnKind::Numeric,
            actual: data.kind(),
        })
    }

    /// Row indices per distinct non-null value of `by`, in first-appearance order.
    pub fn group_indices(&self, by: &str) -> Result<Vec<(String, Vec<usize>)>, DataError> {
        let data = self.column(by)?;
        let mut order: Vec<(String, Vec<usize>)> = Vec::new();
        let mut position: HashMap<String, usize> = HashMap::new();

        for row in 0..self.n_rows {
            let Some(key) = data.key_at(row) else {
                continue;
            };
            match position.get(&key) {
                Some(&idx) => order[idx].1.push(row),
                None => {
                    position.insert(key.clone(), order.len());
                    order.push((key, vec![row]));
                }
            }
        }
        Ok(order)
    }

    /// Distinct non-null values of a column, in first-appearance order.
    pub fn unique(&self, name: &str) -> Result<Vec<String>, DataError> {
        Ok(self
            .group_indices(name)?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    /// New dataset holding only the given rows.
    pub fn take_rows(&self, rows: &[usize]) -> Dataset {
        Dataset {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(rows),
                })
                .collect(),
            n_rows: rows.len(),
        }
    }

    /// New dataset holding the rows for which `keep` returns true.
    pub fn filter_rows(&self, keep: impl Fn(usize) -> bool) -> Dataset {
        let rows: Vec<usize> = (0..self.n_rows).filter(|&i| keep(i)).collect();
        self.take_rows(&rows)
    }

    /// Dense feature matrix from numeric columns. Nulls are rejected.
    pub fn to_matrix(&self, features: &[&str]) -> Result<Array2<f64>, DataError> {
        let mut matrix = Array2::<f64>::zeros((self.n_rows, features.len()));
        for (j, name) in features.iter().enumerate() {
            let values = self.dense_numeric(name)?;
            for (i, v) in values.into_iter().enumerate() {
                matrix[[i, j]] = v;
            }
        }
        Ok(matrix)
    }

    /// Dense target vector from a numeric column. Nulls are rejected.
    pub fn to_vector(&self, name: &str) -> Result<Array1<f64>, DataError> {
        Ok(Array1::from(self.dense_numeric(name)?))
    }

    fn dense_numeric(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let cells = self.numeric(name)?;
        let nulls = cells.iter().filter(|c| c.is_none()).count();
        if nulls > 0 {
            return Err(DataError::NullValues {
                column: name.to_string(),
                count: nulls,
            });
        }
        Ok(cells.iter().flatten().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_columns(vec![
            Column::new(
                "Gender",
                ColumnData::Text(vec![
                    Some("Male".into()),
                    Some("Female".into()),
                    None,
                    Some("Male".into()),
                ]),
            ),
            Column::new(
                "TotalClaims",
                ColumnData::Numeric(vec![Some(1.0), Some(2.0), Some(3.0), None]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_group_indices_first_appearance_order() {
        let ds = sample();
        let groups = ds.group_indices("Gender").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], ("Male".to_string(), vec![0, 3]));
        assert_eq!(groups[1], ("Female".to_string(), vec![1]));
    }

    #[test]
    fn test_insert_column_rejects_wrong_length() {
        let mut ds = sample();
        let err = ds
            .insert_column("Profit", ColumnData::Numeric(vec![Some(1.0)]))
            .unwrap_err();
        assert!(matches!(err, DataError::LengthMismatch { .. }));
    }

    #[test]
    fn test_insert_column_replaces_in_place() {
        let mut ds = sample();
        ds.insert_column("Gender", ColumnData::Numeric(vec![None; 4]))
            .unwrap();
        assert_eq!(ds.column_names(), vec!["Gender", "TotalClaims"]);
        assert_eq!(ds.column("Gender").unwrap().kind(), ColumnKind::Numeric);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = Dataset::from_columns(vec![
            Column::new("A", ColumnData::Numeric(vec![Some(1.0)])),
            Column::new("A", ColumnData::Numeric(vec![Some(2.0)])),
        ]);
        assert!(matches!(result, Err(DataError::DuplicateColumn(_))));
    }

    #[test]
    fn test_to_matrix_rejects_nulls() {
        let ds = sample();
        let err = ds.to_matrix(&["TotalClaims"]).unwrap_err();
        assert!(matches!(err, DataError::NullValues { count: 1, .. }));
    }

    #[test]
    fn test_numeric_kind_mismatch() {
        let ds = sample();
        assert!(matches!(
            ds.numeric("Gender"),
            Err(DataError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2000.0), "2000");
        assert_eq!(format_number(12.5), "12.5");
    }
}

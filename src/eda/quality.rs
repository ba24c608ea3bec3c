//! Type conversion and missing-value handling
//!
//! - Date columns are parsed into timestamps; unparseable cells become null.
//! - Known categorical columns become `Categorical`.
//! - Numeric nulls are filled with the column median, categorical nulls with
//!   the column mode (smallest value on ties).

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::data::columns::{CATEGORICAL_COLUMNS, DATE_COLUMNS};
use crate::data::{format_number, ColumnData, ColumnKind, DataError, Dataset};
use crate::stats::descriptive::{median, mode};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// Parses the date layouts found in the claims extract.
pub struct DateParser {
    month_year: Regex,
}

impl DateParser {
    pub fn new() -> Result<Self, DataError> {
        let month_year = Regex::new(r"^(\d{1,2})/(\d{4})$")
            .map_err(|e| DataError::InvalidParameter(format!("date pattern: {e}")))?;
        Ok(Self { month_year })
    }

    /// `None` when no known layout matches.
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Some(caps) = self.month_year.captures(raw) {
            let month: u32 = caps[1].parse().ok()?;
            let year: i32 = caps[2].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0);
        }
        DATETIME_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }
}

/// Parse the date columns and convert the known categorical columns.
/// A missing date column is logged and skipped.
pub fn convert_types(data: &mut Dataset) -> Result<(), DataError> {
    let parser = DateParser::new()?;

    for name in DATE_COLUMNS {
        let Ok(column) = data.column(name) else {
            warn!(column = name, "Error converting date columns: column not found");
            continue;
        };
        if column.kind() == ColumnKind::Timestamp {
            continue;
        }
        let parsed: Vec<Option<NaiveDateTime>> = (0..column.len())
            .map(|row| column.key_at(row).and_then(|raw| parser.parse(&raw)))
            .collect();
        let failed = parsed.iter().filter(|v| v.is_none()).count() - column.null_count();
        if failed > 0 {
            debug!(column = name, failed, "Unparseable dates set to null");
        }
        data.insert_column(name, ColumnData::Timestamp(parsed))?;
    }

    for name in CATEGORICAL_COLUMNS {
        let Ok(column) = data.column(name) else {
            continue;
        };
        if column.kind() == ColumnKind::Categorical {
            continue;
        }
        let values: Vec<Option<String>> = (0..column.len()).map(|row| column.key_at(row)).collect();
        data.insert_column(name, ColumnData::Categorical(values))?;
    }
    Ok(())
}

/// Nulls found in one column and the value used to fill them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Imputation {
    pub column: String,
    pub kind: ColumnKind,
    pub filled: usize,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QualityReport {
    /// Null count per column before imputation, in column order
    pub missing: Vec<(String, usize)>,
    pub imputations: Vec<Imputation>,
    /// Columns with nulls that could not be filled (no observed values)
    pub unfilled: Vec<String>,
}

impl QualityReport {
    pub fn print(&self) {
        println!("\nMissing Values per Column:");
        for (name, count) in &self.missing {
            println!("{name:<28} {count}");
        }
    }
}

/// Fill numeric and categorical nulls in place.
pub fn impute_missing(data: &mut Dataset) -> Result<QualityReport, DataError> {
    let mut report = QualityReport {
        missing: data
            .columns()
            .map(|c| (c.name.clone(), c.data.null_count()))
            .collect(),
        ..Default::default()
    };

    let targets: Vec<String> = data
        .columns()
        .filter(|c| {
            matches!(c.data.kind(), ColumnKind::Numeric | ColumnKind::Categorical)
                && c.data.null_count() > 0
        })
        .map(|c| c.name.clone())
        .collect();

    for name in targets {
        let column = data.column_mut(&name)?;
        let filled = column.null_count();
        let value = match column {
            ColumnData::Numeric(values) => {
                let observed: Vec<f64> = values.iter().flatten().copied().collect();
                median(&observed).map(|m| {
                    values.iter_mut().filter(|v| v.is_none()).for_each(|v| *v = Some(m));
                    format_number(m)
                })
            }
            ColumnData::Categorical(values) => {
                mode(values.iter().flatten().map(String::as_str)).map(|m| {
                    values
                        .iter_mut()
                        .filter(|v| v.is_none())
                        .for_each(|v| *v = Some(m.clone()));
                    m
                })
            }
            _ => continue,
        };

        match value {
            Some(value) => report.imputations.push(Imputation {
                column: name,
                kind: column.kind(),
                filled,
                value,
            }),
            None => {
                warn!(column = %name, "No observed values to impute from");
                report.unfilled.push(name);
            }
        }
    }

    Ok(report)
}

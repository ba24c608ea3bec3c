//! Delimited file loader
//!
//! Reads a delimited text file with a header row (the claims extract is
//! pipe-delimited) into a `Dataset`. A column becomes `Numeric` when every
//! non-null cell parses as a float; everything else stays `Text` until the
//! EDA type-conversion stage decides otherwise.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{error, info};

use super::{ColumnData, DataError, Dataset};

/// Cell values treated as missing (the common NA spellings of spreadsheet exports).
const NULL_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Load a delimited file.
///
/// A missing file is logged and reported as `Ok(None)`; any other I/O or
/// parse failure is returned as an error.
pub fn load_data(path: impl AsRef<Path>, delimiter: u8) -> Result<Option<Dataset>, DataError> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            error!(path = %path.display(), "Error: File not found");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let dataset = read_delimited(file, delimiter)?;
    info!(
        path = %path.display(),
        rows = dataset.n_rows(),
        columns = dataset.n_columns(),
        "Loaded dataset"
    );
    Ok(Some(dataset))
}

/// Parse delimited text from any reader.
pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Dataset, DataError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for record in rdr.records() {
        let record = record?;
        for (column, raw) in cells.iter_mut().zip(record.iter()) {
            column.push(if is_null_token(raw) {
                None
            } else {
                Some(raw.to_string())
            });
        }
    }

    let mut dataset = Dataset::new();
    for (name, values) in headers.into_iter().zip(cells) {
        dataset.insert_column(name, infer_column(values))?;
    }
    Ok(dataset)
}

fn is_null_token(raw: &str) -> bool {
    NULL_TOKENS.contains(&raw)
}

/// Numeric if every non-null cell parses as f64 (all-null columns are numeric too).
fn infer_column(values: Vec<Option<String>>) -> ColumnData {
    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => s.parse::<f64>().ok().map(Some),
        })
        .collect();

    match parsed {
        Some(numbers) => ColumnData::Numeric(numbers),
        None => ColumnData::Text(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnKind;
    use std::io::Write;

    const SAMPLE: &str = "\
PolicyID|Gender|TotalPremium|TotalClaims|TransactionMonth
1|Male|21.93|0.0|2015-03-01 00:00:00
2|Female|21.93||2015-05-01 00:00:00
3|Not specified|0.0|0.0|2015-07-01 00:00:00
";

    #[test]
    fn test_infers_numeric_and_text_columns() {
        let ds = read_delimited(SAMPLE.as_bytes(), b'|').unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.column("PolicyID").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.column("Gender").unwrap().kind(), ColumnKind::Text);
        assert_eq!(
            ds.column("TransactionMonth").unwrap().kind(),
            ColumnKind::Text
        );
    }

    #[test]
    fn test_empty_cells_are_null() {
        let ds = read_delimited(SAMPLE.as_bytes(), b'|').unwrap();
        let claims = ds.numeric("TotalClaims").unwrap();
        assert_eq!(claims, &[Some(0.0), None, Some(0.0)]);
    }

    #[test]
    fn test_missing_file_returns_none() {
        let result = load_data("/definitely/not/here.txt", b'|').unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let ds = load_data(file.path(), b'|').unwrap().unwrap();
        assert_eq!(ds.n_columns(), 5);
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let bad = "a|b\n1|2\n3\n";
        assert!(matches!(
            read_delimited(bad.as_bytes(), b'|'),
            Err(DataError::Csv(_))
        ));
    }
}

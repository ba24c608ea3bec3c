//! Derived feature columns
//!
//! - `Profit` = `TotalPremium` − `TotalClaims`
//! - `PostalCodeGroup`: postal-code prefix, or the full code for a subset of
//!   the lowest/highest mean-claim postal codes

use std::collections::HashSet;
use tracing::debug;

use super::columns::{POSTAL_CODE, POSTAL_CODE_GROUP, PROFIT, TOTAL_CLAIMS, TOTAL_PREMIUM};
use super::{ColumnData, DataError, Dataset};

/// Add (or overwrite) the `Profit` column. Null if either input is null.
///
/// Idempotent: the column depends only on the premium and claims columns.
pub fn calculate_profit(data: &mut Dataset) -> Result<(), DataError> {
    let premium = data.numeric(TOTAL_PREMIUM)?;
    let claims = data.numeric(TOTAL_CLAIMS)?;

    let profit: Vec<Option<f64>> = premium
        .iter()
        .zip(claims.iter())
        .map(|(p, c)| Some((*p)? - (*c)?))
        .collect();

    data.insert_column(PROFIT, ColumnData::Numeric(profit))
}

/// Add the `PostalCodeGroup` column.
///
/// With `subset = None` the group is the first `n_digits` characters of the
/// postal code. With `subset = Some(n)` postal codes are ranked by mean
/// `TotalClaims`; only rows whose code is among the `n` lowest or `n` highest
/// are kept, and the group is the full code.
pub fn group_zip_codes(
    data: Dataset,
    n_digits: usize,
    subset: Option<usize>,
) -> Result<Dataset, DataError> {
    match subset {
        None => {
            let mut data = data;
            let codes = data.column(POSTAL_CODE)?;
            let groups: Vec<Option<String>> = (0..data.n_rows())
                .map(|row| {
                    codes
                        .key_at(row)
                        .map(|code| code.chars().take(n_digits).collect())
                })
                .collect();
            data.insert_column(POSTAL_CODE_GROUP, ColumnData::Text(groups))?;
            Ok(data)
        }
        Some(n_groups) => {
            let selected = extreme_claim_codes(&data, n_groups)?;
            let codes = data.column(POSTAL_CODE)?;
            let keep: Vec<usize> = (0..data.n_rows())
                .filter(|&row| {
                    codes
                        .key_at(row)
                        .is_some_and(|code| selected.contains(&code))
                })
                .collect();

            let mut subset = data.take_rows(&keep);
            let codes = subset.column(POSTAL_CODE)?;
            let groups: Vec<Option<String>> =
                (0..subset.n_rows()).map(|row| codes.key_at(row)).collect();
            subset.insert_column(POSTAL_CODE_GROUP, ColumnData::Text(groups))?;

            debug!(
                codes = selected.len(),
                rows = subset.n_rows(),
                "Selected lowest/highest mean-claim postal codes"
            );
            Ok(subset)
        }
    }
}

/// Postal codes with the `n` lowest and `n` highest mean claims.
fn extreme_claim_codes(data: &Dataset, n: usize) -> Result<HashSet<String>, DataError> {
    let claims = data.numeric(TOTAL_CLAIMS)?;
    let mut means: Vec<(String, f64)> = data
        .group_indices(POSTAL_CODE)?
        .into_iter()
        .filter_map(|(code, rows)| {
            let values: Vec<f64> = rows.iter().filter_map(|&r| claims[r]).collect();
            if values.is_empty() {
                None
            } else {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                Some((code, mean))
            }
        })
        .collect();

    means.sort_by(|a, b| a.1.total_cmp(&b.1));

    let low = means.iter().take(n);
    let high = means.iter().skip(means.len().saturating_sub(n));
    Ok(low.chain(high).map(|(code, _)| code.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    fn policies() -> Dataset {
        Dataset::from_columns(vec![
            Column::new(
                POSTAL_CODE,
                ColumnData::Numeric(vec![
                    Some(2000.0),
                    Some(2001.0),
                    Some(1234.0),
                    Some(8000.0),
                    Some(2000.0),
                ]),
            ),
            Column::new(
                TOTAL_PREMIUM,
                ColumnData::Numeric(vec![Some(100.0), Some(50.0), Some(80.0), None, Some(10.0)]),
            ),
            Column::new(
                TOTAL_CLAIMS,
                ColumnData::Numeric(vec![Some(0.0), Some(70.0), Some(10.0), Some(5.0), Some(500.0)]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_profit_is_premium_minus_claims() {
        let mut ds = policies();
        calculate_profit(&mut ds).unwrap();
        let profit = ds.numeric(PROFIT).unwrap();
        assert_eq!(profit[0], Some(100.0));
        assert_eq!(profit[1], Some(-20.0));
        assert_eq!(profit[3], None);
    }

    #[test]
    fn test_profit_is_idempotent() {
        let mut ds = policies();
        calculate_profit(&mut ds).unwrap();
        let first = ds.numeric(PROFIT).unwrap().to_vec();
        calculate_profit(&mut ds).unwrap();
        assert_eq!(ds.numeric(PROFIT).unwrap(), first.as_slice());
        assert_eq!(ds.n_columns(), 4);
    }

    #[test]
    fn test_profit_requires_columns() {
        let mut ds = Dataset::new();
        assert!(matches!(
            calculate_profit(&mut ds),
            Err(DataError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_postal_prefix_groups() {
        let ds = group_zip_codes(policies(), 3, None).unwrap();
        let groups = ds.column(POSTAL_CODE_GROUP).unwrap();
        assert_eq!(groups.key_at(0).as_deref(), Some("200"));
        assert_eq!(groups.key_at(2).as_deref(), Some("123"));
    }

    #[test]
    fn test_postal_subset_keeps_extremes() {
        // Mean claims: 2000 -> 250, 2001 -> 70, 1234 -> 10, 8000 -> 5
        let ds = group_zip_codes(policies(), 3, Some(1)).unwrap();
        let codes = ds.unique(POSTAL_CODE_GROUP).unwrap();
        assert_eq!(codes.len(), 2);
        assert!(codes.contains(&"8000".to_string()));
        assert!(codes.contains(&"2000".to_string()));
        assert_eq!(ds.n_rows(), 3);
    }
}

//! Synthetic claims data
//!
//! Generates a claims table with the same shape as the production extract:
//! policy metadata, geography, vehicle attributes, premiums and claims.
//! Provinces and vehicle types carry different claim frequencies so the
//! hypothesis tests have real effects to find. A configurable fraction of
//! cells is blanked to exercise the imputation stage.

use chrono::{Months, NaiveDate};
use rand::prelude::*;
use rand_distr::{Distribution, LogNormal, Normal};
use std::path::Path;
use tracing::info;

use super::columns::*;
use super::{format_number, Column, ColumnData, DataError, Dataset};

/// Province name, claim frequency multiplier, first postal code.
const PROVINCES: [(&str, f64, u32); 5] = [
    ("Gauteng", 1.6, 2000),
    ("Western Cape", 1.0, 7000),
    ("KwaZulu-Natal", 1.3, 4000),
    ("Eastern Cape", 0.8, 5000),
    ("Limpopo", 0.7, 700),
];

/// Vehicle type and premium multiplier.
const VEHICLE_TYPES: [(&str, f64); 4] = [
    ("Passenger Vehicle", 1.0),
    ("Medium Commercial", 1.4),
    ("Heavy Commercial", 2.1),
    ("Light Commercial", 1.2),
];

const MAKES: [&str; 5] = ["TOYOTA", "VOLKSWAGEN", "MERCEDES-BENZ", "NISSAN", "FORD"];
const COVER_TYPES: [&str; 4] = ["Own Damage", "Third Party", "Windscreen", "Passenger Liability"];
const MARITAL_STATUSES: [&str; 3] = ["Single", "Married", "Not specified"];

/// Base monthly premium before multipliers.
const BASE_PREMIUM: f64 = 60.0;
/// Base monthly claim probability before the province multiplier.
const BASE_CLAIM_RATE: f64 = 0.05;

/// Generator settings.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub rows: usize,
    pub seed: u64,
    /// Fraction of cells blanked in the nullable columns.
    pub missing_rate: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            rows: 5_000,
            seed: 42,
            missing_rate: 0.02,
        }
    }
}

/// Generate a synthetic claims table.
pub fn generate(config: &SyntheticConfig) -> Result<Dataset, DataError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let n = config.rows;

    let premium_noise = Normal::<f64>::new(1.0, 0.15).map_err(invalid_distribution)?;
    let claim_size = LogNormal::<f64>::new(8.5, 1.0).map_err(invalid_distribution)?;
    let start = NaiveDate::from_ymd_opt(2013, 10, 1)
        .ok_or_else(|| DataError::InvalidParameter("start month".to_string()))?;

    let mut policy_id = Vec::with_capacity(n);
    let mut month = Vec::with_capacity(n);
    let mut intro = Vec::with_capacity(n);
    let mut gender = Vec::with_capacity(n);
    let mut marital = Vec::with_capacity(n);
    let mut province = Vec::with_capacity(n);
    let mut postal = Vec::with_capacity(n);
    let mut vehicle = Vec::with_capacity(n);
    let mut make = Vec::with_capacity(n);
    let mut cover = Vec::with_capacity(n);
    let mut kilowatts = Vec::with_capacity(n);
    let mut sum_insured = Vec::with_capacity(n);
    let mut premium = Vec::with_capacity(n);
    let mut claims = Vec::with_capacity(n);

    for row in 0..n {
        let (prov, claim_mult, postal_base) = PROVINCES[rng.gen_range(0..PROVINCES.len())];
        let (vtype, premium_mult) = VEHICLE_TYPES[rng.gen_range(0..VEHICLE_TYPES.len())];
        let is_male = rng.gen_bool(0.5);

        let kw = rng.gen_range(50.0..180.0_f64).round();
        let insured = (rng.gen_range(20_000.0..400_000.0_f64) / 100.0).round() * 100.0;
        let monthly_premium =
            (BASE_PREMIUM * premium_mult * (kw / 100.0) * premium_noise.sample(&mut rng)).max(0.0);

        let claim_prob = (BASE_CLAIM_RATE * claim_mult * if is_male { 1.1 } else { 0.9 }).min(1.0);
        let claim: f64 = if rng.gen_bool(claim_prob) {
            claim_size.sample(&mut rng)
        } else {
            0.0
        };

        let txn_month = start
            .checked_add_months(Months::new(rng.gen_range(0..22)))
            .unwrap_or(start);
        let intro_month = rng.gen_range(1..=12);
        let intro_year = rng.gen_range(1995..=2014);

        policy_id.push(Some((row / 3 + 1) as f64));
        month.push(Some(format!("{} 00:00:00", txn_month.format("%Y-%m-%d"))));
        intro.push(Some(format!("{intro_month}/{intro_year}")));
        gender.push(Some(if is_male { "Male" } else { "Female" }.to_string()));
        marital.push(Some(
            MARITAL_STATUSES[rng.gen_range(0..MARITAL_STATUSES.len())].to_string(),
        ));
        province.push(Some(prov.to_string()));
        postal.push(Some(f64::from(postal_base + rng.gen_range(0..40))));
        vehicle.push(Some(vtype.to_string()));
        make.push(Some(MAKES[rng.gen_range(0..MAKES.len())].to_string()));
        cover.push(Some(COVER_TYPES[rng.gen_range(0..COVER_TYPES.len())].to_string()));
        kilowatts.push(Some(kw));
        sum_insured.push(Some(insured));
        premium.push(Some((monthly_premium * 100.0).round() / 100.0));
        claims.push(Some((claim * 100.0).round() / 100.0));
    }

    blank_cells(&mut rng, &mut marital, config.missing_rate);
    blank_cells(&mut rng, &mut vehicle, config.missing_rate);
    blank_cells(&mut rng, &mut make, config.missing_rate);
    blank_cells(&mut rng, &mut kilowatts, config.missing_rate);
    blank_cells(&mut rng, &mut sum_insured, config.missing_rate);

    let dataset = Dataset::from_columns(vec![
        Column::new(POLICY_ID, ColumnData::Numeric(policy_id)),
        Column::new(TRANSACTION_MONTH, ColumnData::Text(month)),
        Column::new(VEHICLE_INTRO_DATE, ColumnData::Text(intro)),
        Column::new(GENDER, ColumnData::Text(gender)),
        Column::new("MaritalStatus", ColumnData::Text(marital)),
        Column::new(PROVINCE, ColumnData::Text(province)),
        Column::new(POSTAL_CODE, ColumnData::Numeric(postal)),
        Column::new(VEHICLE_TYPE, ColumnData::Text(vehicle)),
        Column::new("Make", ColumnData::Text(make)),
        Column::new("CoverType", ColumnData::Text(cover)),
        Column::new("kilowatts", ColumnData::Numeric(kilowatts)),
        Column::new("SumInsured", ColumnData::Numeric(sum_insured)),
        Column::new(TOTAL_PREMIUM, ColumnData::Numeric(premium)),
        Column::new(TOTAL_CLAIMS, ColumnData::Numeric(claims)),
    ])?;

    info!(rows = n, seed = config.seed, "Generated synthetic claims data");
    Ok(dataset)
}

/// Write a dataset as delimited text with a header row. Nulls become empty cells.
pub fn write_delimited(
    dataset: &Dataset,
    path: impl AsRef<Path>,
    delimiter: u8,
) -> Result<(), DataError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path.as_ref())?;

    writer.write_record(dataset.column_names())?;
    let columns: Vec<&ColumnData> = dataset.columns().map(|c| &c.data).collect();
    for row in 0..dataset.n_rows() {
        let record: Vec<String> = columns
            .iter()
            .map(|col| match col {
                ColumnData::Numeric(v) => v[row].map(format_number).unwrap_or_default(),
                other => other.key_at(row).unwrap_or_default(),
            })
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn blank_cells<T>(rng: &mut StdRng, cells: &mut [Option<T>], rate: f64) {
    if rate <= 0.0 {
        return;
    }
    let rate = rate.min(1.0);
    for cell in cells.iter_mut() {
        if rng.gen_bool(rate) {
            *cell = None;
        }
    }
}

fn invalid_distribution(e: impl std::fmt::Display) -> DataError {
    DataError::InvalidParameter(format!("distribution: {e}"))
}

//! Tabular data layer
//!
//! - `frame`: columnar `Dataset` with numeric, categorical, timestamp and text columns
//! - `loader`: delimited-file loading with column type inference (csv crate)
//! - `features`: derived columns (profit, postal-code groups)
//! - `synthetic`: reproducible synthetic claims data for demos and tests

pub mod features;
pub mod frame;
pub mod loader;
pub mod synthetic;

pub use features::{calculate_profit, group_zip_codes};
pub use frame::{format_number, Column, ColumnData, ColumnKind, Dataset};
pub use loader::{load_data, read_delimited};

use thiserror::Error;

/// Well-known column names of the claims dataset.
pub mod columns {
    pub const POLICY_ID: &str = "PolicyID";
    pub const TRANSACTION_MONTH: &str = "TransactionMonth";
    pub const VEHICLE_INTRO_DATE: &str = "VehicleIntroDate";
    pub const PROVINCE: &str = "Province";
    pub const POSTAL_CODE: &str = "PostalCode";
    pub const POSTAL_CODE_GROUP: &str = "PostalCodeGroup";
    pub const VEHICLE_TYPE: &str = "VehicleType";
    pub const GENDER: &str = "Gender";
    pub const TOTAL_PREMIUM: &str = "TotalPremium";
    pub const TOTAL_CLAIMS: &str = "TotalClaims";
    pub const PROFIT: &str = "Profit";

    /// Columns parsed as timestamps during type conversion.
    pub const DATE_COLUMNS: [&str; 2] = [TRANSACTION_MONTH, VEHICLE_INTRO_DATE];

    /// Columns treated as categorical during type conversion (when present).
    pub const CATEGORICAL_COLUMNS: [&str; 34] = [
        "IsVATRegistered",
        "Citizenship",
        "LegalType",
        "Title",
        "Language",
        "Bank",
        "AccountType",
        "MaritalStatus",
        "Gender",
        "Country",
        "Province",
        "PostalCode",
        "MainCrestaZone",
        "SubCrestaZone",
        "ItemType",
        "Mmcode",
        "VehicleType",
        "Make",
        "Model",
        "Bodytype",
        "AlarmImmobiliser",
        "TrackingDevice",
        "NewVehicle",
        "WrittenOff",
        "Rebuilt",
        "Converted",
        "CrossBorder",
        "CoverCategory",
        "CoverType",
        "CoverGroup",
        "Section",
        "Product",
        "StatutoryClass",
        "StatutoryRiskType",
    ];
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column {column} is {actual}, expected {expected}")]
    KindMismatch {
        column: String,
        expected: ColumnKind,
        actual: ColumnKind,
    },

    #[error("Column {column} has {actual} rows, dataset has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Column {column} contains {count} null values")]
    NullValues { column: String, count: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

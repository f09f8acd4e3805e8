//! CSV import of tax calculation requests.
//!
//! ## CSV Format
//!
//! Columns are matched by header name, so order does not matter. Header names
//! are case-sensitive.
//!
//! | Column                | Required | Type    | Notes                                   |
//! |-----------------------|----------|---------|-----------------------------------------|
//! | `user_id`             | yes      | string  | Owner of the calculation                |
//! | `tax_category`        | yes      | string  | e.g. `PPH_21`; unknown codes are kept   |
//! | `calculation_type`    | no       | string  | `MONTHLY` .. `SPECIAL`, default `ANNUAL`|
//! | `period`              | yes      | string  | Free text, e.g. `2025-03`               |
//! | `year`                | yes      | integer | e.g. `2025`                             |
//! | `gross_income`        | yes      | decimal |                                         |
//! | `deductible_expenses` | no       | decimal | Empty cell reads as `0`                 |
//! | `tax_deductions`      | no       | decimal | Empty cell reads as `0`                 |
//! | `tax_credits`         | no       | decimal | Empty cell reads as `0`                 |
//! | `previous_tax_paid`   | no       | decimal | Empty cell reads as `0`                 |
//! | `notes`               | no       | string  |                                         |
//!
//! ### Minimal example
//!
//! ```csv
//! user_id,tax_category,period,year,gross_income
//! wp-001,PPN,2025-03,2025,100000000
//! ```

use std::path::Path;

use pajak_core::{
    CalculationError, CalculationType, NewTaxCalculation, TaxCategory, TaxInputs, parse_amount,
};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Serde-compatible row that mirrors the CSV layout exactly
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CsvRow {
    user_id: String,
    tax_category: String,
    #[serde(default)]
    calculation_type: Option<String>,
    period: String,
    year: i32,
    gross_income: String,
    #[serde(default)]
    deductible_expenses: Option<String>,
    #[serde(default)]
    tax_deductions: Option<String>,
    #[serde(default)]
    tax_credits: Option<String>,
    #[serde(default)]
    previous_tax_paid: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Public error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CsvImportError {
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Bad structure, a missing required column or a non-integer year.
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// An amount cell is not a number. `row` is 1-based, header excluded.
    #[error("row {row}: {source}")]
    InvalidAmount {
        row: usize,
        #[source]
        source: CalculationError,
    },

    #[error("unrecognised calculation type '{value}' on row {row}")]
    InvalidCalculationType { value: String, row: usize },

    #[error("row {row}: {column} must not be empty")]
    MissingValue { column: &'static str, row: usize },
}

// ---------------------------------------------------------------------------
// Core loader
// ---------------------------------------------------------------------------

fn amount(
    field: &str,
    raw: Option<&str>,
    row: usize,
) -> Result<rust_decimal::Decimal, CsvImportError> {
    parse_amount(field, raw.unwrap_or_default())
        .map_err(|source| CsvImportError::InvalidAmount { row, source })
}

fn convert_row(
    row: CsvRow,
    row_number: usize,
) -> Result<NewTaxCalculation, CsvImportError> {
    if row.user_id.is_empty() {
        return Err(CsvImportError::MissingValue {
            column: "user_id",
            row: row_number,
        });
    }
    if row.tax_category.is_empty() {
        return Err(CsvImportError::MissingValue {
            column: "tax_category",
            row: row_number,
        });
    }
    if row.gross_income.is_empty() {
        return Err(CsvImportError::MissingValue {
            column: "gross_income",
            row: row_number,
        });
    }

    let calculation_type = match row.calculation_type.as_deref() {
        None | Some("") => CalculationType::default(),
        Some(code) => CalculationType::parse(code).ok_or_else(|| {
            CsvImportError::InvalidCalculationType {
                value: code.to_string(),
                row: row_number,
            }
        })?,
    };

    let inputs = TaxInputs {
        gross_income: amount("grossIncome", Some(&row.gross_income), row_number)?,
        deductible_expenses: amount(
            "deductibleExpenses",
            row.deductible_expenses.as_deref(),
            row_number,
        )?,
        tax_deductions: amount("taxDeductions", row.tax_deductions.as_deref(), row_number)?,
        tax_credits: amount("taxCredits", row.tax_credits.as_deref(), row_number)?,
        previous_tax_paid: amount(
            "previousTaxPaid",
            row.previous_tax_paid.as_deref(),
            row_number,
        )?,
    };

    Ok(NewTaxCalculation {
        user_id: row.user_id,
        tax_category: TaxCategory::parse(&row.tax_category),
        calculation_type,
        period: row.period,
        year: row.year,
        inputs,
        notes: row.notes.filter(|n| !n.is_empty()),
    })
}

/// Parse CSV text and return the calculation requests in file order.
///
/// # Errors
///
/// * [`CsvImportError::Parse`] if the CSV is structurally invalid.
/// * [`CsvImportError::InvalidAmount`], [`CsvImportError::InvalidCalculationType`]
///   or [`CsvImportError::MissingValue`] for the first bad row.
pub fn load_from_str(input: &str) -> Result<Vec<NewTaxCalculation>, CsvImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| {
            let row = result?;
            convert_row(row, idx + 1)
        })
        .collect()
}

/// Read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(path: &Path) -> Result<Vec<NewTaxCalculation>, CsvImportError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CsvImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_from_str(&contents)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const MINIMAL_CSV: &str = "\
user_id,tax_category,period,year,gross_income
wp-001,PPN,2025-03,2025,100000000
";

    const FULL_CSV: &str = "\
user_id,tax_category,calculation_type,period,year,gross_income,deductible_expenses,tax_deductions,tax_credits,previous_tax_paid,notes
wp-001,PPH_21,ANNUAL,2025,2025,70000000,10000000,0,500000,1000000,salary
wp-002,PPH_25,MONTHLY,2025-04,2025,1000,,,,,
wp-003,RETRIBUSI,SPECIAL,Q1,2025,5000000,1000000,,,,
";

    #[test]
    fn test_minimal_csv_defaults() {
        let requests = load_from_str(MINIMAL_CSV).expect("should parse minimal CSV");

        assert_eq!(requests.len(), 1);
        let r = &requests[0];
        assert_eq!(r.user_id, "wp-001");
        assert_eq!(r.tax_category, TaxCategory::Ppn);
        assert_eq!(r.calculation_type, CalculationType::Annual);
        assert_eq!(r.year, 2025);
        assert_eq!(r.inputs, TaxInputs::new(dec!(100000000)));
        assert_eq!(r.notes, None);
    }

    #[test]
    fn test_full_csv_rows_in_order() {
        let requests = load_from_str(FULL_CSV).expect("should parse full CSV");

        let users: Vec<&str> = requests.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(users, vec!["wp-001", "wp-002", "wp-003"]);

        let first = &requests[0];
        assert_eq!(
            first.inputs,
            TaxInputs {
                gross_income: dec!(70000000),
                deductible_expenses: dec!(10000000),
                tax_deductions: dec!(0),
                tax_credits: dec!(500000),
                previous_tax_paid: dec!(1000000),
            }
        );
        assert_eq!(first.notes.as_deref(), Some("salary"));
        assert_eq!(requests[1].calculation_type, CalculationType::Monthly);
        assert_eq!(requests[1].inputs, TaxInputs::new(dec!(1000)));
    }

    #[test]
    fn test_unknown_category_is_kept_verbatim() {
        let requests = load_from_str(FULL_CSV).expect("should parse full CSV");

        assert_eq!(requests[2].tax_category.as_str(), "RETRIBUSI");
        assert!(!requests[2].tax_category.is_known());
    }

    #[test]
    fn test_non_numeric_amount_reports_row() {
        let csv = "\
user_id,tax_category,period,year,gross_income,tax_credits
wp-001,PPN,2025-03,2025,100000000,0
wp-002,PPN,2025-03,2025,100000000,banyak
";
        let err = load_from_str(csv).expect_err("should reject bad amount");

        match err {
            CsvImportError::InvalidAmount { row, source } => {
                assert_eq!(row, 2);
                assert!(matches!(source, CalculationError::InvalidInput(msg) if msg.contains("banyak")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_calculation_type_reports_row() {
        let csv = "\
user_id,tax_category,calculation_type,period,year,gross_income
wp-001,PPN,WEEKLY,2025-03,2025,1
";
        let err = load_from_str(csv).expect_err("should reject calculation type");

        assert!(matches!(
            err,
            CsvImportError::InvalidCalculationType { ref value, row: 1 } if value == "WEEKLY"
        ));
    }

    #[test]
    fn test_blank_gross_income_is_rejected() {
        let csv = "\
user_id,tax_category,period,year,gross_income
wp-001,PPN,2025-03,2025,
";
        let err = load_from_str(csv).expect_err("gross income is required");

        assert!(matches!(
            err,
            CsvImportError::MissingValue {
                column: "gross_income",
                row: 1
            }
        ));
    }

    #[test]
    fn test_missing_required_column_is_a_parse_error() {
        let csv = "\
user_id,tax_category,period,gross_income
wp-001,PPN,2025-03,1
";
        let err = load_from_str(csv).expect_err("year column is required");

        assert!(matches!(err, CsvImportError::Parse(_)));
    }

    #[test]
    fn test_ragged_row_is_a_parse_error() {
        let csv = "\
user_id,tax_category,period,year,gross_income
wp-001,PPN,2025-03,2025
";
        assert!(matches!(load_from_str(csv), Err(CsvImportError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load_from_file(Path::new("/nonexistent/requests.csv"))
            .expect_err("file does not exist");

        assert!(matches!(err, CsvImportError::Io { .. }));
    }
}

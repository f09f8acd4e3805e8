use std::str::FromStr;

use pajak_core::RepositoryError;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};

fn read_failed(column: &str, storage: &str, e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(format!("cannot read {storage} column '{column}': {e}"))
}

/// Reads an amount column.
///
/// Amounts are written as TEXT, but INTEGER and REAL cells (hand-edited rows,
/// older imports) are accepted too. NULL reads as zero.
pub fn get_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw = row
        .try_get_raw(column)
        .map_err(|e| RepositoryError::Database(format!("no column '{column}': {e}")))?;
    if raw.is_null() {
        return Ok(Decimal::ZERO);
    }
    let storage = raw.type_info().name().to_string();

    match storage.as_str() {
        "TEXT" => {
            let text: String = row
                .try_get(column)
                .map_err(|e| read_failed(column, &storage, e))?;
            parse_decimal(&text).ok_or_else(|| {
                RepositoryError::Database(format!(
                    "column '{column}' holds '{text}', which is not a decimal"
                ))
            })
        }
        "INTEGER" => row
            .try_get::<i64, _>(column)
            .map(Decimal::from)
            .map_err(|e| read_failed(column, &storage, e)),
        "REAL" => {
            let real: f64 = row
                .try_get(column)
                .map_err(|e| read_failed(column, &storage, e))?;
            Decimal::try_from(real).map_err(|e| {
                RepositoryError::Database(format!("column '{column}' holds {real}: {e}"))
            })
        }
        other => Err(RepositoryError::Database(format!(
            "Unexpected type '{other}' for amount column '{column}'"
        ))),
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Exact TEXT form of an amount, scale preserved.
pub fn decimal_to_text(d: Decimal) -> String {
    d.to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    /// One-row table whose single `amount` cell has no declared type, so each
    /// test chooses the storage class by what it inserts.
    async fn cell(literal: &str) -> (SqlitePool, SqliteRow) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite opens");
        sqlx::query("CREATE TABLE cells (amount)")
            .execute(&pool)
            .await
            .expect("table is created");
        sqlx::query(&format!("INSERT INTO cells (amount) VALUES ({literal})"))
            .execute(&pool)
            .await
            .expect("cell is inserted");
        let row = sqlx::query("SELECT amount FROM cells")
            .fetch_one(&pool)
            .await
            .expect("cell is read back");
        (pool, row)
    }

    async fn read(literal: &str) -> Result<Decimal, RepositoryError> {
        let (_pool, row) = cell(literal).await;
        get_decimal(&row, "amount")
    }

    #[tokio::test]
    async fn text_keeps_its_scale() {
        let value = read("'1500000.00'").await.expect("text parses");

        assert_eq!(value, dec!(1500000.00));
        assert_eq!(value.to_string(), "1500000.00");
    }

    #[tokio::test]
    async fn text_with_long_fraction_is_exact() {
        assert_eq!(
            read("'20.833333333333333333333333333'").await,
            Ok(dec!(20.833333333333333333333333333))
        );
    }

    #[tokio::test]
    async fn scientific_text_is_accepted() {
        assert_eq!(read("'6e7'").await, Ok(dec!(60000000)));
    }

    #[tokio::test]
    async fn non_numeric_text_names_the_value() {
        let result = read("'lots'").await;

        assert!(matches!(result, Err(RepositoryError::Database(msg)) if msg.contains("lots")));
    }

    #[tokio::test]
    async fn integer_and_real_cells_are_read() {
        assert_eq!(read("12345").await, Ok(dec!(12345)));
        assert_eq!(read("0.25").await, Ok(dec!(0.25)));
    }

    #[tokio::test]
    async fn null_is_zero() {
        assert_eq!(read("NULL").await, Ok(Decimal::ZERO));
    }

    #[tokio::test]
    async fn blob_is_rejected() {
        let result = read("x'00ff'").await;

        assert!(
            matches!(result, Err(RepositoryError::Database(msg)) if msg.contains("Unexpected type"))
        );
    }

    #[tokio::test]
    async fn unknown_column_is_an_error() {
        let (_pool, row) = cell("1").await;

        let result = get_decimal(&row, "tax_rate");

        assert!(matches!(result, Err(RepositoryError::Database(msg)) if msg.contains("tax_rate")));
    }

    #[test]
    fn text_form_is_exact() {
        assert_eq!(decimal_to_text(dec!(0.005)), "0.005");
        assert_eq!(decimal_to_text(dec!(-5000000)), "-5000000");
        assert_eq!(decimal_to_text(dec!(11000000.00)), "11000000.00");
    }
}

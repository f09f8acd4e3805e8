use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pajak_core::calculations::CalculationBreakdown;
use pajak_core::{
    CalculationFilter, CalculationRepository, CalculationStatus, CalculationType, RepositoryError,
    TaxCalculation, TaxCategory,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;

use crate::decimal::{decimal_to_text, get_decimal};

const SELECT_COLUMNS: &str = "SELECT id, user_id, tax_category, calculation_type, period, year,
        gross_income, deductible_expenses, tax_deductions, tax_credits, previous_tax_paid,
        taxable_income, tax_rate, calculated_tax, final_tax_amount,
        calculation_data, status, verified_at, notes, created_at, updated_at
    FROM tax_calculations";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens (creating if needed) the database at `database_url`.
    ///
    /// Accepts a bare path, a `sqlite:` URL or `:memory:`. An in-memory
    /// database lives inside a single connection, so the pool is pinned to
    /// one connection that is never recycled.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database url: {}", database_url))?
            .create_if_missing(true);

        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn get_text(
    row: &SqliteRow,
    column: &str,
) -> Result<String, RepositoryError> {
    row.try_get(column)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", column, e)))
}

fn encode_breakdown(calc: &TaxCalculation) -> Result<Option<String>, RepositoryError> {
    calc.calculation_data
        .as_ref()
        .map(CalculationBreakdown::to_json)
        .transpose()
        .map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn row_to_tax_calculation(row: &SqliteRow) -> Result<TaxCalculation, RepositoryError> {
    let status = get_text(row, "status")?;
    let calculation_type = get_text(row, "calculation_type")?;
    let calculation_data = row
        .try_get::<Option<String>, _>("calculation_data")
        .map_err(db_error)?
        .map(|json| CalculationBreakdown::from_json(&json))
        .transpose()
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    Ok(TaxCalculation {
        id: row.try_get("id").map_err(db_error)?,
        user_id: get_text(row, "user_id")?,
        tax_category: TaxCategory::parse(&get_text(row, "tax_category")?),
        calculation_type: CalculationType::parse(&calculation_type).ok_or_else(|| {
            RepositoryError::Database(format!("Unknown calculation type '{}'", calculation_type))
        })?,
        period: get_text(row, "period")?,
        year: row.try_get("year").map_err(db_error)?,
        gross_income: get_decimal(row, "gross_income")?,
        deductible_expenses: get_decimal(row, "deductible_expenses")?,
        tax_deductions: get_decimal(row, "tax_deductions")?,
        tax_credits: get_decimal(row, "tax_credits")?,
        previous_tax_paid: get_decimal(row, "previous_tax_paid")?,
        taxable_income: get_decimal(row, "taxable_income")?,
        tax_rate: get_decimal(row, "tax_rate")?,
        calculated_tax: get_decimal(row, "calculated_tax")?,
        final_tax_amount: get_decimal(row, "final_tax_amount")?,
        calculation_data,
        status: CalculationStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Database(format!("Unknown status '{}'", status)))?,
        verified_at: row
            .try_get::<Option<DateTime<Utc>>, _>("verified_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get verified_at: {}", e)))?,
        notes: row.try_get("notes").map_err(db_error)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
        updated_at: row
            .try_get::<DateTime<Utc>, _>("updated_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get updated_at: {}", e)))?,
    })
}

#[async_trait]
impl CalculationRepository for SqliteRepository {
    async fn create_calculation(
        &self,
        mut calc: TaxCalculation,
    ) -> Result<TaxCalculation, RepositoryError> {
        let calculation_data = encode_breakdown(&calc)?;

        let result = sqlx::query(
            "INSERT INTO tax_calculations (
                user_id, tax_category, calculation_type, period, year,
                gross_income, deductible_expenses, tax_deductions, tax_credits, previous_tax_paid,
                taxable_income, tax_rate, calculated_tax, final_tax_amount,
                calculation_data, status, verified_at, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&calc.user_id)
        .bind(calc.tax_category.as_str())
        .bind(calc.calculation_type.as_str())
        .bind(&calc.period)
        .bind(calc.year)
        .bind(decimal_to_text(calc.gross_income))
        .bind(decimal_to_text(calc.deductible_expenses))
        .bind(decimal_to_text(calc.tax_deductions))
        .bind(decimal_to_text(calc.tax_credits))
        .bind(decimal_to_text(calc.previous_tax_paid))
        .bind(decimal_to_text(calc.taxable_income))
        .bind(decimal_to_text(calc.tax_rate))
        .bind(decimal_to_text(calc.calculated_tax))
        .bind(decimal_to_text(calc.final_tax_amount))
        .bind(calculation_data)
        .bind(calc.status.as_str())
        .bind(calc.verified_at)
        .bind(&calc.notes)
        .bind(calc.created_at)
        .bind(calc.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        calc.id = result.last_insert_rowid();
        debug!(id = calc.id, "inserted tax calculation");
        Ok(calc)
    }

    async fn get_calculation(
        &self,
        id: i64,
    ) -> Result<TaxCalculation, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_tax_calculation(&row)
    }

    async fn update_calculation(
        &self,
        calc: &TaxCalculation,
    ) -> Result<(), RepositoryError> {
        let calculation_data = encode_breakdown(calc)?;

        // One statement, so amounts, breakdown and status land together.
        let result = sqlx::query(
            "UPDATE tax_calculations SET
                user_id = ?, tax_category = ?, calculation_type = ?, period = ?, year = ?,
                gross_income = ?, deductible_expenses = ?, tax_deductions = ?,
                tax_credits = ?, previous_tax_paid = ?,
                taxable_income = ?, tax_rate = ?, calculated_tax = ?, final_tax_amount = ?,
                calculation_data = ?, status = ?, verified_at = ?, notes = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&calc.user_id)
        .bind(calc.tax_category.as_str())
        .bind(calc.calculation_type.as_str())
        .bind(&calc.period)
        .bind(calc.year)
        .bind(decimal_to_text(calc.gross_income))
        .bind(decimal_to_text(calc.deductible_expenses))
        .bind(decimal_to_text(calc.tax_deductions))
        .bind(decimal_to_text(calc.tax_credits))
        .bind(decimal_to_text(calc.previous_tax_paid))
        .bind(decimal_to_text(calc.taxable_income))
        .bind(decimal_to_text(calc.tax_rate))
        .bind(decimal_to_text(calc.calculated_tax))
        .bind(decimal_to_text(calc.final_tax_amount))
        .bind(calculation_data)
        .bind(calc.status.as_str())
        .bind(calc.verified_at)
        .bind(&calc.notes)
        .bind(calc.updated_at)
        .bind(calc.id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        debug!(id = calc.id, status = %calc.status, "updated tax calculation");
        Ok(())
    }

    async fn delete_calculation(
        &self,
        id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax_calculations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        debug!(id, "deleted tax calculation");
        Ok(())
    }

    async fn list_calculations(
        &self,
        filter: &CalculationFilter,
    ) -> Result<Vec<TaxCalculation>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        query.push(" WHERE 1 = 1");

        if let Some(user_id) = &filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id.clone());
        }
        if let Some(year) = filter.year {
            query.push(" AND year = ").push_bind(year);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(category) = &filter.tax_category {
            query
                .push(" AND tax_category = ")
                .push_bind(category.as_str().to_string());
        }
        query.push(" ORDER BY id DESC");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter().map(row_to_tax_calculation).collect()
    }
}

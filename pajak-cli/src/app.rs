//! Command-line surface of the `pajak` binary.
//!
//! Every command prints JSON on stdout; logs go to stderr.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, warn};

use pajak_core::db::{DbConfig, InMemoryRepositoryFactory, RepositoryRegistry};
use pajak_core::workflow::CalculationService;
use pajak_core::{
    Actor, ActorRole, CalculationError, CalculationFilter, CalculationStatus, CalculationType,
    CalculationUpdate, InputChanges, NewTaxCalculation, RoleBasedPolicy, TaxCategory, TaxInputs,
    parse_amount,
};
use pajak_db_sqlite::SqliteRepositoryFactory;

use crate::config::AppConfig;
use crate::csv_import;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Tax computation and approval workflow for SPT calculations.
#[derive(Debug, Parser)]
#[command(name = "pajak", version, about, long_about = None)]
pub struct Cli {
    /// TOML config file. Defaults to `pajak.toml` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database backend (`sqlite` or `memory`). Overrides the config file.
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database connection string, e.g. `pajak.db`. Overrides the config file.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Log filter directive, e.g. `debug`. `RUST_LOG` still wins.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Id of the user running the command.
    #[arg(long, global = true, default_value = "cli")]
    pub user: String,

    /// Role of the user running the command.
    #[arg(long, global = true, default_value = "TAXPAYER", value_parser = parse_role)]
    pub role: ActorRole,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Config file values with command-line overrides applied.
    pub fn db_config(
        &self,
        config: &AppConfig,
    ) -> DbConfig {
        DbConfig {
            backend: self
                .backend
                .clone()
                .unwrap_or_else(|| config.database.backend.clone()),
            connection_string: self
                .db
                .clone()
                .unwrap_or_else(|| config.database.connection_string.clone()),
        }
    }

    pub fn log_level<'a>(
        &'a self,
        config: &'a AppConfig,
    ) -> Option<&'a str> {
        self.log_level
            .as_deref()
            .or(config.logging.level.as_deref())
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user.clone(), self.role)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute a liability without storing anything.
    Compute {
        #[arg(long)]
        category: String,
        #[command(flatten)]
        inputs: InputArgs,
    },
    /// Store a new calculation (computed, or a draft with `--draft`).
    Create(CreateArgs),
    /// Compute a stored draft.
    Calculate { id: i64 },
    /// Print one calculation.
    Show { id: i64 },
    /// List calculations, newest first.
    List(FilterArgs),
    /// Edit amounts, status or notes of a calculation.
    Update(UpdateArgs),
    /// Delete a calculation (tax officers and admins only).
    Delete { id: i64 },
    /// Check a stored calculation against its breakdown.
    Audit { id: i64 },
    /// Per-user totals over the matching calculations.
    Summary(FilterArgs),
    /// Create one computed calculation per CSV row.
    ///
    /// Rows are stored one at a time. If a row fails, the rows stored before
    /// it are printed and kept.
    Import { file: PathBuf },
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    #[arg(long)]
    pub gross_income: String,
    #[arg(long, default_value = "0")]
    pub deductible_expenses: String,
    #[arg(long, default_value = "0")]
    pub tax_deductions: String,
    #[arg(long, default_value = "0")]
    pub tax_credits: String,
    #[arg(long, default_value = "0")]
    pub previous_tax_paid: String,
}

impl InputArgs {
    pub fn to_inputs(&self) -> Result<TaxInputs, CalculationError> {
        Ok(TaxInputs {
            gross_income: parse_amount("grossIncome", &self.gross_income)?,
            deductible_expenses: parse_amount("deductibleExpenses", &self.deductible_expenses)?,
            tax_deductions: parse_amount("taxDeductions", &self.tax_deductions)?,
            tax_credits: parse_amount("taxCredits", &self.tax_credits)?,
            previous_tax_paid: parse_amount("previousTaxPaid", &self.previous_tax_paid)?,
        })
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct InputChangeArgs {
    #[arg(long)]
    pub gross_income: Option<String>,
    #[arg(long)]
    pub deductible_expenses: Option<String>,
    #[arg(long)]
    pub tax_deductions: Option<String>,
    #[arg(long)]
    pub tax_credits: Option<String>,
    #[arg(long)]
    pub previous_tax_paid: Option<String>,
}

fn optional_amount(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<rust_decimal::Decimal>, CalculationError> {
    raw.map(|raw| parse_amount(field, raw)).transpose()
}

impl InputChangeArgs {
    pub fn to_changes(&self) -> Result<InputChanges, CalculationError> {
        Ok(InputChanges {
            gross_income: optional_amount("grossIncome", self.gross_income.as_deref())?,
            deductible_expenses: optional_amount(
                "deductibleExpenses",
                self.deductible_expenses.as_deref(),
            )?,
            tax_deductions: optional_amount("taxDeductions", self.tax_deductions.as_deref())?,
            tax_credits: optional_amount("taxCredits", self.tax_credits.as_deref())?,
            previous_tax_paid: optional_amount(
                "previousTaxPaid",
                self.previous_tax_paid.as_deref(),
            )?,
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    /// Owner of the calculation. Defaults to `--user`.
    #[arg(long)]
    pub owner: Option<String>,
    #[arg(long)]
    pub category: String,
    #[arg(long, default_value = "ANNUAL", value_parser = parse_calculation_type)]
    pub calculation_type: CalculationType,
    #[arg(long)]
    pub period: String,
    #[arg(long)]
    pub year: i32,
    #[arg(long)]
    pub notes: Option<String>,
    /// Store without computing.
    #[arg(long, default_value_t = false)]
    pub draft: bool,
    #[command(flatten)]
    pub inputs: InputArgs,
}

#[derive(Debug, Clone, Args)]
pub struct UpdateArgs {
    pub id: i64,
    #[command(flatten)]
    pub inputs: InputChangeArgs,
    #[arg(long, value_parser = parse_status)]
    pub status: Option<CalculationStatus>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[arg(long)]
    pub owner: Option<String>,
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long, value_parser = parse_status)]
    pub status: Option<CalculationStatus>,
    #[arg(long)]
    pub category: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> CalculationFilter {
        CalculationFilter {
            user_id: self.owner.clone(),
            year: self.year,
            status: self.status,
            tax_category: self.category.as_deref().map(TaxCategory::parse),
        }
    }
}

fn parse_role(s: &str) -> Result<ActorRole, String> {
    ActorRole::parse(&s.to_ascii_uppercase())
        .ok_or_else(|| format!("unknown role '{s}' (expected TAXPAYER, TAX_OFFICER or ADMIN)"))
}

fn parse_status(s: &str) -> Result<CalculationStatus, String> {
    CalculationStatus::parse(&s.to_ascii_uppercase()).ok_or_else(|| {
        format!("unknown status '{s}' (expected DRAFT, CALCULATED, VERIFIED, APPROVED or REJECTED)")
    })
}

fn parse_calculation_type(s: &str) -> Result<CalculationType, String> {
    CalculationType::parse(&s.to_ascii_uppercase()).ok_or_else(|| {
        format!("unknown calculation type '{s}' (expected MONTHLY, QUARTERLY, SEMI_ANNUAL, ANNUAL or SPECIAL)")
    })
}

// ─── wiring ──────────────────────────────────────────────────────────────────

/// Registry with every backend this binary ships.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry.register(Box::new(InMemoryRepositoryFactory));
    registry
}

/// Opens the configured store and wraps it in a service with the default
/// role policy.
pub async fn connect(config: &DbConfig) -> Result<CalculationService> {
    debug!("connecting to {} backend", config.backend);
    let repository = build_registry()
        .create(config)
        .await
        .with_context(|| format!("failed to open '{}' backend", config.backend))?;

    Ok(CalculationService::new(
        Arc::from(repository),
        Arc::new(RoleBasedPolicy),
    ))
}

pub async fn run(
    cli: Cli,
    config: AppConfig,
) -> Result<()> {
    let service = connect(&cli.db_config(&config)).await?;
    let actor = cli.actor();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&service, &actor, cli.command, &mut out).await
}

fn print_json<W: Write, T: Serialize>(
    out: &mut W,
    value: &T,
) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to write JSON output")?;
    writeln!(out)?;
    Ok(())
}

// ─── commands ────────────────────────────────────────────────────────────────

pub async fn execute<W: Write>(
    service: &CalculationService,
    actor: &Actor,
    command: Command,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Compute { category, inputs } => {
            let computation =
                service.preview(&TaxCategory::parse(&category), &inputs.to_inputs()?)?;
            print_json(out, &computation)
        }
        Command::Create(args) => {
            let request = NewTaxCalculation {
                user_id: args.owner.unwrap_or_else(|| actor.user_id.clone()),
                tax_category: TaxCategory::parse(&args.category),
                calculation_type: args.calculation_type,
                period: args.period,
                year: args.year,
                inputs: args.inputs.to_inputs()?,
                notes: args.notes,
            };
            let created = if args.draft {
                service.create_draft(actor, request).await?
            } else {
                service.create(actor, request).await?
            };
            print_json(out, &created)
        }
        Command::Calculate { id } => print_json(out, &service.calculate_draft(actor, id).await?),
        Command::Show { id } => print_json(out, &service.get(id).await?),
        Command::List(filter) => print_json(out, &service.list(&filter.to_filter()).await?),
        Command::Update(args) => {
            let update = CalculationUpdate {
                inputs: args.inputs.to_changes()?,
                status: args.status,
                notes: args.notes,
            };
            print_json(out, &service.update(actor, args.id, update).await?)
        }
        Command::Delete { id } => {
            service.delete(actor, id).await?;
            print_json(out, &serde_json::json!({ "deleted": id }))
        }
        Command::Audit { id } => {
            let report = service.audit(id).await?;
            print_json(out, &report)?;
            if !report.is_consistent() {
                bail!(
                    "calculation {id} disagrees with its breakdown in {} field(s)",
                    report.mismatches.len()
                );
            }
            Ok(())
        }
        Command::Summary(filter) => {
            print_json(out, &service.summarize(&filter.to_filter()).await?)
        }
        Command::Import { file } => {
            let requests = csv_import::load_from_file(&file)
                .with_context(|| format!("failed to import {}", file.display()))?;

            let mut created = Vec::with_capacity(requests.len());
            for (idx, request) in requests.into_iter().enumerate() {
                match service.create(actor, request).await {
                    Ok(record) => created.push(record),
                    Err(e) => {
                        warn!(
                            row = idx + 1,
                            stored = created.len(),
                            file = %file.display(),
                            "import stopped"
                        );
                        print_json(out, &created)?;
                        return Err(anyhow::Error::new(e).context(format!(
                            "row {} of {}; {} earlier row(s) stored",
                            idx + 1,
                            file.display(),
                            created.len()
                        )));
                    }
                }
            }

            info!(count = created.len(), file = %file.display(), "import finished");
            print_json(out, &created)
        }
    }
}

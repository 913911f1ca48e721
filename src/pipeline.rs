//! Stage orchestration: load, normalize, join, derive, validate, report.
//!
//! Stages run strictly one after another. Each takes the previous stage's
//! tables by reference and produces new ones, so a run owns every
//! intermediate table and nothing is shared between runs.

use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde::Serialize;

use crate::{
    config::PipelineConfig,
    derive::derive_features,
    exchange::{ExchangeRates, apply_local_currency},
    join::{DimensionJoin, JoinStats, join_fact},
    loader::{LoadError, LoadedTable, load_table},
    normalize::{CoercionReport, fill_missing_with_median, normalize_table, rules_for},
    quality::{QualityReport, quality_report},
    schema::{TableRole, columns},
    summary::{SalesSummary, summarize},
    table::Table,
    validate::{ValidationInput, ValidationOptions, ValidationReport, validate},
};

/// Load diagnostics for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub role: TableRole,
    pub path: PathBuf,
    pub encoding: Option<String>,
    pub rows: usize,
    pub columns: usize,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct LoadedSources {
    pub tables: BTreeMap<TableRole, LoadedTable>,
    pub failures: Vec<(TableRole, LoadError)>,
    pub reports: Vec<SourceReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleCoercions {
    pub role: TableRole,
    pub report: CoercionReport,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub sources: Vec<SourceReport>,
    pub coercions: Vec<RoleCoercions>,
    /// `(source header, output name)` of every join column renamed to avoid a collision.
    pub renames: Vec<(String, String)>,
    pub join_stats: Vec<JoinStats>,
    /// Joined fact table with derived columns.
    pub fact: Table,
    pub validation: ValidationReport,
    pub quality: Vec<QualityReport>,
    pub summary: SalesSummary,
}

/// Everything of a run except the fact table rows, for JSON output.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub sources: &'a [SourceReport],
    pub coercions: &'a [RoleCoercions],
    pub renames: &'a [(String, String)],
    pub join_stats: &'a [JoinStats],
    pub fact_columns: Vec<String>,
    pub validation: &'a ValidationReport,
    pub quality: &'a [QualityReport],
    pub summary: &'a SalesSummary,
}

impl PipelineOutput {
    pub fn report(&self) -> RunReport<'_> {
        RunReport {
            sources: &self.sources,
            coercions: &self.coercions,
            renames: &self.renames,
            join_stats: &self.join_stats,
            fact_columns: self.fact.headers(),
            validation: &self.validation,
            quality: &self.quality,
            summary: &self.summary,
        }
    }
}

/// Loads every configured source file. A failed file is recorded and the
/// remaining files are still attempted.
pub fn load_sources(config: &PipelineConfig) -> Result<LoadedSources> {
    let candidates = config
        .encoding_candidates()
        .context("Resolving configured encodings")?;
    let delimiter = config.delimiter_byte()?;
    let mut tables = BTreeMap::new();
    let mut failures = Vec::new();
    let mut reports = Vec::with_capacity(TableRole::ALL.len());

    for role in TableRole::ALL {
        let path = config.path_for(role);
        match load_table(&path, &candidates, delimiter) {
            Ok(loaded) => {
                reports.push(SourceReport {
                    role,
                    path,
                    encoding: Some(loaded.encoding.clone()),
                    rows: loaded.table.row_count(),
                    columns: loaded.table.column_count(),
                    error: None,
                });
                tables.insert(role, loaded);
            }
            Err(err) => {
                warn!("Failed to load {role} table: {err}");
                reports.push(SourceReport {
                    role,
                    path,
                    encoding: None,
                    rows: 0,
                    columns: 0,
                    error: Some(error_chain(&err)),
                });
                failures.push((role, err));
            }
        }
    }
    Ok(LoadedSources {
        tables,
        failures,
        reports,
    })
}

/// Runs every stage over the configured sources. Only a Sales table that
/// cannot be loaded is an error; a failed dimension is joined as an empty
/// table and shows up as failed validation rules.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    info!("Running pipeline over {:?}", config.data_dir);
    let mut sources = load_sources(config)?;
    if let Some(pos) = sources
        .failures
        .iter()
        .position(|(role, _)| role.is_required())
    {
        let (role, err) = sources.failures.swap_remove(pos);
        return Err(anyhow::Error::new(err).context(format!("Loading {role} table")));
    }

    let mut normalized: BTreeMap<TableRole, Table> = BTreeMap::new();
    let mut coercions = Vec::new();
    for (role, loaded) in std::mem::take(&mut sources.tables) {
        let result = normalize_table(&loaded.table, &rules_for(role));
        let mut table = result.table;
        if role == TableRole::Stores && config.fill_missing_square_meters {
            table = fill_missing_with_median(table, columns::SQUARE_METERS);
        }
        coercions.push(RoleCoercions {
            role,
            report: result.report,
        });
        normalized.insert(role, table);
    }
    for (role, _) in &sources.failures {
        if role.key_column().is_some() {
            warn!("Continuing without {role}; its attributes will be null");
            normalized.insert(*role, Table::new(role.label(), Vec::new()));
        }
    }

    let table_for = |role: TableRole| {
        normalized
            .get(&role)
            .ok_or_else(|| anyhow!("{role} table was not loaded"))
    };
    let sales = table_for(TableRole::Sales)?;
    let products = table_for(TableRole::Products)?;
    let customers = table_for(TableRole::Customers)?;
    let stores = table_for(TableRole::Stores)?;

    let dimensions = [
        (TableRole::Products, products),
        (TableRole::Customers, customers),
        (TableRole::Stores, stores),
    ]
    .into_iter()
    .filter_map(|(role, table)| DimensionJoin::for_role(role, table))
    .collect::<Vec<_>>();
    let joined = join_fact(sales, &dimensions).context("Joining sales with dimensions")?;
    let mut fact = derive_features(&joined.table).context("Deriving features")?;

    if config.convert_currency {
        fact = convert_currency(fact, normalized.get(&TableRole::ExchangeRates))?;
    }

    let validation = validate(
        &ValidationInput {
            sales,
            products,
            customers,
            stores,
            joined: Some(&joined.table),
        },
        &ValidationOptions {
            order_date_range: config.order_date_range,
        },
    );

    let mut quality = normalized.values().map(quality_report).collect::<Vec<_>>();
    quality.push(quality_report(&fact));
    let summary = summarize(&fact);
    info!(
        "Pipeline finished: {} fact row(s), {} column(s), validation {}",
        fact.row_count(),
        fact.column_count(),
        if validation.all_passed() {
            "passed"
        } else {
            "failed"
        }
    );

    Ok(PipelineOutput {
        sources: sources.reports,
        coercions,
        renames: joined.plan.renames(),
        join_stats: joined.stats,
        fact,
        validation,
        quality,
        summary,
    })
}

fn convert_currency(fact: Table, rates_table: Option<&Table>) -> Result<Table> {
    let Some(rates_table) = rates_table else {
        warn!("Currency conversion requested but no exchange rates were loaded");
        return Ok(fact);
    };
    match ExchangeRates::from_table(rates_table) {
        Ok(rates) => {
            info!("Loaded {} exchange rate(s)", rates.len());
            apply_local_currency(&fact, &rates).context("Converting revenue to local currency")
        }
        Err(err) => {
            warn!("Skipping currency conversion: {err:#}");
            Ok(fact)
        }
    }
}

/// `err` followed by each of its sources, joined the way `{:#}` prints them.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub mod cli;
pub mod config;
pub mod data;
pub mod derive;
pub mod exchange;
pub mod io_utils;
pub mod join;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod quality;
pub mod render;
pub mod schema;
pub mod summary;
pub mod table;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};
use serde_json::json;

use crate::{
    cli::{Cli, Commands},
    config::{DEFAULT_ENCODINGS, PipelineConfig},
    io_utils::{is_dash, resolve_encoding_candidates},
    loader::load_table,
    normalize::{normalize_table, rules_for},
    pipeline::PipelineOutput,
    quality::quality_report,
    render::print_table,
    summary::revenue_by,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("retail_etl", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::Probe(args) => handle_probe(&args),
    }
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Loading pipeline config from {path:?}"))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(delimiter) = args.delimiter {
        config.delimiter = Some(char::from(delimiter));
    }
    config.convert_currency |= args.convert_currency;
    debug!("Pipeline config: {config:?}");

    let output = pipeline::run(&config)
        .with_context(|| format!("Running pipeline over {:?}", config.data_dir))?;

    if let Some(path) = &args.output {
        let target = (!is_dash(path)).then_some(path.as_path());
        let rows = io_utils::write_table(&output.fact, target, b',')
            .with_context(|| format!("Writing fact table to {path:?}"))?;
        info!("Wrote {rows} fact row(s) to {path:?}");
    }

    // Reports go to stdout unless the fact table already does.
    let stdout_taken = args.output.as_deref().is_some_and(is_dash);
    if !stdout_taken {
        if args.json {
            let report = serde_json::to_string_pretty(&output.report())
                .context("Serializing run report")?;
            println!("{report}");
        } else {
            print_run_report(&output);
        }
    }

    if args.strict && !output.validation.all_passed() {
        let failed = output
            .validation
            .failures()
            .map(|outcome| outcome.rule.as_str())
            .collect::<Vec<_>>();
        bail!("Validation failed: {}", failed.join(", "));
    }
    Ok(())
}

fn print_run_report(output: &PipelineOutput) {
    println!("Sources");
    print_table(
        &["Table", "File", "Encoding", "Rows", "Error"],
        &render::source_rows(&output.sources),
    );
    let coercions = render::coercion_rows(&output.coercions);
    if !coercions.is_empty() {
        println!("\nCoercion failures (set to null)");
        print_table(&["Table", "Column", "Failures", "First value"], &coercions);
    }
    if !output.renames.is_empty() {
        println!("\nRenamed join columns");
        let rows = output
            .renames
            .iter()
            .map(|(from, to)| vec![from.clone(), to.clone()])
            .collect::<Vec<_>>();
        print_table(&["Source column", "Joined column"], &rows);
    }
    println!("\nValidation");
    print_table(
        &["Rule", "Status", "Detail"],
        &render::validation_rows(&output.validation),
    );
    println!("\nData quality");
    print_table(
        &[
            "Dataset",
            "Rows",
            "Columns",
            "Missing",
            "Duplicates",
            "Numeric",
            "Categorical",
            "Datetime",
            "Memory (MB)",
        ],
        &render::quality_rows(&output.quality),
    );
    println!("\nSummary");
    print_table(&["Metric", "Value"], &render::summary_rows(&output.summary));
    // Customer country, suffixed when stores also carry a country.
    let country_column = [
        format!(
            "{} ({})",
            schema::columns::COUNTRY,
            schema::TableRole::Customers.suffix()
        ),
        schema::columns::COUNTRY.to_string(),
    ]
    .into_iter()
    .find(|name| output.fact.has_column(name));
    let breakdowns = [
        ("Category", Some(schema::columns::CATEGORY.to_string())),
        ("Country", country_column),
    ];
    for (label, column) in breakdowns {
        let Some(column) = column else { continue };
        let groups = revenue_by(&output.fact, &column, 10);
        if groups.is_empty() {
            continue;
        }
        println!("\nRevenue by {}", label.to_lowercase());
        let rows = groups
            .into_iter()
            .map(|(group, amount)| vec![group, render::money(amount)])
            .collect::<Vec<_>>();
        print_table(&[label, "Revenue"], &rows);
    }
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let labels = if args.encodings.is_empty() {
        DEFAULT_ENCODINGS.iter().map(|e| e.to_string()).collect()
    } else {
        args.encodings.clone()
    };
    let candidates = resolve_encoding_candidates(&labels)?;
    info!(
        "Probing '{}' with delimiter '{}' and encodings [{}]",
        args.input.display(),
        printable_delimiter(io_utils::resolve_input_delimiter(&args.input, args.delimiter)),
        labels.join(", ")
    );
    let loaded = load_table(&args.input, &candidates, args.delimiter)
        .with_context(|| format!("Loading {:?}", args.input))?;
    let rules = args.role.map(|role| rules_for(role.into())).unwrap_or_default();
    let normalized = normalize_table(&loaded.table, &rules);
    let quality = quality_report(&normalized.table);

    if args.json {
        let columns = normalized
            .table
            .columns()
            .iter()
            .map(|c| json!({ "name": c.name, "type": c.datatype }))
            .collect::<Vec<_>>();
        let payload = json!({
            "path": loaded.path,
            "encoding": loaded.encoding,
            "columns": columns,
            "coercions": normalized.report,
            "quality": quality,
        });
        let text = serde_json::to_string_pretty(&payload).context("Serializing probe result")?;
        println!("{text}");
        return Ok(());
    }

    println!("File: {}", loaded.path.display());
    println!("Encoding: {}", loaded.encoding);
    println!();
    let rows = normalized
        .table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let nulls = normalized
                .table
                .column_values(idx)
                .filter(Option::is_none)
                .count();
            vec![
                column.name.clone(),
                column.datatype.to_string(),
                nulls.to_string(),
                normalized.report.failures_for(&column.name).to_string(),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&["Column", "Type", "Nulls", "Coercion failures"], &rows);
    println!();
    print_table(
        &[
            "Dataset",
            "Rows",
            "Columns",
            "Missing",
            "Duplicates",
            "Numeric",
            "Categorical",
            "Datetime",
            "Memory (MB)",
        ],
        &render::quality_rows(std::slice::from_ref(&quality)),
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

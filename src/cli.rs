use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::schema::TableRole;

#[derive(Debug, Parser)]
#[command(author, version, about = "Load, join and validate retail sales extracts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full pipeline over a directory of extracts and print its reports
    Run(RunArgs),
    /// Load a single extract and report its encoding, column types and quality
    Probe(ProbeArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Directory holding the extracts (overrides `data_dir` from --config)
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,
    /// YAML pipeline configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Write the joined fact table with derived columns to this CSV file (`-` for stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Emit the reports as JSON instead of console tables
    #[arg(long)]
    pub json: bool,
    /// Exit with an error when any validation rule fails
    #[arg(long)]
    pub strict: bool,
    /// Add `Revenue Local` using the exchange-rate table
    #[arg(long = "convert-currency")]
    pub convert_currency: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Input CSV file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Apply the coercion rules of this table role
    #[arg(long, value_enum)]
    pub role: Option<RoleArg>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Encodings to try in order (defaults to utf-8, latin-1, iso-8859-1, cp1252)
    #[arg(long = "encoding", value_delimiter = ',')]
    pub encodings: Vec<String>,
    /// Emit the probe result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum RoleArg {
    Sales,
    Products,
    Customers,
    Stores,
    ExchangeRates,
}

impl From<RoleArg> for TableRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Sales => TableRole::Sales,
            RoleArg::Products => TableRole::Products,
            RoleArg::Customers => TableRole::Customers,
            RoleArg::Stores => TableRole::Stores,
            RoleArg::ExchangeRates => TableRole::ExchangeRates,
        }
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_single_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("#"), Ok(b'#'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn run_arguments_parse() {
        let cli = Cli::try_parse_from([
            "retail-etl",
            "run",
            "--data-dir",
            "extracts",
            "--strict",
            "--json",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.data_dir, Some(PathBuf::from("extracts")));
        assert!(args.strict && args.json && !args.convert_currency);
    }
}

//! Pipeline configuration, loadable from YAML.
//!
//! Every field has a default, so an empty file (or no file at all) describes
//! the stock run over `./data`.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    io_utils::{EncodingCandidate, resolve_encoding_candidates},
    schema::TableRole,
    validate::DateRange,
};

pub const DEFAULT_ENCODINGS: [&str; 4] = ["utf-8", "latin-1", "iso-8859-1", "cp1252"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFiles {
    pub sales: String,
    pub products: String,
    pub customers: String,
    pub stores: String,
    pub exchange_rates: String,
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self {
            sales: TableRole::Sales.default_file_name().to_string(),
            products: TableRole::Products.default_file_name().to_string(),
            customers: TableRole::Customers.default_file_name().to_string(),
            stores: TableRole::Stores.default_file_name().to_string(),
            exchange_rates: TableRole::ExchangeRates.default_file_name().to_string(),
        }
    }
}

impl SourceFiles {
    pub fn get(&self, role: TableRole) -> &str {
        match role {
            TableRole::Sales => &self.sales,
            TableRole::Products => &self.products,
            TableRole::Customers => &self.customers,
            TableRole::Stores => &self.stores,
            TableRole::ExchangeRates => &self.exchange_rates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub files: SourceFiles,
    /// Ordered fallback list tried for every source file.
    pub encodings: Vec<String>,
    /// Single ASCII delimiter; resolved from the file extension when unset.
    pub delimiter: Option<char>,
    pub order_date_range: DateRange,
    pub convert_currency: bool,
    pub fill_missing_square_meters: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            files: SourceFiles::default(),
            encodings: DEFAULT_ENCODINGS.iter().map(|e| e.to_string()).collect(),
            delimiter: None,
            order_date_range: DateRange::default(),
            convert_currency: false,
            fill_missing_square_meters: true,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: Option<Self> =
            serde_yaml::from_reader(reader).context("Parsing pipeline config YAML")?;
        Ok(config.unwrap_or_default())
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn path_for(&self, role: TableRole) -> PathBuf {
        self.data_dir.join(self.files.get(role))
    }

    pub fn encoding_candidates(&self) -> Result<Vec<EncodingCandidate>> {
        resolve_encoding_candidates(&self.encodings)
    }

    pub fn delimiter_byte(&self) -> Result<Option<u8>> {
        match self.delimiter {
            None => Ok(None),
            Some(c) if c.is_ascii() => Ok(Some(c as u8)),
            Some(c) => anyhow::bail!("Delimiter '{c}' must be ASCII"),
        }
    }
}

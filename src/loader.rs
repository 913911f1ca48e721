//! Source loading with ordered encoding fallback.
//!
//! A file is read once into memory, then decoded with each candidate encoding
//! in turn until one decodes the whole byte stream without a malformed
//! sequence. Only then is the text parsed as CSV; a structurally broken file
//! (ragged rows, missing header) fails with [`LoadError::Parse`] and is never
//! retried with another encoding.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;

use crate::{
    data::Value,
    io_utils::{self, EncodingCandidate},
    schema::{ColumnMeta, ColumnType},
    table::Table,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No supported encoding could decode {path:?} (tried {tried})")]
    Encoding { path: PathBuf, tried: String },
    #[error("Malformed tabular content in {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Io { path, .. }
            | LoadError::Encoding { path, .. }
            | LoadError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    /// Label of the encoding that decoded the file, as configured.
    pub encoding: String,
    pub path: PathBuf,
}

/// Loads a raw table whose cells are all strings; blank cells become null.
pub fn load_table(
    path: &Path,
    encodings: &[EncodingCandidate],
    delimiter: Option<u8>,
) -> Result<LoadedTable, LoadError> {
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (text, candidate) = decode_with_fallback(&bytes, encodings).ok_or_else(|| {
        LoadError::Encoding {
            path: path.to_path_buf(),
            tried: encodings
                .iter()
                .map(|c| c.label.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    })?;
    debug!("Decoded {:?} as {}", path, candidate.label);

    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("table")
        .to_string();
    let table = parse_table(&name, &text, delimiter).map_err(|message| LoadError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    info!(
        "Loaded {} row(s) x {} column(s) from {:?} using {}",
        table.row_count(),
        table.column_count(),
        path,
        candidate.label
    );
    Ok(LoadedTable {
        table,
        encoding: candidate.label.clone(),
        path: path.to_path_buf(),
    })
}

fn decode_with_fallback<'a>(
    bytes: &[u8],
    encodings: &'a [EncodingCandidate],
) -> Option<(String, &'a EncodingCandidate)> {
    encodings.iter().find_map(|candidate| {
        let decoded = io_utils::decode_strict(bytes, candidate.encoding);
        if decoded.is_none() {
            debug!("Encoding {} rejected", candidate.label);
        }
        decoded.map(|text| (text, candidate))
    })
}

fn parse_table(name: &str, text: &str, delimiter: u8) -> Result<Table, String> {
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter, true);
    let headers = reader
        .headers()
        .map_err(|err| format!("Reading header row: {err}"))?
        .clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err("missing header row".to_string());
    }
    let columns = headers
        .iter()
        .map(|h| ColumnMeta::new(h.trim(), ColumnType::String))
        .collect::<Vec<_>>();
    let mut table = Table::new(name, columns);

    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|err| format!("Row {}: {err}", row_idx + 2))?;
        let row = record
            .iter()
            .map(|field| {
                if field.trim().is_empty() {
                    None
                } else {
                    Some(Value::String(field.to_string()))
                }
            })
            .collect();
        table
            .push_row(row)
            .map_err(|err| format!("Row {}: {err}", row_idx + 2))?;
    }
    Ok(table)
}

//! I/O utilities for encoding resolution and CSV reading/writing.
//!
//! All file I/O in retail-etl flows through this module:
//!
//! - **Encoding**: label resolution (including the `latin-1` spelling that the
//!   WHATWG label table lacks) and strict, non-replacing decoding so the
//!   loader can detect a wrong guess and move to the next candidate.
//! - **Delimiters**: extension-based detection (`.tsv` → tab) with override.
//! - **Reader/writer construction**: strict (non-flexible) CSV readers and a
//!   UTF-8 writer for the derived fact table; `-` routes output to stdout.

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::{data::display_cell, table::Table};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One entry of the ordered encoding fallback list.
#[derive(Debug, Clone)]
pub struct EncodingCandidate {
    /// The label as configured, reported back as the encoding used.
    pub label: String,
    pub encoding: &'static Encoding,
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    let trimmed = label.trim();
    Encoding::for_label(trimmed.as_bytes())
        .or_else(|| {
            let compact = trimmed.replace(['-', '_'], "");
            Encoding::for_label(compact.as_bytes())
        })
        .ok_or_else(|| anyhow!("Unknown encoding '{label}'"))
}

pub fn resolve_encoding_candidates(labels: &[String]) -> Result<Vec<EncodingCandidate>> {
    labels
        .iter()
        .map(|label| {
            Ok(EncodingCandidate {
                label: label.trim().to_string(),
                encoding: resolve_encoding(label)?,
            })
        })
        .collect()
}

/// Decodes `bytes` without replacement characters; `None` on any malformed
/// sequence. A leading UTF-8 byte-order mark is dropped for UTF-8.
pub fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let payload = if encoding == UTF_8 {
        bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
    } else {
        bytes
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(payload)
        .map(|text| text.into_owned())
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

/// Writes `table` as CSV, nulls rendered as empty fields.
pub fn write_table(table: &Table, path: Option<&Path>, delimiter: u8) -> Result<usize> {
    let mut writer = open_csv_writer(path, delimiter)?;
    writer
        .write_record(table.headers())
        .context("Writing output headers")?;
    for (idx, row) in table.rows().iter().enumerate() {
        writer
            .write_record(row.iter().map(|cell| display_cell(cell.as_ref())))
            .with_context(|| format!("Writing output row {}", idx + 2))?;
    }
    writer.flush().context("Flushing output writer")?;
    Ok(table.row_count())
}

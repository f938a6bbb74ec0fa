//! CSV source table loader.
//!
//! Each source is read independently: headers are normalized and mapped
//! through the source's alias table, the year column is located, required
//! columns are checked, and every row is parsed into a [`RawSourceRecord`].
//! Columns outside the source schema are ignored.

use crate::error::{Result, SourceFormatError};
use crate::normalize::{is_missing_token, normalize_column_name, parse_numeric, parse_year};
use crate::source::{RawSourceRecord, SourceKind, SourceTable, YEAR_COLUMNS};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Load a source table from a CSV file.
pub fn load_source_path(kind: SourceKind, path: impl AsRef<Path>) -> Result<SourceTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| SourceFormatError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!(source = %kind, path = %path.display(), "reading source table");
    load_source_reader(kind, file)
}

/// Load a source table from any CSV reader.
pub fn load_source_reader<R: Read>(kind: SourceKind, reader: R) -> Result<SourceTable> {
    let schema = kind.schema();
    let source_name = kind.to_string();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| schema.canonical(&normalize_column_name(h)).to_string())
        .collect();

    let mut seen = HashSet::new();
    for header in headers.iter().filter(|h| !h.is_empty()) {
        if !seen.insert(header.as_str()) {
            return Err(SourceFormatError::DuplicateColumn {
                source_name,
                column: header.clone(),
            });
        }
    }

    let year_idx = YEAR_COLUMNS
        .iter()
        .find_map(|candidate| headers.iter().position(|h| h == candidate))
        .ok_or_else(|| SourceFormatError::MissingYearColumn {
            source_name: source_name.clone(),
            candidates: YEAR_COLUMNS.join(", "),
        })?;

    for required in schema.required {
        if !headers.iter().any(|h| h == required) {
            return Err(SourceFormatError::MissingColumn {
                source_name,
                column: (*required).to_string(),
                found: headers.join(", "),
            });
        }
    }

    let value_columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != year_idx && schema.is_known(h))
        .map(|(i, h)| (i, h.as_str()))
        .collect();

    let ignored: Vec<&str> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != year_idx && !h.is_empty() && !schema.is_known(h))
        .map(|(_, h)| h.as_str())
        .collect();
    if !ignored.is_empty() {
        debug!(source = %kind, columns = ?ignored, "ignoring columns outside source schema");
    }

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        if is_blank(&row) {
            continue;
        }
        let line = row.position().map_or(0, |p| p.line());

        let raw_year = row.get(year_idx).unwrap_or_default();
        let year = parse_year(raw_year).ok_or_else(|| SourceFormatError::InvalidYear {
            source_name: source_name.clone(),
            line,
            value: raw_year.to_string(),
        })?;

        let mut fields = BTreeMap::new();
        for &(idx, column) in &value_columns {
            let raw = row.get(idx).unwrap_or_default();
            let value = parse_numeric(raw).map_err(|_| SourceFormatError::InvalidValue {
                source_name: source_name.clone(),
                line,
                column: column.to_string(),
                value: raw.to_string(),
            })?;
            fields.insert(column.to_string(), value);
        }

        records.push(RawSourceRecord { year, line, fields });
    }

    if records.is_empty() {
        return Err(SourceFormatError::Empty { source_name });
    }

    debug!(source = %kind, rows = records.len(), "loaded source table");

    Ok(SourceTable {
        kind,
        columns: value_columns.iter().map(|(_, c)| c.to_string()).collect(),
        records,
    })
}

/// A row whose every cell is a missing token, e.g. a trailing spreadsheet line.
fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(is_missing_token)
}

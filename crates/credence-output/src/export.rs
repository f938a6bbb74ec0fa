//! Export formats and the [`Exporter`] trait.

use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rendered output was not valid UTF-8.
    #[error("encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// IO error.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// File or directory being written
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The value has no rendering in this format.
    #[error("{what} cannot be exported as {format}")]
    UnsupportedFormat {
        /// Requested format
        format: ExportFormat,
        /// What was being exported
        what: &'static str,
    },
}

impl ExportError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,

    /// Markdown for human review.
    Markdown,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
            Self::Markdown => "md",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Csv => "CSV",
            Self::Json => "JSON",
            Self::PrettyJson => "pretty JSON",
            Self::Markdown => "Markdown",
        };
        f.write_str(name)
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the format is unsupported.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
        }
        let mut file = File::create(path).map_err(|e| ExportError::io(path, e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| ExportError::io(path, e))?;
        Ok(())
    }
}

/// Serialize records as CSV, header from the first record.
pub(crate) fn to_csv<T: Serialize>(
    records: impl IntoIterator<Item = T>,
) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    finish(wtr)
}

/// Flush a CSV writer into a string.
pub(crate) fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Pretty JSON for [`ExportFormat::PrettyJson`], compact otherwise.
pub(crate) fn to_json<T: Serialize + ?Sized>(
    value: &T,
    format: ExportFormat,
) -> Result<String, ExportError> {
    let json = if format == ExportFormat::PrettyJson {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Optional number as a CSV or Markdown cell, empty when missing.
pub(crate) fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

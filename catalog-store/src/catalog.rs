//! CSV catalog loading: one [`CatalogDocument`] per data row.

use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use product_model::{serialize_fields, CatalogDocument};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogEncoding {
    #[default]
    Utf8,
    ShiftJis,
}

impl CatalogEncoding {
    /// Accepts the usual labels; `None` for anything unrecognized.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "shift_jis" | "shift-jis" | "sjis" | "cp932" | "windows-31j" => Some(Self::ShiftJis),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::ShiftJis => "shift_jis",
        }
    }

    fn encoding(self) -> &'static Encoding {
        match self {
            Self::Utf8 => UTF_8,
            Self::ShiftJis => SHIFT_JIS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read `{path}`: {message}")]
    Io { path: String, message: String },
    #[error("failed to decode `{path}` as {encoding}")]
    Decode { path: String, encoding: &'static str },
    #[error("csv error at record {record}: {message}")]
    Csv { record: usize, message: String },
    #[error("catalog `{0}` contains no rows")]
    Empty(String),
}

/// Read and decode a CSV catalog from disk.
pub fn load_catalog(path: impl AsRef<Path>, encoding: CatalogEncoding) -> Result<Vec<CatalogDocument>, CatalogError> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let bytes = fs::read(path).map_err(|e| CatalogError::Io { path: source.clone(), message: e.to_string() })?;
    let (decoded, _, had_errors) = encoding.encoding().decode(&bytes);
    if had_errors { return Err(CatalogError::Decode { path: source, encoding: encoding.label() }); }
    let docs = parse_catalog(&decoded, &source)?;
    info!(path = %source, encoding = encoding.label(), documents = docs.len(), "catalog loaded");
    Ok(docs)
}

/// Parse CSV text whose first row is the header. Each data row becomes a
/// document whose content is the `header: value` lines of that row.
pub fn parse_catalog(text: &str, source: &str) -> Result<Vec<CatalogDocument>, CatalogError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| CatalogError::Csv { record: 0, message: e.to_string() })?
        .clone();

    let mut docs = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| CatalogError::Csv { record: index + 1, message: e.to_string() })?;
        if record.iter().all(|v| v.trim().is_empty()) { continue; }
        if record.len() != headers.len() {
            warn!(record = index + 1, fields = record.len(), columns = headers.len(), "catalog row width differs from header");
        }
        let content = serialize_fields(headers.iter().zip(record.iter()));
        docs.push(CatalogDocument::with_source(docs.len(), content, source));
    }
    if docs.is_empty() { return Err(CatalogError::Empty(source.to_string())); }
    Ok(docs)
}

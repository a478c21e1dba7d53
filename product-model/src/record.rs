use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Separator between a field name and its value on each content line.
pub const FIELD_SEPARATOR: &str = ": ";

/// Fields every product must carry to be presented as a card.
pub const REQUIRED_FIELDS: [&str; 3] = ["name", "price", "id"];

pub const DEFAULT_CATEGORY: &str = "未設定";
pub const DEFAULT_MAKER: &str = "未設定";
pub const DEFAULT_SCORE: &str = "未評価";
pub const DEFAULT_REVIEW_NUMBER: &str = "0";

/// Inventory state encoded in the `stock_status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Parse a catalog label; anything outside the three known labels is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "あり" => Some(Self::InStock),
            "残りわずか" => Some(Self::LowStock),
            "なし" => Some(Self::OutOfStock),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::InStock => "あり",
            Self::LowStock => "残りわずか",
            Self::OutOfStock => "なし",
        }
    }
}

/// Required fields were absent from a product's content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required fields: {}", missing.join(", "))]
pub struct MissingRequiredFieldsError {
    pub missing: Vec<String>,
    /// Field names that were parsed successfully.
    pub available: Vec<String>,
    /// The unparsed content, kept for diagnostics.
    pub raw: String,
}

/// Field name -> value mapping re-derived from a document's `page_content`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductRecord {
    fields: BTreeMap<String, String>,
}

impl ProductRecord {
    /// Split on lines, then on the first `": "`. Blank lines are ignored,
    /// lines without the separator are skipped, and later keys overwrite earlier ones.
    pub fn parse(content: &str) -> Self {
        let mut fields = BTreeMap::new();
        for line in content.lines() {
            match line.split_once(FIELD_SEPARATOR) {
                Some((key, value)) => {
                    debug!(key, value, "parsed product field");
                    fields.insert(key.to_string(), value.to_string());
                }
                None if line.trim().is_empty() => {}
                None => warn!(line, "skipping product line without a field separator"),
            }
        }
        Self { fields }
    }

    /// Parse and require `name`, `price` and `id`.
    pub fn parse_validated(content: &str) -> Result<Self, MissingRequiredFieldsError> {
        let record = Self::parse(content);
        let missing = record.missing_required();
        if missing.is_empty() {
            return Ok(record);
        }
        Err(MissingRequiredFieldsError {
            missing,
            available: record.keys().map(str::to_string).collect(),
            raw: content.to_string(),
        })
    }

    pub fn missing_required(&self) -> Vec<String> {
        REQUIRED_FIELDS
            .iter()
            .filter(|f| !self.fields.contains_key(**f))
            .map(|f| f.to_string())
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.fields.len() }
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    pub fn fields(&self) -> &BTreeMap<String, String> { &self.fields }

    pub fn name(&self) -> Option<&str> { self.get("name") }
    pub fn price(&self) -> Option<&str> { self.get("price") }
    pub fn id(&self) -> Option<&str> { self.get("id") }

    /// Recognized stock state; unknown labels and a missing key both yield `None`.
    pub fn stock_status(&self) -> Option<StockStatus> {
        self.get("stock_status").and_then(StockStatus::from_label)
    }

    pub fn category(&self) -> &str { self.get("category").unwrap_or(DEFAULT_CATEGORY) }
    pub fn maker(&self) -> &str { self.get("maker").unwrap_or(DEFAULT_MAKER) }
    pub fn score(&self) -> &str { self.get("score").unwrap_or(DEFAULT_SCORE) }
    pub fn review_number(&self) -> &str { self.get("review_number").unwrap_or(DEFAULT_REVIEW_NUMBER) }

    pub fn file_name(&self) -> Option<&str> { self.get("file_name") }
    pub fn description(&self) -> Option<&str> { self.get("description") }
    pub fn recommended_people(&self) -> Option<&str> { self.get("recommended_people") }
}

impl FromIterator<(String, String)> for ProductRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().collect() }
    }
}

/// Serialize fields as `key: value` lines joined by `\n`.
///
/// Keys and values are trimmed and line breaks inside a value are folded into
/// single spaces, so [`ProductRecord::parse`] recovers every pair written here.
pub fn serialize_fields<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}{}{}", k.as_ref().trim(), FIELD_SEPARATOR, fold_lines(v.as_ref())))
        .collect::<Vec<_>>()
        .join("\n")
}

fn fold_lines(value: &str) -> String {
    let trimmed = value.trim();
    if !trimmed.contains(['\n', '\r']) {
        return trimmed.to_string();
    }
    trimmed.split(['\n', '\r']).map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
}

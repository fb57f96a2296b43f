//! FILENAME: core/model/src/column.rs
//! PURPOSE: Column schema entries and header-name normalization.
//! CONTEXT: Uploaded headers arrive messy ("  Total estimado  Anual ",
//! "Saldo\nde Empenhos RAP"). The label keeps the human form (trimmed,
//! whitespace collapsed, accents preserved); the key is a stable snake_case
//! identifier derived by folding diacritics.

use crate::collate::fold_diacritics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inferred column kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    Date,
    Boolean,
}

impl ColumnKind {
    /// Whether values of this kind can back a measure at all.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Real)
    }

    pub fn dtype_name(&self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Integer => "integer",
            ColumnKind::Real => "real",
            ColumnKind::Date => "date",
            ColumnKind::Boolean => "boolean",
        }
    }
}

/// Schema entry for one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Stable identifier used in queries and filters.
    pub key: String,
    /// Original (cleaned) header label.
    pub label: String,
    pub kind: ColumnKind,
    /// True for numeric columns that are not obviously identifiers.
    #[serde(rename = "isMeasure")]
    pub is_measure: bool,
    /// True for columns produced by a pre-aggregation calculation.
    pub calculated: bool,
}

impl ColumnSchema {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: ColumnKind) -> Self {
        let key = key.into();
        let label = label.into();
        let is_measure = kind.is_numeric() && !key_is_identifier(&key);
        ColumnSchema {
            key,
            label,
            kind,
            is_measure,
            calculated: false,
        }
    }
}

/// Cleans a raw header cell into a display label: trim, collapse internal
/// whitespace (including newlines), keep accents.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derives the stable key for a label: diacritics folded, lowercased,
/// non-alphanumerics collapsed to single underscores.
pub fn derive_key(label: &str) -> String {
    let folded = fold_diacritics(label).to_lowercase();
    let mut key = String::with_capacity(folded.len());
    let mut last_was_sep = true;
    for ch in folded.chars() {
        if ch.is_ascii_alphanumeric() {
            key.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            key.push('_');
            last_was_sep = true;
        }
    }
    while key.ends_with('_') {
        key.pop();
    }
    key
}

/// Allocates unique keys for a header row; collisions get numeric suffixes
/// (`valor`, `valor_2`, `valor_3`, ...). Empty headers become positional
/// `col_N` keys.
#[derive(Debug, Default)]
pub struct KeyAllocator {
    seen: HashMap<String, usize>,
}

impl KeyAllocator {
    pub fn new() -> Self {
        KeyAllocator::default()
    }

    pub fn allocate(&mut self, label: &str, position: usize) -> String {
        let mut base = derive_key(label);
        if base.is_empty() {
            base = format!("col_{}", position + 1);
        }
        let count = self.seen.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            format!("{}_{}", base, *count)
        }
    }
}

/// Identifier deny-list: numeric columns matching these are codes, not
/// measures (ids, CNPJ/CPF documents, internal-plan and contract numbers).
pub fn key_is_identifier(key: &str) -> bool {
    key == "id"
        || key.starts_with("id_")
        || key.ends_with("_id")
        || key.contains("cnpj")
        || key.contains("cpf")
        || key.starts_with("pi_")
        || key.contains("contrato")
}

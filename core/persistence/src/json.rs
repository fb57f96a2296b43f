//! FILENAME: core/persistence/src/json.rs
//! PURPOSE: JSON-array decoding for uploads.
//! CONTEXT: Accepts either a top-level list of objects or `{"data": [...]}`.
//! The header is the union of keys across all objects, in first-appearance
//! order; values stringify into the same raw grid the other decoders
//! produce so type inference treats every source alike.

use crate::error::LoadError;
use crate::loader::RawGrid;
use serde_json::Value;

pub fn read_grid(content: &[u8]) -> Result<RawGrid, LoadError> {
    let payload: Value =
        serde_json::from_slice(content).map_err(|e| LoadError::Malformed(e.to_string()))?;

    let records = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(LoadError::Malformed(
                    "Formato JSON não suportado: é necessário um array de objetos ou campo 'data'."
                        .to_string(),
                ))
            }
        },
        _ => {
            return Err(LoadError::Malformed(
                "Formato JSON não suportado: é necessário um array de objetos ou campo 'data'."
                    .to_string(),
            ))
        }
    };

    let mut headers: Vec<String> = Vec::new();
    for record in &records {
        if let Value::Object(map) = record {
            for key in map.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|record| match record {
            Value::Object(map) => Some(
                headers
                    .iter()
                    .map(|key| map.get(key).map(stringify).unwrap_or_default())
                    .collect(),
            ),
            _ => None,
        })
        .collect();

    Ok(RawGrid { headers, rows })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

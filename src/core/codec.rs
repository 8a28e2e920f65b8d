//! Purpose: Encode and decode row columns to and from the store's wire cell shape.
//! Exports: `ColumnValue`, `ColumnMap`, `CellKind`, `WireCell`, `WireRow`,
//! `encode_columns`, `decode_cells`.
//! Role: Pure codec layer shared by mutations, reads, and scans; no transport access.
//! Invariants: Encoding is total over `ColumnValue`; empty text is pruned only on request.
//! Invariants: Cell values travel as base64; the `kind` marker decides how they decode.

use crate::core::error::{Error, ErrorKind};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type ColumnMap = BTreeMap<String, ColumnValue>;

/// A column value as the application sees it. Numbers are carried as their
/// string representation (`Text`); only values tagged `Json` decode back to
/// structured data.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Json(Value),
}

impl ColumnValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(text) => Some(text),
            ColumnValue::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ColumnValue::Text(_) => None,
            ColumnValue::Json(value) => Some(value),
        }
    }

    fn is_empty_text(&self) -> bool {
        matches!(self, ColumnValue::Text(text) if text.is_empty())
    }
}

impl From<&str> for ColumnValue {
    fn from(text: &str) -> Self {
        ColumnValue::Text(text.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(text: String) -> Self {
        ColumnValue::Text(text)
    }
}

impl From<i64> for ColumnValue {
    fn from(number: i64) -> Self {
        ColumnValue::Text(number.to_string())
    }
}

impl From<u64> for ColumnValue {
    fn from(number: u64) -> Self {
        ColumnValue::Text(number.to_string())
    }
}

impl From<f64> for ColumnValue {
    fn from(number: f64) -> Self {
        ColumnValue::Text(number.to_string())
    }
}

impl From<Value> for ColumnValue {
    fn from(value: Value) -> Self {
        ColumnValue::Json(value)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireCell {
    pub column: String,
    pub kind: CellKind,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireRow {
    pub key: String,
    pub cells: Vec<WireCell>,
}

/// Encode a column map into wire cells. Bare qualifiers pick up
/// `default_family`; names already of the form `family:qualifier` pass
/// through. With `remove_empty` set, empty text values are omitted, which is
/// how put-with-empty-value expresses column deletion.
pub fn encode_columns(
    columns: &ColumnMap,
    default_family: &str,
    remove_empty: bool,
) -> Result<Vec<WireCell>, Error> {
    let mut cells = Vec::with_capacity(columns.len());
    for (name, value) in columns {
        if remove_empty && value.is_empty_text() {
            continue;
        }
        let column = qualify_column(name, default_family)?;
        let (kind, bytes) = match value {
            ColumnValue::Text(text) => (CellKind::Text, text.as_bytes().to_vec()),
            ColumnValue::Json(json) => {
                let bytes = serde_json::to_vec(json).map_err(|err| {
                    Error::new(ErrorKind::Codec)
                        .with_message("failed to encode structured column value")
                        .with_source(err)
                })?;
                (CellKind::Json, bytes)
            }
        };
        cells.push(WireCell {
            column,
            kind,
            value: STANDARD.encode(bytes),
        });
    }
    Ok(cells)
}

/// Decode wire cells back into a column map. Column names come back as the
/// bare qualifier unless `include_families` asks for `family:qualifier`.
pub fn decode_cells(cells: &[WireCell], include_families: bool) -> Result<ColumnMap, Error> {
    let mut columns = ColumnMap::new();
    for cell in cells {
        let name = if include_families {
            cell.column.clone()
        } else {
            match cell.column.split_once(':') {
                Some((_, qualifier)) => qualifier.to_string(),
                None => cell.column.clone(),
            }
        };
        let bytes = STANDARD.decode(&cell.value).map_err(|err| {
            Error::new(ErrorKind::Codec)
                .with_message(format!("cell {} is not valid base64", cell.column))
                .with_source(err)
        })?;
        let value = match cell.kind {
            CellKind::Text => {
                let text = String::from_utf8(bytes).map_err(|err| {
                    Error::new(ErrorKind::Codec)
                        .with_message(format!("cell {} is not valid utf-8", cell.column))
                        .with_source(err)
                })?;
                ColumnValue::Text(text)
            }
            CellKind::Json => {
                let json = serde_json::from_slice(&bytes).map_err(|err| {
                    Error::new(ErrorKind::Codec)
                        .with_message(format!("cell {} is not valid json", cell.column))
                        .with_source(err)
                })?;
                ColumnValue::Json(json)
            }
        };
        columns.insert(name, value);
    }
    Ok(columns)
}

pub fn qualify_column(name: &str, default_family: &str) -> Result<String, Error> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::Codec).with_message("column name must not be empty"));
    }
    match name.split_once(':') {
        Some((family, qualifier)) => {
            if family.is_empty() || qualifier.is_empty() {
                return Err(Error::new(ErrorKind::Codec)
                    .with_message(format!("column {name} has an empty family or qualifier")));
            }
            Ok(name.to_string())
        }
        None => Ok(format!("{default_family}:{name}")),
    }
}

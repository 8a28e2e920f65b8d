//! Purpose: Build per-row mutation batches for puts and column/row deletes.
//! Exports: `CellOp`, `RowMutation`, `build_put`, `build_put_batch`,
//! `build_delete_column`, `build_delete_columns`, `build_delete_row`, `build_delete_rows`.
//! Role: Pure builder layer over the codec; applying batches is the store's job.
//! Invariants: One batch per row key; an empty row set builds an empty batch list.

use crate::core::codec::{CellKind, ColumnMap, encode_columns, qualify_column};
use crate::core::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CellOp {
    Put {
        column: String,
        kind: CellKind,
        value: String,
    },
    DeleteColumn {
        column: String,
    },
    DeleteRow,
}

/// One row's batch of cell puts and deletes, ready for the store's
/// mutation-apply primitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowMutation {
    pub row: String,
    pub ops: Vec<CellOp>,
}

pub fn build_put(
    rowkey: &str,
    columns: &ColumnMap,
    default_family: &str,
    remove_empty: bool,
) -> Result<RowMutation, Error> {
    ensure_rowkey(rowkey)?;
    let cells = encode_columns(columns, default_family, remove_empty)?;
    let ops = cells
        .into_iter()
        .map(|cell| CellOp::Put {
            column: cell.column,
            kind: cell.kind,
            value: cell.value,
        })
        .collect();
    Ok(RowMutation {
        row: rowkey.to_string(),
        ops,
    })
}

pub fn build_put_batch(
    rows: &BTreeMap<String, ColumnMap>,
    default_family: &str,
    remove_empty: bool,
) -> Result<Vec<RowMutation>, Error> {
    let mut batches = Vec::with_capacity(rows.len());
    for (rowkey, columns) in rows {
        batches.push(build_put(rowkey, columns, default_family, remove_empty)?);
    }
    Ok(batches)
}

pub fn build_delete_column(
    rowkey: &str,
    column: &str,
    default_family: &str,
) -> Result<RowMutation, Error> {
    build_delete_columns(rowkey, &[column.to_string()], default_family)
}

pub fn build_delete_columns(
    rowkey: &str,
    columns: &[String],
    default_family: &str,
) -> Result<RowMutation, Error> {
    ensure_rowkey(rowkey)?;
    if columns.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("column delete requires at least one column")
            .with_row(rowkey));
    }
    let ops = columns
        .iter()
        .map(|column| {
            Ok(CellOp::DeleteColumn {
                column: qualify_column(column, default_family)?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(RowMutation {
        row: rowkey.to_string(),
        ops,
    })
}

pub fn build_delete_row(rowkey: &str) -> Result<RowMutation, Error> {
    ensure_rowkey(rowkey)?;
    Ok(RowMutation {
        row: rowkey.to_string(),
        ops: vec![CellOp::DeleteRow],
    })
}

pub fn build_delete_rows(rowkeys: &[String]) -> Result<Vec<RowMutation>, Error> {
    rowkeys.iter().map(|key| build_delete_row(key)).collect()
}

fn ensure_rowkey(rowkey: &str) -> Result<(), Error> {
    if rowkey.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("row key must not be empty"));
    }
    Ok(())
}

//! Purpose: Shared in-memory store double for integration tests.
//! Exports: `MemoryStore`, seeding and column-map helpers.
//! Role: Stands in for the external storage engine behind `StoreTransport`.
//! Invariants: Honors inclusive bounds, direction ordering, limits, filters,
//! and column selectors the way the wire contract describes them.
#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tabulite::api::{
    BatchPut, CellKind, CellOp, Client, ClientConfig, ColumnMap, ColumnValue, Error, ErrorKind,
    RangeQuery, RowMutation, StoreTransport, WireCell, WireRow,
};

type CellStore = BTreeMap<String, (CellKind, String)>;
type TableStore = BTreeMap<String, CellStore>;

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, TableStore>>,
    fail_on_table: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call touching `table` fail with an Internal error, to
    /// exercise store-error pass-through and batch first-failure reporting.
    pub fn fail_table(&self, table: &str) {
        *self.fail_on_table.lock().expect("lock") = Some(table.to_string());
    }

    /// Seed a raw wire cell, bypassing the codec; used to simulate a store
    /// handing back payloads the codec must reject.
    pub fn insert_raw_cell(&self, table: &str, row: &str, column: &str, kind: CellKind, value: &str) {
        let mut tables = self.tables.lock().expect("lock");
        tables
            .entry(table.to_string())
            .or_default()
            .entry(row.to_string())
            .or_default()
            .insert(column.to_string(), (kind, value.to_string()));
    }

    pub fn row_count(&self, table: &str) -> usize {
        let tables = self.tables.lock().expect("lock");
        tables.get(table).map(BTreeMap::len).unwrap_or(0)
    }

    fn check_injected_failure(&self, table: &str) -> Result<(), Error> {
        let failing = self.fail_on_table.lock().expect("lock");
        if failing.as_deref() == Some(table) {
            return Err(Error::new(ErrorKind::Internal)
                .with_message("injected store failure")
                .with_table(table));
        }
        Ok(())
    }
}

impl StoreTransport for MemoryStore {
    fn scan_range(&self, table: &str, query: &RangeQuery) -> Result<Vec<WireRow>, Error> {
        self.check_injected_failure(table)?;
        let tables = self.tables.lock().expect("lock");
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut selected = Vec::new();
        for (key, cells) in rows {
            if let Some(lower) = &query.lower {
                if key < lower {
                    continue;
                }
            }
            if let Some(upper) = &query.upper {
                if key > upper {
                    continue;
                }
            }
            if let Some(filter) = &query.filter {
                if !filter_matches(filter, cells) {
                    continue;
                }
            }
            let cells = select_cells(cells, query.columns.as_deref());
            if cells.is_empty() {
                continue;
            }
            selected.push(WireRow {
                key: key.clone(),
                cells,
            });
        }
        if query.direction.is_descending() {
            selected.reverse();
        }
        if let Some(limit) = query.limit {
            selected.truncate(limit as usize);
        }
        Ok(selected)
    }

    fn fetch_row(
        &self,
        table: &str,
        rowkey: &str,
        columns: Option<&[String]>,
    ) -> Result<Option<WireRow>, Error> {
        self.check_injected_failure(table)?;
        let tables = self.tables.lock().expect("lock");
        let Some(cells) = tables.get(table).and_then(|rows| rows.get(rowkey)) else {
            return Ok(None);
        };
        let cells = select_cells(cells, columns);
        if cells.is_empty() {
            return Ok(None);
        }
        Ok(Some(WireRow {
            key: rowkey.to_string(),
            cells,
        }))
    }

    fn apply_mutation(&self, table: &str, mutation: &RowMutation) -> Result<(), Error> {
        self.check_injected_failure(table)?;
        let mut tables = self.tables.lock().expect("lock");
        let rows = tables.entry(table.to_string()).or_default();
        for op in &mutation.ops {
            match op {
                CellOp::Put {
                    column,
                    kind,
                    value,
                } => {
                    rows.entry(mutation.row.clone())
                        .or_default()
                        .insert(column.clone(), (*kind, value.clone()));
                }
                CellOp::DeleteColumn { column } => {
                    if let Some(cells) = rows.get_mut(&mutation.row) {
                        cells.remove(column);
                    }
                }
                CellOp::DeleteRow => {
                    rows.remove(&mutation.row);
                }
            }
        }
        if rows.get(&mutation.row).is_some_and(BTreeMap::is_empty) {
            rows.remove(&mutation.row);
        }
        Ok(())
    }
}

fn select_cells(cells: &CellStore, selector: Option<&[String]>) -> Vec<WireCell> {
    cells
        .iter()
        .filter(|(column, _)| match selector {
            None => true,
            Some(wanted) => wanted.iter().any(|entry| {
                if entry.contains(':') {
                    entry == *column
                } else {
                    column.starts_with(&format!("{entry}:"))
                }
            }),
        })
        .map(|(column, (kind, value))| WireCell {
            column: column.clone(),
            kind: *kind,
            value: value.clone(),
        })
        .collect()
}

fn filter_matches(expr: &Value, cells: &CellStore) -> bool {
    if expr.get("op").and_then(Value::as_str) == Some("and") {
        return expr["filters"]
            .as_array()
            .is_some_and(|filters| filters.iter().all(|filter| filter_matches(filter, cells)));
    }
    let family = expr["family"].as_str().unwrap_or_default();
    let qualifier = expr["qualifier"].as_str().unwrap_or_default();
    let comparator = expr["comparator"].as_str().unwrap_or("eq");
    let expected = expr["value"].as_str().unwrap_or_default();

    let column = format!("{family}:{qualifier}");
    let Some((_, encoded)) = cells.get(&column) else {
        return false;
    };
    let Ok(bytes) = STANDARD.decode(encoded) else {
        return false;
    };
    let Ok(actual) = String::from_utf8(bytes) else {
        return false;
    };
    match comparator {
        "eq" => actual == expected,
        "ne" => actual != expected,
        "gt" => actual.as_str() > expected,
        "ge" => actual.as_str() >= expected,
        "lt" => actual.as_str() < expected,
        "le" => actual.as_str() <= expected,
        _ => false,
    }
}

pub fn memory_client() -> Client<MemoryStore> {
    Client::with_store(MemoryStore::new(), ClientConfig::new("http://localhost:9090"))
}

pub fn text_columns(pairs: &[(&str, &str)]) -> ColumnMap {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), ColumnValue::from(*value)))
        .collect()
}

/// Seed `ROW|1`..`ROW|6`, each carrying an index column and an odd/even
/// parity column, through the client's own batch-put path.
pub fn seed_standard_rows(client: &Client<MemoryStore>, table: &str) {
    let mut rows: BTreeMap<String, ColumnMap> = BTreeMap::new();
    for index in 1..=6 {
        let parity = if index % 2 == 0 { "even" } else { "odd" };
        rows.insert(
            format!("ROW|{index}"),
            text_columns(&[("index", &index.to_string()), ("parity", parity)]),
        );
    }
    client
        .put_rows(&BatchPut::new(table, rows))
        .expect("seed rows");
}

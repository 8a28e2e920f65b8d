//! Purpose: Public client surface: row reads and writes, deletes, and scan entry points.
//! Exports: `Client`, `ClientConfig`, `Row`, `RowQuery`, `RowsQuery`, `RowPut`, `BatchPut`.
//! Role: Stable boundary callers use; holds the config object and the transport.
//! Invariants: Codec and range errors are detected before any wire call.
//! Invariants: A row decoding to zero columns is reported as absent, not as empty.
//! Invariants: Batch operations fan out one wire call per row key and report the
//! first failure; previously applied mutations stay in place.
#![allow(clippy::result_large_err)]

use crate::api::rest::RestStore;
use crate::api::scan::{ScanRequest, ScanResult, Scanner, scan_page};
use crate::api::store::StoreTransport;
use crate::core::codec::{ColumnMap, decode_cells};
use crate::core::error::{Error, ErrorKind};
use crate::core::mutation::{
    RowMutation, build_delete_columns, build_delete_rows, build_put, build_put_batch,
};
use std::collections::BTreeMap;
use std::thread;
use tracing::debug;

pub type ApiResult<T> = Result<T, Error>;

pub const DEFAULT_COLUMN_FAMILY: &str = "d";

/// Explicit client configuration; there is no process-wide state. The table
/// prefix is prepended to every table name before it reaches the wire, and
/// bare column qualifiers pick up `default_family` on encode.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub table_prefix: Option<String>,
    pub default_family: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            table_prefix: None,
            default_family: DEFAULT_COLUMN_FAMILY.to_string(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = Some(prefix.into());
        self
    }

    pub fn with_default_family(mut self, family: impl Into<String>) -> Self {
        self.default_family = family.into();
        self
    }

    pub(crate) fn qualified_table(&self, table: &str) -> String {
        match &self.table_prefix {
            Some(prefix) => format!("{prefix}{table}"),
            None => table.to_string(),
        }
    }
}

/// One keyed record: a row key plus its named column values.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub key: String,
    pub columns: ColumnMap,
}

#[derive(Clone, Debug)]
pub struct RowQuery {
    pub table: String,
    pub rowkey: String,
    pub columns: Option<Vec<String>>,
    pub include_families: bool,
}

impl RowQuery {
    pub fn new(table: impl Into<String>, rowkey: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rowkey: rowkey.into(),
            columns: None,
            include_families: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RowsQuery {
    pub table: String,
    pub rowkeys: Vec<String>,
    pub columns: Option<Vec<String>>,
    pub include_families: bool,
}

impl RowsQuery {
    pub fn new(table: impl Into<String>, rowkeys: Vec<String>) -> Self {
        Self {
            table: table.into(),
            rowkeys,
            columns: None,
            include_families: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RowPut {
    pub table: String,
    pub rowkey: String,
    pub columns: ColumnMap,
    pub remove_empty_columns: bool,
}

impl RowPut {
    pub fn new(table: impl Into<String>, rowkey: impl Into<String>, columns: ColumnMap) -> Self {
        Self {
            table: table.into(),
            rowkey: rowkey.into(),
            columns,
            remove_empty_columns: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BatchPut {
    pub table: String,
    pub rows: BTreeMap<String, ColumnMap>,
    pub remove_empty_columns: bool,
}

impl BatchPut {
    pub fn new(table: impl Into<String>, rows: BTreeMap<String, ColumnMap>) -> Self {
        Self {
            table: table.into(),
            rows,
            remove_empty_columns: false,
        }
    }
}

pub struct Client<S: StoreTransport> {
    store: S,
    config: ClientConfig,
}

impl Client<RestStore> {
    /// Build a client speaking the REST protocol at `config.base_url`.
    pub fn connect(config: ClientConfig) -> ApiResult<Self> {
        let mut store = RestStore::new(config.base_url.clone())?;
        if let Some(token) = &config.token {
            store = store.with_token(token.clone());
        }
        Ok(Self { store, config })
    }
}

impl<S: StoreTransport> Client<S> {
    /// Build a client over any transport; used by tests and embeddings.
    pub fn with_store(store: S, config: ClientConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn put_row(&self, put: &RowPut) -> ApiResult<()> {
        ensure_table(&put.table)?;
        let mutation = build_put(
            &put.rowkey,
            &put.columns,
            &self.config.default_family,
            put.remove_empty_columns,
        )?;
        if mutation.ops.is_empty() {
            return Ok(());
        }
        let table = self.config.qualified_table(&put.table);
        self.store.apply_mutation(&table, &mutation)
    }

    pub fn put_rows(&self, batch: &BatchPut) -> ApiResult<()> {
        ensure_table(&batch.table)?;
        let mut mutations = build_put_batch(
            &batch.rows,
            &self.config.default_family,
            batch.remove_empty_columns,
        )?;
        mutations.retain(|mutation| !mutation.ops.is_empty());
        let table = self.config.qualified_table(&batch.table);
        self.fan_out_mutations(&table, &mutations)
    }

    pub fn get_row(&self, query: &RowQuery) -> ApiResult<Option<Row>> {
        ensure_table(&query.table)?;
        ensure_rowkey(&query.rowkey)?;
        let table = self.config.qualified_table(&query.table);
        let Some(wire) = self
            .store
            .fetch_row(&table, &query.rowkey, query.columns.as_deref())?
        else {
            return Ok(None);
        };
        let columns = decode_cells(&wire.cells, query.include_families)?;
        if columns.is_empty() {
            return Ok(None);
        }
        Ok(Some(Row {
            key: wire.key,
            columns,
        }))
    }

    /// Fetch several rows by key. Results keep the caller's key order; keys
    /// that resolve to no row are omitted rather than null-padded.
    pub fn get_rows(&self, query: &RowsQuery) -> ApiResult<Vec<Row>> {
        ensure_table(&query.table)?;
        for rowkey in &query.rowkeys {
            ensure_rowkey(rowkey)?;
        }
        let table = self.config.qualified_table(&query.table);
        let columns = query.columns.as_deref();

        let fetched: Vec<ApiResult<Option<crate::core::codec::WireRow>>> =
            if query.rowkeys.len() <= 1 {
                query
                    .rowkeys
                    .iter()
                    .map(|rowkey| self.store.fetch_row(&table, rowkey, columns))
                    .collect()
            } else {
                let store = &self.store;
                let table = table.as_str();
                thread::scope(|scope| {
                    let handles: Vec<_> = query
                        .rowkeys
                        .iter()
                        .map(|rowkey| scope.spawn(move || store.fetch_row(table, rowkey, columns)))
                        .collect();
                    handles.into_iter().map(join_worker).collect()
                })
            };

        let mut rows = Vec::with_capacity(query.rowkeys.len());
        for fetch in fetched {
            let Some(wire) = fetch? else {
                continue;
            };
            let decoded = decode_cells(&wire.cells, query.include_families)?;
            if decoded.is_empty() {
                continue;
            }
            rows.push(Row {
                key: wire.key,
                columns: decoded,
            });
        }
        debug!(
            table = query.table.as_str(),
            requested = query.rowkeys.len(),
            found = rows.len(),
            "multi-row fetch"
        );
        Ok(rows)
    }

    pub fn get_scan(&self, request: &ScanRequest) -> ApiResult<ScanResult> {
        scan_page(&self.store, &self.config, request)
    }

    /// Pager over the full range: repeatedly issues single-page scans,
    /// folding each page's marker into the next request.
    pub fn scan_all(&self, request: ScanRequest) -> Scanner<'_, S> {
        Scanner::new(&self.store, &self.config, request)
    }

    pub fn delete_column(&self, table: &str, rowkey: &str, column: &str) -> ApiResult<()> {
        self.delete_columns(table, rowkey, &[column.to_string()])
    }

    pub fn delete_columns(&self, table: &str, rowkey: &str, columns: &[String]) -> ApiResult<()> {
        ensure_table(table)?;
        let mutation = build_delete_columns(rowkey, columns, &self.config.default_family)?;
        let table = self.config.qualified_table(table);
        self.store.apply_mutation(&table, &mutation)
    }

    pub fn delete_row(&self, table: &str, rowkey: &str) -> ApiResult<()> {
        self.delete_rows(table, &[rowkey.to_string()])
    }

    pub fn delete_rows(&self, table: &str, rowkeys: &[String]) -> ApiResult<()> {
        ensure_table(table)?;
        let mutations = build_delete_rows(rowkeys)?;
        let table = self.config.qualified_table(table);
        self.fan_out_mutations(&table, &mutations)
    }

    /// Dispatch one wire call per row batch, concurrently for more than one
    /// batch. All calls run to completion; the first failure in batch order
    /// is reported.
    fn fan_out_mutations(&self, table: &str, mutations: &[RowMutation]) -> ApiResult<()> {
        match mutations {
            [] => Ok(()),
            [single] => self.store.apply_mutation(table, single),
            many => {
                debug!(table, batches = many.len(), "mutation fan-out");
                let store = &self.store;
                let results: Vec<ApiResult<()>> = thread::scope(|scope| {
                    let handles: Vec<_> = many
                        .iter()
                        .map(|mutation| scope.spawn(move || store.apply_mutation(table, mutation)))
                        .collect();
                    handles.into_iter().map(join_worker).collect()
                });
                results
                    .into_iter()
                    .find(|result| result.is_err())
                    .unwrap_or(Ok(()))
            }
        }
    }
}

fn join_worker<T>(handle: thread::ScopedJoinHandle<'_, ApiResult<T>>) -> ApiResult<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(Error::new(ErrorKind::Internal).with_message("worker panicked")))
}

pub(crate) fn ensure_table(table: &str) -> ApiResult<()> {
    if table.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("table name must not be empty"));
    }
    Ok(())
}

fn ensure_rowkey(rowkey: &str) -> ApiResult<()> {
    if rowkey.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("row key must not be empty"));
    }
    Ok(())
}

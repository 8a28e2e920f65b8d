//! Purpose: Drive range scans: filter composition, page fetch, marker computation.
//! Exports: `ScanRequest`, `ScanResult`, `Filter`, `Comparator`, `Scanner`.
//! Role: Pagination engine between the range resolver and the store transport.
//! Invariants: One wire call per page; `limit + 1` rows are requested so marker
//! presence exactly matches "more rows exist within bounds".
//! Invariants: The marker is the key of the first row not returned to the caller.
#![allow(clippy::result_large_err)]

use crate::api::client::{ClientConfig, Row, ensure_table};
use crate::api::store::{RangeQuery, StoreTransport};
use crate::core::codec::decode_cells;
use crate::core::error::Error;
use crate::core::range::resolve_range;
use serde_json::{Value, json};
use std::collections::VecDeque;
use tracing::debug;

/// Rows fetched per page when a `Scanner` is driven without an explicit limit.
const DEFAULT_PAGE_SIZE: u32 = 1000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparator {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Comparator::Eq => "eq",
            Comparator::Ne => "ne",
            Comparator::Gt => "gt",
            Comparator::Ge => "ge",
            Comparator::Lt => "lt",
            Comparator::Le => "le",
        }
    }
}

/// A server-evaluated column predicate. The store applies filters; the
/// client only composes them into the single expression the wire accepts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Filter {
    pub family: String,
    pub qualifier: String,
    pub comparator: Comparator,
    pub value: String,
}

impl Filter {
    pub fn new(
        family: impl Into<String>,
        qualifier: impl Into<String>,
        comparator: Comparator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
            comparator,
            value: value.into(),
        }
    }
}

/// Combine filters into one wire expression with logical AND. No filters
/// composes to no expression; a single filter passes through bare.
pub fn compose_filter_expr(filters: &[Filter]) -> Option<Value> {
    fn predicate(filter: &Filter) -> Value {
        json!({
            "family": filter.family,
            "qualifier": filter.qualifier,
            "comparator": filter.comparator.as_wire_str(),
            "value": filter.value,
        })
    }

    match filters {
        [] => None,
        [single] => Some(predicate(single)),
        many => Some(json!({
            "op": "and",
            "filters": many.iter().map(predicate).collect::<Vec<_>>(),
        })),
    }
}

#[derive(Clone, Debug)]
pub struct ScanRequest {
    pub table: String,
    pub start_row: Option<String>,
    pub stop_row: Option<String>,
    pub marker: Option<String>,
    pub limit: Option<u32>,
    pub descending: bool,
    pub include_families: bool,
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Filter>,
}

impl ScanRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            start_row: None,
            stop_row: None,
            marker: None,
            limit: None,
            descending: false,
            include_families: false,
            columns: None,
            filters: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScanResult {
    pub rows: Vec<Row>,
    pub marker: Option<String>,
}

/// Fetch one page: resolve the range, issue a single range-scan call, decode
/// rows, and derive the continuation marker from the one extra row fetched
/// past the limit.
pub(crate) fn scan_page<S: StoreTransport>(
    store: &S,
    config: &ClientConfig,
    request: &ScanRequest,
) -> Result<ScanResult, Error> {
    ensure_table(&request.table)?;
    let range = resolve_range(
        request.start_row.as_deref(),
        request.stop_row.as_deref(),
        request.marker.as_deref(),
        request.descending,
    )?;
    let query = RangeQuery {
        lower: range.lower,
        upper: range.upper,
        direction: range.direction,
        limit: request.limit.map(|limit| limit.saturating_add(1)),
        filter: compose_filter_expr(&request.filters),
        columns: request.columns.clone(),
    };
    let table = config.qualified_table(&request.table);
    let mut wire_rows = store.scan_range(&table, &query)?;

    let marker = match request.limit {
        Some(limit) if wire_rows.len() > limit as usize => {
            let marker = wire_rows[limit as usize].key.clone();
            wire_rows.truncate(limit as usize);
            Some(marker)
        }
        _ => None,
    };

    let mut rows = Vec::with_capacity(wire_rows.len());
    for wire in wire_rows {
        let columns = decode_cells(&wire.cells, request.include_families)?;
        if columns.is_empty() {
            continue;
        }
        rows.push(Row {
            key: wire.key,
            columns,
        });
    }
    debug!(
        table = request.table.as_str(),
        rows = rows.len(),
        marker = marker.as_deref(),
        "scan page"
    );
    Ok(ScanResult { rows, marker })
}

/// Streams the whole range one row at a time, fetching pages on demand and
/// folding each page's marker into the next request.
pub struct Scanner<'a, S: StoreTransport> {
    store: &'a S,
    config: &'a ClientConfig,
    request: ScanRequest,
    page_size: u32,
    marker: Option<String>,
    buffered: VecDeque<Row>,
    done: bool,
}

impl<'a, S: StoreTransport> Scanner<'a, S> {
    pub(crate) fn new(store: &'a S, config: &'a ClientConfig, request: ScanRequest) -> Self {
        let page_size = request.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let marker = request.marker.clone();
        Self {
            store,
            config,
            request,
            page_size,
            marker,
            buffered: VecDeque::new(),
            done: false,
        }
    }

    pub fn next_row(&mut self) -> Result<Option<Row>, Error> {
        loop {
            if let Some(row) = self.buffered.pop_front() {
                return Ok(Some(row));
            }
            if self.done {
                return Ok(None);
            }
            let mut request = self.request.clone();
            request.limit = Some(self.page_size);
            request.marker = self.marker.clone();
            let page = scan_page(self.store, self.config, &request)?;
            self.marker = page.marker;
            self.done = self.marker.is_none();
            self.buffered = page.rows.into();
        }
    }
}

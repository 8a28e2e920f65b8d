//! Purpose: Define the stable public Rust API boundary for tabulite.
//! Exports: Client surface, scan types, the transport seam, and core re-exports.
//! Role: The one public path callers use; transport modules stay private.
//! Invariants: Everything needed to drive the client is reachable from here.

mod client;
mod rest;
mod scan;
mod store;

pub use crate::core::codec::{CellKind, ColumnMap, ColumnValue, WireCell, WireRow};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::mutation::{CellOp, RowMutation};
pub use crate::core::range::{Direction, ResolvedRange, resolve_range};
pub use client::{
    BatchPut, Client, ClientConfig, DEFAULT_COLUMN_FAMILY, Row, RowPut, RowQuery, RowsQuery,
};
pub use rest::RestStore;
pub use scan::{Comparator, Filter, ScanRequest, ScanResult, Scanner, compose_filter_expr};
pub use store::{RangeQuery, StoreTransport};

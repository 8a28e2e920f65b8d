//! Purpose: Define the seam between the client and the external storage engine.
//! Exports: `StoreTransport`, `RangeQuery`.
//! Role: Trait boundary so client logic runs against REST or in-memory doubles.
//! Invariants: Implementations return rows ordered per the query direction.
//! Invariants: A missing row reads as `Ok(None)`, never as an error.

use crate::core::codec::WireRow;
use crate::core::error::Error;
use crate::core::mutation::RowMutation;
use crate::core::range::Direction;
use serde_json::Value;

/// One range-scan call as handed to the store: resolved inclusive bounds,
/// traversal direction, the number of rows to fetch, the composed filter
/// expression, and the column selector.
#[derive(Clone, Debug)]
pub struct RangeQuery {
    pub lower: Option<String>,
    pub upper: Option<String>,
    pub direction: Direction,
    pub limit: Option<u32>,
    pub filter: Option<Value>,
    pub columns: Option<Vec<String>>,
}

pub trait StoreTransport: Sync {
    fn scan_range(&self, table: &str, query: &RangeQuery) -> Result<Vec<WireRow>, Error>;

    fn fetch_row(
        &self,
        table: &str,
        rowkey: &str,
        columns: Option<&[String]>,
    ) -> Result<Option<WireRow>, Error>;

    fn apply_mutation(&self, table: &str, mutation: &RowMutation) -> Result<(), Error>;
}

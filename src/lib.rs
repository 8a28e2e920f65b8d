//! Purpose: Client library for sorted column-family stores speaking a REST scan protocol.
//! Exports: `api` (client surface, transport) and `core` (codec, resolver, mutations).
//! Role: Library crate; no binaries and no storage engine, the store is remote.
//! Invariants: `core` stays transport-free; all wire traffic goes through `api`.
//! Invariants: Operations are independent units of work; the crate holds no shared state.
pub mod api;
pub mod core;

// Core modules implementing the row codec, mutation building, range
// resolution, and error modeling. Everything here is transport-free.
pub mod codec;
pub mod error;
pub mod mutation;
pub mod range;

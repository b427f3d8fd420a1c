//! Storage backends
//!
//! The engine talks to its store through the `Backend` trait; rows travel as
//! plain value vectors in schema field order with the id at index 0. Any
//! transport or connectivity failure surfaces as `DmlError::Backend` and
//! aborts the operation with no partial effect.

pub mod memory;

pub use memory::MemoryBackend;

use crate::core::{DmlError, Value};

pub trait Backend: Send {
    /// Insert a batch of rows, assigning ids. All-or-nothing: either every
    /// row is stored or none is. Returns the assigned ids in input order.
    fn insert(&mut self, table: &str, rows: Vec<Vec<Value>>) -> Result<Vec<i64>, DmlError>;

    /// All rows of a table in ascending id order.
    fn scan(&self, table: &str) -> Result<Vec<Vec<Value>>, DmlError>;

    /// Apply the same `(column index, value)` assignments to every listed id.
    /// Missing ids are skipped. Returns the number of rows actually written.
    fn update(
        &mut self,
        table: &str,
        ids: &[i64],
        changes: &[(usize, Value)],
    ) -> Result<usize, DmlError>;

    /// Remove the listed ids. Missing ids are skipped (idempotent).
    /// Returns the number of rows actually removed.
    fn delete(&mut self, table: &str, ids: &[i64]) -> Result<usize, DmlError>;
}

// CriteriaDB - table-agnostic DML engine with prefix-notation criteria
// Schemas are declared up front; every operation is parameterized by table name

// Clippy configuration - allow non-critical warnings
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::option_if_let_else)]

// Core data structures (values, fields, schemas, records, errors)
pub mod core;

// Schema registry and declaration format
pub mod registry;

// Criteria terms and predicate compilation
pub mod criteria;

// Input coercion and outbound cell normalization
pub mod coerce;

// Storage backends
pub mod storage;

// The DML engine (create, search, read, search_read, search_count, update, delete)
pub mod executor;

// Re-export commonly used types for convenience
pub use crate::core::{DmlError, FieldDef, FieldType, Record, TableSchema, Value};
pub use criteria::{ComparisonOp, Criteria, LogicOp, Term, Triplet};
pub use executor::{DmlEngine, FieldValues, SortSpec};
pub use registry::{SchemaConfig, SchemaRegistry};
pub use storage::{Backend, MemoryBackend};

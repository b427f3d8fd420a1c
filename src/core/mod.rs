// Module declarations
pub mod error;
pub mod field;
pub mod field_type;
pub mod record;
pub mod schema;
pub mod value;

// Re-exports for convenience
pub use error::DmlError;
pub use field::FieldDef;
pub use field_type::FieldType;
pub use record::Record;
pub use schema::{is_system_field, TableSchema, SYSTEM_FIELDS};
pub use value::{value_cmp, value_eq, Value, TIMESTAMP_FORMAT};

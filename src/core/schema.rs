use serde::{Deserialize, Serialize};

use super::error::DmlError;
use super::field::FieldDef;
use super::field_type::FieldType;

/// Fields owned by the engine: auto-assigned, never externally writable.
pub const SYSTEM_FIELDS: [&str; 3] = ["id", "create_date", "write_date"];

/// Whether `name` is one of the system-managed fields.
#[must_use]
pub fn is_system_field(name: &str) -> bool {
    SYSTEM_FIELDS.contains(&name)
}

/// Per-table field declaration driving validation and coercion.
///
/// The field list is ordered: `id` first, the declared fields in declaration
/// order, `create_date` and `write_date` last. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    fields: Vec<FieldDef>,
}

impl TableSchema {
    /// Build a schema from the user-declared fields, injecting the system
    /// fields around them.
    pub fn new(name: &str, declared: Vec<FieldDef>) -> Result<Self, DmlError> {
        let mut fields = Vec::with_capacity(declared.len() + SYSTEM_FIELDS.len());
        fields.push(FieldDef::new("id", FieldType::Integer, false));

        for field in declared {
            if is_system_field(&field.name) {
                return Err(DmlError::InvalidSchema(format!(
                    "field '{}' on table '{name}' collides with a system field",
                    field.name
                )));
            }
            if fields.iter().any(|f| f.name == field.name) {
                return Err(DmlError::InvalidSchema(format!(
                    "duplicate field '{}' on table '{name}'",
                    field.name
                )));
            }
            fields.push(field);
        }

        fields.push(FieldDef::new("create_date", FieldType::Timestamp, false));
        fields.push(FieldDef::new("write_date", FieldType::Timestamp, false));

        Ok(Self {
            name: name.to_string(),
            fields,
        })
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field lookup that reports `UnknownField` with table context.
    pub fn require_field(&self, name: &str) -> Result<(usize, &FieldDef), DmlError> {
        self.field_index(name)
            .map(|idx| (idx, &self.fields[idx]))
            .ok_or_else(|| DmlError::UnknownField(name.to_string(), self.name.clone()))
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Number of columns in a stored row, system fields included.
    #[must_use]
    pub fn width(&self) -> usize {
        self.fields.len()
    }
}

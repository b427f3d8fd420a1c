use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
    Enum { name: String, values: Vec<String> },
    /// Integer-valued reference to another table's id
    ForeignKey { table: String },
}

impl FieldType {
    /// Label used in error messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Enum { .. } => "enum",
            Self::ForeignKey { .. } => "foreign key",
        }
    }
}

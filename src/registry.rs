//! Schema registry
//!
//! Process-wide, read-only-after-init mapping from table name to its
//! `TableSchema`. Built once from a declarative configuration and passed by
//! reference into the engine; there is no ambient global state.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::core::{DmlError, FieldDef, FieldType, TableSchema};

/// Declarative schema source, e.g. as JSON:
///
/// ```json
/// {
///     "tables": [
///         {
///             "name": "users",
///             "fields": [
///                 { "name": "user", "type": "text", "nullable": false },
///                 { "name": "alliance_id", "type": { "foreign_key": { "table": "alliances" } } }
///             ]
///         }
///     ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    pub tables: Vec<TableDecl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

const fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    /// Build the registry from an in-memory configuration.
    pub fn from_config(config: SchemaConfig) -> Result<Self, DmlError> {
        let mut tables = HashMap::with_capacity(config.tables.len());

        for decl in config.tables {
            if tables.contains_key(&decl.name) {
                return Err(DmlError::InvalidSchema(format!(
                    "table '{}' is declared twice",
                    decl.name
                )));
            }

            let fields = decl
                .fields
                .into_iter()
                .map(|f| FieldDef {
                    name: f.name,
                    field_type: f.field_type,
                    nullable: f.nullable,
                })
                .collect();

            let schema = TableSchema::new(&decl.name, fields)?;
            tables.insert(decl.name, schema);
        }

        Ok(Self { tables })
    }

    /// Load the registry from a declarative config file (JSON, TOML or YAML,
    /// by extension).
    pub fn load(path: &Path) -> Result<Self, DmlError> {
        let config: SchemaConfig = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        Self::from_config(config)
    }

    pub fn get_schema(&self, table_name: &str) -> Result<&TableSchema, DmlError> {
        self.tables
            .get(table_name)
            .ok_or_else(|| DmlError::UnknownTable(table_name.to_string()))
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

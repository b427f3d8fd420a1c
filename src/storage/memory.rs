use std::collections::{BTreeMap, HashMap};

use super::Backend;
use crate::core::{DmlError, Value};

/// In-memory row store with a per-table id sequence.
///
/// Tables materialize on first touch; the registry, not the backend, decides
/// which table names exist. Mutations are computed fully before being
/// applied, so a batch never leaves partial state behind.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: HashMap<String, TableRows>,
}

#[derive(Debug, Default)]
struct TableRows {
    next_id: i64,
    rows: BTreeMap<i64, Vec<Value>>,
}

impl TableRows {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn insert(&mut self, table: &str, rows: Vec<Vec<Value>>) -> Result<Vec<i64>, DmlError> {
        let table_rows = self.tables.entry(table.to_string()).or_default();

        let mut staged = Vec::with_capacity(rows.len());
        let mut ids = Vec::with_capacity(rows.len());
        for mut row in rows {
            let id = table_rows.assign_id();
            if let Some(slot) = row.first_mut() {
                *slot = Value::Integer(id);
            }
            ids.push(id);
            staged.push((id, row));
        }

        table_rows.rows.extend(staged);
        Ok(ids)
    }

    fn scan(&self, table: &str) -> Result<Vec<Vec<Value>>, DmlError> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn update(
        &mut self,
        table: &str,
        ids: &[i64],
        changes: &[(usize, Value)],
    ) -> Result<usize, DmlError> {
        let Some(table_rows) = self.tables.get_mut(table) else {
            return Ok(0);
        };

        let mut staged = Vec::new();
        for id in ids {
            if let Some(row) = table_rows.rows.get(id) {
                let mut new_row = row.clone();
                for (index, value) in changes {
                    if let Some(slot) = new_row.get_mut(*index) {
                        *slot = value.clone();
                    }
                }
                staged.push((*id, new_row));
            }
        }

        let affected = staged.len();
        for (id, row) in staged {
            table_rows.rows.insert(id, row);
        }
        Ok(affected)
    }

    fn delete(&mut self, table: &str, ids: &[i64]) -> Result<usize, DmlError> {
        let Some(table_rows) = self.tables.get_mut(table) else {
            return Ok(0);
        };

        let mut removed = 0;
        for id in ids {
            if table_rows.rows.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

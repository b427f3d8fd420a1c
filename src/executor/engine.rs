//! Generic DML engine
//!
//! Table-agnostic create / search / read / search_read / search_count /
//! update / delete, parameterized by table name and validated against the
//! schema registry up front. Criteria compilation and payload validation are
//! pure and happen before the backend lock is taken; the lock is held for
//! exactly one operation, the connection scope. Concurrent updates to the
//! same rows are last-writer-wins.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Mutex;

use chrono::Utc;

use crate::coerce;
use crate::core::{is_system_field, value_cmp, DmlError, Record, TableSchema, Value};
use crate::criteria::{compile, Criteria, Predicate};
use crate::registry::SchemaRegistry;
use crate::storage::{Backend, MemoryBackend};

/// Field -> value payload for create and update operations.
pub type FieldValues = Vec<(String, Value)>;

/// Multi-column sort: parallel field and direction lists, zipped pairwise.
#[derive(Debug, Clone, Default)]
pub struct SortSpec {
    keys: Vec<(String, bool)>,
}

impl SortSpec {
    /// Single-column sort; `ascending = false` sorts descending.
    #[must_use]
    pub fn single(field: &str, ascending: bool) -> Self {
        Self {
            keys: vec![(field.to_string(), ascending)],
        }
    }

    /// Zip field and direction lists pairwise; extra entries on either side
    /// are ignored.
    #[must_use]
    pub fn zip(fields: &[&str], ascending: &[bool]) -> Self {
        Self {
            keys: fields
                .iter()
                .zip(ascending)
                .map(|(field, asc)| ((*field).to_string(), *asc))
                .collect(),
        }
    }

    fn resolve(&self, schema: &TableSchema) -> Result<Vec<(usize, bool)>, DmlError> {
        self.keys
            .iter()
            .map(|(field, asc)| {
                let (index, _) = schema.require_field(field)?;
                Ok((index, *asc))
            })
            .collect()
    }
}

pub struct DmlEngine<B: Backend = MemoryBackend> {
    registry: SchemaRegistry,
    backend: Mutex<B>,
}

impl DmlEngine<MemoryBackend> {
    /// Engine over the in-memory backend.
    #[must_use]
    pub fn in_memory(registry: SchemaRegistry) -> Self {
        Self::new(registry, MemoryBackend::new())
    }
}

impl<B: Backend> DmlEngine<B> {
    #[must_use]
    pub fn new(registry: SchemaRegistry, backend: B) -> Self {
        Self {
            registry,
            backend: Mutex::new(backend),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Create one or many records and return their assigned ids.
    ///
    /// System fields (`id`, `create_date`, `write_date`) are discarded from
    /// payloads; they are engine-managed. The batch is all-or-nothing: any
    /// invalid payload fails the whole call before the store is touched.
    pub fn create(&self, table_name: &str, data: &[FieldValues]) -> Result<Vec<i64>, DmlError> {
        let schema = self.registry.get_schema(table_name)?;
        let now = Value::Timestamp(Utc::now().naive_utc());

        let mut rows = Vec::with_capacity(data.len());
        for payload in data {
            let mut row = vec![Value::Null; schema.width()];
            let width = schema.width();
            row[width - 2] = now.clone(); // create_date
            row[width - 1] = now.clone(); // write_date

            for (name, value) in payload {
                if is_system_field(name) {
                    continue;
                }
                let (index, field) = schema.require_field(name)?;
                row[index] = coerce::coerce_input(field, value.clone())?;
            }

            for (index, field) in schema.fields().iter().enumerate() {
                if !field.nullable && !is_system_field(&field.name) && row[index].is_null() {
                    return Err(DmlError::TypeMismatch(
                        field.name.clone(),
                        "field is not nullable and no value was given".to_string(),
                    ));
                }
            }

            rows.push(row);
        }

        self.lock()?.insert(table_name, rows)
    }

    /// Ids of the rows matching `criteria`, ascending. Offset and limit
    /// apply after ordering.
    pub fn search(
        &self,
        table_name: &str,
        criteria: &Criteria,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<i64>, DmlError> {
        let schema = self.registry.get_schema(table_name)?;
        let predicate = compile(schema, criteria)?;

        let rows = self.lock()?.scan(table_name)?;
        Ok(paginate(filter_rows(rows, &predicate), offset, limit)
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_int))
            .collect())
    }

    /// Records for the given ids. Ids not present are skipped, never an
    /// error. Default order is ascending id; `id` always leads the
    /// projection even when not requested.
    pub fn read(
        &self,
        table_name: &str,
        ids: &[i64],
        fields: &[&str],
        sort: Option<&SortSpec>,
    ) -> Result<Vec<Record>, DmlError> {
        let schema = self.registry.get_schema(table_name)?;
        let projection = resolve_projection(schema, fields)?;
        let sort_keys = resolve_sort(schema, sort)?;

        let rows = self.lock()?.scan(table_name)?;
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        let mut rows: Vec<Vec<Value>> = rows
            .into_iter()
            .filter(|row| {
                row.first()
                    .and_then(Value::as_int)
                    .is_some_and(|id| wanted.contains(&id))
            })
            .collect();
        sort_rows(&mut rows, &sort_keys);

        Ok(project(schema, rows, &projection))
    }

    /// `search` followed by `read`, executed as a single pass:
    /// filter, sort, paginate, project, coerce.
    pub fn search_read(
        &self,
        table_name: &str,
        criteria: &Criteria,
        fields: &[&str],
        offset: Option<usize>,
        limit: Option<usize>,
        sort: Option<&SortSpec>,
    ) -> Result<Vec<Record>, DmlError> {
        let schema = self.registry.get_schema(table_name)?;
        let predicate = compile(schema, criteria)?;
        let projection = resolve_projection(schema, fields)?;
        let sort_keys = resolve_sort(schema, sort)?;

        let rows = self.lock()?.scan(table_name)?;
        let mut rows = filter_rows(rows, &predicate);
        sort_rows(&mut rows, &sort_keys);
        let rows = paginate(rows, offset, limit);

        Ok(project(schema, rows, &projection))
    }

    /// Number of rows matching `criteria`, independent of pagination.
    pub fn search_count(&self, table_name: &str, criteria: &Criteria) -> Result<usize, DmlError> {
        let schema = self.registry.get_schema(table_name)?;
        let predicate = compile(schema, criteria)?;

        let rows = self.lock()?.scan(table_name)?;
        Ok(rows.iter().filter(|row| predicate.matches(row)).count())
    }

    /// Write the same values to every listed id, bumping `write_date`.
    /// Missing ids are skipped; `Ok(0)` is a successful no-op.
    pub fn update(
        &self,
        table_name: &str,
        ids: &[i64],
        data: &FieldValues,
    ) -> Result<usize, DmlError> {
        let schema = self.registry.get_schema(table_name)?;

        let mut changes = Vec::with_capacity(data.len() + 1);
        for (name, value) in data {
            if is_system_field(name) {
                continue;
            }
            let (index, field) = schema.require_field(name)?;
            let coerced = coerce::coerce_input(field, value.clone())?;
            if coerced.is_null() && !field.nullable {
                return Err(DmlError::TypeMismatch(
                    field.name.clone(),
                    "field is not nullable".to_string(),
                ));
            }
            changes.push((index, coerced));
        }

        if ids.is_empty() {
            return Ok(0);
        }

        let write_date_index = schema.width() - 1;
        changes.push((write_date_index, Value::Timestamp(Utc::now().naive_utc())));

        self.lock()?.update(table_name, ids, &changes)
    }

    /// Delete the listed ids. Idempotent: absent ids are not an error.
    pub fn delete(&self, table_name: &str, ids: &[i64]) -> Result<usize, DmlError> {
        self.registry.get_schema(table_name)?;
        self.lock()?.delete(table_name, ids)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, B>, DmlError> {
        self.backend
            .lock()
            .map_err(|_| DmlError::Backend("backend lock poisoned".to_string()))
    }
}

fn filter_rows(rows: Vec<Vec<Value>>, predicate: &Predicate) -> Vec<Vec<Value>> {
    rows.into_iter()
        .filter(|row| predicate.matches(row))
        .collect()
}

fn paginate(rows: Vec<Vec<Value>>, offset: Option<usize>, limit: Option<usize>) -> Vec<Vec<Value>> {
    rows.into_iter()
        .skip(offset.unwrap_or(0))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// Column indices for the requested projection, `id` forced first and
/// duplicates dropped. Empty request selects every field in schema order.
fn resolve_projection(schema: &TableSchema, fields: &[&str]) -> Result<Vec<usize>, DmlError> {
    let mut indices = vec![0];
    if fields.is_empty() {
        indices.extend(1..schema.width());
    } else {
        for name in fields {
            let (index, _) = schema.require_field(name)?;
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
    }
    Ok(indices)
}

fn resolve_sort(
    schema: &TableSchema,
    sort: Option<&SortSpec>,
) -> Result<Vec<(usize, bool)>, DmlError> {
    // Default ordering is ascending id for determinism
    sort.map_or_else(|| Ok(vec![(0, true)]), |spec| spec.resolve(schema))
}

fn sort_rows(rows: &mut [Vec<Value>], keys: &[(usize, bool)]) {
    rows.sort_by(|a, b| {
        for (index, ascending) in keys {
            let ordering = value_cmp(&a[*index], &b[*index]).unwrap_or(Ordering::Equal);
            let ordering = if *ascending {
                ordering
            } else {
                ordering.reverse()
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn project(schema: &TableSchema, rows: Vec<Vec<Value>>, projection: &[usize]) -> Vec<Record> {
    rows.into_iter()
        .map(|row| {
            let normalized = coerce::normalize_row(schema, row);
            Record::new(
                projection
                    .iter()
                    .map(|&index| {
                        (
                            schema.fields()[index].name.clone(),
                            normalized[index].clone(),
                        )
                    })
                    .collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{ComparisonOp, Term};
    use crate::registry::SchemaConfig;

    fn engine() -> DmlEngine {
        let config: SchemaConfig = serde_json::from_str(
            r#"{
                "tables": [
                    {
                        "name": "users",
                        "fields": [
                            { "name": "user", "type": "text", "nullable": false },
                            { "name": "name", "type": "text" },
                            { "name": "amount", "type": "integer" }
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();
        DmlEngine::in_memory(SchemaRegistry::from_config(config).unwrap())
    }

    fn user(user: &str, name: &str, amount: i64) -> FieldValues {
        vec![
            ("user".to_string(), Value::from(user)),
            ("name".to_string(), Value::from(name)),
            ("amount".to_string(), Value::from(amount)),
        ]
    }

    #[test]
    fn test_create_assigns_ids_and_system_fields() {
        let engine = engine();
        let ids = engine
            .create("users", &[user("onnymm", "Onnymm Azzur", 100)])
            .unwrap();
        assert_eq!(ids, vec![1]);

        let records = engine.read("users", &ids, &[], None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), Some(1));
        assert!(matches!(
            records[0].get("create_date"),
            Some(Value::Timestamp(_))
        ));
        assert!(matches!(
            records[0].get("write_date"),
            Some(Value::Timestamp(_))
        ));
    }

    #[test]
    fn test_create_discards_system_fields_from_payload() {
        let engine = engine();
        let mut payload = user("onnymm", "Onnymm Azzur", 100);
        payload.push(("id".to_string(), Value::Integer(999)));
        payload.push(("create_date".to_string(), Value::from("2000-01-01 00:00:00")));

        let ids = engine.create("users", &[payload]).unwrap();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_create_requires_non_nullable_fields() {
        let engine = engine();
        let payload = vec![("name".to_string(), Value::from("No User"))];
        assert!(matches!(
            engine.create("users", &[payload]),
            Err(DmlError::TypeMismatch(field, _)) if field == "user"
        ));
    }

    #[test]
    fn test_create_unknown_payload_field() {
        let engine = engine();
        let mut payload = user("onnymm", "Onnymm Azzur", 100);
        payload.push(("missing".to_string(), Value::Integer(1)));
        assert!(matches!(
            engine.create("users", &[payload]),
            Err(DmlError::UnknownField(field, _)) if field == "missing"
        ));
    }

    #[test]
    fn test_batch_create_is_all_or_nothing() {
        let engine = engine();
        let bad = vec![("user".to_string(), Value::Integer(5))];
        assert!(engine
            .create("users", &[user("onnymm", "Onnymm Azzur", 100), bad])
            .is_err());
        // First payload must not have been inserted
        assert_eq!(
            engine.search("users", &Criteria::empty(), None, None).unwrap(),
            Vec::<i64>::new()
        );
    }

    #[test]
    fn test_unknown_table() {
        let engine = engine();
        assert!(matches!(
            engine.search("commisions", &Criteria::empty(), None, None),
            Err(DmlError::UnknownTable(name)) if name == "commisions"
        ));
    }

    #[test]
    fn test_search_orders_and_paginates() {
        let engine = engine();
        engine
            .create(
                "users",
                &[
                    user("a", "A", 1),
                    user("b", "B", 2),
                    user("c", "C", 3),
                    user("d", "D", 4),
                    user("e", "E", 5),
                ],
            )
            .unwrap();

        let all = engine.search("users", &Criteria::empty(), None, None).unwrap();
        assert_eq!(all, vec![1, 2, 3, 4, 5]);

        let offset = engine
            .search("users", &Criteria::empty(), Some(2), None)
            .unwrap();
        assert_eq!(offset, vec![3, 4, 5]);

        let limited = engine
            .search("users", &Criteria::empty(), None, Some(3))
            .unwrap();
        assert_eq!(limited, vec![1, 2, 3]);

        let page = engine
            .search("users", &Criteria::empty(), Some(1), Some(2))
            .unwrap();
        assert_eq!(page, vec![2, 3]);
    }

    #[test]
    fn test_read_projection_forces_id_first() {
        let engine = engine();
        engine.create("users", &[user("onnymm", "Onnymm Azzur", 100)]).unwrap();

        let records = engine.read("users", &[1], &["name"], None).unwrap();
        assert_eq!(records[0].fields(), vec!["id", "name"]);

        // Requesting id again does not duplicate it
        let records = engine.read("users", &[1], &["name", "id"], None).unwrap();
        assert_eq!(records[0].fields(), vec!["id", "name"]);
    }

    #[test]
    fn test_read_empty_ids() {
        let engine = engine();
        engine.create("users", &[user("onnymm", "Onnymm Azzur", 100)]).unwrap();
        assert!(engine.read("users", &[], &[], None).unwrap().is_empty());
    }

    #[test]
    fn test_multi_column_sort() {
        let engine = engine();
        engine
            .create(
                "users",
                &[
                    user("a", "Same", 2),
                    user("b", "Same", 1),
                    user("c", "Other", 9),
                ],
            )
            .unwrap();

        let sort = SortSpec::zip(&["name", "amount"], &[true, false]);
        let records = engine
            .read("users", &[1, 2, 3], &["name", "amount"], Some(&sort))
            .unwrap();
        let ids: Vec<Option<i64>> = records.iter().map(Record::id).collect();
        // "Other" first, then "Same" with amount descending
        assert_eq!(ids, vec![Some(3), Some(1), Some(2)]);
    }

    #[test]
    fn test_unknown_sort_field() {
        let engine = engine();
        let sort = SortSpec::single("missing", true);
        assert!(matches!(
            engine.read("users", &[], &[], Some(&sort)),
            Err(DmlError::UnknownField(field, _)) if field == "missing"
        ));
    }

    #[test]
    fn test_update_bumps_write_date() {
        let engine = engine();
        engine.create("users", &[user("onnymm", "Onnymm Azzur", 100)]).unwrap();

        let before = engine.read("users", &[1], &["write_date"], None).unwrap();
        let affected = engine
            .update(
                "users",
                &[1],
                &vec![("name".to_string(), Value::from("Cambiado"))],
            )
            .unwrap();
        assert_eq!(affected, 1);

        let after = engine.read("users", &[1], &["name", "write_date"], None).unwrap();
        assert_eq!(after[0].get("name"), Some(&Value::from("Cambiado")));
        // write_date moved (or at least stayed valid) while create_date is untouched
        assert!(matches!(after[0].get("write_date"), Some(Value::Timestamp(_))));
        assert!(matches!(before[0].get("write_date"), Some(Value::Timestamp(_))));
    }

    #[test]
    fn test_update_empty_ids_is_noop() {
        let engine = engine();
        let affected = engine
            .update(
                "users",
                &[],
                &vec![("name".to_string(), Value::from("Cambiado"))],
            )
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[test]
    fn test_update_rejects_bad_types() {
        let engine = engine();
        engine.create("users", &[user("onnymm", "Onnymm Azzur", 100)]).unwrap();
        assert!(matches!(
            engine.update(
                "users",
                &[1],
                &vec![("amount".to_string(), Value::from("not a number"))],
            ),
            Err(DmlError::TypeMismatch(field, _)) if field == "amount"
        ));
    }

    #[test]
    fn test_delete_idempotent() {
        let engine = engine();
        engine
            .create("users", &[user("a", "A", 1), user("b", "B", 2)])
            .unwrap();

        assert_eq!(engine.delete("users", &[1, 99]).unwrap(), 1);
        assert_eq!(engine.delete("users", &[1, 99]).unwrap(), 0);
        assert_eq!(
            engine.search("users", &Criteria::empty(), None, None).unwrap(),
            vec![2]
        );
    }

    #[test]
    fn test_search_count_matches_search_len() {
        let engine = engine();
        engine
            .create(
                "users",
                &[user("a", "A", 100), user("b", "B", 600), user("c", "C", 900)],
            )
            .unwrap();

        let criteria = Criteria(vec![Term::triplet("amount", ComparisonOp::Gt, 500)]);
        let found = engine.search("users", &criteria, None, None).unwrap();
        let count = engine.search_count("users", &criteria).unwrap();
        assert_eq!(count, found.len());
        assert_eq!(count, 2);

        // Count ignores pagination
        let page = engine.search("users", &criteria, Some(1), Some(1)).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(engine.search_count("users", &criteria).unwrap(), 2);
    }
}

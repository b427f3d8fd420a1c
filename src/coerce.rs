//! Type coercion layer
//!
//! Boundary normalization in both directions. Inbound: criteria and payload
//! scalars are checked and converted to the schema type of their field.
//! Outbound: raw fetched rows are normalized so every column carries either
//! its schema type or `Value::Null`, never a foreign absent-value
//! representation (NaN, stray text, undeclared enum variants).

use chrono::NaiveDateTime;

use crate::core::{DmlError, FieldDef, FieldType, TableSchema, Value, TIMESTAMP_FORMAT};

/// Parse the wire timestamp format, tolerating the ISO 8601 `T` separator
/// and fractional seconds.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        TIMESTAMP_FORMAT,
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Coerce an inbound scalar to the schema type of `field`.
///
/// `Null` passes through; nullability is the caller's concern (criteria may
/// compare any field against null, payload writes may not). Shape or type
/// disagreement is a `TypeMismatch`.
pub fn coerce_input(field: &FieldDef, value: Value) -> Result<Value, DmlError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let mismatch = |value: &Value| {
        DmlError::TypeMismatch(
            field.name.clone(),
            format!(
                "expected {}, got {}",
                field.field_type.label(),
                value.type_name()
            ),
        )
    };

    match &field.field_type {
        FieldType::Integer | FieldType::ForeignKey { .. } => match value {
            Value::Integer(_) => Ok(value),
            Value::Real(r) if r.fract() == 0.0 && r.is_finite() => Ok(Value::Integer(r as i64)),
            other => Err(mismatch(&other)),
        },
        FieldType::Real => match value {
            Value::Real(_) => Ok(value),
            Value::Integer(i) => Ok(Value::Real(i as f64)),
            other => Err(mismatch(&other)),
        },
        FieldType::Text => match value {
            Value::Text(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        FieldType::Boolean => match value {
            Value::Boolean(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        FieldType::Timestamp => match value {
            Value::Timestamp(_) => Ok(value),
            Value::Text(text) => parse_timestamp(&text)
                .map(Value::Timestamp)
                .ok_or_else(|| {
                    DmlError::TypeMismatch(
                        field.name.clone(),
                        format!("'{text}' is not a valid timestamp"),
                    )
                }),
            other => Err(mismatch(&other)),
        },
        FieldType::Enum { name, values } => match value {
            Value::Enum(_, variant) | Value::Text(variant) => {
                if values.contains(&variant) {
                    Ok(Value::Enum(name.clone(), variant))
                } else {
                    Err(DmlError::TypeMismatch(
                        field.name.clone(),
                        format!("'{variant}' is not a variant of enum '{name}' ({values:?})"),
                    ))
                }
            }
            other => Err(mismatch(&other)),
        },
    }
}

/// Normalize one fetched cell to its schema type, mapping anything the
/// column type cannot represent to the canonical `Null`.
#[must_use]
pub fn normalize_cell(field_type: &FieldType, value: Value) -> Value {
    match (field_type, value) {
        (_, Value::Null) => Value::Null,
        (FieldType::Integer | FieldType::ForeignKey { .. }, Value::Integer(i)) => {
            Value::Integer(i)
        }
        (FieldType::Integer | FieldType::ForeignKey { .. }, Value::Real(r)) => {
            if r.is_finite() && r.fract() == 0.0 {
                Value::Integer(r as i64)
            } else {
                Value::Null
            }
        }
        (FieldType::Real, Value::Real(r)) => {
            if r.is_nan() {
                Value::Null
            } else {
                Value::Real(r)
            }
        }
        (FieldType::Real, Value::Integer(i)) => Value::Real(i as f64),
        (FieldType::Text, Value::Text(s)) => Value::Text(s),
        (FieldType::Boolean, Value::Boolean(b)) => Value::Boolean(b),
        (FieldType::Boolean, Value::Integer(0)) => Value::Boolean(false),
        (FieldType::Boolean, Value::Integer(1)) => Value::Boolean(true),
        (FieldType::Timestamp, Value::Timestamp(t)) => Value::Timestamp(t),
        (FieldType::Timestamp, Value::Text(s)) => {
            parse_timestamp(&s).map_or(Value::Null, Value::Timestamp)
        }
        (FieldType::Enum { name, values }, Value::Enum(_, v) | Value::Text(v)) => {
            if values.contains(&v) {
                Value::Enum(name.clone(), v)
            } else {
                Value::Null
            }
        }
        _ => Value::Null,
    }
}

/// Normalize a whole fetched row against the schema's ordered field list.
#[must_use]
pub fn normalize_row(schema: &TableSchema, row: Vec<Value>) -> Vec<Value> {
    schema
        .fields()
        .iter()
        .zip(row)
        .map(|(field, value)| normalize_cell(&field.field_type, value))
        .collect()
}

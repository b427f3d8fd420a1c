//! Criteria compilation and predicate evaluation
//!
//! `compile` turns a criteria term sequence into a boolean predicate tree by
//! recursive descent over the sequence: a logic operator always combines
//! exactly the two expressions that follow it, each of which may itself start
//! with another logic operator. The whole sequence must be consumed by a
//! single expression; truncated or over-long input is rejected instead of
//! being read out of bounds or silently dropped.

use std::cmp::Ordering;

use crate::coerce;
use crate::core::{value_cmp, value_eq, DmlError, FieldDef, FieldType, TableSchema, Value};

use super::{ComparisonOp, Criteria, LogicOp, Term, Triplet};

/// Compiled, executable filter. Field names are resolved to column indices
/// and values are coerced to their field types at compile time, so
/// evaluation is infallible.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Empty criteria: matches every row
    All,
    Leaf(CompiledTriplet),
    Combine(LogicOp, Box<Predicate>, Box<Predicate>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTriplet {
    pub field_index: usize,
    pub op: ComparisonOp,
    pub value: Value,
}

/// Compile `criteria` against `schema`.
///
/// Fails with `UnknownField` for fields absent from the schema,
/// `TypeMismatch` when a value's shape or type disagrees with its operator,
/// and `MalformedCriteria` when the sequence does not parse to exactly one
/// expression consuming every term.
pub fn compile(schema: &TableSchema, criteria: &Criteria) -> Result<Predicate, DmlError> {
    let terms = criteria.terms();
    if terms.is_empty() {
        return Ok(Predicate::All);
    }

    let (predicate, consumed) = parse_term(schema, terms, 0)?;
    if consumed != terms.len() {
        return Err(DmlError::MalformedCriteria(format!(
            "{} trailing term(s) left unconsumed after a complete expression",
            terms.len() - consumed
        )));
    }
    Ok(predicate)
}

fn parse_term(
    schema: &TableSchema,
    terms: &[Term],
    index: usize,
) -> Result<(Predicate, usize), DmlError> {
    match terms.get(index) {
        None => Err(DmlError::MalformedCriteria(format!(
            "expected a term at position {index}, but the sequence ends there"
        ))),
        Some(Term::Logic(op)) => {
            let (left, after_left) = parse_term(schema, terms, index + 1)?;
            let (right, after_right) = parse_term(schema, terms, after_left)?;
            Ok((
                Predicate::Combine(*op, Box::new(left), Box::new(right)),
                after_right,
            ))
        }
        Some(Term::Triplet(triplet)) => {
            let compiled = compile_triplet(schema, triplet)?;
            Ok((Predicate::Leaf(compiled), index + 1))
        }
    }
}

fn compile_triplet(schema: &TableSchema, triplet: &Triplet) -> Result<CompiledTriplet, DmlError> {
    let (field_index, field) = schema.require_field(triplet.field())?;
    let op = triplet.op();
    let value = validate_operand(field, op, triplet.value().clone())?;

    Ok(CompiledTriplet {
        field_index,
        op,
        value,
    })
}

/// Check operator arity against the operand shape and coerce the operand to
/// the field's type.
fn validate_operand(
    field: &FieldDef,
    op: ComparisonOp,
    value: Value,
) -> Result<Value, DmlError> {
    match op {
        ComparisonOp::Eq | ComparisonOp::Ne => coerce::coerce_input(field, value),
        ComparisonOp::Gt | ComparisonOp::Ge | ComparisonOp::Lt | ComparisonOp::Le => {
            if value.is_null() {
                return Err(DmlError::TypeMismatch(
                    field.name.clone(),
                    format!("operator '{op}' cannot compare against null"),
                ));
            }
            coerce::coerce_input(field, value)
        }
        ComparisonOp::Between => {
            let Value::List(items) = value else {
                return Err(DmlError::TypeMismatch(
                    field.name.clone(),
                    format!("operator '><' requires a list of 2 values, got {}", value.type_name()),
                ));
            };
            if items.len() != 2 {
                return Err(DmlError::TypeMismatch(
                    field.name.clone(),
                    format!("operator '><' requires exactly 2 values, got {}", items.len()),
                ));
            }
            let coerced = items
                .into_iter()
                .map(|item| {
                    if item.is_null() {
                        return Err(DmlError::TypeMismatch(
                            field.name.clone(),
                            "operator '><' bounds cannot be null".to_string(),
                        ));
                    }
                    coerce::coerce_input(field, item)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(coerced))
        }
        ComparisonOp::In | ComparisonOp::NotIn => {
            let Value::List(items) = value else {
                return Err(DmlError::TypeMismatch(
                    field.name.clone(),
                    format!("operator '{op}' requires a collection, got {}", value.type_name()),
                ));
            };
            if items.is_empty() {
                return Err(DmlError::TypeMismatch(
                    field.name.clone(),
                    format!("operator '{op}' requires a non-empty collection"),
                ));
            }
            let coerced = items
                .into_iter()
                .map(|item| coerce::coerce_input(field, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(coerced))
        }
        ComparisonOp::Contains | ComparisonOp::NotContains => {
            if !matches!(field.field_type, FieldType::Text) {
                return Err(DmlError::TypeMismatch(
                    field.name.clone(),
                    format!(
                        "operator '{op}' applies to text fields, '{}' is {}",
                        field.name,
                        field.field_type.label()
                    ),
                ));
            }
            match value {
                Value::Text(_) => Ok(value),
                other => Err(DmlError::TypeMismatch(
                    field.name.clone(),
                    format!("operator '{op}' requires a text pattern, got {}", other.type_name()),
                )),
            }
        }
    }
}

impl Predicate {
    /// Evaluate against a raw row in schema field order.
    #[must_use]
    pub fn matches(&self, row: &[Value]) -> bool {
        match self {
            Self::All => true,
            Self::Leaf(triplet) => triplet.matches(row),
            Self::Combine(LogicOp::And, left, right) => left.matches(row) && right.matches(row),
            Self::Combine(LogicOp::Or, left, right) => left.matches(row) || right.matches(row),
        }
    }
}

impl CompiledTriplet {
    fn matches(&self, row: &[Value]) -> bool {
        let cell = row.get(self.field_index).unwrap_or(&Value::Null);
        match self.op {
            ComparisonOp::Eq => value_eq(cell, &self.value),
            ComparisonOp::Ne => !value_eq(cell, &self.value),
            ComparisonOp::Gt => cmp_is(cell, &self.value, &[Ordering::Greater]),
            ComparisonOp::Ge => cmp_is(cell, &self.value, &[Ordering::Greater, Ordering::Equal]),
            ComparisonOp::Lt => cmp_is(cell, &self.value, &[Ordering::Less]),
            ComparisonOp::Le => cmp_is(cell, &self.value, &[Ordering::Less, Ordering::Equal]),
            ComparisonOp::Between => {
                let Value::List(bounds) = &self.value else {
                    return false;
                };
                cmp_is(cell, &bounds[0], &[Ordering::Greater, Ordering::Equal])
                    && cmp_is(cell, &bounds[1], &[Ordering::Less, Ordering::Equal])
            }
            ComparisonOp::In => self
                .value
                .as_list()
                .is_some_and(|items| items.iter().any(|item| value_eq(cell, item))),
            ComparisonOp::NotIn => self
                .value
                .as_list()
                .is_some_and(|items| !items.iter().any(|item| value_eq(cell, item))),
            // Null cells match neither contains nor its negation
            ComparisonOp::Contains => text_contains(cell, &self.value).unwrap_or(false),
            ComparisonOp::NotContains => {
                text_contains(cell, &self.value).map(|found| !found).unwrap_or(false)
            }
        }
    }
}

fn cmp_is(cell: &Value, operand: &Value, accepted: &[Ordering]) -> bool {
    value_cmp(cell, operand).is_some_and(|ordering| accepted.contains(&ordering))
}

/// Case-insensitive substring containment. `None` when the cell holds no
/// text to search in.
fn text_contains(cell: &Value, pattern: &Value) -> Option<bool> {
    let haystack = cell.as_text()?;
    let needle = pattern.as_text()?;
    Some(haystack.to_lowercase().contains(&needle.to_lowercase()))
}

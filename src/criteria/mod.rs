//! Criteria structures
//!
//! A criteria is an ordered sequence of terms encoding a prefix (Polish)
//! boolean expression: each term is either a logic operator combining the two
//! terms that follow it, or a `(field, operator, value)` triplet. On the
//! wire a criteria is a plain JSON list mixing operator strings and triplet
//! arrays:
//!
//! ```json
//! ["&", ["amount", ">", 500], ["name", "ilike", "as"]]
//! ```

pub mod predicate;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Value;

pub use predicate::{compile, Predicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "><")]
    Between,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "ilike")]
    Contains,
    #[serde(rename = "not ilike")]
    NotContains,
}

impl ComparisonOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Between => "><",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Contains => "ilike",
            Self::NotContains => "not ilike",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    #[serde(rename = "&")]
    And,
    #[serde(rename = "|")]
    Or,
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "&",
            Self::Or => "|",
        })
    }
}

/// Atomic comparison `(field, operator, value)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triplet(pub String, pub ComparisonOp, pub Value);

impl Triplet {
    pub fn new(field: &str, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Self(field.to_string(), op, value.into())
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub const fn op(&self) -> ComparisonOp {
        self.1
    }

    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    Logic(LogicOp),
    Triplet(Triplet),
}

impl Term {
    pub fn triplet(field: &str, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Self::Triplet(Triplet::new(field, op, value))
    }

    #[must_use]
    pub const fn and() -> Self {
        Self::Logic(LogicOp::And)
    }

    #[must_use]
    pub const fn or() -> Self {
        Self::Logic(LogicOp::Or)
    }
}

/// Ordered term sequence. The empty criteria selects every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Criteria(pub Vec<Term>);

impl Criteria {
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Term>> for Criteria {
    fn from(terms: Vec<Term>) -> Self {
        Self(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_triplet_from_json() {
        let criteria: Criteria = serde_json::from_str(r#"[["amount", ">", 500]]"#).unwrap();
        assert_eq!(
            criteria,
            Criteria(vec![Term::triplet("amount", ComparisonOp::Gt, 500)])
        );
    }

    #[test]
    fn test_logic_op_from_json() {
        let criteria: Criteria =
            serde_json::from_str(r#"["&", ["amount", ">", 500], ["name", "ilike", "as"]]"#)
                .unwrap();
        assert_eq!(
            criteria,
            Criteria(vec![
                Term::and(),
                Term::triplet("amount", ComparisonOp::Gt, 500),
                Term::triplet("name", ComparisonOp::Contains, "as"),
            ])
        );
    }

    #[test]
    fn test_nested_prefix_from_json() {
        let json = r#"[
            "&",
                "|",
                    ["partner_id", "=", 14418],
                    ["partner_id", "=", 14417],
                ["salesperson_id", "=", 213]
        ]"#;
        let criteria: Criteria = serde_json::from_str(json).unwrap();
        assert_eq!(criteria.len(), 5);
        assert_eq!(criteria.terms()[0], Term::and());
        assert_eq!(criteria.terms()[1], Term::or());
    }

    #[test]
    fn test_collection_operators_from_json() {
        let criteria: Criteria = serde_json::from_str(
            r#"[["state", "in", ["posted", "sent"]], "|", ["id", "><", [3, 7]], ["id", "not in", [1]]]"#,
        )
        .unwrap();
        assert_eq!(criteria.len(), 4);
        let Term::Triplet(first) = &criteria.terms()[0] else {
            panic!("expected triplet");
        };
        assert_eq!(first.op(), ComparisonOp::In);
        assert_eq!(
            first.value(),
            &Value::List(vec![
                Value::Text("posted".to_string()),
                Value::Text("sent".to_string())
            ])
        );
    }

    #[test]
    fn test_criteria_json_roundtrip() {
        let criteria = Criteria(vec![
            Term::or(),
            Term::triplet("id", ComparisonOp::Eq, 5),
            Term::triplet("state", ComparisonOp::Eq, "posted"),
        ]);
        let json = serde_json::to_string(&criteria).unwrap();
        assert_eq!(json, r#"["|",["id","=",5],["state","=","posted"]]"#);
        let parsed: Criteria = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, criteria);
    }

    #[test]
    fn test_operator_symbols() {
        assert_eq!(ComparisonOp::Between.to_string(), "><");
        assert_eq!(ComparisonOp::NotContains.to_string(), "not ilike");
        assert_eq!(LogicOp::And.to_string(), "&");
        assert_eq!(LogicOp::Or.to_string(), "|");
    }
}

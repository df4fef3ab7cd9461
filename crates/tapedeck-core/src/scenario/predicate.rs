//! The JSON-body predicate dialect. Modeled as a sum type with an explicit
//! evaluator over a gjson-style dotted field path, rather than an open
//! trait hierarchy of predicate kinds.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

/// A compiled predicate tree. Leaves carry a `field` path and a comparison
/// value; combinators recurse into child predicates.
#[derive(Debug)]
pub enum Predicate {
    Eq { field: String, value: Value },
    Rx { field: String, regex: Regex },
    Gt { field: String, value: f64 },
    Lt { field: String, value: f64 },
    Gte { field: String, value: f64 },
    Lte { field: String, value: f64 },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

/// The YAML/JSON surface form of a predicate, deserialized before
/// compilation (so an `rx` leaf's pattern can be validated once).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawPredicate {
    Eq(FieldValue),
    Rx(FieldValue),
    Gt(FieldNumber),
    Lt(FieldNumber),
    Gte(FieldNumber),
    Lte(FieldNumber),
    And(Vec<RawPredicate>),
    Or(Vec<RawPredicate>),
    Not(Box<RawPredicate>),
}

#[derive(Debug, Deserialize)]
pub struct FieldValue {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct FieldNumber {
    pub field: String,
    pub value: f64,
}

/// Compile a [`RawPredicate`] into a [`Predicate`], validating regex leaves.
/// Returns `Err` with a human-readable reason on the first invalid leaf,
/// rejecting the whole config rather than silently dropping a bad filter.
pub fn compile(raw: &RawPredicate) -> Result<Predicate, String> {
    Ok(match raw {
        RawPredicate::Eq(fv) => Predicate::Eq {
            field: fv.field.clone(),
            value: fv.value.clone(),
        },
        RawPredicate::Rx(fv) => {
            let pattern = fv
                .value
                .as_str()
                .ok_or_else(|| format!("rx predicate on field {:?} must have a string value", fv.field))?;
            let regex = Regex::new(pattern)
                .map_err(|e| format!("invalid regex {pattern:?} for field {:?}: {e}", fv.field))?;
            Predicate::Rx {
                field: fv.field.clone(),
                regex,
            }
        }
        RawPredicate::Gt(fv) => Predicate::Gt { field: fv.field.clone(), value: fv.value },
        RawPredicate::Lt(fv) => Predicate::Lt { field: fv.field.clone(), value: fv.value },
        RawPredicate::Gte(fv) => Predicate::Gte { field: fv.field.clone(), value: fv.value },
        RawPredicate::Lte(fv) => Predicate::Lte { field: fv.field.clone(), value: fv.value },
        RawPredicate::And(children) => {
            Predicate::And(children.iter().map(compile).collect::<Result<_, _>>()?)
        }
        RawPredicate::Or(children) => {
            Predicate::Or(children.iter().map(compile).collect::<Result<_, _>>()?)
        }
        RawPredicate::Not(child) => Predicate::Not(Box::new(compile(child)?)),
    })
}

/// Resolve a gjson-style dotted field path (no `$` prefix) against a JSON
/// value, e.g. `"processing.state"` or `"payload.id"`.
pub fn resolve_field<'a>(root: &'a Value, field: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in field.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

impl Predicate {
    /// Evaluate this predicate against a request body. When the body is not
    /// valid JSON, callers pass `None` and every leaf predicate below
    /// returns `false` rather than matching vacuously.
    pub fn matches(&self, body: Option<&Value>) -> bool {
        match self {
            Predicate::Eq { field, value } => {
                body.and_then(|b| resolve_field(b, field)).map(|v| v == value).unwrap_or(false)
            }
            Predicate::Rx { field, regex } => body
                .and_then(|b| resolve_field(b, field))
                .and_then(Value::as_str)
                .map(|s| regex.is_match(s))
                .unwrap_or(false),
            Predicate::Gt { field, value } => numeric_compare(body, field, |v| v > *value),
            Predicate::Lt { field, value } => numeric_compare(body, field, |v| v < *value),
            Predicate::Gte { field, value } => numeric_compare(body, field, |v| v >= *value),
            Predicate::Lte { field, value } => numeric_compare(body, field, |v| v <= *value),
            Predicate::And(children) => children.iter().all(|p| p.matches(body)),
            Predicate::Or(children) => children.iter().any(|p| p.matches(body)),
            Predicate::Not(child) => !child.matches(body),
        }
    }
}

fn numeric_compare(body: Option<&Value>, field: &str, cmp: impl Fn(f64) -> bool) -> bool {
    body.and_then(|b| resolve_field(b, field))
        .and_then(Value::as_f64)
        .map(cmp)
        .unwrap_or(false)
}

//! Rule condition language: parser and evaluator.
//!
//! A rule's `when` clause is JSON text in one of these forms:
//!
//! ```text
//! true | false
//! {"var": "user_age", "op": ">=", "value": 18}
//! {"all": [<condition>, ...]}
//! {"any": [<condition>, ...]}
//! ```
//!
//! `var` names a declared input. Operators: `==`, `!=`, `>`, `<`, `>=`, `<=`.
//! Evaluation is total and side-effect free: every condition yields a bool.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A parsed condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A boolean literal.
    Literal(bool),
    /// A single comparison against an input.
    Compare(Comparison),
    /// True when every child is true (vacuously true when empty).
    All(Vec<Condition>),
    /// True when any child is true (false when empty).
    Any(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub var: String,
    pub op: Op,
    pub value: Value,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Op {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "==" => Op::Eq,
            "!=" => Op::NotEq,
            ">" => Op::Gt,
            "<" => Op::Lt,
            ">=" => Op::Gte,
            "<=" => Op::Lte,
            _ => return None,
        })
    }
}

impl Condition {
    /// Evaluate against a case's input values.
    pub fn evaluate(&self, inputs: &BTreeMap<String, Value>) -> bool {
        match self {
            Condition::Literal(b) => *b,
            Condition::Compare(cmp) => cmp.evaluate(inputs),
            Condition::All(children) => children.iter().all(|c| c.evaluate(inputs)),
            Condition::Any(children) => children.iter().any(|c| c.evaluate(inputs)),
        }
    }

    /// Input names this condition reads.
    pub fn referenced_inputs(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_inputs(&mut names);
        names
    }

    fn collect_inputs(&self, names: &mut BTreeSet<String>) {
        match self {
            Condition::Literal(_) => {}
            Condition::Compare(cmp) => {
                names.insert(cmp.var.clone());
            }
            Condition::All(children) | Condition::Any(children) => {
                for child in children {
                    child.collect_inputs(names);
                }
            }
        }
    }
}

impl Comparison {
    fn evaluate(&self, inputs: &BTreeMap<String, Value>) -> bool {
        let actual = inputs.get(&self.var);
        match self.op {
            Op::Eq => actual.is_some_and(|a| values_equal(a, &self.value)),
            Op::NotEq => actual.is_none_or(|a| !values_equal(a, &self.value)),
            Op::Gt => compare_num(actual, &self.value, |a, b| a > b),
            Op::Lt => compare_num(actual, &self.value, |a, b| a < b),
            Op::Gte => compare_num(actual, &self.value, |a, b| a >= b),
            Op::Lte => compare_num(actual, &self.value, |a, b| a <= b),
        }
    }
}

/// JSON equality, with numbers compared by value so `18` equals `18.0`.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) if a.is_number() && b.is_number() => x == y,
        _ => a == b,
    }
}

fn compare_num(actual: Option<&Value>, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(Value::as_f64), expected.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

// ─── Parser ──────────────────────────────────────────────────────────

/// Parse `when` text into a [`Condition`] tree.
pub fn parse_condition(input: &str) -> Result<Condition, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty expression".into());
    }
    let value: Value =
        serde_json::from_str(input).map_err(|e| format!("expression is not valid JSON: {e}"))?;
    parse_value(&value)
}

fn parse_value(value: &Value) -> Result<Condition, String> {
    match value {
        Value::Bool(b) => Ok(Condition::Literal(*b)),
        Value::Object(map) => parse_object(map),
        other => Err(format!("expected a condition object or boolean, found {other}")),
    }
}

fn parse_object(map: &Map<String, Value>) -> Result<Condition, String> {
    if map.len() == 1 {
        if let Some(children) = map.get("all") {
            return parse_children(children, "all").map(Condition::All);
        }
        if let Some(children) = map.get("any") {
            return parse_children(children, "any").map(Condition::Any);
        }
    }
    parse_comparison(map).map(Condition::Compare)
}

fn parse_children(value: &Value, key: &str) -> Result<Vec<Condition>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("'{key}' must be an array of conditions"))?;
    items.iter().map(parse_value).collect()
}

fn parse_comparison(map: &Map<String, Value>) -> Result<Comparison, String> {
    if let Some(unknown) = map.keys().find(|k| !matches!(k.as_str(), "var" | "op" | "value")) {
        return Err(format!("unexpected key '{unknown}' in comparison"));
    }
    let var = map
        .get("var")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or("comparison requires a non-empty string 'var'")?;
    if var.contains('.') {
        return Err(format!("'{var}' is not an input name; paths into inputs are not supported"));
    }
    let op_raw = map
        .get("op")
        .and_then(Value::as_str)
        .ok_or("comparison requires a string 'op'")?;
    let op = Op::parse(op_raw).ok_or_else(|| format!("unknown operator '{op_raw}'"))?;
    let value = map.get("value").ok_or("comparison requires a 'value'")?;
    Ok(Comparison {
        var: var.to_string(),
        op,
        value: value.clone(),
    })
}

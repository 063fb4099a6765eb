//! Split a filter set between the hosted store's query filters and
//! in-memory evaluation.
//!
//! A predicate is pushed down only when the remote filter cannot drop a
//! row the in-memory evaluator accepts. Remote comparisons never match a
//! null column, so operators and operands under which a null field passes
//! in memory stay in the residual set, which is evaluated against the rows
//! the remote query returns.

use std::fmt;

use crm_core::Record;
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::coerce;
use crate::filter::FilterSet;
use crate::predicates::{Operator, Predicate};

/// Whether an operator has a native remote counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pushdown {
    Native,
    InMemory,
}

impl Operator {
    /// `not_equals` stays local because the remote `neq` drops null rows.
    /// Emptiness stays local because falsy values (`0`, `""`, `false`) are
    /// wider than SQL null.
    pub fn pushdown(&self) -> Pushdown {
        match self {
            Operator::Equals
            | Operator::Contains
            | Operator::StartsWith
            | Operator::EndsWith
            | Operator::GreaterThan
            | Operator::LessThan
            | Operator::Before
            | Operator::After => Pushdown::Native,
            Operator::NotEquals | Operator::IsEmpty | Operator::IsNotEmpty | Operator::Unknown(_) => {
                Pushdown::InMemory
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOp {
    Eq,
    ILike,
    Gt,
    Lt,
}

impl RemoteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteOp::Eq => "eq",
            RemoteOp::ILike => "ilike",
            RemoteOp::Gt => "gt",
            RemoteOp::Lt => "lt",
        }
    }
}

/// One column filter in the hosted store's REST query syntax
/// (`column=op.operand`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFilter {
    pub field: String,
    pub op: RemoteOp,
    pub operand: String,
}

impl RemoteFilter {
    /// Translate a predicate, or `None` when it must be evaluated locally.
    pub fn from_predicate(predicate: &Predicate) -> Option<Self> {
        if predicate.operator.pushdown() == Pushdown::InMemory {
            return None;
        }
        let (op, operand) = match &predicate.operator {
            Operator::Equals => (RemoteOp::Eq, scalar_operand(&predicate.value)?),
            Operator::Contains => (RemoteOp::ILike, format!("*{}*", like_operand(&predicate.value)?)),
            Operator::StartsWith => (RemoteOp::ILike, format!("{}*", like_operand(&predicate.value)?)),
            Operator::EndsWith => (RemoteOp::ILike, format!("*{}", like_operand(&predicate.value)?)),
            Operator::GreaterThan | Operator::After => {
                (RemoteOp::Gt, numeric_operand(&predicate.value, |n| n >= 0.0)?)
            }
            Operator::LessThan | Operator::Before => {
                (RemoteOp::Lt, numeric_operand(&predicate.value, |n| n <= 0.0)?)
            }
            _ => return None,
        };
        Some(Self {
            field: predicate.field.clone(),
            op,
            operand,
        })
    }

    /// Unencoded `(key, value)` query parameter.
    pub fn to_query_param(&self) -> (String, String) {
        (self.field.clone(), format!("{}.{}", self.op.as_str(), self.operand))
    }
}

impl fmt::Display for RemoteFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}.{}", self.field, self.op.as_str(), self.operand)
    }
}

/// Remote filters plus the predicates left for in-memory evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryPlan {
    pub remote: Vec<RemoteFilter>,
    pub residual: FilterSet,
}

impl QueryPlan {
    /// URL-encoded query string for the remote filters.
    pub fn query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for filter in &self.remote {
            let (key, value) = filter.to_query_param();
            serializer.append_pair(&key, &value);
        }
        serializer.finish()
    }

    pub fn is_fully_pushed_down(&self) -> bool {
        self.residual.is_empty()
    }

    /// Evaluate the residual predicates over rows already narrowed by the
    /// remote filters.
    pub fn apply<'a>(&'a self, records: &'a [Record]) -> impl Iterator<Item = &'a Record> + 'a {
        self.residual.filter(records)
    }
}

impl FilterSet {
    /// Partition predicates into remote filters and a residual set,
    /// preserving the relative order of each side.
    pub fn plan(&self) -> QueryPlan {
        let mut plan = QueryPlan::default();
        for predicate in self {
            match RemoteFilter::from_predicate(predicate) {
                Some(remote) => plan.remote.push(remote),
                None => plan.residual.push(predicate.clone()),
            }
        }
        plan
    }
}

fn scalar_operand(value: &Value) -> Option<String> {
    match value {
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Some(coerce::to_text(value)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// LIKE operands must be non-empty strings free of wildcard characters,
/// which the remote syntax cannot escape. Numeric operands usually target
/// numeric columns, where `ilike` does not apply, so they stay local.
fn like_operand(value: &Value) -> Option<String> {
    let Value::String(text) = value else {
        return None;
    };
    if text.is_empty() || text.contains(|c: char| matches!(c, '*' | '%' | '_' | '\\')) {
        return None;
    }
    Some(text.clone())
}

/// A null field compares as `0` in memory but never passes a remote
/// comparison, so the operand is only usable when `0` fails the
/// comparison too (`null_fails`).
fn numeric_operand(value: &Value, null_fails: fn(f64) -> bool) -> Option<String> {
    let n = coerce::to_number(crm_core::FieldValue::Present(value));
    (n.is_finite() && null_fails(n)).then(|| coerce::float_text(n))
}

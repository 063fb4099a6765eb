//! Predicate types and evaluation logic for segment criteria.

use std::fmt;

use crm_core::{FieldValue, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce;

/// A single `{field, operator, value}` condition from a saved segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
    /// Grouping hint carried by stored segments. Evaluation is AND-only and
    /// does not read it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Logic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

/// Comparison operators understood by the evaluator.
///
/// Operator names that are not recognised deserialize into `Unknown` with
/// the raw name preserved, so stored segments round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
    Before,
    After,
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::IsEmpty => "is_empty",
            Operator::IsNotEmpty => "is_not_empty",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Operator::Unknown(_))
    }
}

impl From<&str> for Operator {
    fn from(name: &str) -> Self {
        match name {
            "equals" => Operator::Equals,
            "not_equals" => Operator::NotEquals,
            "contains" => Operator::Contains,
            "starts_with" => Operator::StartsWith,
            "ends_with" => Operator::EndsWith,
            "is_empty" => Operator::IsEmpty,
            "is_not_empty" => Operator::IsNotEmpty,
            "greater_than" => Operator::GreaterThan,
            "less_than" => Operator::LessThan,
            "before" => Operator::Before,
            "after" => Operator::After,
            other => Operator::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        match Operator::from(name.as_str()) {
            Operator::Unknown(_) => Operator::Unknown(name),
            known => known,
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Predicate {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<Operator>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
            logic: None,
        }
    }

    pub fn with_logic(mut self, logic: Logic) -> Self {
        self.logic = Some(logic);
        self
    }

    /// Whether `record` satisfies this predicate.
    pub fn matches(&self, record: &Record) -> bool {
        compare_values(record.field(&self.field), &self.operator, &self.value)
    }
}

/// Apply `operator` to a record field and the predicate operand.
///
/// Never fails: unknown operators pass, and numeric comparisons involving
/// a non-numeric side are false.
pub fn compare_values(actual: FieldValue<'_>, operator: &Operator, expected: &Value) -> bool {
    match operator {
        Operator::Equals => coerce::strict_equals(actual, expected),
        Operator::NotEquals => !coerce::strict_equals(actual, expected),
        Operator::Contains => text_match(actual, expected, |a, e| a.contains(e)),
        Operator::StartsWith => text_match(actual, expected, |a, e| a.starts_with(e)),
        Operator::EndsWith => text_match(actual, expected, |a, e| a.ends_with(e)),
        Operator::IsEmpty => !coerce::is_truthy(actual),
        Operator::IsNotEmpty => coerce::is_truthy(actual),
        Operator::GreaterThan | Operator::After => numeric_cmp(actual, expected, |a, e| a > e),
        Operator::LessThan | Operator::Before => numeric_cmp(actual, expected, |a, e| a < e),
        Operator::Unknown(_) => true,
    }
}

fn text_match(actual: FieldValue<'_>, expected: &Value, cmp: fn(&str, &str) -> bool) -> bool {
    if !coerce::is_truthy(actual) {
        return false;
    }
    let FieldValue::Present(actual) = actual else {
        return false;
    };
    let haystack = coerce::to_text(actual).to_lowercase();
    let needle = coerce::to_text(expected).to_lowercase();
    cmp(&haystack, &needle)
}

fn numeric_cmp(actual: FieldValue<'_>, expected: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    // NaN on either side makes both `>` and `<` false.
    cmp(
        coerce::to_number(actual),
        coerce::to_number(FieldValue::Present(expected)),
    )
}

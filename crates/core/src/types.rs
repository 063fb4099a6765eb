//! Record representation shared by the data-access layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CrmError, CrmResult};

/// One row fetched from the hosted store (a contact, deal, ...).
///
/// Records are structurally typed: no schema is enforced, keys are looked
/// up by name at evaluation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

/// Result of looking a field up on a [`Record`].
///
/// A key that is absent is not the same as a key holding `null`: the two
/// coerce differently to numbers and never compare strictly equal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Missing,
    Present(&'a Value),
}

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn field(&self, name: &str) -> FieldValue<'_> {
        match self.0.get(name) {
            Some(value) => FieldValue::Present(value),
            None => FieldValue::Missing,
        }
    }

    /// Set `name`, replacing any previous value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = CrmError;

    fn try_from(value: Value) -> CrmResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(CrmError::InvalidRecord(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Parse a JSON array of objects into records.
pub fn records_from_json(input: &str) -> CrmResult<Vec<Record>> {
    let values: Vec<Value> = serde_json::from_str(input)?;
    values.into_iter().map(Record::try_from).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

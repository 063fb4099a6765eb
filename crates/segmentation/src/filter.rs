//! Conjunctive filter sets.

use crm_core::{CrmError, CrmResult, Record};
use serde::{Deserialize, Serialize};

use crate::predicates::Predicate;

/// Ordered list of predicates combined with AND.
///
/// An empty set matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Predicate> {
        self.predicates.iter()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// True iff every predicate passes on `record`.
    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    /// Matching records, in input order.
    pub fn filter<'a>(&'a self, records: &'a [Record]) -> impl Iterator<Item = &'a Record> + 'a {
        records.iter().filter(move |r| self.matches(r))
    }

    /// Predicates whose operator the evaluator does not recognise.
    pub fn unknown_operators(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter().filter(|p| !p.operator.is_known())
    }

    /// Reject the set if any predicate uses an unknown operator.
    pub fn validate(&self) -> CrmResult<()> {
        match self.unknown_operators().next() {
            Some(p) => Err(CrmError::UnknownOperator {
                field: p.field.clone(),
                operator: p.operator.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl From<Vec<Predicate>> for FilterSet {
    fn from(predicates: Vec<Predicate>) -> Self {
        Self::new(predicates)
    }
}

impl FromIterator<Predicate> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a Predicate;
    type IntoIter = std::slice::Iter<'a, Predicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.predicates.iter()
    }
}

//! Segment builder — fluent API for constructing saved segments.

use serde_json::Value;
use uuid::Uuid;

use crate::engine::Segment;
use crate::filter::FilterSet;
use crate::predicates::{Operator, Predicate};

pub struct SegmentBuilder {
    tenant_id: Uuid,
    name: String,
    description: Option<String>,
    filters: FilterSet,
    tags: Vec<String>,
}

impl SegmentBuilder {
    pub fn new(tenant_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            tenant_id,
            name: name.into(),
            description: None,
            filters: FilterSet::default(),
            tags: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn filters(mut self, filters: FilterSet) -> Self {
        for predicate in &filters {
            self.filters.push(predicate.clone());
        }
        self
    }

    pub fn equals(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::new(field, Operator::Equals, value))
    }

    pub fn contains(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::new(field, Operator::Contains, value))
    }

    pub fn greater_than(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::new(field, Operator::GreaterThan, value))
    }

    pub fn less_than(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Predicate::new(field, Operator::LessThan, value))
    }

    pub fn is_empty(self, field: impl Into<String>) -> Self {
        self.filter(Predicate::new(field, Operator::IsEmpty, Value::Null))
    }

    pub fn is_not_empty(self, field: impl Into<String>) -> Self {
        self.filter(Predicate::new(field, Operator::IsNotEmpty, Value::Null))
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn build(self) -> Segment {
        let now = chrono::Utc::now();
        Segment {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: self.name,
            description: self.description,
            filters: self.filters,
            tags: self.tags,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_predicate_order() {
        let tenant = Uuid::new_v4();
        let segment = SegmentBuilder::new(tenant, "Hot leads")
            .description("Leads with a phone and a recent score")
            .is_not_empty("phone")
            .greater_than("lead_score", 70)
            .contains("source", "whatsapp")
            .tag("sales")
            .build();

        assert_eq!(segment.tenant_id, tenant);
        assert_eq!(segment.tags, vec!["sales".to_string()]);
        let operators: Vec<_> = segment.filters.iter().map(|p| p.operator.clone()).collect();
        assert_eq!(
            operators,
            vec![Operator::IsNotEmpty, Operator::GreaterThan, Operator::Contains]
        );
        assert_eq!(segment.created_at, segment.updated_at);
    }
}

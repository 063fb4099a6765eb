//! Saved-segment registry and membership evaluation.

use chrono::{DateTime, Utc};
use crm_core::config::SegmentsConfig;
use crm_core::{CrmError, CrmResult, Record};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::filter::FilterSet;
use crate::pagination::{paginate_page, PageRequest, PageResult};

/// A tenant's saved segment: a named filter set over contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Segment {
    pub fn matches(&self, record: &Record) -> bool {
        self.filters.matches(record)
    }
}

pub struct SegmentationEngine {
    segments: DashMap<Uuid, Segment>,
    strict_operators: bool,
    default_page_size: usize,
}

impl SegmentationEngine {
    pub fn new() -> Self {
        Self::with_config(&SegmentsConfig::default())
    }

    pub fn with_config(config: &SegmentsConfig) -> Self {
        Self {
            segments: DashMap::new(),
            strict_operators: config.strict_operators,
            default_page_size: config.default_page_size.max(1),
        }
    }

    /// First page at the configured page size.
    pub fn default_page(&self) -> PageRequest {
        PageRequest::new(0, self.default_page_size)
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    /// Register or replace a segment. In strict mode, filter sets with
    /// unknown operators are rejected.
    pub fn register(&self, segment: Segment) -> CrmResult<()> {
        self.check_filters(segment.id, &segment.filters)?;
        info!(
            segment_id = %segment.id,
            tenant_id = %segment.tenant_id,
            name = %segment.name,
            predicates = segment.filters.len(),
            "Segment registered"
        );
        self.segments.insert(segment.id, segment);
        Ok(())
    }

    pub fn update_filters(&self, id: Uuid, filters: FilterSet) -> CrmResult<Segment> {
        self.check_filters(id, &filters)?;
        let mut entry = self.segments.get_mut(&id).ok_or(CrmError::SegmentNotFound(id))?;
        entry.filters = filters;
        entry.updated_at = Utc::now();
        debug!(segment_id = %id, predicates = entry.filters.len(), "Segment filters updated");
        Ok(entry.clone())
    }

    pub fn get_segment(&self, id: &Uuid) -> Option<Segment> {
        self.segments.get(id).map(|s| s.clone())
    }

    pub fn remove_segment(&self, id: &Uuid) -> Option<Segment> {
        self.segments.remove(id).map(|(_, segment)| segment)
    }

    /// Segments owned by `tenant_id`, sorted by name.
    pub fn list_segments(&self, tenant_id: Uuid) -> Vec<Segment> {
        let mut segments: Vec<Segment> = self
            .segments
            .iter()
            .filter(|s| s.tenant_id == tenant_id)
            .map(|s| s.value().clone())
            .collect();
        segments.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        segments
    }

    /// Ids of the tenant's segments that `record` belongs to, in
    /// segment-name order.
    pub fn memberships(&self, tenant_id: Uuid, record: &Record) -> Vec<Uuid> {
        self.list_segments(tenant_id)
            .into_iter()
            .filter(|segment| segment.matches(record))
            .map(|segment| segment.id)
            .collect()
    }

    /// One page of `records` that belong to segment `id`.
    pub fn members(&self, id: Uuid, records: &[Record], page: PageRequest) -> CrmResult<PageResult> {
        let filters = self.filters_for(id)?;
        let result = paginate_page(records, &filters, page);
        debug!(
            segment_id = %id,
            candidates = records.len(),
            count = result.count,
            offset = page.offset,
            limit = page.limit,
            "Segment members evaluated"
        );
        Ok(result)
    }

    /// Number of `records` that belong to segment `id`.
    pub fn count(&self, id: Uuid, records: &[Record]) -> CrmResult<usize> {
        let filters = self.filters_for(id)?;
        Ok(filters.filter(records).count())
    }

    fn filters_for(&self, id: Uuid) -> CrmResult<FilterSet> {
        self.segments
            .get(&id)
            .map(|s| s.filters.clone())
            .ok_or(CrmError::SegmentNotFound(id))
    }

    fn check_filters(&self, id: Uuid, filters: &FilterSet) -> CrmResult<()> {
        if self.strict_operators {
            return filters.validate();
        }
        for predicate in filters.unknown_operators() {
            warn!(
                segment_id = %id,
                field = %predicate.field,
                operator = %predicate.operator,
                "Unknown operator, predicate will match every record"
            );
        }
        Ok(())
    }
}

impl Default for SegmentationEngine {
    fn default() -> Self {
        Self::new()
    }
}

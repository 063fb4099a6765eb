//! Paginated result assembly over already-fetched records.

use crm_core::Record;
use serde::{Deserialize, Serialize};

use crate::filter::FilterSet;

/// Window into a filtered result: `[offset, offset + limit)`.
///
/// Deserialized requests go through [`PageRequest::new`], so a `limit` of 0
/// read from JSON is clamped like any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPageRequest")]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

#[derive(Deserialize)]
struct RawPageRequest {
    #[serde(default)]
    offset: usize,
    limit: usize,
}

impl From<RawPageRequest> for PageRequest {
    fn from(raw: RawPageRequest) -> Self {
        Self::new(raw.offset, raw.limit)
    }
}

impl PageRequest {
    /// A zero `limit` is raised to one.
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: limit.max(1),
        }
    }

    /// Window for a 1-based page number. Page 0 is read as page 1.
    pub fn from_page(page: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self::new(page.saturating_sub(1).saturating_mul(page_size), page_size)
    }

    /// 1-based page number this window starts on. A hand-built request
    /// with a zero `limit` reads as pages of one.
    pub fn page_number(&self) -> usize {
        self.offset / self.limit.max(1) + 1
    }
}

/// One page of matches plus the total number of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub count: usize,
    pub items: Vec<Record>,
}

impl PageResult {
    pub fn total_pages(&self, page_size: usize) -> usize {
        self.count.div_ceil(page_size.max(1))
    }
}

/// Filter `records` through `filters` and return the requested window.
///
/// Matches keep their input order. An offset past the last match yields an
/// empty page with the full count.
pub fn paginate(records: &[Record], filters: &FilterSet, offset: usize, limit: usize) -> PageResult {
    let page = PageRequest::new(offset, limit);
    let end = page.offset.saturating_add(page.limit);

    let mut count = 0;
    let mut items = Vec::with_capacity(page.limit.min(records.len()));
    for record in filters.filter(records) {
        if (page.offset..end).contains(&count) {
            items.push(record.clone());
        }
        count += 1;
    }

    PageResult { count, items }
}

/// [`paginate`] with a [`PageRequest`].
pub fn paginate_page(records: &[Record], filters: &FilterSet, page: PageRequest) -> PageResult {
    paginate(records, filters, page.offset, page.limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::Predicate;

    fn contacts(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::new()
                    .with("id", i)
                    .with("status", if i % 2 == 0 { "active" } else { "archived" })
            })
            .collect()
    }

    fn ids(page: &PageResult) -> Vec<u64> {
        page.items
            .iter()
            .filter_map(|r| r.as_map()["id"].as_u64())
            .collect()
    }

    #[test]
    fn test_boundary_pages() {
        let records = contacts(25);
        let filters = FilterSet::default();

        let page = paginate(&records, &filters, 20, 10);
        assert_eq!(page.count, 25);
        assert_eq!(page.items.len(), 5);
        assert_eq!(ids(&page), vec![20, 21, 22, 23, 24]);

        let page = paginate(&records, &filters, 30, 10);
        assert_eq!(page.count, 25);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_page_of_filtered_matches() {
        let records = contacts(10);
        let filters = FilterSet::new(vec![Predicate::new("status", "equals", "active")]);

        let page = paginate(&records, &filters, 1, 2);
        assert_eq!(page.count, 5);
        assert_eq!(ids(&page), vec![2, 4]);
    }

    #[test]
    fn test_empty_input() {
        let page = paginate(&[], &FilterSet::default(), 0, 10);
        assert_eq!(page, PageResult::default());
        assert_eq!(page.total_pages(10), 0);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let records = contacts(3);
        let page = paginate(&records, &FilterSet::default(), 0, 0);
        assert_eq!(page.count, 3);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_page_numbers() {
        let request = PageRequest::from_page(3, 20);
        assert_eq!(request, PageRequest { offset: 40, limit: 20 });
        assert_eq!(request.page_number(), 3);
        assert_eq!(PageRequest::from_page(0, 20).offset, 0);

        let result = PageResult { count: 41, items: Vec::new() };
        assert_eq!(result.total_pages(20), 3);
        assert_eq!(result.total_pages(41), 1);
    }

    #[test]
    fn test_deserialized_zero_limit_is_clamped() {
        let request: PageRequest = serde_json::from_str(r#"{"offset": 0, "limit": 0}"#).unwrap();
        assert_eq!(request, PageRequest::new(0, 1));
        assert_eq!(request.page_number(), 1);

        let request: PageRequest = serde_json::from_str(r#"{"limit": 25}"#).unwrap();
        assert_eq!(request, PageRequest { offset: 0, limit: 25 });
    }

    #[test]
    fn test_page_number_with_zero_limit() {
        let request = PageRequest { offset: 5, limit: 0 };
        assert_eq!(request.page_number(), 6);

        let page = paginate_page(&contacts(8), &FilterSet::default(), request);
        assert_eq!(page.count, 8);
        assert_eq!(ids(&page), vec![5]);
    }
}

//! Segment predicate evaluation for the CRM data-access layer: saved
//! segment filters, in-memory evaluation over fetched rows, push-down
//! planning against the hosted store, and pagination.

pub mod builder;
pub mod coerce;
pub mod engine;
pub mod filter;
pub mod pagination;
pub mod predicates;
pub mod pushdown;

pub use builder::SegmentBuilder;
pub use engine::{Segment, SegmentationEngine};
pub use filter::FilterSet;
pub use pagination::{paginate, paginate_page, PageRequest, PageResult};
pub use predicates::{compare_values, Logic, Operator, Predicate};
pub use pushdown::{Pushdown, QueryPlan, RemoteFilter, RemoteOp};

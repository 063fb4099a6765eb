pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{CrmError, CrmResult};
pub use types::{records_from_json, FieldValue, Record};

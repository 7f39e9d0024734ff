//! Core data models for fetched articles and page requests.

mod record;
mod search;

pub use record::{
    parse_identifier, CandidateRecord, Classification, ExportRecord, RawEntry, RecordError,
};
pub use search::{PageRequest, QueryTarget, SortBy, SortOrder};

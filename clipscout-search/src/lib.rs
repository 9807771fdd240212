//! Keyword search aggregation over the TikTok search API.
//!
//! A run fans out a fixed set of page requests concurrently, folds whatever
//! comes back into one deduplicated list, and filters it against a calendar
//! window resolved in local time.
pub mod error;
pub mod orchestrator;
pub mod source;
pub mod window;

pub use error::SearchError;
pub use orchestrator::{
    AggregatedResult, DEFAULT_SORT_BY, PageOutcome, SearchOrchestrator, SearchRequest,
    SearchSettings, aggregate,
};
pub use source::PageSource;
pub use window::{DateWindow, PublishTime};

/// Failures that abort a search run before any upstream call is made.
///
/// Page-level failures never surface here; they are logged and the page is
/// dropped from the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("no upstream API key configured")]
    MissingCredential,
    #[error("invalid search settings: {0}")]
    InvalidSettings(String),
}

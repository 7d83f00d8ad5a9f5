/// Wikipedia data-source abstraction
///
/// The recommendation pipeline only talks to Wikipedia through this trait,
/// which keeps the candidate generation testable against mocks and leaves
/// room for other wiki backends.
use crate::{error::AppResult, models::PageSummary};

pub mod wikipedia;

pub use wikipedia::WikipediaProvider;

/// Trait for link-graph and summary fetchers
///
/// All three operations are idempotent reads against the public API and may
/// fail on network or HTTP errors; callers decide how much failure they
/// tolerate.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WikiProvider: Send + Sync {
    /// Titles of articles that link TO `title` (main namespace only).
    async fn backlinks(&self, title: &str) -> AppResult<Vec<String>>;

    /// Titles of articles that `title` links TO (main namespace only).
    async fn forward_links(&self, title: &str) -> AppResult<Vec<String>>;

    /// Display-ready summary for `title`.
    async fn summary(&self, title: &str) -> AppResult<PageSummary>;
}

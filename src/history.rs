use std::sync::{Arc, PoisonError, RwLock};

use crate::models::VisitedArticle;

/// Ordered, read-only view of the user's reading history
///
/// The recommendation core only reads from this; recording visits belongs to
/// whoever owns the store.
pub trait VisitedHistory: Send + Sync {
    /// Visited articles, most recent first.
    fn visited(&self) -> Vec<VisitedArticle>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory visited-article store with bounded capacity
///
/// Revisiting an article promotes it to the front rather than duplicating
/// it; past capacity, the oldest entry is retired.
#[derive(Clone)]
pub struct InMemoryHistory {
    inner: Arc<RwLock<Vec<VisitedArticle>>>,
    capacity: usize,
}

impl InMemoryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Vec::new())),
            capacity,
        }
    }

    /// Records a visit, promoting the title if it was already present.
    pub fn record(&self, title: &str) {
        let mut articles = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(position) = articles.iter().position(|a| a.title == title) {
            articles.remove(position);
        }
        articles.insert(0, VisitedArticle::new(title));

        if articles.len() > self.capacity {
            articles.truncate(self.capacity);
        }
    }
}

impl VisitedHistory for InMemoryHistory {
    fn visited(&self) -> Vec<VisitedArticle> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(history: &InMemoryHistory) -> Vec<String> {
        history.visited().into_iter().map(|a| a.title).collect()
    }

    #[test]
    fn test_records_most_recent_first() {
        let history = InMemoryHistory::new(10);
        history.record("Alps");
        history.record("Danube");
        history.record("Rhine");

        assert_eq!(titles(&history), vec!["Rhine", "Danube", "Alps"]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_revisit_promotes_without_duplicating() {
        let history = InMemoryHistory::new(10);
        history.record("Alps");
        history.record("Danube");
        history.record("Alps");

        assert_eq!(titles(&history), vec!["Alps", "Danube"]);
    }

    #[test]
    fn test_capacity_retires_oldest() {
        let history = InMemoryHistory::new(2);
        history.record("Alps");
        history.record("Danube");
        history.record("Rhine");

        assert_eq!(titles(&history), vec!["Rhine", "Danube"]);
    }

    #[test]
    fn test_empty_history() {
        let history = InMemoryHistory::new(10);
        assert!(history.is_empty());
        assert!(history.visited().is_empty());
    }
}

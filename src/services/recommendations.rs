/// Recommendation feed pipeline
///
/// Samples the reading history, walks the link graph outward from the
/// sampled articles, and assembles a shuffled feed of summaries. Partial
/// data always beats total failure: a single bad fetch costs at most its
/// own contribution, never the whole feed.
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    error::AppResult,
    history::VisitedHistory,
    models::{LinkKind, RecommendationItem, VisitedArticle},
    random::RandomSource,
    services::providers::WikiProvider,
};

// Extra summaries fetched beyond the limit so individual failures do not
// shrink the feed.
const SUMMARY_SLACK: usize = 5;

const GENERIC_ERROR: &str = "Could not load recommendations. Please try again.";

/// Observable pipeline state, updated only by the latest invocation
#[derive(Debug, Default)]
struct FeedState {
    loading: bool,
    error: Option<String>,
    generation: u64,
}

/// Produces the recommendation feed from history, link graph, and summaries
pub struct RecommendationService {
    provider: Arc<dyn WikiProvider>,
    history: Arc<dyn VisitedHistory>,
    random: Arc<dyn RandomSource>,
    state: Arc<RwLock<FeedState>>,
}

impl RecommendationService {
    pub fn new(
        provider: Arc<dyn WikiProvider>,
        history: Arc<dyn VisitedHistory>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            provider,
            history,
            random,
            state: Arc::new(RwLock::new(FeedState::default())),
        }
    }

    pub fn loading(&self) -> bool {
        self.read_state(|s| s.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.read_state(|s| s.error.clone())
    }

    pub fn visited_articles_count(&self) -> usize {
        self.history.len()
    }

    /// Builds a feed of at most `limit` recommendations.
    ///
    /// Resolves to an empty list on an empty history or when the pipeline
    /// fails outright; in the failure case `error()` carries a user-facing
    /// message. Overlapping invocations each get their own return value, but
    /// only the latest one updates the observable state.
    pub async fn get_recommendations(&self, limit: usize) -> Vec<RecommendationItem> {
        let generation = self.begin();
        let outcome = self.build_feed(limit).await;
        self.finish(generation, &outcome);
        outcome.unwrap_or_default()
    }

    async fn build_feed(&self, limit: usize) -> AppResult<Vec<RecommendationItem>> {
        let visited = self.history.visited();
        if visited.is_empty() {
            tracing::debug!("No reading history, feed is empty");
            return Ok(Vec::new());
        }

        let source_count = max_source_articles(visited.len(), limit);
        let sources = self.sample_sources(&visited, source_count);

        tracing::debug!(
            history = visited.len(),
            sources = sources.len(),
            limit,
            "Generating recommendations"
        );

        let batches = self.fetch_link_batches(sources).await;

        let visited_titles: HashSet<&str> = visited.iter().map(|a| a.title.as_str()).collect();
        let mut candidates = merge_candidates(batches, &visited_titles);
        self.shuffle(&mut candidates);
        candidates.truncate(limit + SUMMARY_SLACK);

        let mut items = self.resolve_summaries(candidates).await;
        items.truncate(limit);

        tracing::info!(count = items.len(), "Feed assembled");

        Ok(items)
    }

    /// Draws `count` distinct source articles uniformly, without
    /// replacement, via an index pool.
    fn sample_sources(&self, visited: &[VisitedArticle], count: usize) -> Vec<String> {
        let mut pool: Vec<usize> = (0..visited.len()).collect();
        let mut sources = Vec::with_capacity(count);

        while sources.len() < count && !pool.is_empty() {
            let slot = self.random.pick(pool.len());
            let index = pool.swap_remove(slot);
            sources.push(visited[index].title.clone());
        }

        sources
    }

    /// Fetches one link batch per source in parallel.
    ///
    /// Each source is queried for either backlinks or forward links, chosen
    /// by an unbiased coin flip for candidate diversity. A failed fetch
    /// contributes an empty batch and never disturbs its siblings.
    async fn fetch_link_batches(&self, sources: Vec<String>) -> Vec<Vec<String>> {
        let mut tasks = Vec::with_capacity(sources.len());

        for title in sources {
            let kind = if self.random.next_f64() < 0.5 {
                LinkKind::Backlinks
            } else {
                LinkKind::ForwardLinks
            };
            let provider = Arc::clone(&self.provider);

            tasks.push(tokio::spawn(async move {
                let links = match kind {
                    LinkKind::Backlinks => provider.backlinks(&title).await,
                    LinkKind::ForwardLinks => provider.forward_links(&title).await,
                };

                match links {
                    Ok(links) => links,
                    Err(e) => {
                        tracing::warn!(
                            title = %title,
                            kind = %kind,
                            error = %e,
                            "Link fetch failed, contributing no candidates"
                        );
                        Vec::new()
                    }
                }
            }));
        }

        let mut batches = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(links) => batches.push(links),
                Err(e) => {
                    tracing::error!(error = %e, "Link fetch task failed");
                    batches.push(Vec::new());
                }
            }
        }

        batches
    }

    /// Unbiased Fisher-Yates shuffle over the injected randomness source.
    fn shuffle(&self, items: &mut [String]) {
        for i in (1..items.len()).rev() {
            let j = self.random.pick(i + 1);
            items.swap(i, j);
        }
    }

    /// Resolves summaries for every candidate in parallel, substituting a
    /// bare-title stub where resolution fails. Output preserves candidate
    /// order, not completion order.
    async fn resolve_summaries(&self, candidates: Vec<String>) -> Vec<RecommendationItem> {
        let mut tasks = Vec::with_capacity(candidates.len());

        for title in candidates {
            let provider = Arc::clone(&self.provider);
            let task_title = title.clone();

            let handle = tokio::spawn(async move {
                match provider.summary(&task_title).await {
                    Ok(summary) => RecommendationItem::from(summary),
                    Err(e) => {
                        tracing::debug!(
                            title = %task_title,
                            error = %e,
                            "Summary fetch failed, using stub"
                        );
                        RecommendationItem::stub(&task_title)
                    }
                }
            });

            tasks.push((title, handle));
        }

        let mut items = Vec::with_capacity(tasks.len());
        for (title, handle) in tasks {
            match handle.await {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::error!(title = %title, error = %e, "Summary task failed");
                    items.push(RecommendationItem::stub(&title));
                }
            }
        }

        items
    }

    /// Marks a new invocation: clears the previous error, raises the loading
    /// flag, and hands back the generation token guarding state updates.
    fn begin(&self) -> u64 {
        let mut state = self.write_state();
        state.generation += 1;
        state.loading = true;
        state.error = None;
        state.generation
    }

    /// Applies an invocation's outcome to the observable state, unless a
    /// newer invocation has started since (stale response guard).
    fn finish(&self, generation: u64, outcome: &AppResult<Vec<RecommendationItem>>) {
        let mut state = self.write_state();
        if state.generation != generation {
            tracing::debug!(generation, "Discarding stale feed state update");
            return;
        }

        state.loading = false;
        if let Err(e) = outcome {
            tracing::error!(error = %e, "Feed generation failed");
            state.error = Some(GENERIC_ERROR.to_string());
        }
    }

    fn read_state<T>(&self, f: impl FnOnce(&FeedState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, FeedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Number of history entries sampled for a feed of `limit` items.
fn max_source_articles(history_len: usize, limit: usize) -> usize {
    history_len.min(limit.div_ceil(2))
}

/// Flattens per-source link batches into a deduplicated candidate list,
/// dropping titles the user has already visited. First occurrence wins.
fn merge_candidates(batches: Vec<Vec<String>>, visited_titles: &HashSet<&str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for batch in batches {
        for title in batch {
            if visited_titles.contains(title.as_str()) {
                continue;
            }
            if seen.insert(title.clone()) {
                candidates.push(title);
            }
        }
    }

    candidates
}

/// Wikipedia provider backed by the public Action and REST APIs
///
/// Link-graph queries go through the MediaWiki Action API; page summaries
/// come from the REST `page/summary` endpoint. Every call is routed through
/// the shared request cache, so repeated queries within the stale window
/// never touch the network twice.
use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    cache::{Cache, CacheKey},
    config::Config,
    error::{AppError, AppResult},
    models::PageSummary,
    services::providers::WikiProvider,
};

const LINK_STALE_TIME: Duration = Duration::from_secs(10 * 60);
const LINK_GC_TIME: Duration = Duration::from_secs(30 * 60);
const SUMMARY_STALE_TIME: Duration = Duration::from_secs(5 * 60);
const SUMMARY_GC_TIME: Duration = Duration::from_secs(30 * 60);

// Main (article) namespace only; talk/user/project pages never become
// candidates.
const ARTICLE_NAMESPACE: &str = "0";

#[derive(Debug, Deserialize)]
struct BacklinksResponse {
    #[serde(default)]
    query: Option<BacklinksQuery>,
}

#[derive(Debug, Deserialize)]
struct BacklinksQuery {
    #[serde(default)]
    backlinks: Vec<PageRef>,
}

#[derive(Debug, Deserialize)]
struct ForwardLinksResponse {
    #[serde(default)]
    query: Option<ForwardLinksQuery>,
}

#[derive(Debug, Deserialize)]
struct ForwardLinksQuery {
    #[serde(default)]
    pages: HashMap<String, ForwardLinksPage>,
}

#[derive(Debug, Deserialize)]
struct ForwardLinksPage {
    #[serde(default)]
    links: Vec<PageRef>,
}

#[derive(Debug, Deserialize)]
struct PageRef {
    title: String,
}

#[derive(Clone)]
pub struct WikipediaProvider {
    http_client: HttpClient,
    action_api_url: String,
    rest_api_url: String,
    cache: Cache,
}

impl WikipediaProvider {
    pub fn new(config: &Config, cache: Cache) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            http_client,
            action_api_url: config.action_api_url.clone(),
            rest_api_url: config.rest_api_url.clone(),
            cache,
        })
    }

    async fn fetch_backlinks(&self, title: &str) -> AppResult<Vec<String>> {
        let response = self
            .http_client
            .get(&self.action_api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("list", "backlinks"),
                ("bltitle", title),
                ("blnamespace", ARTICLE_NAMESPACE),
                ("bllimit", "max"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body: BacklinksResponse = response.json().await?;
        let titles: Vec<String> = body
            .query
            .map(|q| q.backlinks.into_iter().map(|p| p.title).collect())
            .unwrap_or_default();

        tracing::debug!(title = %title, count = titles.len(), "Backlinks fetched");

        Ok(titles)
    }

    async fn fetch_forward_links(&self, title: &str) -> AppResult<Vec<String>> {
        let response = self
            .http_client
            .get(&self.action_api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "links"),
                ("titles", title),
                ("plnamespace", ARTICLE_NAMESPACE),
                ("pllimit", "max"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        // The Action API keys results by page id; a single-title query still
        // comes back as a one-entry map.
        let body: ForwardLinksResponse = response.json().await?;
        let titles: Vec<String> = body
            .query
            .map(|q| {
                q.pages
                    .into_values()
                    .flat_map(|page| page.links)
                    .map(|p| p.title)
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(title = %title, count = titles.len(), "Forward links fetched");

        Ok(titles)
    }

    async fn fetch_summary(&self, title: &str) -> AppResult<PageSummary> {
        let url = format!(
            "{}/page/summary/{}",
            self.rest_api_url,
            summary_path_segment(title)
        );

        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let summary: PageSummary = response.json().await?;

        tracing::debug!(title = %title, pageid = ?summary.pageid, "Summary fetched");

        Ok(summary)
    }

    async fn status_error(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        AppError::ExternalApi(format!("API returned status {}: {}", status, body))
    }
}

/// REST path segment for a title: canonical underscores, percent-encoded.
fn summary_path_segment(title: &str) -> String {
    urlencoding::encode(&title.replace(' ', "_")).into_owned()
}

#[async_trait::async_trait]
impl WikiProvider for WikipediaProvider {
    async fn backlinks(&self, title: &str) -> AppResult<Vec<String>> {
        self.cache
            .fetch(
                &CacheKey::Backlinks(title.to_string()),
                LINK_STALE_TIME,
                LINK_GC_TIME,
                || self.fetch_backlinks(title),
            )
            .await
    }

    async fn forward_links(&self, title: &str) -> AppResult<Vec<String>> {
        self.cache
            .fetch(
                &CacheKey::ForwardLinks(title.to_string()),
                LINK_STALE_TIME,
                LINK_GC_TIME,
                || self.fetch_forward_links(title),
            )
            .await
    }

    async fn summary(&self, title: &str) -> AppResult<PageSummary> {
        self.cache
            .fetch(
                &CacheKey::Summary(title.to_string()),
                SUMMARY_STALE_TIME,
                SUMMARY_GC_TIME,
                || self.fetch_summary(title),
            )
            .await
    }
}

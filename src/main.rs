use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use wikifeed::cache::Cache;
use wikifeed::config::Config;
use wikifeed::history::InMemoryHistory;
use wikifeed::random::ThreadRandom;
use wikifeed::services::providers::WikipediaProvider;
use wikifeed::services::RecommendationService;

/// Seeds the reading history from the command line and prints one feed.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let titles: Vec<String> = std::env::args().skip(1).collect();
    if titles.is_empty() {
        eprintln!("usage: wikifeed <visited article title>...");
        std::process::exit(2);
    }

    let history = Arc::new(InMemoryHistory::new(config.history_capacity));
    for title in &titles {
        history.record(title);
    }

    let provider = Arc::new(WikipediaProvider::new(&config, Cache::new())?);
    let service = RecommendationService::new(provider, history, Arc::new(ThreadRandom));

    let feed = service.get_recommendations(config.feed_limit).await;

    if let Some(error) = service.error() {
        eprintln!("{}", error);
        std::process::exit(1);
    }

    for item in feed {
        match &item.description {
            Some(description) => println!("{}: {}", item.title, description),
            None => println!("{}", item.title),
        }
    }

    Ok(())
}

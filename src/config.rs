use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// MediaWiki Action API endpoint (backlinks, forward links)
    #[serde(default = "default_action_api_url")]
    pub action_api_url: String,

    /// Wikipedia REST API base URL (page summaries)
    #[serde(default = "default_rest_api_url")]
    pub rest_api_url: String,

    /// User-Agent header sent with every request, per Wikimedia API etiquette
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Number of recommendations produced per feed refresh
    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,

    /// Maximum number of visited articles retained in history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_action_api_url() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

fn default_rest_api_url() -> String {
    "https://en.wikipedia.org/api/rest_v1".to_string()
}

fn default_user_agent() -> String {
    "wikifeed/0.1 (https://github.com/wikifeed)".to_string()
}

fn default_feed_limit() -> usize {
    10
}

fn default_history_capacity() -> usize {
    100
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_env() {
        let config: Config = envy::from_iter(std::iter::empty::<(String, String)>()).unwrap();
        assert_eq!(config.action_api_url, "https://en.wikipedia.org/w/api.php");
        assert_eq!(config.rest_api_url, "https://en.wikipedia.org/api/rest_v1");
        assert_eq!(config.feed_limit, 10);
        assert_eq!(config.history_capacity, 100);
    }
}

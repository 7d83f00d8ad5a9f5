use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A previously viewed article, recorded by the reading history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitedArticle {
    pub title: String,
    pub visited_at: DateTime<Utc>,
}

impl VisitedArticle {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            visited_at: Utc::now(),
        }
    }
}

/// Which side of the link graph a candidate query walks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Articles that link TO the subject
    Backlinks,
    /// Articles the subject links TO
    ForwardLinks,
}

impl Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkKind::Backlinks => write!(f, "backlinks"),
            LinkKind::ForwardLinks => write!(f, "links"),
        }
    }
}

/// Thumbnail image from the REST summary endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thumbnail {
    pub source: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Raw response of the Wikipedia REST `page/summary/{title}` endpoint
///
/// Only the fields the feed renders are deserialized; everything else in the
/// payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageSummary {
    pub title: String,
    #[serde(default)]
    pub displaytitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub extract: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
    #[serde(default)]
    pub pageid: Option<u64>,
}

/// A single entry of the recommendation feed returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationItem {
    pub title: String,
    pub displaytitle: String,
    pub description: Option<String>,
    pub extract: Option<String>,
    pub thumbnail: Option<Thumbnail>,
    pub pageid: Option<u64>,
}

impl RecommendationItem {
    /// Degraded form substituted when summary resolution fails.
    ///
    /// A candidate that made the final cut is never dropped silently; it is
    /// rendered from its bare title instead.
    pub fn stub(title: &str) -> Self {
        Self {
            title: title.to_string(),
            displaytitle: title.to_string(),
            description: None,
            extract: None,
            thumbnail: None,
            pageid: None,
        }
    }
}

impl From<PageSummary> for RecommendationItem {
    fn from(summary: PageSummary) -> Self {
        let displaytitle = summary
            .displaytitle
            .unwrap_or_else(|| summary.title.clone());

        Self {
            title: summary.title,
            displaytitle,
            description: summary.description,
            extract: summary.extract,
            thumbnail: summary.thumbnail,
            pageid: summary.pageid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_mirrors_title_into_displaytitle() {
        let item = RecommendationItem::stub("Alan Turing");
        assert_eq!(item.title, "Alan Turing");
        assert_eq!(item.displaytitle, "Alan Turing");
        assert_eq!(item.description, None);
        assert_eq!(item.extract, None);
        assert_eq!(item.thumbnail, None);
        assert_eq!(item.pageid, None);
    }

    #[test]
    fn test_item_from_full_summary() {
        let summary = PageSummary {
            title: "Alan Turing".to_string(),
            displaytitle: Some("<b>Alan Turing</b>".to_string()),
            description: Some("English mathematician".to_string()),
            extract: Some("Alan Mathison Turing was...".to_string()),
            thumbnail: Some(Thumbnail {
                source: "https://upload.wikimedia.org/turing.jpg".to_string(),
                width: Some(320),
                height: Some(240),
            }),
            pageid: Some(1208),
        };

        let item = RecommendationItem::from(summary);
        assert_eq!(item.displaytitle, "<b>Alan Turing</b>");
        assert_eq!(item.pageid, Some(1208));
        assert_eq!(item.thumbnail.unwrap().width, Some(320));
    }

    #[test]
    fn test_item_from_summary_without_displaytitle() {
        let summary = PageSummary {
            title: "Alps".to_string(),
            displaytitle: None,
            description: None,
            extract: None,
            thumbnail: None,
            pageid: None,
        };

        let item = RecommendationItem::from(summary);
        assert_eq!(item.displaytitle, "Alps");
    }

    #[test]
    fn test_page_summary_deserializes_sparse_payload() {
        let json = r#"{"title": "Alps"}"#;
        let summary: PageSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.title, "Alps");
        assert_eq!(summary.extract, None);
    }
}

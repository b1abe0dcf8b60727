use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::Story;

pub const DEFAULT_ENDPOINT: &str = "https://hn.algolia.com/api/v1/search?query=";

const USER_AGENT: &str = concat!("hacker_stories/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search service answered with HTTP {0}")]
    Status(StatusCode),
    #[error("could not decode search response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can turn a query URL into a list of stories.
#[async_trait]
pub trait StorySource: Send + Sync {
    async fn fetch_stories(&self, url: &str) -> Result<Vec<Story>, FetchError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(alias = "stories")]
    hits: Vec<Story>,
}

pub struct HackerNewsClient {
    client: Client,
}

impl HackerNewsClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    pub(crate) fn parse_stories(body: &str) -> Result<Vec<Story>, FetchError> {
        let response: SearchResponse = serde_json::from_str(body)?;

        // Titles occasionally carry entities like &amp; straight from the submission form
        let stories = response
            .hits
            .into_iter()
            .map(|mut story| {
                story.title = html_escape::decode_html_entities(&story.title).into_owned();
                story
            })
            .collect();

        Ok(stories)
    }
}

#[async_trait]
impl StorySource for HackerNewsClient {
    async fn fetch_stories(&self, url: &str) -> Result<Vec<Story>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let stories = Self::parse_stories(&body)?;
        debug!(url, count = stories.len(), "decoded search response");

        Ok(stories)
    }
}

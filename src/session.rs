use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::controller::FetchController;
use crate::db::KeyValueStore;
use crate::hn_client::{StorySource, DEFAULT_ENDPOINT};
use crate::models::{StoriesState, Story};
use crate::store::{Generation, StoreError, StoriesAction, StoriesStore};
use crate::term::PersistentTerm;

pub const SEARCH_KEY: &str = "Search";
pub const DEFAULT_TERM: &str = "React";

/// How a session searches: which fetches fire and where filtering happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SearchMode {
    /// Fetch once on mount and filter titles locally by the live input.
    Local,
    /// Fetch whenever the committed query changes; the service does the filtering.
    Remote,
    /// Like `Remote`, but an empty committed term never fires a fetch.
    RemoteNonEmpty,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub endpoint: String,
    pub mode: SearchMode,
    pub storage_key: String,
    pub default_term: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            mode: SearchMode::RemoteNonEmpty,
            storage_key: SEARCH_KEY.to_string(),
            default_term: DEFAULT_TERM.to_string(),
        }
    }
}

/// What the render layer sees after each transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub data: Vec<Story>,
    pub is_loading: bool,
    pub is_error: bool,
    pub search_term: String,
}

/// Case-insensitive substring match on titles.
pub fn filter_stories(stories: &[Story], term: &str) -> Vec<Story> {
    let needle = term.to_lowercase();
    stories
        .iter()
        .filter(|story| story.title.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// One search session: the persisted input, the committed query, and the stories it produced.
pub struct SearchSession<S: KeyValueStore> {
    mode: SearchMode,
    term: PersistentTerm<S>,
    committed: String,
    // Last URL derived from the committed term, whether or not it was fetched
    derived_url: Option<String>,
    store: Arc<StoriesStore>,
    controller: FetchController,
}

impl<S: KeyValueStore> SearchSession<S> {
    pub fn new(source: Arc<dyn StorySource>, storage: S, options: SessionOptions) -> Self {
        let term = PersistentTerm::load(storage, options.storage_key, &options.default_term);
        let committed = term.value().to_string();
        let store = Arc::new(StoriesStore::new());
        let controller = FetchController::new(source, Arc::clone(&store), options.endpoint);

        Self {
            mode: options.mode,
            term,
            committed,
            derived_url: None,
            store,
            controller,
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn search_term(&self) -> &str {
        self.term.value()
    }

    pub fn committed_term(&self) -> &str {
        &self.committed
    }

    /// The URL the committed term maps to. Local sessions always query the bare endpoint.
    pub fn query_url(&self) -> String {
        match self.mode {
            SearchMode::Local => self.controller.url_for(""),
            SearchMode::Remote | SearchMode::RemoteNonEmpty => self.controller.url_for(&self.committed),
        }
    }

    fn may_fetch(&self) -> bool {
        !(self.mode == SearchMode::RemoteNonEmpty && self.committed.is_empty())
    }

    // Fetches when the derived URL moved since the last derivation, even if that one was never fetched
    fn derive_and_fetch(&mut self) -> Result<Option<Generation>, StoreError> {
        let url = self.query_url();
        if self.derived_url.as_deref() == Some(url.as_str()) {
            debug!(url = %url, "query unchanged, skipping fetch");
            return Ok(None);
        }
        self.derived_url = Some(url.clone());

        if !self.may_fetch() {
            debug!("empty search term, skipping fetch");
            return Ok(None);
        }

        self.controller.fetch(url).map(Some)
    }

    /// Fires the initial fetch for this mode.
    pub fn mount(&mut self) -> Result<Option<Generation>, StoreError> {
        self.derive_and_fetch()
    }

    pub fn on_search_input(&mut self, text: &str) {
        if let Err(e) = self.term.set(text) {
            warn!(key = self.term.key(), error = %e, "failed to persist search term");
        }
    }

    /// Commits the live input and refetches if the query changed.
    pub fn on_search_submit(&mut self) -> Result<Option<Generation>, StoreError> {
        self.committed = self.term.value().to_string();

        if self.mode == SearchMode::Local {
            return Ok(None);
        }

        self.derive_and_fetch()
    }

    pub fn on_remove_item(&self, story: &Story) -> Result<(), StoreError> {
        self.store.dispatch(StoriesAction::RemoveStory(story.clone()))?;
        Ok(())
    }

    /// Refetches the current query even if it has not changed.
    pub fn reload(&mut self) -> Result<Option<Generation>, StoreError> {
        if !self.may_fetch() {
            return Ok(None);
        }

        let url = self.query_url();
        self.controller.fetch(url).map(Some)
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, StoreError> {
        let StoriesState {
            data,
            is_loading,
            is_error,
        } = self.store.state()?;

        let data = match self.mode {
            SearchMode::Local => filter_stories(&data, self.term.value()),
            SearchMode::Remote | SearchMode::RemoteNonEmpty => data,
        };

        Ok(SessionSnapshot {
            data,
            is_loading,
            is_error,
            search_term: self.term.value().to_string(),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<StoriesState> {
        self.store.subscribe()
    }

    pub async fn settle(&mut self) {
        self.controller.settle().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stories() -> Vec<Story> {
        vec![Story::new(0u64, "React"), Story::new(1u64, "Redux")]
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let filtered = filter_stories(&stories(), "red");
        assert_eq!(filtered, vec![Story::new(1u64, "Redux")]);

        assert_eq!(filter_stories(&stories(), "RE").len(), 2);
        assert!(filter_stories(&stories(), "vue").is_empty());
    }

    #[test]
    fn empty_filter_keeps_everything() {
        assert_eq!(filter_stories(&stories(), ""), stories());
    }
}

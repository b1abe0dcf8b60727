use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::hn_client::StorySource;
use crate::store::{Generation, StoreError, StoriesStore};

/// Builds the request URL for a committed search term.
pub fn query_url(endpoint: &str, term: &str) -> String {
    format!("{}{}", endpoint, urlencoding::encode(term))
}

/// Issues story fetches and feeds their outcome back into the store.
///
/// Fetches are never cancelled. Each one is tagged with the generation handed
/// out by [`StoriesStore::begin_fetch`], and only the latest generation's
/// result is applied when it lands.
pub struct FetchController {
    source: Arc<dyn StorySource>,
    store: Arc<StoriesStore>,
    endpoint: String,
    last_url: Option<String>,
    in_flight: Vec<JoinHandle<()>>,
}

impl FetchController {
    pub fn new(source: Arc<dyn StorySource>, store: Arc<StoriesStore>, endpoint: impl Into<String>) -> Self {
        Self {
            source,
            store,
            endpoint: endpoint.into(),
            last_url: None,
            in_flight: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    pub fn url_for(&self, term: &str) -> String {
        query_url(&self.endpoint, term)
    }

    /// Dispatches `FETCH_INIT` right away and spawns the network call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn fetch(&mut self, url: String) -> Result<Generation, StoreError> {
        let generation = self.store.begin_fetch()?;
        info!(%generation, url = %url, "fetching stories");

        let source = Arc::clone(&self.source);
        let store = Arc::clone(&self.store);
        let request_url = url.clone();
        let handle = tokio::spawn(async move {
            let outcome = source.fetch_stories(&request_url).await;
            match store.complete_fetch(generation, outcome) {
                Ok(true) => debug!(%generation, "fetch settled"),
                Ok(false) => {}
                Err(e) => error!(%generation, error = %e, "could not apply fetch result"),
            }
        });

        // Drop handles of fetches that already finished
        self.in_flight.retain(|handle| !handle.is_finished());
        self.in_flight.push(handle);
        self.last_url = Some(url);

        Ok(generation)
    }

    /// Fetches only when `url` differs from the last requested one.
    pub fn fetch_if_changed(&mut self, url: String) -> Result<Option<Generation>, StoreError> {
        if self.last_url.as_deref() == Some(url.as_str()) {
            debug!(url = %url, "query unchanged, skipping fetch");
            return Ok(None);
        }

        self.fetch(url).map(Some)
    }

    /// Waits until every spawned fetch has reached its terminal dispatch.
    pub async fn settle(&mut self) {
        for handle in self.in_flight.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "fetch task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hn_client::FetchError;
    use crate::models::Story;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    const ENDPOINT: &str = "https://search.test/api?query=";

    // Hands out a oneshot per URL so a test decides when each response lands
    #[derive(Default)]
    struct GatedSource {
        gates: Mutex<HashMap<String, oneshot::Receiver<Result<Vec<Story>, FetchError>>>>,
        requested: Mutex<Vec<String>>,
    }

    impl GatedSource {
        fn gate(&self, url: &str) -> oneshot::Sender<Result<Vec<Story>, FetchError>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(url.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl StorySource for GatedSource {
        async fn fetch_stories(&self, url: &str) -> Result<Vec<Story>, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            let gate = self.gates.lock().unwrap().remove(url).expect("no gate for url");
            gate.await.expect("gate dropped")
        }
    }

    #[test]
    fn encodes_term_into_url() {
        assert_eq!(query_url(ENDPOINT, "React"), "https://search.test/api?query=React");
        assert_eq!(
            query_url(ENDPOINT, "rust & c++"),
            "https://search.test/api?query=rust%20%26%20c%2B%2B"
        );
        assert_eq!(query_url(ENDPOINT, ""), ENDPOINT);
    }

    #[tokio::test]
    async fn fetch_sets_loading_then_success() {
        let source = Arc::new(GatedSource::default());
        let store = Arc::new(StoriesStore::new());
        let mut controller = FetchController::new(source.clone(), store.clone(), ENDPOINT);

        let url = controller.url_for("React");
        let gate = source.gate(&url);
        controller.fetch(url.clone()).unwrap();

        // FETCH_INIT is applied before the request resolves
        assert!(store.state().unwrap().is_loading);

        gate.send(Ok(vec![Story::new(0u64, "React")])).unwrap();
        controller.settle().await;

        let state = store.state().unwrap();
        assert!(!state.is_loading);
        assert!(!state.is_error);
        assert_eq!(state.data, vec![Story::new(0u64, "React")]);
        assert_eq!(controller.last_url(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn failure_is_recorded_in_store() {
        let source = Arc::new(GatedSource::default());
        let store = Arc::new(StoriesStore::new());
        let mut controller = FetchController::new(source.clone(), store.clone(), ENDPOINT);

        let url = controller.url_for("React");
        let gate = source.gate(&url);
        controller.fetch(url).unwrap();

        gate.send(Err(FetchError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)))
            .unwrap();
        controller.settle().await;

        let state = store.state().unwrap();
        assert!(state.is_error);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn slow_stale_response_is_discarded() {
        let source = Arc::new(GatedSource::default());
        let store = Arc::new(StoriesStore::new());
        let mut controller = FetchController::new(source.clone(), store.clone(), ENDPOINT);

        let url_a = controller.url_for("React");
        let url_b = controller.url_for("Rust");
        let gate_a = source.gate(&url_a);
        let gate_b = source.gate(&url_b);

        controller.fetch(url_a).unwrap();
        controller.fetch(url_b).unwrap();

        // B lands first, then A's late answer must not overwrite it
        gate_b.send(Ok(vec![Story::new(2u64, "Rust")])).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        gate_a.send(Ok(vec![Story::new(1u64, "React")])).unwrap();
        controller.settle().await;

        assert_eq!(store.state().unwrap().data, vec![Story::new(2u64, "Rust")]);
    }

    #[tokio::test]
    async fn unchanged_url_does_not_refetch() {
        let source = Arc::new(GatedSource::default());
        let store = Arc::new(StoriesStore::new());
        let mut controller = FetchController::new(source.clone(), store.clone(), ENDPOINT);

        let url = controller.url_for("React");
        let gate = source.gate(&url);
        assert!(controller.fetch_if_changed(url.clone()).unwrap().is_some());
        gate.send(Ok(Vec::new())).unwrap();
        controller.settle().await;

        assert!(controller.fetch_if_changed(url).unwrap().is_none());
        assert_eq!(source.requested.lock().unwrap().len(), 1);
    }
}

//! Stories reducer and the store that serializes dispatches into it.
//!
//! [`reduce`] is a pure function of `(state, action)`. [`StoriesStore`] wraps it
//! with a mutex so concurrent fetch completions apply one at a time, and tags
//! every fetch with a [`Generation`] so a slow response for an old query can
//! never overwrite the results of a newer one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::hn_client::FetchError;
use crate::models::{StoriesState, Story};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum StoriesAction {
    #[serde(rename = "STORIES_FETCH_INIT")]
    FetchInit,
    #[serde(rename = "STORIES_FETCH_SUCCESS")]
    FetchSuccess(Vec<Story>),
    #[serde(rename = "STORIES_FETCH_FAILURE")]
    FetchFailure,
    #[serde(rename = "REMOVE_STORY")]
    RemoveStory(Story),
}

impl StoriesAction {
    pub const KINDS: [&'static str; 4] = [
        "STORIES_FETCH_INIT",
        "STORIES_FETCH_SUCCESS",
        "STORIES_FETCH_FAILURE",
        "REMOVE_STORY",
    ];

    /// Decodes an untyped `{ "type": ..., "payload": ... }` action.
    pub fn decode(value: Value) -> Result<Self, StoreError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(StoreError::MissingActionType)?
            .to_string();

        if !Self::KINDS.contains(&kind.as_str()) {
            return Err(StoreError::UnknownAction(kind));
        }

        serde_json::from_value(value).map_err(|source| StoreError::MalformedAction { kind, source })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown stories action `{0}`")]
    UnknownAction(String),
    #[error("action has no `type` field")]
    MissingActionType,
    #[error("malformed `{kind}` action: {source}")]
    MalformedAction {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stories store lock poisoned")]
    Poisoned,
}

pub fn reduce(state: &StoriesState, action: StoriesAction) -> StoriesState {
    match action {
        StoriesAction::FetchInit => StoriesState {
            is_loading: true,
            is_error: false,
            ..state.clone()
        },
        StoriesAction::FetchSuccess(payload) => StoriesState {
            data: payload,
            is_loading: false,
            is_error: false,
        },
        StoriesAction::FetchFailure => StoriesState {
            is_loading: false,
            is_error: true,
            ..state.clone()
        },
        StoriesAction::RemoveStory(item) => StoriesState {
            data: state
                .data
                .iter()
                .filter(|story| story.object_id != item.object_id)
                .cloned()
                .collect(),
            is_loading: state.is_loading,
            is_error: state.is_error,
        },
    }
}

pub fn reduce_raw(state: &StoriesState, action: Value) -> Result<StoriesState, StoreError> {
    let action = StoriesAction::decode(action)?;
    Ok(reduce(state, action))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Inner {
    state: StoriesState,
    generation: u64,
}

pub struct StoriesStore {
    inner: Mutex<Inner>,
    updates: watch::Sender<StoriesState>,
}

impl StoriesStore {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(StoriesState::new());
        Self {
            inner: Mutex::new(Inner {
                state: StoriesState::new(),
                generation: 0,
            }),
            updates,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    // Must be called with the lock held so subscribers see transitions in apply order
    fn commit(&self, inner: &mut Inner, action: StoriesAction) -> StoriesState {
        inner.state = reduce(&inner.state, action);
        self.updates.send_replace(inner.state.clone());
        inner.state.clone()
    }

    pub fn state(&self) -> Result<StoriesState, StoreError> {
        Ok(self.lock()?.state.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<StoriesState> {
        self.updates.subscribe()
    }

    pub fn dispatch(&self, action: StoriesAction) -> Result<StoriesState, StoreError> {
        let mut inner = self.lock()?;
        Ok(self.commit(&mut inner, action))
    }

    pub fn dispatch_raw(&self, action: Value) -> Result<StoriesState, StoreError> {
        // Decode before locking so a bad action never touches the state
        let action = StoriesAction::decode(action)?;
        self.dispatch(action)
    }

    /// Starts a new fetch cycle: supersedes every earlier generation and applies `FETCH_INIT`.
    pub fn begin_fetch(&self) -> Result<Generation, StoreError> {
        let mut inner = self.lock()?;
        inner.generation += 1;
        let generation = Generation(inner.generation);
        self.commit(&mut inner, StoriesAction::FetchInit);
        Ok(generation)
    }

    /// Applies the outcome of a fetch if it is still the latest one.
    ///
    /// Returns `false` without touching the state when a newer fetch has
    /// started since `generation` was issued.
    pub fn complete_fetch(
        &self,
        generation: Generation,
        outcome: Result<Vec<Story>, FetchError>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        if generation.0 != inner.generation {
            debug!(%generation, latest = inner.generation, "dropping stale fetch result");
            return Ok(false);
        }

        let action = match outcome {
            Ok(stories) => StoriesAction::FetchSuccess(stories),
            Err(err) => {
                warn!(%generation, error = %err, "fetching stories failed");
                StoriesAction::FetchFailure
            }
        };
        self.commit(&mut inner, action);
        Ok(true)
    }
}

impl Default for StoriesStore {
    fn default() -> Self {
        Self::new()
    }
}

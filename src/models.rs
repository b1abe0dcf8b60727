use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// Story identifiers arrive either as numbers (local fixtures) or strings (Algolia)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoryId {
    Number(u64),
    Text(String),
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryId::Number(n) => write!(f, "{}", n),
            StoryId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for StoryId {
    fn from(id: u64) -> Self {
        StoryId::Number(id)
    }
}

impl From<&str> for StoryId {
    fn from(id: &str) -> Self {
        StoryId::Text(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    #[serde(rename = "objectID")]
    pub object_id: StoryId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub num_comments: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Story {
    pub fn new(object_id: impl Into<StoryId>, title: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            title: title.into(),
            url: String::new(),
            author: String::new(),
            num_comments: 0,
            points: 0,
            created_at: None,
        }
    }
}

// The search API sends explicit nulls for missing fields, which `#[serde(default)]` alone rejects
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Snapshot of the fetched result set plus the request flags.
///
/// `is_loading` and `is_error` are never both set once a fetch has settled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoriesState {
    pub data: Vec<Story>,
    pub is_loading: bool,
    pub is_error: bool,
}

impl StoriesState {
    pub fn new() -> Self {
        Self::default()
    }
}

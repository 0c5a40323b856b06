use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::PlaybackConfig;

pub const DEFAULT_AUTHOR_NAME: &str = "User";
pub const DEFAULT_AVATAR_URL: &str = "/images/default-avatar.jpg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// A story as it appears in a catalog document. `duration` is kept loose on purpose:
/// anything that is not a positive integer falls back to the configured default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: String,
    #[serde(alias = "mediaUrl")]
    pub image: String,
    #[serde(default, alias = "durationMs", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<AuthorRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Wrapped { stories: Vec<StoryRecord> },
    Bare(Vec<StoryRecord>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryItem {
    pub id: String,
    pub media_url: String,
    #[serde(rename = "durationMs", with = "crate::serde_duration")]
    pub duration: Duration,
    pub author_name: Option<String>,
    pub author_avatar_url: Option<String>,
}

impl StoryItem {
    pub fn from_record(record: StoryRecord, config: &PlaybackConfig) -> Self {
        let raw_ms = record.duration.as_ref().and_then(Value::as_i64);
        let (author_name, author_avatar_url) = match record.user {
            Some(user) => (Some(user.name), user.avatar),
            None => (None, None),
        };
        Self {
            id: record.id,
            media_url: record.image,
            duration: config.story_duration(raw_ms),
            author_name,
            author_avatar_url,
        }
    }

    pub fn display_name(&self) -> &str {
        self.author_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_AUTHOR_NAME)
    }

    pub fn display_avatar(&self) -> &str {
        self.author_avatar_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_AVATAR_URL)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog has no stories")]
    Empty,
    #[error("duplicate story id {0:?}")]
    DuplicateId(String),
    #[error("catalog document is malformed: {0}")]
    Malformed(String),
}

/// Ordered, non-empty story sequence shared between the engine and preload tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    items: Arc<[StoryItem]>,
}

impl Catalog {
    pub fn new(items: Vec<StoryItem>) -> Result<Self, CatalogError> {
        if items.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
        }
        Ok(Self {
            items: items.into(),
        })
    }

    pub fn from_records(
        records: Vec<StoryRecord>,
        config: &PlaybackConfig,
    ) -> Result<Self, CatalogError> {
        Self::new(
            records
                .into_iter()
                .map(|record| StoryItem::from_record(record, config))
                .collect(),
        )
    }

    /// Parses either `{"stories": [...]}` or a bare array of stories.
    pub fn from_json(text: &str, config: &PlaybackConfig) -> Result<Self, CatalogError> {
        let document: CatalogDocument =
            serde_json::from_str(text).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        let records = match document {
            CatalogDocument::Wrapped { stories } => stories,
            CatalogDocument::Bare(stories) => stories,
        };
        Self::from_records(records, config)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always `false` for a constructed catalog; kept for the usual `len` pairing.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StoryItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[StoryItem] {
        &self.items
    }

    pub fn last_index(&self) -> usize {
        self.items.len() - 1
    }

    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.last_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> StoryRecord {
        StoryRecord {
            id: id.to_string(),
            image: format!("https://example.test/{id}.jpg"),
            duration: None,
            user: None,
        }
    }

    #[test]
    fn empty_catalog_fails_fast() {
        assert_eq!(
            Catalog::from_records(Vec::new(), &PlaybackConfig::default()),
            Err(CatalogError::Empty)
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Catalog::from_records(
            vec![record("a"), record("b"), record("a")],
            &PlaybackConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId("a".to_string()));
    }

    #[test]
    fn clamp_index_pins_to_last_story() {
        let catalog =
            Catalog::from_records(vec![record("a"), record("b")], &PlaybackConfig::default())
                .expect("catalog");
        assert_eq!(catalog.clamp_index(0), 0);
        assert_eq!(catalog.clamp_index(7), 1);
    }

    #[test]
    fn display_fallbacks_apply_to_missing_author() {
        let item = StoryItem::from_record(record("a"), &PlaybackConfig::default());
        assert_eq!(item.display_name(), DEFAULT_AUTHOR_NAME);
        assert_eq!(item.display_avatar(), DEFAULT_AVATAR_URL);
    }
}

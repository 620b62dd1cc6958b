//! Snippet persistence.
//!
//! The store is built once in `main` and handed to whatever needs it. Two
//! backends exist: a JSON document on disk and an in-memory map.

use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    error::StoreError,
    snippet::{Snippet, SnippetPatch, validate_id},
};

type Snippets = BTreeMap<String, Snippet>;

#[async_trait]
pub trait SnippetStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Snippet, StoreError>;

    /// Every snippet, ordered by id.
    async fn all(&self) -> Result<Vec<Snippet>, StoreError>;

    async fn create(&self, snippet: Snippet) -> Result<(), StoreError>;

    async fn update(&self, id: &str, patch: SnippetPatch) -> Result<Snippet, StoreError>;

    /// Removes the given ids and returns how many existed.
    async fn delete_many(&self, ids: &[String]) -> Result<usize, StoreError>;
}

// Shared by both backends so they agree on every edge case
fn insert(map: &mut Snippets, snippet: Snippet) -> Result<(), StoreError> {
    validate_id(&snippet.id)?;
    if map.contains_key(&snippet.id) {
        return Err(StoreError::DuplicateId(snippet.id));
    }
    map.insert(snippet.id.clone(), snippet);
    Ok(())
}

fn patch(map: &mut Snippets, id: &str, patch: SnippetPatch) -> Result<Snippet, StoreError> {
    let snippet = map
        .get_mut(id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    snippet.apply(patch);
    Ok(snippet.clone())
}

fn remove(map: &mut Snippets, ids: &[String]) -> usize {
    ids.iter().filter(|id| map.remove(id.as_str()).is_some()).count()
}

#[derive(Default)]
pub struct MemoryStore {
    snippets: RwLock<Snippets>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnippetStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Snippet, StoreError> {
        self.snippets
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn all(&self) -> Result<Vec<Snippet>, StoreError> {
        Ok(self.snippets.read().await.values().cloned().collect())
    }

    async fn create(&self, snippet: Snippet) -> Result<(), StoreError> {
        insert(&mut *self.snippets.write().await, snippet)
    }

    async fn update(&self, id: &str, changes: SnippetPatch) -> Result<Snippet, StoreError> {
        patch(&mut *self.snippets.write().await, id, changes)
    }

    async fn delete_many(&self, ids: &[String]) -> Result<usize, StoreError> {
        Ok(remove(&mut *self.snippets.write().await, ids))
    }
}

/// Snippets kept as one pretty-printed JSON object keyed by id.
///
/// Every operation reads the file; mutations write it back whole. The lock
/// serializes mutations from this process only.
pub struct JsonFileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Snippets, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "snippet file missing, starting empty");
                return Ok(Snippets::new());
            }
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Snippets::new());
        }
        let snippets: Snippets = serde_json::from_slice(&bytes)?;

        // Keys are ids; a hand-edited file must not break that
        if let Some((key, snippet)) = snippets.iter().find(|(key, s)| **key != s.id) {
            return Err(StoreError::MismatchedKey {
                key: key.clone(),
                id: snippet.id.clone(),
            });
        }
        Ok(snippets)
    }

    async fn save(&self, snippets: &Snippets) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(snippets)?;

        // Write beside the target then rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), count = snippets.len(), "saved snippets");
        Ok(())
    }
}

#[async_trait]
impl SnippetStore for JsonFileStore {
    async fn get(&self, id: &str) -> Result<Snippet, StoreError> {
        let _guard = self.lock.read().await;
        self.load()
            .await?
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn all(&self) -> Result<Vec<Snippet>, StoreError> {
        let _guard = self.lock.read().await;
        Ok(self.load().await?.into_values().collect())
    }

    async fn create(&self, snippet: Snippet) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        let mut snippets = self.load().await?;
        insert(&mut snippets, snippet)?;
        self.save(&snippets).await
    }

    async fn update(&self, id: &str, changes: SnippetPatch) -> Result<Snippet, StoreError> {
        let _guard = self.lock.write().await;
        let mut snippets = self.load().await?;
        let updated = patch(&mut snippets, id, changes)?;
        self.save(&snippets).await?;
        Ok(updated)
    }

    async fn delete_many(&self, ids: &[String]) -> Result<usize, StoreError> {
        let _guard = self.lock.write().await;
        let mut snippets = self.load().await?;
        let removed = remove(&mut snippets, ids);
        if removed > 0 {
            self.save(&snippets).await?;
        }
        Ok(removed)
    }
}

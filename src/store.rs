//! Record stores keyed by article URL.
//!
//! The ingestor only needs [`RecordStore::exists`] and [`RecordStore::insert`];
//! the listing layer reads through [`RecordStore::get`] and
//! [`RecordStore::all`]. Two implementations are provided:
//!
//! - [`MemoryStore`]: a plain vector, used by tests and as the in-memory half
//!   of the file store
//! - [`JsonFileStore`]: a JSON array on disk, rewritten after every insert
//!
//! Ids are assigned on insert, starting at 1. Inserting a URL that is already
//! stored is refused with [`StoreError::DuplicateUrl`], but callers are
//! expected to check [`RecordStore::exists`] first.

use crate::models::{ArticleRecord, NewArticle, RecordId};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("article {0} is already stored")]
    DuplicateUrl(String),

    #[error("store I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store file {} is not valid JSON: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistence for article records, keyed by URL.
pub trait RecordStore {
    /// `true` if a record with exactly this URL is stored.
    fn exists(&self, url: &str) -> Result<bool, StoreError>;

    /// Store a new article and return its id.
    fn insert(&mut self, article: NewArticle) -> Result<RecordId, StoreError>;

    fn get(&self, id: RecordId) -> Result<Option<ArticleRecord>, StoreError>;

    /// Every record in insertion order.
    fn all(&self) -> Result<Vec<ArticleRecord>, StoreError>;
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<ArticleRecord>,
}

impl MemoryStore {
    pub fn from_records(records: Vec<ArticleRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[ArticleRecord] {
        &self.records
    }

    fn next_id(&self) -> RecordId {
        RecordId(self.records.iter().map(|r| r.id.0).max().unwrap_or(0) + 1)
    }
}

impl RecordStore for MemoryStore {
    fn exists(&self, url: &str) -> Result<bool, StoreError> {
        Ok(self.records.iter().any(|r| r.url == url))
    }

    fn insert(&mut self, article: NewArticle) -> Result<RecordId, StoreError> {
        if self.exists(&article.url)? {
            return Err(StoreError::DuplicateUrl(article.url));
        }
        let id = self.next_id();
        self.records.push(ArticleRecord::from_new(id, article));
        Ok(id)
    }

    fn get(&self, id: RecordId) -> Result<Option<ArticleRecord>, StoreError> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    fn all(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        Ok(self.records.clone())
    }
}

/// Store persisted as a JSON array of [`ArticleRecord`]s.
///
/// The whole file is loaded on open and rewritten (temp file, then rename)
/// after each insert. Single writer only.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    memory: MemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`; a missing file is an empty store.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        info!(records = records.len(), "Opened article store");

        Ok(Self {
            path,
            memory: MemoryStore::from_records(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self.memory.records())?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        debug!(path = %self.path.display(), records = self.memory.len(), "Store written");
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn exists(&self, url: &str) -> Result<bool, StoreError> {
        self.memory.exists(url)
    }

    fn insert(&mut self, article: NewArticle) -> Result<RecordId, StoreError> {
        let id = self.memory.insert(article)?;
        if let Err(e) = self.persist() {
            // Keep memory in line with what is on disk.
            self.memory.records.pop();
            return Err(e);
        }
        Ok(id)
    }

    fn get(&self, id: RecordId) -> Result<Option<ArticleRecord>, StoreError> {
        self.memory.get(id)
    }

    fn all(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        self.memory.all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn article(url: &str) -> NewArticle {
        NewArticle {
            url: url.to_string(),
            title: "Title".to_string(),
            html_content: "<article><p>Body</p></article>".to_string(),
            plain_text: "Body".to_string(),
            publish_date: NaiveDate::from_ymd_opt(2025, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_memory_store_assigns_sequential_ids() {
        let mut store = MemoryStore::default();
        assert_eq!(store.insert(article("https://a.example/1")).unwrap(), RecordId(1));
        assert_eq!(store.insert(article("https://a.example/2")).unwrap(), RecordId(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_memory_store_exists_is_exact_match() {
        let mut store = MemoryStore::default();
        store.insert(article("https://a.example/1")).unwrap();

        assert!(store.exists("https://a.example/1").unwrap());
        assert!(!store.exists("https://a.example/1/").unwrap());
        assert!(!store.exists("https://A.example/1").unwrap());
    }

    #[test]
    fn test_memory_store_refuses_duplicates() {
        let mut store = MemoryStore::default();
        store.insert(article("https://a.example/1")).unwrap();

        let err = store.insert(article("https://a.example/1")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUrl(url) if url == "https://a.example/1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_store_get() {
        let mut store = MemoryStore::default();
        let id = store.insert(article("https://a.example/1")).unwrap();

        assert_eq!(store.get(id).unwrap().unwrap().url, "https://a.example/1");
        assert!(store.get(RecordId(99)).unwrap().is_none());
    }

    #[test]
    fn test_json_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("articles.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        assert!(store.all().unwrap().is_empty());
        store.insert(article("https://a.example/1")).unwrap();
        store.insert(article("https://a.example/2")).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        let records = reopened.all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, RecordId(2));
        assert!(reopened.exists("https://a.example/2").unwrap());
    }

    #[test]
    fn test_json_store_ids_continue_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");

        JsonFileStore::open(&path)
            .unwrap()
            .insert(article("https://a.example/1"))
            .unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.insert(article("https://a.example/2")).unwrap(), RecordId(2));
    }

    #[test]
    fn test_json_store_rolls_back_failed_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.insert(article("https://a.example/1")).unwrap();

        // A directory where the temp file goes makes the rewrite fail.
        let blocker = path.with_extension("json.tmp");
        fs::create_dir(&blocker).unwrap();

        let err = store.insert(article("https://a.example/2")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }), "got {err:?}");
        assert!(!store.exists("https://a.example/2").unwrap());
        assert_eq!(store.all().unwrap().len(), 1);
        assert_eq!(JsonFileStore::open(&path).unwrap().all().unwrap().len(), 1);

        fs::remove_dir(&blocker).unwrap();
        assert_eq!(store.insert(article("https://a.example/2")).unwrap(), RecordId(2));
    }

    #[test]
    fn test_json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}

//! File-backed document database.
//!
//! Documents live in a flat map keyed by their slash-separated path, e.g.
//! `users/{uid}` or `users/{uid}/journalEntries/{id}`. Every committed write
//! is persisted to a single JSON file and broadcast to listeners.

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::subscription::Subscription;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{self, AtomicBool},
        Arc,
    },
};
use tokio::{
    fs,
    sync::{broadcast, Mutex},
};
use tracing::{debug, error, info};
use uuid::Uuid;

pub type Fields = Map<String, Value>;

const SENTINEL_KEY: &str = "$sentinel";
const SERVER_TIMESTAMP: &str = "serverTimestamp";
const EVENT_CAPACITY: usize = 64;

/// Placeholder replaced by the write time when the document is stored.
pub fn server_timestamp() -> Value {
    let mut marker = Map::new();
    marker.insert(SENTINEL_KEY.to_owned(), Value::String(SERVER_TIMESTAMP.to_owned()));
    Value::Object(marker)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    path: String,
}

impl DocumentRef {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let segments = split_path(path)?;
        if segments.len() % 2 != 0 {
            return Err(StoreError::InvalidPath(path.to_owned()));
        }
        Ok(Self {
            path: segments.join("/"),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    path: String,
}

impl CollectionRef {
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let segments = split_path(path)?;
        if segments.len() % 2 != 1 {
            return Err(StoreError::InvalidPath(path.to_owned()));
        }
        Ok(Self {
            path: segments.join("/"),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn doc(&self, id: &str) -> Result<DocumentRef, StoreError> {
        DocumentRef::new(&format!("{}/{id}", self.path))
    }

    pub fn order_by(&self, field: &str, direction: Direction) -> Query {
        Query {
            collection: self.clone(),
            field: field.to_owned(),
            direction,
        }
    }

    /// True when `doc_path` names a direct child document.
    fn contains(&self, doc_path: &str) -> bool {
        doc_path
            .strip_prefix(self.path.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|id| !id.is_empty() && !id.contains('/'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct Query {
    collection: CollectionRef,
    field: String,
    direction: Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub data: Option<Fields>,
}

impl DocumentSnapshot {
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(field))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    documents: BTreeMap<String, Fields>,
}

#[derive(Debug, Clone)]
enum StoreEvent {
    Changed(String),
    Terminated,
}

#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    data_path: PathBuf,
    data: Mutex<StoreData>,
    events: broadcast::Sender<StoreEvent>,
    terminated: AtomicBool,
}

impl DocumentStore {
    pub async fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let data_path = config.data_path.clone();
        if let Some(parent) = data_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let data = load_data(&data_path).await?;
        info!(
            path = %data_path.display(),
            documents = data.documents.len(),
            "document store opened"
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            inner: Arc::new(StoreInner {
                data_path,
                data: Mutex::new(data),
                events,
                terminated: AtomicBool::new(false),
            }),
        })
    }

    fn is_terminated(&self) -> bool {
        self.inner.terminated.load(atomic::Ordering::SeqCst)
    }

    /// Closes the store. Later reads and writes fail and listeners end.
    pub fn terminate(&self) {
        if !self.inner.terminated.swap(true, atomic::Ordering::SeqCst) {
            let _ = self.inner.events.send(StoreEvent::Terminated);
        }
    }

    pub async fn get_document(&self, doc: &DocumentRef) -> Result<DocumentSnapshot, StoreError> {
        self.ensure_open()?;
        let data = self.inner.data.lock().await;
        Ok(DocumentSnapshot {
            id: doc.id().to_owned(),
            data: data.documents.get(doc.path()).cloned(),
        })
    }

    pub async fn get_query(&self, query: &Query) -> Result<Vec<DocumentSnapshot>, StoreError> {
        self.ensure_open()?;
        let data = self.inner.data.lock().await;

        let mut docs: Vec<DocumentSnapshot> = data
            .documents
            .iter()
            .filter(|(path, fields)| {
                query.collection.contains(path) && fields.contains_key(&query.field)
            })
            .map(|(path, fields)| DocumentSnapshot {
                id: path.rsplit('/').next().unwrap_or_default().to_owned(),
                data: Some(fields.clone()),
            })
            .collect();

        docs.sort_by(|a, b| {
            let ordering = match (a.get(&query.field), b.get(&query.field)) {
                (Some(left), Some(right)) => compare_values(left, right),
                _ => Ordering::Equal,
            };
            let ordering = match query.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });

        Ok(docs)
    }

    /// Upserts `fields` into the document, keeping fields not named.
    pub async fn set_merge(&self, doc: &DocumentRef, fields: Fields) -> Result<(), StoreError> {
        self.write(doc, fields).await
    }

    /// Stores a new document under a generated id.
    pub async fn add(&self, collection: &CollectionRef, fields: Fields) -> Result<DocumentRef, StoreError> {
        let doc = collection.doc(&Uuid::new_v4().simple().to_string())?;
        self.write(&doc, fields).await?;
        Ok(doc)
    }

    pub fn on_document_snapshot<F>(&self, doc: DocumentRef, mut on_next: F) -> Subscription
    where
        F: FnMut(Result<DocumentSnapshot, StoreError>) + Send + 'static,
    {
        let store = self.clone();
        let mut events = self.inner.events.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match store.get_document(&doc).await {
                    Ok(snapshot) => on_next(Ok(snapshot)),
                    Err(err) => return on_next(Err(err)),
                }
                if !next_change(&mut events, |path| path == doc.path()).await {
                    return on_next(Err(StoreError::Terminated));
                }
            }
        });
        Subscription::new(task)
    }

    pub fn on_query_snapshot<F>(&self, query: Query, mut on_next: F) -> Subscription
    where
        F: FnMut(Result<Vec<DocumentSnapshot>, StoreError>) + Send + 'static,
    {
        let store = self.clone();
        let mut events = self.inner.events.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match store.get_query(&query).await {
                    Ok(docs) => on_next(Ok(docs)),
                    Err(err) => return on_next(Err(err)),
                }
                if !next_change(&mut events, |path| query.collection.contains(path)).await {
                    return on_next(Err(StoreError::Terminated));
                }
            }
        });
        Subscription::new(task)
    }

    async fn write(&self, doc: &DocumentRef, fields: Fields) -> Result<(), StoreError> {
        self.ensure_open()?;
        let written_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut data = self.inner.data.lock().await;
        let previous = data.documents.get(doc.path()).cloned();
        let target = data.documents.entry(doc.path().to_owned()).or_default();
        for (key, value) in fields {
            target.insert(key, resolve_sentinel(value, &written_at));
        }

        if let Err(err) = persist_data(&self.inner.data_path, &data).await {
            error!(path = doc.path(), "failed to persist document: {err}");
            match previous {
                Some(fields) => data.documents.insert(doc.path().to_owned(), fields),
                None => data.documents.remove(doc.path()),
            };
            return Err(err);
        }
        drop(data);

        debug!(path = doc.path(), "document written");
        let _ = self.inner.events.send(StoreEvent::Changed(doc.path().to_owned()));
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_terminated() {
            return Err(StoreError::Terminated);
        }
        Ok(())
    }
}

/// Waits for a change accepted by `relevant`. Returns false once the store is gone.
async fn next_change(
    events: &mut broadcast::Receiver<StoreEvent>,
    relevant: impl Fn(&str) -> bool,
) -> bool {
    loop {
        match events.recv().await {
            Ok(StoreEvent::Changed(path)) if relevant(&path) => return true,
            Ok(StoreEvent::Changed(_)) => continue,
            Ok(StoreEvent::Terminated) | Err(broadcast::error::RecvError::Closed) => return false,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "listener lagged, re-reading");
                return true;
            }
        }
    }
}

fn split_path(raw: &str) -> Result<Vec<&str>, StoreError> {
    let trimmed = raw.trim_matches('/');
    let segments: Vec<&str> = trimmed.split('/').collect();
    if trimmed.is_empty() || segments.iter().any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidPath(raw.to_owned()));
    }
    Ok(segments)
}

fn resolve_sentinel(value: Value, written_at: &str) -> Value {
    let is_timestamp = value
        .as_object()
        .and_then(|object| object.get(SENTINEL_KEY))
        .and_then(Value::as_str)
        == Some(SERVER_TIMESTAMP);
    if is_timestamp {
        Value::String(written_at.to_owned())
    } else {
        value
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .unwrap_or_default()
            .total_cmp(&b.as_f64().unwrap_or_default()),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

async fn load_data(path: &Path) -> Result<StoreData, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => Ok(data),
            Err(err) => {
                error!("failed to parse store file: {err}");
                Ok(StoreData::default())
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StoreData::default()),
        Err(err) => Err(err.into()),
    }
}

async fn persist_data(path: &Path, data: &StoreData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    fs::write(path, payload).await?;
    Ok(())
}

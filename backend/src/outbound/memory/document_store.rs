//! In-process document store.
//!
//! Implements the full [`DocumentStore`] contract over a mutex-guarded map
//! of collections. Server timestamps come from the injected clock and are
//! strictly increasing, so documents written in sequence order the same
//! way under `createdAt`. Every call is recorded in an operation log that
//! tests use to assert fan-out behaviour, and failures can be queued per
//! operation kind.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::evaluate;
use crate::domain::ports::{
    Collection, DocumentSnapshot, DocumentStore, DocumentStoreError, DocumentWrite, FieldValue,
    Query, SetMode, WriteBatch, WriteOperation, timestamp_value,
};

type Documents = BTreeMap<String, Map<String, Value>>;

/// Kind of call made against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// [`DocumentStore::get`].
    Get,
    /// [`DocumentStore::add`].
    Add,
    /// [`DocumentStore::set`].
    Set,
    /// [`DocumentStore::update`].
    Update,
    /// [`DocumentStore::delete`].
    Delete,
    /// [`DocumentStore::query`].
    Query,
    /// [`DocumentStore::commit`].
    Commit,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOperation {
    /// Point read.
    Get {
        /// Collection read.
        collection: Collection,
        /// Document read.
        id: String,
    },
    /// Insert with a generated id.
    Add {
        /// Collection written.
        collection: Collection,
    },
    /// Write under a caller-chosen id.
    Set {
        /// Collection written.
        collection: Collection,
        /// Document written.
        id: String,
        /// Overwrite or merge.
        mode: SetMode,
    },
    /// Field mutation of an existing document.
    Update {
        /// Collection written.
        collection: Collection,
        /// Document written.
        id: String,
    },
    /// Document removal.
    Delete {
        /// Collection written.
        collection: Collection,
        /// Document removed.
        id: String,
    },
    /// Query execution.
    Query(Query),
    /// Batch commit.
    Commit {
        /// Number of writes in the batch.
        writes: usize,
    },
}

impl StoreOperation {
    /// The kind of call this entry records.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Get { .. } => OperationKind::Get,
            Self::Add { .. } => OperationKind::Add,
            Self::Set { .. } => OperationKind::Set,
            Self::Update { .. } => OperationKind::Update,
            Self::Delete { .. } => OperationKind::Delete,
            Self::Query(_) => OperationKind::Query,
            Self::Commit { .. } => OperationKind::Commit,
        }
    }
}

#[derive(Default)]
struct State {
    collections: BTreeMap<Collection, Documents>,
    last_timestamp: Option<DateTime<Utc>>,
    operations: Vec<StoreOperation>,
    failures: VecDeque<(OperationKind, DocumentStoreError)>,
}

impl State {
    fn record(&mut self, operation: StoreOperation) -> Result<(), DocumentStoreError> {
        let kind = operation.kind();
        self.operations.push(operation);
        match self.failures.iter().position(|(failing, _)| *failing == kind) {
            Some(index) => match self.failures.remove(index) {
                Some((_, error)) => Err(error),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn server_timestamp(&mut self, now: DateTime<Utc>) -> Value {
        let stamp = match self.last_timestamp {
            Some(last) if now <= last => last + TimeDelta::nanoseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(stamp);
        timestamp_value(stamp)
    }
}

/// Document store held entirely in memory.
pub struct InMemoryDocumentStore {
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl InMemoryDocumentStore {
    /// Empty store stamping writes with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `fields` verbatim under `id`, bypassing the operation log.
    pub fn insert(
        &self,
        collection: Collection,
        id: impl Into<String>,
        fields: Map<String, Value>,
    ) {
        self.lock()
            .collections
            .entry(collection)
            .or_default()
            .insert(id.into(), fields);
    }

    /// Current fields of a document, bypassing the operation log.
    pub fn document(&self, collection: Collection, id: &str) -> Option<Map<String, Value>> {
        self.lock()
            .collections
            .get(&collection)
            .and_then(|documents| documents.get(id))
            .cloned()
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        self.lock()
            .collections
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    /// Return `true` when `collection` holds no documents.
    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    /// Every call made so far, in order.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.lock().operations.clone()
    }

    /// Calls of `kind` made so far.
    pub fn count(&self, kind: OperationKind) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|operation| operation.kind() == kind)
            .count()
    }

    /// Queries executed so far.
    pub fn queries(&self) -> Vec<Query> {
        self.lock()
            .operations
            .iter()
            .filter_map(|operation| match operation {
                StoreOperation::Query(query) => Some(query.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    /// Make the next call of `kind` fail with `error`.
    ///
    /// Failures queue up; each is consumed by one call.
    pub fn fail_next(&self, kind: OperationKind, error: DocumentStoreError) {
        self.lock().failures.push_back((kind, error));
    }
}

fn apply_write(fields: &mut Map<String, Value>, write: &DocumentWrite, timestamp: &Value) {
    for (name, mutation) in write.iter() {
        match mutation {
            FieldValue::Value(value) => {
                fields.insert(name.clone(), value.clone());
            }
            FieldValue::ServerTimestamp => {
                fields.insert(name.clone(), timestamp.clone());
            }
            FieldValue::ArrayUnion(values) => {
                let mut items = match fields.remove(name) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                for value in values {
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                }
                fields.insert(name.clone(), Value::Array(items));
            }
            FieldValue::ArrayRemove(values) => {
                let mut items = match fields.remove(name) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                };
                items.retain(|item| !values.contains(item));
                fields.insert(name.clone(), Value::Array(items));
            }
        }
    }
}

fn apply_operation(
    collections: &mut BTreeMap<Collection, Documents>,
    operation: WriteOperation,
    timestamp: &Value,
) -> Result<(), DocumentStoreError> {
    match operation {
        WriteOperation::Set {
            collection,
            id,
            data,
            mode,
        } => {
            let documents = collections.entry(collection).or_default();
            let mut fields = match mode {
                SetMode::Overwrite => Map::new(),
                SetMode::Merge => documents.remove(&id).unwrap_or_default(),
            };
            apply_write(&mut fields, &data, timestamp);
            documents.insert(id, fields);
            Ok(())
        }
        WriteOperation::Update {
            collection,
            id,
            data,
        } => {
            let fields = collections
                .get_mut(&collection)
                .and_then(|documents| documents.get_mut(&id))
                .ok_or_else(|| DocumentStoreError::not_found(collection.as_str(), id.as_str()))?;
            apply_write(fields, &data, timestamp);
            Ok(())
        }
        WriteOperation::Delete { collection, id } => {
            if let Some(documents) = collections.get_mut(&collection) {
                documents.remove(&id);
            }
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<DocumentSnapshot>, DocumentStoreError> {
        let mut state = self.lock();
        state.record(StoreOperation::Get {
            collection,
            id: id.to_owned(),
        })?;
        Ok(state
            .collections
            .get(&collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| DocumentSnapshot::new(id, fields.clone())))
    }

    async fn add(
        &self,
        collection: Collection,
        data: DocumentWrite,
    ) -> Result<String, DocumentStoreError> {
        let now = self.clock.utc();
        let mut state = self.lock();
        state.record(StoreOperation::Add { collection })?;
        let id = Uuid::new_v4().simple().to_string();
        let timestamp = state.server_timestamp(now);
        let mut fields = Map::new();
        apply_write(&mut fields, &data, &timestamp);
        state
            .collections
            .entry(collection)
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn set(
        &self,
        collection: Collection,
        id: &str,
        data: DocumentWrite,
        mode: SetMode,
    ) -> Result<(), DocumentStoreError> {
        let now = self.clock.utc();
        let mut state = self.lock();
        state.record(StoreOperation::Set {
            collection,
            id: id.to_owned(),
            mode,
        })?;
        let timestamp = state.server_timestamp(now);
        apply_operation(
            &mut state.collections,
            WriteOperation::Set {
                collection,
                id: id.to_owned(),
                data,
                mode,
            },
            &timestamp,
        )
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        data: DocumentWrite,
    ) -> Result<(), DocumentStoreError> {
        let now = self.clock.utc();
        let mut state = self.lock();
        state.record(StoreOperation::Update {
            collection,
            id: id.to_owned(),
        })?;
        let timestamp = state.server_timestamp(now);
        apply_operation(
            &mut state.collections,
            WriteOperation::Update {
                collection,
                id: id.to_owned(),
                data,
            },
            &timestamp,
        )
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), DocumentStoreError> {
        let mut state = self.lock();
        state.record(StoreOperation::Delete {
            collection,
            id: id.to_owned(),
        })?;
        if let Some(documents) = state.collections.get_mut(&collection) {
            documents.remove(id);
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<DocumentSnapshot>, DocumentStoreError> {
        let mut state = self.lock();
        state.record(StoreOperation::Query(query.clone()))?;
        evaluate::validate(query)?;

        let Some(documents) = state.collections.get(&query.collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<(&String, &Map<String, Value>)> = documents
            .iter()
            .filter(|(id, fields)| {
                query
                    .filters
                    .iter()
                    .all(|filter| evaluate::matches(id.as_str(), fields, filter))
            })
            .collect();
        if let Some(order) = &query.order_by {
            hits.sort_by(|left, right| {
                evaluate::compare(order, (left.0.as_str(), left.1), (right.0.as_str(), right.1))
            });
        }
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(hits
            .into_iter()
            .take(limit)
            .map(|(id, fields)| DocumentSnapshot::new(id.as_str(), fields.clone()))
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), DocumentStoreError> {
        let now = self.clock.utc();
        let mut state = self.lock();
        state.record(StoreOperation::Commit {
            writes: batch.len(),
        })?;
        let timestamp = state.server_timestamp(now);
        let mut staged = state.collections.clone();
        for operation in batch.into_operations() {
            apply_operation(&mut staged, operation, &timestamp)?;
        }
        state.collections = staged;
        Ok(())
    }
}

#[cfg(test)]
#[path = "document_store_tests.rs"]
mod tests;

//! In-process blob storage.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use url::Url;

use crate::domain::ports::{ObjectStore, ObjectStoreError};

/// Object store operation, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOperation {
    /// [`ObjectStore::put`].
    Put,
    /// [`ObjectStore::download_url`].
    DownloadUrl,
    /// [`ObjectStore::delete`].
    Delete,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, Vec<u8>>,
    failures: VecDeque<(ObjectOperation, ObjectStoreError)>,
}

impl State {
    fn take_failure(&mut self, operation: ObjectOperation) -> Result<(), ObjectStoreError> {
        let Some(index) = self
            .failures
            .iter()
            .position(|(failing, _)| *failing == operation)
        else {
            return Ok(());
        };
        match self.failures.remove(index) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }
}

/// Object store keeping blobs in a map and serving them under `base_url`.
pub struct InMemoryObjectStore {
    base_url: Url,
    state: Mutex<State>,
}

impl InMemoryObjectStore {
    /// Store whose download URLs resolve against `base_url`.
    ///
    /// `base_url` should end with `/` so object paths nest beneath it.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bytes stored at `path`.
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(path).cloned()
    }

    /// Paths of every stored object, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    /// Make the next `operation` fail with `error`.
    pub fn fail_next(&self, operation: ObjectOperation, error: ObjectStoreError) {
        self.lock().failures.push_back((operation, error));
    }
}

fn check_path(path: &str) -> Result<(), ObjectStoreError> {
    if path.is_empty() || path.starts_with('/') || path.split('/').any(str::is_empty) {
        return Err(ObjectStoreError::rejected(format!("invalid object path {path:?}")));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError> {
        check_path(path)?;
        let mut state = self.lock();
        state.take_failure(ObjectOperation::Put)?;
        state.objects.insert(path.to_owned(), bytes);
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<Url, ObjectStoreError> {
        let mut state = self.lock();
        state.take_failure(ObjectOperation::DownloadUrl)?;
        if !state.objects.contains_key(path) {
            return Err(ObjectStoreError::not_found(path));
        }
        self.base_url
            .join(path)
            .map_err(|err| ObjectStoreError::rejected(format!("cannot address {path}: {err}")))
    }

    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError> {
        let mut state = self.lock();
        state.take_failure(ObjectOperation::Delete)?;
        state
            .objects
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ObjectStoreError::not_found(path))
    }
}

//! Aggregation service.
//!
//! The single entry point for reads and writes against zines, profiles,
//! flowers and tags. The document store performs no joins, so this layer
//! composes them, enforces ownership rules and publishes invalidation
//! events after mutations that change the saved-zines view.
//!
//! Reads that return sequences degrade to an empty result when the backend
//! fails; the failure is only visible in the logs. Writes surface errors.

mod documents;
mod enrich;
mod flowers;
mod profiles;
mod saved;
mod tags;
mod zines;

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::Value;
use tracing::warn;

use crate::domain::ports::{
    Collection, DocumentSnapshot, DocumentStore, DocumentStoreError, FieldPath,
    IN_FILTER_LIMIT, ObjectStore, ObjectStoreError, Query,
};
use crate::domain::{Error, InvalidationBus, ZineId};

pub use self::zines::ZineDeletion;

/// Object-store layout and catalogue behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Folder holding zine covers.
    pub cover_prefix: String,
    /// Folder holding avatars.
    pub avatar_prefix: String,
    /// File extension appended to uploaded images.
    pub image_extension: String,
    /// Substitute the built-in tags when the backend has none.
    pub tag_fallback: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            cover_prefix: "zine-covers".to_owned(),
            avatar_prefix: "avatars".to_owned(),
            image_extension: "jpg".to_owned(),
            tag_fallback: true,
        }
    }
}

impl ServiceOptions {
    /// Object path of a zine's cover.
    ///
    /// # Examples
    /// ```
    /// use zinezone::domain::{ServiceOptions, ZineId};
    ///
    /// let id = ZineId::new("z1").expect("valid id");
    /// assert_eq!(ServiceOptions::default().cover_path(&id), "zine-covers/z1.jpg");
    /// ```
    pub fn cover_path(&self, zine_id: &ZineId) -> String {
        self.object_path(&self.cover_prefix, zine_id.as_str())
    }

    /// Object path of a user's avatar.
    pub fn avatar_path(&self, user_id: &crate::domain::UserId) -> String {
        self.object_path(&self.avatar_prefix, user_id.as_str())
    }

    fn object_path(&self, prefix: &str, id: &str) -> String {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            format!("{id}.{}", self.image_extension)
        } else {
            format!("{prefix}/{id}.{}", self.image_extension)
        }
    }
}

/// Stateless façade over the document and object stores.
#[derive(Clone)]
pub struct AggregationService<D, O> {
    documents: Arc<D>,
    objects: Arc<O>,
    bus: InvalidationBus,
    options: ServiceOptions,
}

impl<D, O> AggregationService<D, O> {
    /// Create a service with default options.
    pub fn new(documents: Arc<D>, objects: Arc<O>, bus: InvalidationBus) -> Self {
        Self::with_options(documents, objects, bus, ServiceOptions::default())
    }

    /// Create a service with explicit options.
    pub fn with_options(
        documents: Arc<D>,
        objects: Arc<O>,
        bus: InvalidationBus,
        options: ServiceOptions,
    ) -> Self {
        Self {
            documents,
            objects,
            bus,
            options,
        }
    }

    /// The bus mutations publish on.
    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }

    /// Active options.
    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }
}

impl<D, O> AggregationService<D, O>
where
    D: DocumentStore,
    O: ObjectStore,
{
    fn map_store_error(error: DocumentStoreError) -> Error {
        match error {
            DocumentStoreError::Unavailable { message } => {
                Error::backend_unavailable(format!("document store unavailable: {message}"))
            }
            DocumentStoreError::NotFound { collection, id } => {
                Error::not_found(format!("{collection}/{id} does not exist"))
            }
            DocumentStoreError::InvalidQuery { message } => {
                Error::internal(format!("document query rejected: {message}"))
            }
            DocumentStoreError::Decode { message } => {
                Error::internal(format!("stored document is malformed: {message}"))
            }
        }
    }

    fn map_object_error(error: ObjectStoreError) -> Error {
        match error {
            ObjectStoreError::Unavailable { message } => {
                Error::backend_unavailable(format!("object store unavailable: {message}"))
            }
            ObjectStoreError::NotFound { path } => {
                Error::not_found(format!("object {path} does not exist"))
            }
            ObjectStoreError::Rejected { message } => {
                Error::invalid_request(format!("upload rejected: {message}"))
            }
        }
    }

    /// Collapse a failed read into an empty result.
    fn degrade<T>(operation: &'static str, result: Result<Vec<T>, Error>) -> Vec<T> {
        result.unwrap_or_else(|error| {
            warn!(operation, error = %error, "read failed; returning empty result");
            Vec::new()
        })
    }

    /// Decode every snapshot, skipping the ones that do not fit.
    fn decode_all<T>(
        snapshots: &[DocumentSnapshot],
        decode: fn(&DocumentSnapshot) -> Result<T, DocumentStoreError>,
    ) -> Vec<T> {
        snapshots
            .iter()
            .filter_map(|snapshot| match decode(snapshot) {
                Ok(value) => Some(value),
                Err(error) => {
                    warn!(document_id = %snapshot.id, error = %error, "skipping undecodable document");
                    None
                }
            })
            .collect()
    }

    /// Fetch zines by id with `in` queries of at most [`IN_FILTER_LIMIT`]
    /// ids each, issued concurrently.
    ///
    /// Never queries when `ids` is empty. Result order is unspecified.
    async fn fetch_zines_by_id(&self, ids: &[ZineId]) -> Result<Vec<DocumentSnapshot>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let queries: Vec<Query> = ids
            .chunks(IN_FILTER_LIMIT)
            .map(|chunk| {
                let values = chunk.iter().map(|id| Value::from(id.as_str())).collect();
                Query::new(Collection::Zines).where_in(FieldPath::DocumentId, values)
            })
            .collect();
        let results = join_all(queries.iter().map(|query| self.documents.query(query))).await;

        let mut snapshots = Vec::with_capacity(ids.len());
        for result in results {
            snapshots.extend(result.map_err(Self::map_store_error)?);
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

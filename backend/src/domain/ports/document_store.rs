//! Port for the hosted document database.
//!
//! The [`DocumentStore`] trait captures the capability contract the
//! aggregation service relies on: point reads, generated-id inserts,
//! overwrite and merge writes, field-level array mutations, filtered and
//! ordered queries, batched writes, and server-assigned timestamps. The
//! store performs no joins; the service composes them.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::define_port_error;

/// Maximum number of values accepted by a single `in` filter.
pub const IN_FILTER_LIMIT: usize = 30;

/// Encode a timestamp the way the store persists them.
///
/// Timestamps are RFC 3339 UTC strings with fixed nanosecond precision, so
/// lexical order matches chronological order.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use zinezone::domain::ports::timestamp_value;
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid date");
/// assert_eq!(timestamp_value(at), "2024-05-01T12:00:00.000000000Z");
/// ```
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

define_port_error! {
    /// Errors raised by document store adapters.
    pub enum DocumentStoreError {
        /// The store could not be reached or timed out.
        Unavailable { message: String } =>
            "document store unavailable: {message}",
        /// A write targeted a document that does not exist.
        NotFound { collection: String, id: String } =>
            "document {collection}/{id} not found",
        /// The query was rejected before execution.
        InvalidQuery { message: String } =>
            "invalid document query: {message}",
        /// Stored data could not be converted to or from the requested shape.
        Decode { message: String } =>
            "document decode failed: {message}",
    }
}

/// Collections known to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    /// User profiles keyed by principal id.
    Users,
    /// Published zines.
    Zines,
    /// Flowers given to zines.
    Flowers,
    /// Tag reference data.
    Tags,
}

impl Collection {
    /// Collection name as stored in the backend.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Zines => "zines",
            Self::Flowers => "flowers",
            Self::Tags => "tags",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    /// Document identifier within its collection.
    pub id: String,
    /// Stored fields with server sentinels already resolved.
    pub fields: Map<String, Value>,
}

impl DocumentSnapshot {
    /// Build a snapshot from an id and a JSON object.
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Borrow a top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Deserialise the fields into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DocumentStoreError> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|err| {
            DocumentStoreError::decode(format!("document {}: {err}", self.id))
        })
    }
}

/// A single field mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Store the value as-is.
    Value(Value),
    /// Replace with the server's commit time.
    ServerTimestamp,
    /// Append each element not already present in the array.
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each element from the array.
    ArrayRemove(Vec<Value>),
}

/// Field mutations applied by a single write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentWrite {
    fields: BTreeMap<String, FieldValue>,
}

impl DocumentWrite {
    /// Empty write.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a serialisable struct into plain value writes.
    ///
    /// `value` must serialise to a JSON object.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, DocumentStoreError> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Ok(Self {
                fields: map
                    .into_iter()
                    .map(|(name, value)| (name, FieldValue::Value(value)))
                    .collect(),
            }),
            Ok(other) => Err(DocumentStoreError::decode(format!(
                "expected an object, got {other}"
            ))),
            Err(err) => Err(DocumentStoreError::decode(err.to_string())),
        }
    }

    /// Store `value` under `name`.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields
            .insert(name.into(), FieldValue::Value(value.into()));
        self
    }

    /// Stamp `name` with the server's commit time.
    #[must_use]
    pub fn server_timestamp(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), FieldValue::ServerTimestamp);
        self
    }

    /// Add `values` to the array stored under `name`.
    #[must_use]
    pub fn array_union(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.fields
            .insert(name.into(), FieldValue::ArrayUnion(values));
        self
    }

    /// Remove `values` from the array stored under `name`.
    #[must_use]
    pub fn array_remove(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.fields
            .insert(name.into(), FieldValue::ArrayRemove(values));
        self
    }

    /// Iterate over the field mutations in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Return `true` when no field would be written.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// How [`DocumentStore::set`] treats fields absent from the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Replace the whole document.
    Overwrite,
    /// Leave absent fields untouched, creating the document if needed.
    Merge,
}

/// Field addressed by a filter or ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    /// The document's own identifier.
    DocumentId,
    /// A top-level field.
    Field(String),
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self::Field(value.to_owned())
    }
}

/// Range comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
}

/// Query predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value.
    Equal {
        /// Field under test.
        field: FieldPath,
        /// Expected value.
        value: Value,
    },
    /// Field equals one of `values`; `values` must be non-empty and at most
    /// [`IN_FILTER_LIMIT`] long.
    In {
        /// Field under test.
        field: FieldPath,
        /// Candidate values.
        values: Vec<Value>,
    },
    /// Array field contains value.
    ArrayContains {
        /// Array field under test.
        field: FieldPath,
        /// Element to look for.
        value: Value,
    },
    /// Field compares against value.
    Compare {
        /// Field under test.
        field: FieldPath,
        /// Operator.
        op: Comparison,
        /// Right-hand side.
        value: Value,
    },
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Ordering clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Sort key.
    pub field: FieldPath,
    /// Sort direction.
    pub direction: Direction,
}

/// A filtered, optionally ordered query over one collection.
///
/// # Examples
/// ```
/// use zinezone::domain::ports::{Collection, Direction, Query};
///
/// let query = Query::new(Collection::Zines)
///     .where_equal("artistId", "a1")
///     .order_by("createdAt", Direction::Descending);
/// assert_eq!(query.filters.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection to scan.
    pub collection: Collection,
    /// Conjunction of predicates.
    pub filters: Vec<Filter>,
    /// Optional ordering.
    pub order_by: Option<OrderBy>,
    /// Optional maximum result count.
    pub limit: Option<usize>,
}

impl Query {
    /// Unfiltered query over `collection`.
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add an equality predicate.
    #[must_use]
    pub fn where_equal(mut self, field: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Equal {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Add an `in` predicate.
    #[must_use]
    pub fn where_in(mut self, field: impl Into<FieldPath>, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In {
            field: field.into(),
            values,
        });
        self
    }

    /// Add an array-contains predicate.
    #[must_use]
    pub fn where_array_contains(
        mut self,
        field: impl Into<FieldPath>,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter::ArrayContains {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Add a range predicate.
    #[must_use]
    pub fn where_compare(
        mut self,
        field: impl Into<FieldPath>,
        op: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter::Compare {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Order results.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<FieldPath>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Return `true` when any predicate is an `in` filter.
    pub fn has_in_filter(&self) -> bool {
        self.filters
            .iter()
            .any(|filter| matches!(filter, Filter::In { .. }))
    }
}

/// One write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOperation {
    /// See [`DocumentStore::set`].
    Set {
        /// Target collection.
        collection: Collection,
        /// Target document.
        id: String,
        /// Field mutations.
        data: DocumentWrite,
        /// Overwrite or merge.
        mode: SetMode,
    },
    /// See [`DocumentStore::update`].
    Update {
        /// Target collection.
        collection: Collection,
        /// Target document.
        id: String,
        /// Field mutations.
        data: DocumentWrite,
    },
    /// See [`DocumentStore::delete`].
    Delete {
        /// Target collection.
        collection: Collection,
        /// Target document.
        id: String,
    },
}

/// Writes committed atomically: all apply or none do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    operations: Vec<WriteOperation>,
}

impl WriteBatch {
    /// Empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an update of an existing document.
    pub fn update(&mut self, collection: Collection, id: impl Into<String>, data: DocumentWrite) {
        self.operations.push(WriteOperation::Update {
            collection,
            id: id.into(),
            data,
        });
    }

    /// Queue a set.
    pub fn set(
        &mut self,
        collection: Collection,
        id: impl Into<String>,
        data: DocumentWrite,
        mode: SetMode,
    ) {
        self.operations.push(WriteOperation::Set {
            collection,
            id: id.into(),
            data,
            mode,
        });
    }

    /// Queue a delete.
    pub fn delete(&mut self, collection: Collection, id: impl Into<String>) {
        self.operations.push(WriteOperation::Delete {
            collection,
            id: id.into(),
        });
    }

    /// Number of queued writes.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Return `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Consume the batch, yielding its writes in order.
    pub fn into_operations(self) -> Vec<WriteOperation> {
        self.operations
    }
}

/// Port for the document database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id. Returns `None` when it does not exist.
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<DocumentSnapshot>, DocumentStoreError>;

    /// Insert a document under a store-generated id and return that id.
    async fn add(
        &self,
        collection: Collection,
        data: DocumentWrite,
    ) -> Result<String, DocumentStoreError>;

    /// Write a document under a caller-chosen id.
    async fn set(
        &self,
        collection: Collection,
        id: &str,
        data: DocumentWrite,
        mode: SetMode,
    ) -> Result<(), DocumentStoreError>;

    /// Apply field mutations to an existing document.
    ///
    /// Fails with [`DocumentStoreError::NotFound`] when the document is
    /// absent.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        data: DocumentWrite,
    ) -> Result<(), DocumentStoreError>;

    /// Delete a document. Deleting an absent document succeeds.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), DocumentStoreError>;

    /// Run a query.
    async fn query(&self, query: &Query) -> Result<Vec<DocumentSnapshot>, DocumentStoreError>;

    /// Commit a batch atomically.
    async fn commit(&self, batch: WriteBatch) -> Result<(), DocumentStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        display_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        avatar: Option<String>,
    }

    #[rstest]
    fn from_serializable_writes_plain_values() {
        let write = DocumentWrite::from_serializable(&Sample {
            display_name: "Ada".to_owned(),
            avatar: None,
        })
        .expect("object serialises");
        let fields: Vec<_> = write.iter().collect();
        assert_eq!(fields.len(), 1);
        assert_eq!(
            fields.first().map(|(_, value)| (*value).clone()),
            Some(FieldValue::Value(json!("Ada")))
        );
    }

    #[rstest]
    fn from_serializable_rejects_non_objects() {
        let err = DocumentWrite::from_serializable(&42).expect_err("not an object");
        assert!(matches!(err, DocumentStoreError::Decode { .. }));
    }

    #[rstest]
    fn snapshot_decode_reports_document_id() {
        let snapshot = DocumentSnapshot::new("z1", Map::new());
        let err = snapshot
            .decode::<Sample2>()
            .expect_err("missing required field");
        assert!(err.to_string().contains("z1"));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Sample2 {
        #[expect(dead_code, reason = "field exists only to force a decode failure")]
        title: String,
    }

    #[rstest]
    fn query_builder_tracks_in_filters() {
        let plain = Query::new(Collection::Zines).where_equal("artistId", "a1");
        assert!(!plain.has_in_filter());
        let batched =
            Query::new(Collection::Zines).where_in(FieldPath::DocumentId, vec![json!("z1")]);
        assert!(batched.has_in_filter());
    }

    #[rstest]
    fn not_found_error_formats_path() {
        let err = DocumentStoreError::not_found("users", "u1");
        assert_eq!(err.to_string(), "document users/u1 not found");
    }
}

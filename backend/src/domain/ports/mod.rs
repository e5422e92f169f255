//! Domain ports for the hexagonal boundary.
//!
//! The aggregation service consumes three outbound collaborators: the
//! document database, blob storage and the identity provider. Adapters
//! live under `crate::outbound`.

mod macros;
pub(crate) use macros::define_port_error;

mod document_store;
mod identity_provider;
mod object_store;

#[cfg(test)]
pub use document_store::MockDocumentStore;
pub use document_store::{
    Collection, Comparison, Direction, DocumentSnapshot, DocumentStore, DocumentStoreError,
    DocumentWrite, FieldPath, FieldValue, Filter, IN_FILTER_LIMIT, OrderBy, Query, SetMode,
    WriteBatch, WriteOperation, timestamp_value,
};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::IdentityProvider;
#[cfg(test)]
pub use object_store::MockObjectStore;
pub use object_store::{ObjectStore, ObjectStoreError};

//! In-process adapters for every domain port.
//!
//! These back local development and the behavioural tests. They follow the
//! hosted services' observable semantics (server timestamps, `in` filter
//! limits, atomic batches, download URLs) without any network access.

mod document_store;
mod evaluate;
mod identity;
mod object_store;

pub use document_store::{InMemoryDocumentStore, OperationKind, StoreOperation};
pub use identity::StaticIdentityProvider;
pub use object_store::{InMemoryObjectStore, ObjectOperation};

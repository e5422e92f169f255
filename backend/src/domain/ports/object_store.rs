//! Port for blob storage (zine covers and avatars).

use async_trait::async_trait;
use url::Url;

use super::define_port_error;

define_port_error! {
    /// Errors raised by object store adapters.
    pub enum ObjectStoreError {
        /// The store could not be reached or timed out.
        Unavailable { message: String } =>
            "object store unavailable: {message}",
        /// No object exists at the path.
        NotFound { path: String } =>
            "object {path} not found",
        /// The store refused the operation (quota, permissions, bad path).
        Rejected { message: String } =>
            "object store rejected the request: {message}",
    }
}

/// Port for storing and addressing binary objects.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `path`, replacing any existing object.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), ObjectStoreError>;

    /// Resolve a retrievable URL for the object at `path`.
    async fn download_url(&self, path: &str) -> Result<Url, ObjectStoreError>;

    /// Remove the object at `path`.
    async fn delete(&self, path: &str) -> Result<(), ObjectStoreError>;
}
